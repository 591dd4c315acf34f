//! # テスト用共通ヘルパー
//!
//! service, resolver, endpointsのテストで共有するモック群。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use alloy_primitives::Address;

use crate::config::{
    SignerConfig, DEFAULT_CHAIN_ID, DEFAULT_DESCRIPTION, DEFAULT_MAX_IMAGE_BYTES,
    DEFAULT_VALIDITY_WINDOW_SECS,
};
use crate::resolver::{CollectionResolver, ResolveError};
use crate::service::VoucherSigner;

/// テスト用の受取人アドレス（EIP-55形式）
pub const TEST_RECIPIENT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

/// 4x4ピクセルのPNG（canvasのスクリーンショット相当）
pub const TEST_IMAGE: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAQAAAAECAYAAACp8Z5+AAAAEklEQVR4nGM4URHwHxkzkC4AAGyHKPHsjI6oAAAAAElFTkSuQmCC";

/// 固定の結果を返すモックResolver。呼び出し回数を記録する。
pub struct StaticResolver {
    /// trueなら常にNotDeployedを返す
    fail: bool,
    /// resolveの呼び出し回数
    calls: Arc<AtomicUsize>,
}

impl StaticResolver {
    /// 常に成功するResolver。
    pub fn ok() -> Self {
        Self {
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 常に失敗するResolver。
    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait::async_trait]
impl CollectionResolver for StaticResolver {
    async fn resolve(&self, collection: Address) -> Result<(), ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ResolveError::NotDeployed(voucher_crypto::format_address(
                &collection,
            )));
        }
        Ok(())
    }
}

/// テスト用の設定を構築する。署名鍵は毎回ランダム。
pub fn test_config() -> SignerConfig {
    SignerConfig {
        signing_key: voucher_crypto::SigningKey::random(&mut rand::rngs::OsRng),
        collection_address: Address::repeat_byte(0x11),
        chain_id: DEFAULT_CHAIN_ID,
        rpc_url: "http://127.0.0.1:0".to_string(),
        validity_window_secs: DEFAULT_VALIDITY_WINDOW_SECS,
        royalty_recipient: Address::ZERO,
        royalty_bps: 0,
        primary_sale_recipient: Address::ZERO,
        description: DEFAULT_DESCRIPTION.to_string(),
        max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        listen_addr: "127.0.0.1:0".to_string(),
    }
}

/// テスト用のVoucherSignerと、Resolverの呼び出し回数カウンタを返す。
pub fn test_signer(resolver: StaticResolver) -> (VoucherSigner, Arc<AtomicUsize>) {
    let calls = resolver.calls.clone();
    (VoucherSigner::new(test_config(), Box::new(resolver)), calls)
}

/// モックJSON-RPCノードを起動し、URLを返す。
///
/// - `eth_getCode` には `code` を返す
/// - `eth_call` には `supports` の値をABIエンコードしたboolを返す（Noneならrevert）
pub async fn start_mock_rpc(code: &'static str, supports: Option<bool>) -> String {
    use axum::routing::post;
    use axum::Json;

    let app = axum::Router::new().route(
        "/",
        post(move |Json(body): Json<serde_json::Value>| async move {
            let method = body
                .get("method")
                .and_then(|m| m.as_str())
                .unwrap_or_default()
                .to_string();
            let response = match (method.as_str(), supports) {
                ("eth_getCode", _) => serde_json::json!({"jsonrpc": "2.0", "id": 1, "result": code}),
                ("eth_call", Some(flag)) => serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "result": format!("0x{:064x}", u8::from(flag)),
                }),
                ("eth_call", None) => serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "error": {"code": 3, "message": "execution reverted"},
                }),
                _ => serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "error": {"code": -32601, "message": "method not found"},
                }),
            };
            Json(response)
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    format!("http://127.0.0.1:{port}")
}
