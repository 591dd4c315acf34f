//! # コレクションコントラクト解決
//!
//! 設定されたコレクションアドレスに、ERC-721互換のコントラクトが
//! デプロイされているかを確認する。
//!
//! ## 解決手順
//! 1. `eth_getCode`でバイトコードの存在を確認
//! 2. `eth_call`で`supportsInterface(0x80ac58cd)`を呼び出し、ERC-721対応を確認

use alloy_primitives::{Address, FixedBytes};
use alloy_sol_types::SolCall;
use voucher_crypto::{ITokenERC721, ERC721_INTERFACE_ID};
use voucher_types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};

/// コントラクト解決のエラー型。
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// アドレスにバイトコードが存在しない
    #[error("コントラクトがデプロイされていません: {0}")]
    NotDeployed(String),
    /// ERC-721に対応していない
    #[error("ERC-721互換のコントラクトではありません: {0}")]
    Incompatible(String),
    /// RPCノードとの通信失敗
    #[error("RPC呼び出しに失敗: {0}")]
    Rpc(String),
}

/// コレクションコントラクトを解決するトレイト。
///
/// RPCノード以外の解決方法（テスト用の固定結果等）に差し替えられるよう抽象化する。
#[async_trait::async_trait]
pub trait CollectionResolver: Send + Sync {
    /// コレクションが利用可能であれば`Ok(())`を返す。
    async fn resolve(&self, collection: Address) -> Result<(), ResolveError>;
}

/// JSON-RPC経由でコントラクトを解決する実装。
pub struct RpcResolver {
    /// HTTPクライアント
    http_client: reqwest::Client,
    /// RPCエンドポイント
    rpc_url: String,
}

impl RpcResolver {
    /// RpcResolverを構築する。
    pub fn new(http_client: reqwest::Client, rpc_url: String) -> Self {
        Self {
            http_client,
            rpc_url,
        }
    }

    /// JSON-RPCを呼び出す。外側のErrは通信失敗、内側のErrはノードが返したエラー。
    async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Result<serde_json::Value, JsonRpcError>, ResolveError> {
        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&JsonRpcRequest::new(method, params))
            .send()
            .await
            .map_err(|e| ResolveError::Rpc(format!("{method}の送信失敗: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Rpc(format!("{method}: HTTP {status}")));
        }

        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| ResolveError::Rpc(format!("{method}のレスポンスのパースに失敗: {e}")))?;

        match (body.result, body.error) {
            (_, Some(error)) => Ok(Err(error)),
            (Some(result), None) => Ok(Ok(result)),
            (None, None) => Err(ResolveError::Rpc(format!("{method}のレスポンスにresultがありません"))),
        }
    }
}

#[async_trait::async_trait]
impl CollectionResolver for RpcResolver {
    async fn resolve(&self, collection: Address) -> Result<(), ResolveError> {
        let address = voucher_crypto::format_address(&collection);

        // Step 1: バイトコードの存在確認
        let code = self
            .call("eth_getCode", serde_json::json!([address, "latest"]))
            .await?
            .map_err(|e| ResolveError::Rpc(format!("eth_getCode: {e}")))?;
        let code = code.as_str().unwrap_or_default();
        if code.is_empty() || code == "0x" {
            return Err(ResolveError::NotDeployed(address));
        }

        // Step 2: ERC-165によるERC-721対応確認
        let calldata = ITokenERC721::supportsInterfaceCall {
            interfaceId: FixedBytes::new(ERC721_INTERFACE_ID),
        }
        .abi_encode();
        let call_params = serde_json::json!([
            { "to": address, "data": format!("0x{}", hex::encode(calldata)) },
            "latest"
        ]);

        let returned = match self.call("eth_call", call_params).await? {
            Ok(value) => value,
            Err(error) => {
                return Err(ResolveError::Incompatible(format!(
                    "{address}: supportsInterfaceが失敗しました: {error}"
                )));
            }
        };

        let returned = returned.as_str().unwrap_or_default();
        let bytes = hex::decode(returned.trim_start_matches("0x")).map_err(|e| {
            ResolveError::Rpc(format!("eth_callの戻り値をデコードできません: {e}"))
        })?;
        let supported = ITokenERC721::supportsInterfaceCall::abi_decode_returns(&bytes, true)
            .map_err(|e| {
                ResolveError::Incompatible(format!(
                    "{address}: supportsInterfaceの戻り値が不正です: {e}"
                ))
            })?
            ._0;

        if !supported {
            return Err(ResolveError::Incompatible(address));
        }
        Ok(())
    }
}
