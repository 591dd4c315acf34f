//! # JSON-RPCコレクション
//!
//! ユーザーのウォレットアカウントから`eth_sendTransaction`で`mintWithSignature`を送信し、
//! `eth_getTransactionReceipt`をポーリングして確定を待つ。
//! トークンIDはERC-721の`Transfer`ログから取得する。
//!
//! 署名はノード側で行われるため、送信元アカウントをアンロック済みで保持するノードが必要。
//! 公開RPCエンドポイントは`eth_sendTransaction`を受け付けない。
//!
//! ## エラーの扱い
//! - 送信時のRPCエラー（revert含む） → `Rejected`
//! - receiptの`status`が`0x0` → `Rejected`
//! - 通信失敗 → `Rpc`
//! - ポーリング回数の上限到達 → `Timeout`

use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolEvent};
use voucher_crypto::ITokenERC721;
use voucher_types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MintVoucher, MintedToken};

use super::{encode_request, ChainError, CollectionContract};

/// receiptポーリング間隔のデフォルト
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// receiptポーリング回数のデフォルト
pub const DEFAULT_MAX_POLLS: u32 = 60;

/// JSON-RPC経由のコレクションコントラクト。
pub struct RpcCollection {
    /// HTTPクライアント
    http_client: reqwest::Client,
    /// RPCエンドポイント
    rpc_url: String,
    /// トランザクション送信元（ユーザーのウォレット）
    from: Address,
    /// コレクションコントラクトのアドレス
    collection: Address,
    /// receiptポーリング間隔
    poll_interval: Duration,
    /// receiptポーリング回数の上限
    max_polls: u32,
}

impl RpcCollection {
    /// RpcCollectionを構築する。
    pub fn new(
        http_client: reqwest::Client,
        rpc_url: impl Into<String>,
        from: Address,
        collection: Address,
    ) -> Self {
        Self {
            http_client,
            rpc_url: rpc_url.into(),
            from,
            collection,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    /// receiptのポーリング設定を変更する。
    pub fn with_polling(mut self, poll_interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = poll_interval;
        self.max_polls = max_polls;
        self
    }

    /// JSON-RPCを呼び出す。外側のErrは通信失敗、内側のErrはノードが返したエラー。
    async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Result<serde_json::Value, JsonRpcError>, ChainError> {
        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&JsonRpcRequest::new(method, params))
            .send()
            .await
            .map_err(|e| ChainError::Rpc(format!("{method}の送信失敗: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChainError::Rpc(format!("{method}: HTTP {status}")));
        }

        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| ChainError::Rpc(format!("{method}のレスポンスのパースに失敗: {e}")))?;

        match (body.result, body.error) {
            (_, Some(error)) => Ok(Err(error)),
            (result, None) => Ok(Ok(result.unwrap_or(serde_json::Value::Null))),
        }
    }

    /// トランザクションを送信し、トランザクションハッシュを返す。
    async fn send_transaction(&self, calldata: Vec<u8>) -> Result<String, ChainError> {
        let params = serde_json::json!([{
            "from": voucher_crypto::format_address(&self.from),
            "to": voucher_crypto::format_address(&self.collection),
            "data": format!("0x{}", hex::encode(calldata)),
            "value": "0x0",
        }]);

        let hash = self
            .call("eth_sendTransaction", params)
            .await?
            .map_err(|e| ChainError::Rejected(e.to_string()))?;
        hash.as_str()
            .map(str::to_string)
            .ok_or_else(|| ChainError::Rpc("eth_sendTransactionの結果が文字列ではありません".into()))
    }

    /// receiptが得られるまでポーリングする。
    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<serde_json::Value, ChainError> {
        for _ in 0..self.max_polls {
            let receipt = self
                .call("eth_getTransactionReceipt", serde_json::json!([tx_hash]))
                .await?
                .map_err(|e| ChainError::Rpc(e.to_string()))?;
            if !receipt.is_null() {
                return Ok(receipt);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        Err(ChainError::Timeout(format!(
            "{tx_hash}（{}回ポーリング）",
            self.max_polls
        )))
    }
}

#[async_trait::async_trait]
impl CollectionContract for RpcCollection {
    async fn mint_with_signature(&self, voucher: &MintVoucher) -> Result<MintedToken, ChainError> {
        let (request, signature) = encode_request(voucher)?;
        let calldata = ITokenERC721::mintWithSignatureCall {
            req: request,
            signature: Bytes::from(signature),
        }
        .abi_encode();

        let tx_hash = self.send_transaction(calldata).await?;
        tracing::info!(tx_hash = %tx_hash, uid = %voucher.uid, "mintWithSignatureを送信しました");

        let receipt = self.wait_for_receipt(&tx_hash).await?;
        if receipt.get("status").and_then(|s| s.as_str()) != Some("0x1") {
            return Err(ChainError::Rejected(format!(
                "トランザクションがrevertしました: {tx_hash}"
            )));
        }

        let (owner, token_id) = transfer_from_receipt(&receipt, self.collection)
            .ok_or_else(|| ChainError::Rpc(format!("Transferログが見つかりません: {tx_hash}")))?;
        let owner = voucher_crypto::format_address(&owner);
        tracing::info!(token_id = %token_id, owner = %owner, "ミントが確定しました");

        Ok(MintedToken {
            token_id: token_id.to_string(),
            owner,
            transaction_hash: Some(tx_hash),
            voucher_uid: voucher.uid.clone(),
        })
    }
}

/// receiptのログからコレクションが発行した`Transfer`を探し、(受取人, トークンID)を返す。
fn transfer_from_receipt(receipt: &serde_json::Value, collection: Address) -> Option<(Address, U256)> {
    receipt.get("logs")?.as_array()?.iter().find_map(|log| {
        let emitter: Address = log.get("address")?.as_str()?.parse().ok()?;
        if emitter != collection {
            return None;
        }
        let topics = log
            .get("topics")?
            .as_array()?
            .iter()
            .map(|topic| topic.as_str()?.parse::<B256>().ok())
            .collect::<Option<Vec<_>>>()?;
        if topics.len() != 4 || topics[0] != ITokenERC721::Transfer::SIGNATURE_HASH {
            return None;
        }
        Some((
            Address::from_word(topics[2]),
            U256::from_be_slice(topics[3].as_slice()),
        ))
    })
}
