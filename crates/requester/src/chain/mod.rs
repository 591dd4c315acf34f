//! # コレクションコントラクト
//!
//! バウチャーを`mintWithSignature`として提出する先の抽象。
//!
//! ## コントラクトの検証内容
//! - 復元した署名者がミンター権限を持ち、`uid`が未使用であること
//! - `validityStartTimestamp <= block.timestamp <= validityEndTimestamp`（両端を含む）
//! - `to`がゼロアドレスでないこと
//! - `price`が0でなければ、その額が支払われていること
//!
//! 成功時は`uid`を使用済みにし、トークンIDを0から順に割り当てる。
//! `royaltyRecipient`がゼロアドレスでなければトークン単位のロイヤリティを記録する。

pub mod local;
pub mod rpc;

pub use local::LocalCollection;
pub use rpc::RpcCollection;

use voucher_crypto::MintRequest;
use voucher_types::{MintedToken, MintVoucher};

/// チェーン操作のエラー型。
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// コントラクトが要求を拒否した（revert）
    #[error("ミントが拒否されました: {0}")]
    Rejected(String),
    /// RPCノードとの通信失敗
    #[error("RPC呼び出しに失敗: {0}")]
    Rpc(String),
    /// トランザクションの確定待ちがタイムアウトした
    #[error("トランザクションの確定待ちがタイムアウトしました: {0}")]
    Timeout(String),
}

/// バウチャーを受け付けるコレクションコントラクト。
#[async_trait::async_trait]
pub trait CollectionContract: Send + Sync {
    /// `mintWithSignature(req, signature)`を実行し、ミントされたトークンを返す。
    async fn mint_with_signature(&self, voucher: &MintVoucher) -> Result<MintedToken, ChainError>;
}

/// バウチャーからコントラクトに渡す`MintRequest`と署名バイト列を取り出す。
///
/// `uri`はバウチャーに記載された値をそのまま使う（コントラクトはメタデータを解釈しない）。
pub(crate) fn encode_request(voucher: &MintVoucher) -> Result<(MintRequest, Vec<u8>), ChainError> {
    let request =
        voucher_crypto::request_fields(voucher).map_err(|e| ChainError::Rejected(e.to_string()))?;
    let signature = voucher_crypto::decode_signature(&voucher.signature)
        .map_err(|e| ChainError::Rejected(e.to_string()))?;
    Ok((request, signature))
}
