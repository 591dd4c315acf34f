//! # POST /voucher
//!
//! ミント要求を受け取り、署名済みバウチャーを返す。
//!
//! ボディはContent-Typeに関わらずJSONとして解析する
//! （既存のクライアントは`text/plain`でJSON文字列を送信する）。
//! 解析失敗は業務上の検証エラーとは別の`MalformedRequest`として扱う。

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use voucher_types::{VoucherRequest, VoucherResponse};

use crate::error::SignerError;
use crate::service::VoucherSigner;

/// POST /voucher: バウチャー発行。
pub async fn handle_voucher(
    State(signer): State<Arc<VoucherSigner>>,
    body: Bytes,
) -> Result<Json<VoucherResponse>, SignerError> {
    let request: VoucherRequest = serde_json::from_slice(&body)
        .map_err(|e| SignerError::MalformedRequest(e.to_string()))?;

    let now = unix_now()?;
    let voucher = signer.issue_voucher(request, now).await?;

    Ok(Json(VoucherResponse {
        signed_payload: Some(voucher),
    }))
}

/// 現在時刻（UNIX秒）
fn unix_now() -> Result<u64, SignerError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| SignerError::Signing(format!("時刻取得失敗: {e}")))
}
