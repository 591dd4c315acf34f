//! # GET /.well-known/voucher-signer
//!
//! 署名者情報公開エンドポイント。

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use voucher_types::SignerInfo;

use crate::service::VoucherSigner;

/// GET /.well-known/voucher-signer: 署名者情報公開。
///
/// コントラクト管理者がミンター権限を付与するアドレスの確認や、
/// Requesterによるバウチャー署名者の事前検証に使用する。
pub async fn handle_signer_info(State(signer): State<Arc<VoucherSigner>>) -> Json<SignerInfo> {
    Json(signer.signer_info())
}
