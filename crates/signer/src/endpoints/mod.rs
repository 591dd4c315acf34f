//! # Signer Serviceエンドポイント
//!
//! ## API エンドポイント
//! - `POST /voucher`: バウチャー発行（`POST /api/server`は既存クライアント向けの別名）
//! - `GET /.well-known/voucher-signer`: 署名者情報公開

pub mod signer_info;
pub mod voucher;

pub use signer_info::handle_signer_info;
pub use voucher::handle_voucher;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;

use crate::service::VoucherSigner;

/// axumルーターを構築する。
pub fn router(signer: Arc<VoucherSigner>, body_limit: usize) -> axum::Router {
    axum::Router::new()
        .route("/voucher", axum::routing::post(handle_voucher))
        .route("/api/server", axum::routing::post(handle_voucher))
        .route(
            "/.well-known/voucher-signer",
            axum::routing::get(handle_signer_info),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(signer)
}
