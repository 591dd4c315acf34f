//! # Signer Service エラー型
//!
//! 内部の詳細はサーバー側でログに残し、信頼境界を越えるのは要約メッセージのみ。

use axum::http::StatusCode;
use axum::Json;
use voucher_types::ErrorResponse;

/// Signer Serviceのリクエスト単位のエラー型。
///
/// 設定エラーはリクエスト単位では発生しない（起動時に`ConfigError`で停止する）。
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    /// リクエストボディのパース失敗（JSONでない、型不一致、必須フィールド欠落）
    #[error("リクエストボディを解析できません: {0}")]
    MalformedRequest(String),
    /// ミント要求の検証失敗（アドレス不正、表示名の長さ超過、画像サイズ超過）
    #[error("不正なリクエスト: {0}")]
    Validation(String),
    /// コレクションコントラクトを解決できない
    #[error("コレクションコントラクトを解決できません: {0}")]
    Dependency(String),
    /// 署名処理の失敗。部分的なバウチャーは返さない。
    #[error("バウチャーの署名に失敗: {0}")]
    Signing(String),
}

impl SignerError {
    /// HTTPステータスコード。
    pub fn status(&self) -> StatusCode {
        match self {
            SignerError::MalformedRequest(_) | SignerError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            SignerError::Dependency(_) => StatusCode::BAD_GATEWAY,
            SignerError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// クライアントに返す要約メッセージ。
    /// 入力起因のエラーは詳細を返し、サーバー起因のエラーは内部情報を含めない。
    pub fn public_message(&self) -> String {
        match self {
            SignerError::MalformedRequest(_) | SignerError::Validation(_) => self.to_string(),
            SignerError::Dependency(_) => {
                "コレクションコントラクトを解決できません。時間をおいて再試行してください".to_string()
            }
            SignerError::Signing(_) => "バウチャーの署名に失敗しました".to_string(),
        }
    }
}

impl axum::response::IntoResponse for SignerError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "バウチャー発行に失敗");
        } else {
            tracing::warn!(status = %status, error = %self, "バウチャー要求を拒否");
        }
        let body = ErrorResponse {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}
