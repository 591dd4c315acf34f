//! # Signer Serviceクライアント
//!
//! `POST /voucher`と`GET /.well-known/voucher-signer`を呼び出す。

use voucher_types::{ErrorResponse, MintVoucher, SignerInfo, VoucherRequest, VoucherResponse};

use crate::error::MintError;

/// Signer ServiceのHTTPクライアント。
#[derive(Debug, Clone)]
pub struct SignerClient {
    /// HTTPクライアント
    http_client: reqwest::Client,
    /// Signer ServiceのベースURL（例: `http://localhost:3000`）
    base_url: String,
}

impl SignerClient {
    /// SignerClientを構築する。
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http_client,
            base_url,
        }
    }

    /// ベースURL。
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// バウチャーを要求する。
    ///
    /// 非2xx、または`signedPayload`が欠落・nullの場合はエラーを返す。
    /// 不完全なバウチャーを呼び出し元に渡すことはない。
    pub async fn request_voucher(&self, intent: &VoucherRequest) -> Result<MintVoucher, MintError> {
        let url = format!("{}/voucher", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .json(intent)
            .send()
            .await
            .map_err(|e| MintError::Transport(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            tracing::warn!(status = status.as_u16(), message = %message, "Signer Serviceがエラーを返しました");
            return Err(if status.is_client_error() {
                MintError::SignerRejected {
                    status: status.as_u16(),
                    message,
                }
            } else {
                MintError::SignerUnavailable {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        let body: VoucherResponse = response
            .json()
            .await
            .map_err(|e| MintError::Transport(format!("レスポンスのパースに失敗: {e}")))?;
        body.signed_payload.ok_or(MintError::MissingPayload)
    }

    /// 署名者情報を取得する。
    pub async fn signer_info(&self) -> Result<SignerInfo, MintError> {
        let url = format!("{}/.well-known/voucher-signer", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| MintError::Transport(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MintError::Discovery(format!("{url}: HTTP {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| MintError::Discovery(format!("署名者情報のパースに失敗: {e}")))
    }
}

/// エラーレスポンスから要約メッセージを取り出す。JSONでなければ本文をそのまま使う。
async fn error_message(response: reqwest::Response) -> String {
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(body) => body.error,
        Err(_) => text,
    }
}
