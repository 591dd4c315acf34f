//! # 画像スナップショット
//!
//! 画像ファイルを`data:<mime>;base64,...`形式のURLに変換する。
//! ブラウザでcanvasのスクリーンショットを取得するのと同じ形式になる。

use std::path::Path;

use base64::Engine;

/// スナップショット取得のエラー型。
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// ファイルの読み込み失敗
    #[error("画像ファイルを読み込めません: {0}")]
    Io(#[from] std::io::Error),
    /// 対応していない画像形式
    #[error("対応していない画像形式です: {0}")]
    UnsupportedFormat(String),
    /// 空のファイル
    #[error("画像ファイルが空です")]
    Empty,
}

/// 拡張子からMIMEタイプを決定する。
pub fn mime_type(path: &Path) -> Result<&'static str, SnapshotError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "gif" => Ok("image/gif"),
        "webp" => Ok("image/webp"),
        "svg" => Ok("image/svg+xml"),
        _ => Err(SnapshotError::UnsupportedFormat(path.display().to_string())),
    }
}

/// バイト列をdata URLに変換する。
pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{mime};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// 画像ファイルを読み込み、data URLを返す。
pub async fn image_data_url(path: &Path) -> Result<String, SnapshotError> {
    let mime = mime_type(path)?;
    let bytes = tokio::fs::read(path).await?;
    if bytes.is_empty() {
        return Err(SnapshotError::Empty);
    }
    Ok(data_url(mime, &bytes))
}
