//! # Avatar Mint 共有型定義
//!
//! Signer ServiceとVoucher Requesterの間で受け渡されるデータ構造をRust構造体として提供する。
//!
//! ## エンコーディング規則
//! - アドレス: `0x` + 40桁の16進数（出力時はEIP-55チェックサム形式）
//! - バイナリ（uid, 署名）: `0x`プレフィックス付き16進数
//! - タイムスタンプ: UNIX秒（JSON整数。2^53未満のため精度劣化なし）
//! - JSONフィールド名: camelCase

use serde::{Deserialize, Serialize};

/// 表示名の最大文字数（Unicodeスカラー値単位）。
pub const MAX_NFT_NAME_CHARS: usize = 26;

// ---------------------------------------------------------------------------
// /voucher リクエスト（MintIntent）
// ---------------------------------------------------------------------------

/// クライアントが送信するミント要求。
///
/// 認可情報は一切含まない。あくまで「要求」であり資格情報ではない。
/// `authorAddress`はウォレット未接続のクライアントから欠落して届くことがあるため
/// `Option`で受け、検証段階で拒否する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherRequest {
    /// 受取人アドレス
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_address: Option<String>,
    /// NFTの表示名（省略時は空文字列として扱う）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nft_name: Option<String>,
    /// 画像ペイロード（通常は`data:image/png;base64,...`）
    pub image: String,
}

impl VoucherRequest {
    /// 表示名を返す。省略時は空文字列。
    pub fn display_name(&self) -> &str {
        self.nft_name.as_deref().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// バウチャー
// ---------------------------------------------------------------------------

/// NFTメタデータ。`uri`にエンコードされ、署名の対象となる。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NftMetadata {
    /// トークン名
    pub name: String,
    /// 説明文（サービス固定値）
    pub description: String,
    /// 画像ペイロード（リクエストの値をそのまま保持）
    pub image: String,
    /// 追加プロパティ（現状は常に空）
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// Signer Serviceが署名したミントバウチャー。
///
/// 署名はthirdweb `TokenERC721`のEIP-712型付き構造体`MintRequest`に対して行われる。
/// `metadata`以外のフィールドはその構造体のフィールドに一対一で対応し、
/// `uri`は`metadata`から決定的に導出されるため、いずれを改変しても署名検証に失敗する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintVoucher {
    /// 受取人アドレス（EIP-55形式）
    pub to: String,
    /// ロイヤリティ受取人（ゼロアドレスならコントラクトのデフォルト設定に従う）
    pub royalty_recipient: String,
    /// ロイヤリティ（basis points）
    pub royalty_bps: u64,
    /// 一次販売の売上受取人
    pub primary_sale_recipient: String,
    /// NFTメタデータ
    pub metadata: NftMetadata,
    /// トークンURI（`data:application/json;base64,...`）
    pub uri: String,
    /// ミント価格（最小単位の10進数文字列。本サービスは常に"0"）
    pub price: String,
    /// 支払い通貨のアドレス（ネイティブトークンは`0xEeee...EEeE`）
    pub currency: String,
    /// 有効期間の開始（UNIX秒、両端を含む）
    pub validity_start_timestamp: u64,
    /// 有効期間の終了（UNIX秒、両端を含む）
    pub validity_end_timestamp: u64,
    /// リプレイ防止用の32バイト識別子（`0x`付き16進数）
    pub uid: String,
    /// 65バイトの`r || s || v`署名（`0x`付き16進数）
    pub signature: String,
}

// ---------------------------------------------------------------------------
// /voucher レスポンス
// ---------------------------------------------------------------------------

/// /voucher 成功レスポンス。
///
/// Requester側では`signedPayload`の欠落・nullを失敗として扱うため`Option`で受ける。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherResponse {
    /// 署名済みバウチャー
    #[serde(default)]
    pub signed_payload: Option<MintVoucher>,
}

/// 全エンドポイント共通のエラーレスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 信頼境界を越えて返す要約メッセージ
    pub error: String,
}

// ---------------------------------------------------------------------------
// 署名者情報
// ---------------------------------------------------------------------------

/// /.well-known/voucher-signer レスポンス。
///
/// コントラクト管理者がミンター権限を付与する際や、Requesterが
/// バウチャーの署名者を事前確認する際に使用する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerInfo {
    /// 署名鍵に対応するアドレス（EIP-55形式）
    pub signer_address: String,
    /// EIP-712ドメインのchainId
    pub chain_id: u64,
    /// 対象コレクションコントラクトのアドレス（EIP-55形式）
    pub collection_address: String,
    /// バウチャーの有効期間（秒）
    pub validity_window_secs: u64,
    /// EIP-712ドメイン名
    pub domain_name: String,
    /// EIP-712ドメインバージョン
    pub domain_version: String,
}

// ---------------------------------------------------------------------------
// ミント結果
// ---------------------------------------------------------------------------

/// オンチェーンミントの成功結果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintedToken {
    /// トークンID（10進数文字列。uint256を精度劣化なしで保持する）
    pub token_id: String,
    /// 所有者アドレス（EIP-55形式）
    pub owner: String,
    /// ミントトランザクションのハッシュ（ローカルコレクションでは存在しない）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    /// 消費されたバウチャーのuid
    pub voucher_uid: String,
}

// ---------------------------------------------------------------------------
// JSON-RPC エンベロープ
// ---------------------------------------------------------------------------

/// JSON-RPC 2.0 リクエスト。
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest<'a> {
    /// 常に"2.0"
    pub jsonrpc: &'static str,
    /// リクエストID
    pub id: u64,
    /// メソッド名（例: "eth_getCode"）
    pub method: &'a str,
    /// パラメータ配列
    pub params: serde_json::Value,
}

impl<'a> JsonRpcRequest<'a> {
    /// id=1のリクエストを構築する。
    pub fn new(method: &'a str, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        }
    }
}

/// JSON-RPC 2.0 レスポンス。
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    /// 成功時の結果（`eth_getTransactionReceipt`の未確定時はnull）
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    /// 失敗時のエラー
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 エラーオブジェクト。
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    /// エラーコード（revertは3または-32000系）
    pub code: i64,
    /// エラーメッセージ（revert理由を含むことがある）
    pub message: String,
    /// 追加データ（revertデータ等）
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}
