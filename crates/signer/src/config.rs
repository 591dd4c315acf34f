//! # Signer Service設定
//!
//! 環境変数からの設定読み込み。
//! 設定は起動時に一度だけ読み込み、`VoucherSigner`に注入する。
//! リクエストごとに環境変数を参照することはない。

use alloy_primitives::Address;
use voucher_crypto::SigningKey;

/// デフォルトのchainId（Polygon Amoy）
pub const DEFAULT_CHAIN_ID: u64 = 80002;

/// デフォルトのRPCエンドポイント
pub const DEFAULT_RPC_URL: &str = "https://rpc-amoy.polygon.technology";

/// デフォルトのバウチャー有効期間（24時間）
pub const DEFAULT_VALIDITY_WINDOW_SECS: u64 = 24 * 60 * 60;

/// デフォルトのメタデータ説明文
pub const DEFAULT_DESCRIPTION: &str = "A custom avatar NFT";

/// デフォルトの画像ペイロード上限（1 MiB）
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 1024 * 1024;

/// デフォルトの待ち受けアドレス
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

/// 画像以外のフィールド分としてボディ上限に加算するバイト数
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

/// 設定エラー。いずれも起動時に致命的エラーとして扱う。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 署名鍵が未設定
    #[error("WALLET_PRIVATE_KEYが設定されていません")]
    MissingSigningKey,
    /// 署名鍵の形式が不正
    #[error("WALLET_PRIVATE_KEYが不正です: {0}")]
    InvalidSigningKey(String),
    /// コレクションアドレスが未設定
    #[error("NFT_COLLECTION_ADDRESSが設定されていません")]
    MissingCollectionAddress,
    /// コレクションアドレスの形式が不正
    #[error("NFT_COLLECTION_ADDRESSが不正です: {0}")]
    InvalidCollectionAddress(String),
    /// 数値設定のパース失敗
    #[error("{name}は数値である必要があります: {value}")]
    InvalidNumber {
        /// 環境変数名
        name: &'static str,
        /// 設定値
        value: String,
    },
    /// 有効期間がゼロ
    #[error("VOUCHER_VALIDITY_SECSは1以上である必要があります")]
    ZeroValidityWindow,
    /// アドレス設定の形式が不正
    #[error("{name}が不正です: {reason}")]
    InvalidAddress {
        /// 環境変数名
        name: &'static str,
        /// 理由
        reason: String,
    },
    /// ロイヤリティが上限を超えている
    #[error("ROYALTY_BPSは10000以下である必要があります: {value}")]
    RoyaltyBpsTooHigh {
        /// 設定値
        value: u64,
    },
}

/// Signer Serviceの設定。
pub struct SignerConfig {
    /// バウチャー署名用secp256k1秘密鍵（Requesterには決して公開しない）
    pub signing_key: SigningKey,
    /// 対象コレクションコントラクトのアドレス
    pub collection_address: Address,
    /// EIP-712ドメインのchainId
    pub chain_id: u64,
    /// コントラクト解決に使用するRPCエンドポイント
    pub rpc_url: String,
    /// バウチャーの有効期間（秒）
    pub validity_window_secs: u64,
    /// ロイヤリティ受取人（ゼロアドレスならコントラクトのデフォルト設定に従う）
    pub royalty_recipient: Address,
    /// ロイヤリティ（basis points）
    pub royalty_bps: u64,
    /// 一次販売の売上受取人（価格0のため送金は発生しない）
    pub primary_sale_recipient: Address,
    /// メタデータの説明文
    pub description: String,
    /// 画像ペイロードの最大サイズ（バイト）
    pub max_image_bytes: usize,
    /// 待ち受けアドレス
    pub listen_addr: String,
}

impl SignerConfig {
    /// 環境変数から構築する。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の参照関数から構築する。空文字列は未設定として扱う。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let signing_key = get("WALLET_PRIVATE_KEY")
            .ok_or(ConfigError::MissingSigningKey)
            .and_then(|key| {
                voucher_crypto::signing_key_from_hex(&key)
                    .map_err(|e| ConfigError::InvalidSigningKey(e.to_string()))
            })?;

        let collection_address = get("NFT_COLLECTION_ADDRESS")
            .ok_or(ConfigError::MissingCollectionAddress)
            .and_then(|address| {
                voucher_crypto::parse_address(address.trim())
                    .map_err(|e| ConfigError::InvalidCollectionAddress(e.to_string()))
            })?;
        if collection_address == Address::ZERO {
            return Err(ConfigError::InvalidCollectionAddress(
                "ゼロアドレスは指定できません".to_string(),
            ));
        }

        let chain_id = parse_number("CHAIN_ID", get("CHAIN_ID"), DEFAULT_CHAIN_ID)?;
        let validity_window_secs = parse_number(
            "VOUCHER_VALIDITY_SECS",
            get("VOUCHER_VALIDITY_SECS"),
            DEFAULT_VALIDITY_WINDOW_SECS,
        )?;
        if validity_window_secs == 0 {
            return Err(ConfigError::ZeroValidityWindow);
        }
        let max_image_bytes = parse_number(
            "MAX_IMAGE_BYTES",
            get("MAX_IMAGE_BYTES"),
            DEFAULT_MAX_IMAGE_BYTES,
        )?;

        let royalty_recipient = parse_optional_address("ROYALTY_RECIPIENT", get("ROYALTY_RECIPIENT"))?;
        let royalty_bps = parse_number("ROYALTY_BPS", get("ROYALTY_BPS"), 0u64)?;
        if royalty_bps > voucher_crypto::MAX_BPS {
            return Err(ConfigError::RoyaltyBpsTooHigh { value: royalty_bps });
        }
        let primary_sale_recipient =
            parse_optional_address("PRIMARY_SALE_RECIPIENT", get("PRIMARY_SALE_RECIPIENT"))?;

        Ok(Self {
            signing_key,
            collection_address,
            chain_id,
            rpc_url: get("CHAIN_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            validity_window_secs,
            royalty_recipient,
            royalty_bps,
            primary_sale_recipient,
            description: get("VOUCHER_DESCRIPTION")
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            max_image_bytes,
            listen_addr: get("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
        })
    }

    /// HTTPボディの上限サイズ。
    pub fn max_body_bytes(&self) -> usize {
        self.max_image_bytes.saturating_add(BODY_OVERHEAD_BYTES)
    }
}

fn parse_number<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value: raw }),
        None => Ok(default),
    }
}

/// 未設定ならゼロアドレスとして扱う。
fn parse_optional_address(name: &'static str, value: Option<String>) -> Result<Address, ConfigError> {
    match value {
        Some(raw) => voucher_crypto::parse_address(raw.trim()).map_err(|e| ConfigError::InvalidAddress {
            name,
            reason: e.to_string(),
        }),
        None => Ok(Address::ZERO),
    }
}
