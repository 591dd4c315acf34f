//! # Avatar Mint 暗号処理
//!
//! ミントバウチャーの署名・検証に必要な暗号処理を実装する。
//! 署名はオンチェーンのコレクションコントラクト（thirdweb `TokenERC721`互換）が
//! `ecrecover`で検証できる形式で生成する。
//!
//! ## 暗号アルゴリズム
//! | 用途 | アルゴリズム |
//! |------|------------|
//! | 構造化データハッシュ | EIP-712 |
//! | 署名 | ECDSA secp256k1（`r || s || v`、low-s） |
//! | ハッシュ | Keccak-256 |
//! | アドレス導出 | `keccak256(非圧縮公開鍵)[12..]` |

use std::borrow::Cow;
use std::str::FromStr;

use alloy_primitives::{address, keccak256, Address, B256, U256};
use alloy_sol_types::{sol, Eip712Domain, SolStruct};
use base64::Engine;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use voucher_types::{MintVoucher, NftMetadata};

pub use k256::ecdsa::SigningKey;

/// EIP-712ドメイン名（thirdweb `TokenERC721`と同一）
pub const DOMAIN_NAME: &str = "TokenERC721";

/// EIP-712ドメインバージョン
pub const DOMAIN_VERSION: &str = "1";

/// ERC-721のERC-165インターフェースID
pub const ERC721_INTERFACE_ID: [u8; 4] = [0x80, 0xac, 0x58, 0xcd];

/// メタデータURIのプレフィックス
pub const METADATA_URI_PREFIX: &str = "data:application/json;base64,";

/// ネイティブトークンを表す通貨アドレス（thirdweb `CurrencyTransferLib.NATIVE_TOKEN`）
pub const NATIVE_TOKEN_ADDRESS: Address = address!("0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// ロイヤリティの上限（basis points）
pub const MAX_BPS: u64 = 10_000;

sol! {
    /// 署名対象のミント要求。thirdweb `ITokenERC721.MintRequest`とフィールド順・型を一致させる。
    #[derive(Debug, PartialEq, Eq)]
    struct MintRequest {
        address to;
        address royaltyRecipient;
        uint256 royaltyBps;
        address primarySaleRecipient;
        string uri;
        uint256 price;
        address currency;
        uint128 validityStartTimestamp;
        uint128 validityEndTimestamp;
        bytes32 uid;
    }

    /// コレクションコントラクトのうち本プロトコルが利用する部分。
    interface ITokenERC721 {
        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);

        function mintWithSignature(MintRequest calldata req, bytes calldata signature)
            external
            payable
            returns (uint256 tokenIdMinted);

        function supportsInterface(bytes4 interfaceId) external view returns (bool);
    }
}

/// 暗号処理のエラー型
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// アドレス形式エラー
    #[error("アドレスの形式が不正です: {0}")]
    InvalidAddress(String),
    /// EIP-55チェックサム不一致
    #[error("EIP-55チェックサムが一致しません: {0}")]
    ChecksumMismatch(String),
    /// 秘密鍵形式エラー（鍵の内容はメッセージに含めない）
    #[error("秘密鍵の形式が不正です: {0}")]
    InvalidPrivateKey(String),
    /// 署名形式エラー
    #[error("署名の形式が不正です: {0}")]
    InvalidSignature(String),
    /// uid形式エラー
    #[error("uidの形式が不正です: {0}")]
    InvalidUid(String),
    /// 数値フィールド（royaltyBps, price）の形式エラー
    #[error("{field}の値が不正です: {value}")]
    InvalidAmount {
        /// フィールド名
        field: &'static str,
        /// 値
        value: String,
    },
    /// メタデータのシリアライズ失敗
    #[error("メタデータのエンコードに失敗しました: {0}")]
    MetadataEncoding(String),
    /// uriがmetadataから導出される値と一致しない
    #[error("uriがメタデータと一致しません")]
    UriMismatch,
    /// ECDSA署名の生成失敗
    #[error("ECDSA署名に失敗しました: {0}")]
    SigningFailed(String),
    /// 署名から公開鍵を復元できない
    #[error("署名者の復元に失敗しました")]
    RecoveryFailed,
}

/// Base64エンジン（Standard）
fn b64() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}

// ---------------------------------------------------------------------------
// アドレス・鍵
// ---------------------------------------------------------------------------

/// `0x` + 40桁の16進数をアドレスとしてパースする。
///
/// 大文字・小文字が混在する場合はEIP-55チェックサムを検証する。
/// 全て小文字または全て大文字の場合はチェックサムなしとして受理する。
pub fn parse_address(input: &str) -> Result<Address, CryptoError> {
    let digits = input
        .strip_prefix("0x")
        .ok_or_else(|| CryptoError::InvalidAddress(format!("0xプレフィックスがありません: {input}")))?;

    if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(CryptoError::InvalidAddress(format!(
            "40桁の16進数である必要があります: {input}"
        )));
    }

    let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        return Address::parse_checksummed(input, None)
            .map_err(|_| CryptoError::ChecksumMismatch(input.to_string()));
    }

    Address::from_str(input).map_err(|e| CryptoError::InvalidAddress(format!("{input}: {e}")))
}

/// アドレスをEIP-55チェックサム形式で文字列化する。
pub fn format_address(address: &Address) -> String {
    address.to_checksum(None)
}

/// 16進数（`0x`は任意）の秘密鍵をパースする。
pub fn signing_key_from_hex(input: &str) -> Result<SigningKey, CryptoError> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(digits)
        .map_err(|_| CryptoError::InvalidPrivateKey("16進数としてデコードできません".to_string()))?;
    if bytes.len() != 32 {
        return Err(CryptoError::InvalidPrivateKey(format!(
            "32バイトである必要があります（{}バイト）",
            bytes.len()
        )));
    }
    SigningKey::from_slice(&bytes)
        .map_err(|_| CryptoError::InvalidPrivateKey("secp256k1のスカラー範囲外です".to_string()))
}

/// 公開鍵からアドレスを導出する。
pub fn address_of(verifying_key: &VerifyingKey) -> Address {
    let point = verifying_key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// 秘密鍵に対応するアドレスを導出する。
pub fn signer_address(signing_key: &SigningKey) -> Address {
    address_of(signing_key.verifying_key())
}

// ---------------------------------------------------------------------------
// EIP-712
// ---------------------------------------------------------------------------

/// コレクションコントラクトのEIP-712ドメインを構築する。
pub fn voucher_domain(chain_id: u64, collection: Address) -> Eip712Domain {
    Eip712Domain::new(
        Some(Cow::Borrowed(DOMAIN_NAME)),
        Some(Cow::Borrowed(DOMAIN_VERSION)),
        Some(U256::from(chain_id)),
        Some(collection),
        None,
    )
}

/// メタデータを`data:application/json;base64,...`形式のURIにエンコードする。
///
/// `NftMetadata`のフィールド順と`properties`（BTreeMap）のキー順は固定のため、
/// 同じメタデータからは常に同じURIが得られる。
pub fn metadata_uri(metadata: &NftMetadata) -> Result<String, CryptoError> {
    let json = serde_json::to_vec(metadata)
        .map_err(|e| CryptoError::MetadataEncoding(e.to_string()))?;
    Ok(format!("{METADATA_URI_PREFIX}{}", b64().encode(json)))
}

/// `0x` + 64桁の16進数をuidとしてパースする。
pub fn parse_uid(input: &str) -> Result<B256, CryptoError> {
    let digits = input
        .strip_prefix("0x")
        .ok_or_else(|| CryptoError::InvalidUid(input.to_string()))?;
    if digits.len() != 64 {
        return Err(CryptoError::InvalidUid(input.to_string()));
    }
    B256::from_str(digits).map_err(|_| CryptoError::InvalidUid(input.to_string()))
}

/// 32バイト値を`0x`付き16進数で文字列化する。
pub fn format_b256(value: &B256) -> String {
    format!("0x{}", hex::encode(value.as_slice()))
}

/// 10進数文字列をuint256としてパースする。
pub fn parse_amount(field: &'static str, value: &str) -> Result<U256, CryptoError> {
    U256::from_str_radix(value, 10).map_err(|_| CryptoError::InvalidAmount {
        field,
        value: value.to_string(),
    })
}

/// バウチャーの各フィールドから`MintRequest`を組み立てる。`uri`は記載値をそのまま使う。
pub fn request_fields(voucher: &MintVoucher) -> Result<MintRequest, CryptoError> {
    Ok(MintRequest {
        to: parse_address(&voucher.to)?,
        royaltyRecipient: parse_address(&voucher.royalty_recipient)?,
        royaltyBps: U256::from(voucher.royalty_bps),
        primarySaleRecipient: parse_address(&voucher.primary_sale_recipient)?,
        uri: voucher.uri.clone(),
        price: parse_amount("price", &voucher.price)?,
        currency: parse_address(&voucher.currency)?,
        validityStartTimestamp: u128::from(voucher.validity_start_timestamp),
        validityEndTimestamp: u128::from(voucher.validity_end_timestamp),
        uid: parse_uid(&voucher.uid)?,
    })
}

/// バウチャーから署名対象の`MintRequest`を再構築する。
///
/// `uri`はメタデータから再計算し、バウチャーに記載された値と一致しなければ拒否する。
pub fn mint_request(voucher: &MintVoucher) -> Result<MintRequest, CryptoError> {
    if metadata_uri(&voucher.metadata)? != voucher.uri {
        return Err(CryptoError::UriMismatch);
    }
    request_fields(voucher)
}

/// `MintRequest`のEIP-712署名ハッシュを計算する。
pub fn signing_hash(request: &MintRequest, domain: &Eip712Domain) -> B256 {
    request.eip712_signing_hash(domain)
}

// ---------------------------------------------------------------------------
// 署名・復元
// ---------------------------------------------------------------------------

/// 32バイトのダイジェストに署名し、`r || s || v`（v ∈ {27, 28}）を返す。
pub fn sign_prehash(signing_key: &SigningKey, digest: &B256) -> Result<[u8; 65], CryptoError> {
    let (signature, recovery_id) = signing_key
        .sign_prehash_recoverable(digest.as_slice())
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

    let mut out = [0u8; 65];
    out[..64].copy_from_slice(&signature.to_bytes());
    out[64] = recovery_id.to_byte() + 27;
    Ok(out)
}

/// `MintRequest`にEIP-712署名を行う。
pub fn sign_mint_request(
    signing_key: &SigningKey,
    request: &MintRequest,
    domain: &Eip712Domain,
) -> Result<[u8; 65], CryptoError> {
    sign_prehash(signing_key, &signing_hash(request, domain))
}

/// ダイジェストと署名から署名者アドレスを復元する。
///
/// OpenZeppelin `ECDSA.recover`と同様に、high-sの署名は拒否する。
/// vは{27, 28}に加えて{0, 1}も受理する。
pub fn recover_signer(digest: &B256, signature: &[u8]) -> Result<Address, CryptoError> {
    if signature.len() != 65 {
        return Err(CryptoError::InvalidSignature(format!(
            "65バイトである必要があります（{}バイト）",
            signature.len()
        )));
    }

    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
    if sig.normalize_s().is_some() {
        return Err(CryptoError::InvalidSignature("high-sの署名は受理できません".to_string()));
    }

    let v = match signature[64] {
        27 | 28 => signature[64] - 27,
        0 | 1 => signature[64],
        other => {
            return Err(CryptoError::InvalidSignature(format!("不正なv値: {other}")));
        }
    };
    let recovery_id = RecoveryId::from_byte(v)
        .ok_or_else(|| CryptoError::InvalidSignature(format!("不正なv値: {v}")))?;

    let verifying_key = VerifyingKey::recover_from_prehash(digest.as_slice(), &sig, recovery_id)
        .map_err(|_| CryptoError::RecoveryFailed)?;
    Ok(address_of(&verifying_key))
}

/// 65バイト署名を`0x`付き16進数で文字列化する。
pub fn encode_signature(signature: &[u8; 65]) -> String {
    format!("0x{}", hex::encode(signature))
}

/// `0x`付き16進数の署名をデコードする。
pub fn decode_signature(input: &str) -> Result<Vec<u8>, CryptoError> {
    let digits = input
        .strip_prefix("0x")
        .ok_or_else(|| CryptoError::InvalidSignature("0xプレフィックスがありません".to_string()))?;
    let bytes =
        hex::decode(digits).map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
    if bytes.len() != 65 {
        return Err(CryptoError::InvalidSignature(format!(
            "65バイトである必要があります（{}バイト）",
            bytes.len()
        )));
    }
    Ok(bytes)
}

/// バウチャーの署名者アドレスを復元する。
///
/// 署名対象のいずれかのフィールドが署名後に改変されていれば、
/// エラーになるか、本来の署名者とは異なるアドレスが返る。
pub fn recover_voucher_signer(
    voucher: &MintVoucher,
    domain: &Eip712Domain,
) -> Result<Address, CryptoError> {
    let request = mint_request(voucher)?;
    let signature = decode_signature(&voucher.signature)?;
    recover_signer(&signing_hash(&request, domain), &signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_sol_types::SolCall;

    fn test_metadata(name: &str) -> NftMetadata {
        NftMetadata {
            name: name.to_string(),
            description: "A custom avatar NFT".to_string(),
            image: "data:image/png;base64,iVBORw0KGgo=".to_string(),
            properties: serde_json::Map::new(),
        }
    }

    /// テスト用に署名済みバウチャーを構築する
    fn signed_voucher(key: &SigningKey, domain: &Eip712Domain) -> MintVoucher {
        let metadata = test_metadata("Test");
        let uri = metadata_uri(&metadata).unwrap();
        let mut voucher = MintVoucher {
            to: "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".to_string(),
            royalty_recipient: format_address(&Address::repeat_byte(0x33)),
            royalty_bps: 500,
            primary_sale_recipient: format_address(&Address::repeat_byte(0x44)),
            metadata,
            uri,
            price: "0".to_string(),
            currency: format_address(&NATIVE_TOKEN_ADDRESS),
            validity_start_timestamp: 1_700_000_000,
            validity_end_timestamp: 1_700_086_400,
            uid: format_b256(&B256::repeat_byte(0x42)),
            signature: String::new(),
        };
        let request = mint_request(&voucher).unwrap();
        voucher.signature = encode_signature(&sign_mint_request(key, &request, domain).unwrap());
        voucher
    }

    fn test_domain() -> Eip712Domain {
        voucher_domain(80002, Address::repeat_byte(0x11))
    }

    #[test]
    fn test_parse_address_variants() {
        // EIP-55 チェックサム付き
        let checksummed = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
        let address = parse_address(checksummed).unwrap();
        assert_eq!(format_address(&address), checksummed);

        // 全小文字・全大文字はチェックサムなしとして受理
        assert_eq!(parse_address(&checksummed.to_lowercase()).unwrap(), address);
        let upper = format!("0x{}", checksummed[2..].to_uppercase());
        assert_eq!(parse_address(&upper).unwrap(), address);

        // チェックサム不一致
        assert!(matches!(
            parse_address("0x5aaeb6053F3E94C9b9A09f33669435E7Ef1BeAed"),
            Err(CryptoError::ChecksumMismatch(_))
        ));

        // 形式不正
        assert!(parse_address("").is_err());
        assert!(parse_address("0xABC").is_err());
        assert!(parse_address("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").is_err());
        assert!(parse_address("0xzzAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").is_err());
    }

    /// 秘密鍵1に対応する既知のアドレス
    #[test]
    fn test_signer_address_known_vector() {
        let key = signing_key_from_hex(
            "0x0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        assert_eq!(
            format_address(&signer_address(&key)),
            "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
        );
    }

    #[test]
    fn test_signing_key_from_hex_rejects_bad_input() {
        assert!(signing_key_from_hex("").is_err());
        assert!(signing_key_from_hex("0x1234").is_err());
        assert!(signing_key_from_hex("not-hex").is_err());
        // ゼロはスカラー範囲外
        assert!(signing_key_from_hex(&"00".repeat(32)).is_err());
    }

    #[test]
    fn test_metadata_uri_encodes_metadata_json() {
        let metadata = test_metadata("Test");
        let uri = metadata_uri(&metadata).unwrap();
        assert!(uri.starts_with(METADATA_URI_PREFIX));

        let decoded = b64().decode(&uri[METADATA_URI_PREFIX.len()..]).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(value["name"], "Test");
        assert_eq!(value["description"], "A custom avatar NFT");
        assert_eq!(value["image"], metadata.image);
        assert_eq!(value["properties"], serde_json::json!({}));

        // 同じ入力からは同じURI
        assert_eq!(metadata_uri(&metadata).unwrap(), uri);
    }

    #[test]
    fn test_voucher_signature_recovers_signer() {
        let key = SigningKey::random(&mut rand::rngs::OsRng);
        let domain = test_domain();
        let voucher = signed_voucher(&key, &domain);

        let recovered = recover_voucher_signer(&voucher, &domain).unwrap();
        assert_eq!(recovered, signer_address(&key));
        assert_eq!(decode_signature(&voucher.signature).unwrap().len(), 65);
    }

    /// 署名後にいずれかのフィールドを改変すると署名者が一致しなくなる
    #[test]
    fn test_tampered_voucher_does_not_recover_signer() {
        let key = SigningKey::random(&mut rand::rngs::OsRng);
        let signer = signer_address(&key);
        let domain = test_domain();
        let voucher = signed_voucher(&key, &domain);

        let recovers = |v: &MintVoucher| {
            matches!(recover_voucher_signer(v, &domain), Ok(address) if address == signer)
        };
        assert!(recovers(&voucher));

        let mut tampered = voucher.clone();
        tampered.metadata.name = "Other".to_string();
        assert!(matches!(
            recover_voucher_signer(&tampered, &domain),
            Err(CryptoError::UriMismatch)
        ));

        // uriも合わせて書き換えても署名が一致しない
        tampered.uri = metadata_uri(&tampered.metadata).unwrap();
        assert!(!recovers(&tampered));

        let mut tampered = voucher.clone();
        tampered.metadata.image = "data:image/png;base64,AAAA".to_string();
        tampered.uri = metadata_uri(&tampered.metadata).unwrap();
        assert!(!recovers(&tampered));

        let mut tampered = voucher.clone();
        tampered.validity_end_timestamp += 1;
        assert!(!recovers(&tampered));

        let mut tampered = voucher.clone();
        tampered.validity_start_timestamp -= 1;
        assert!(!recovers(&tampered));

        let mut tampered = voucher.clone();
        tampered.to = format_address(&Address::repeat_byte(0x22));
        assert!(!recovers(&tampered));

        let mut tampered = voucher.clone();
        tampered.uid = format_b256(&B256::repeat_byte(0x43));
        assert!(!recovers(&tampered));

        let mut tampered = voucher.clone();
        tampered.royalty_bps = 0;
        assert!(!recovers(&tampered));

        let mut tampered = voucher.clone();
        tampered.royalty_recipient = format_address(&Address::repeat_byte(0x55));
        assert!(!recovers(&tampered));

        let mut tampered = voucher.clone();
        tampered.price = "1".to_string();
        assert!(!recovers(&tampered));
    }

    /// コントラクトと同じ型文字列・typehash・セレクタになる
    #[test]
    fn test_mint_request_matches_token_erc721_abi() {
        assert_eq!(
            MintRequest::eip712_encode_type(),
            "MintRequest(address to,address royaltyRecipient,uint256 royaltyBps,\
address primarySaleRecipient,string uri,uint256 price,address currency,\
uint128 validityStartTimestamp,uint128 validityEndTimestamp,bytes32 uid)"
        );
        assert_eq!(
            format_b256(&keccak256(MintRequest::eip712_encode_type().as_bytes())),
            "0x86633b4ffa94b7c3d316ca70d7d2700f3fdfa7a7806efd31499b513d9176692e"
        );

        assert_eq!(
            ITokenERC721::mintWithSignatureCall::SIGNATURE,
            "mintWithSignature((address,address,uint256,address,string,uint256,address,uint128,uint128,bytes32),bytes)"
        );
        assert_eq!(
            ITokenERC721::mintWithSignatureCall::SELECTOR,
            [0x2c, 0x45, 0x10, 0xf8]
        );
        assert_eq!(
            format_address(&NATIVE_TOKEN_ADDRESS),
            "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE"
        );
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("price", "0").unwrap(), U256::ZERO);
        assert_eq!(parse_amount("price", "1000").unwrap(), U256::from(1000));
        assert!(parse_amount("price", "0x10").is_err());
        assert!(parse_amount("price", "abc").is_err());
    }

    /// 別チェーン・別コントラクトのドメインでは署名者が一致しない
    #[test]
    fn test_domain_separation() {
        let key = SigningKey::random(&mut rand::rngs::OsRng);
        let signer = signer_address(&key);
        let voucher = signed_voucher(&key, &test_domain());

        let other_chain = voucher_domain(1, Address::repeat_byte(0x11));
        let other_contract = voucher_domain(80002, Address::repeat_byte(0x12));
        for domain in [other_chain, other_contract] {
            let recovered = recover_voucher_signer(&voucher, &domain);
            assert!(!matches!(recovered, Ok(address) if address == signer));
        }
    }

    /// v ∈ {0, 1} も受理する
    #[test]
    fn test_recover_signer_accepts_raw_recovery_id() {
        let key = SigningKey::random(&mut rand::rngs::OsRng);
        let digest = keccak256(b"avatar");
        let mut signature = sign_prehash(&key, &digest).unwrap();
        assert!(signature[64] == 27 || signature[64] == 28);

        signature[64] -= 27;
        assert_eq!(recover_signer(&digest, &signature).unwrap(), signer_address(&key));

        signature[64] = 5;
        assert!(recover_signer(&digest, &signature).is_err());
        assert!(recover_signer(&digest, &signature[..64]).is_err());
    }

    #[test]
    fn test_decode_signature_rejects_bad_input() {
        assert!(decode_signature("").is_err());
        assert!(decode_signature(&"ab".repeat(65)).is_err());
        assert!(decode_signature(&format!("0x{}", "ab".repeat(64))).is_err());
        assert!(decode_signature("0xzz").is_err());
    }

    #[test]
    fn test_parse_uid() {
        let uid = B256::repeat_byte(0xab);
        assert_eq!(parse_uid(&format_b256(&uid)).unwrap(), uid);
        assert!(parse_uid("0x1234").is_err());
        assert!(parse_uid(&"ab".repeat(32)).is_err());
    }
}
