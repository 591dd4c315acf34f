//! # テスト用共通ヘルパー
//!
//! chain, minterのテストで共有するバウチャー生成関数群。

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::Eip712Domain;
use voucher_crypto::{MintRequest, SigningKey};
use voucher_types::{MintVoucher, NftMetadata};

/// テスト用の受取人アドレス（EIP-55形式）
pub const TEST_RECIPIENT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

/// 4x4ピクセルのPNG
pub const TEST_IMAGE: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAQAAAAECAYAAACp8Z5+AAAAEklEQVR4nGM4URHwHxkzkC4AAGyHKPHsjI6oAAAAAElFTkSuQmCC";

/// テスト用のコレクションアドレス
pub fn test_collection() -> Address {
    Address::repeat_byte(0x11)
}

/// ランダムな署名鍵を生成する。
pub fn random_key() -> SigningKey {
    SigningKey::random(&mut rand::rngs::OsRng)
}

/// Signer Serviceと同じ手順で署名済みバウチャーを構築する。
pub fn sign_test_voucher(
    key: &SigningKey,
    domain: &Eip712Domain,
    to: &str,
    name: &str,
    start: u64,
    end: u64,
) -> MintVoucher {
    let metadata = NftMetadata {
        name: name.to_string(),
        description: "A custom avatar NFT".to_string(),
        image: TEST_IMAGE.to_string(),
        properties: serde_json::Map::new(),
    };
    let uri = voucher_crypto::metadata_uri(&metadata).unwrap();
    let uid = B256::from(rand::random::<[u8; 32]>());
    let request = MintRequest {
        to: voucher_crypto::parse_address(to).unwrap(),
        royaltyRecipient: Address::ZERO,
        royaltyBps: U256::ZERO,
        primarySaleRecipient: Address::ZERO,
        uri: uri.clone(),
        price: U256::ZERO,
        currency: voucher_crypto::NATIVE_TOKEN_ADDRESS,
        validityStartTimestamp: u128::from(start),
        validityEndTimestamp: u128::from(end),
        uid,
    };
    let signature = voucher_crypto::sign_mint_request(key, &request, domain).unwrap();

    MintVoucher {
        to: voucher_crypto::format_address(&request.to),
        royalty_recipient: voucher_crypto::format_address(&request.royaltyRecipient),
        royalty_bps: 0,
        primary_sale_recipient: voucher_crypto::format_address(&request.primarySaleRecipient),
        metadata,
        uri,
        price: "0".to_string(),
        currency: voucher_crypto::format_address(&request.currency),
        validity_start_timestamp: start,
        validity_end_timestamp: end,
        uid: voucher_crypto::format_b256(&uid),
        signature: voucher_crypto::encode_signature(&signature),
    }
}

/// フィールドを書き換えたバウチャーに署名し直す。
pub fn resign_test_voucher(key: &SigningKey, domain: &Eip712Domain, voucher: &mut MintVoucher) {
    let request = voucher_crypto::request_fields(voucher).unwrap();
    let signature = voucher_crypto::sign_mint_request(key, &request, domain).unwrap();
    voucher.signature = voucher_crypto::encode_signature(&signature);
}
