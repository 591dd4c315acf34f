//! # バウチャー発行
//!
//! ミント要求を検証し、有効期間付きのバウチャーを構築して署名する。
//!
//! ## 処理フロー
//! 1. ミント要求の検証（検証失敗時は署名を一切行わない）
//! 2. コレクションコントラクトの解決
//! 3. 有効期間の決定（`[now, now + window]`）
//! 4. メタデータ・uri・uidの構築（価格は0、通貨はネイティブトークン）
//! 5. EIP-712署名
//!
//! 発行したバウチャーは保存しない。リプレイ防止と有効期限の強制は
//! コントラクト側の責務であり、本サービスはステートレスに水平スケールできる。

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::Eip712Domain;
use voucher_crypto::MintRequest;
use voucher_types::{MintVoucher, NftMetadata, SignerInfo, VoucherRequest, MAX_NFT_NAME_CHARS};

use crate::config::SignerConfig;
use crate::error::SignerError;
use crate::resolver::CollectionResolver;

/// バウチャー発行者。設定は構築時に注入され、以後は読み取り専用。
pub struct VoucherSigner {
    /// サービス設定
    config: SignerConfig,
    /// 署名鍵に対応するアドレス
    signer_address: Address,
    /// EIP-712ドメイン
    domain: Eip712Domain,
    /// コレクションコントラクトの解決方法
    resolver: Box<dyn CollectionResolver>,
}

impl VoucherSigner {
    /// VoucherSignerを構築する。
    pub fn new(config: SignerConfig, resolver: Box<dyn CollectionResolver>) -> Self {
        let signer_address = voucher_crypto::signer_address(&config.signing_key);
        let domain = voucher_crypto::voucher_domain(config.chain_id, config.collection_address);
        Self {
            config,
            signer_address,
            domain,
            resolver,
        }
    }

    /// 署名鍵に対応するアドレス。
    pub fn signer_address(&self) -> Address {
        self.signer_address
    }

    /// EIP-712ドメイン。
    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    /// サービス設定。
    pub fn config(&self) -> &SignerConfig {
        &self.config
    }

    /// 公開可能な署名者情報。
    pub fn signer_info(&self) -> SignerInfo {
        SignerInfo {
            signer_address: voucher_crypto::format_address(&self.signer_address),
            chain_id: self.config.chain_id,
            collection_address: voucher_crypto::format_address(&self.config.collection_address),
            validity_window_secs: self.config.validity_window_secs,
            domain_name: voucher_crypto::DOMAIN_NAME.to_string(),
            domain_version: voucher_crypto::DOMAIN_VERSION.to_string(),
        }
    }

    /// ミント要求を検証し、受取人アドレスを返す。
    pub fn validate_intent(&self, request: &VoucherRequest) -> Result<Address, SignerError> {
        let raw_address = request
            .author_address
            .as_deref()
            .filter(|address| !address.is_empty())
            .ok_or_else(|| SignerError::Validation("authorAddressが指定されていません".into()))?;

        let recipient = voucher_crypto::parse_address(raw_address)
            .map_err(|e| SignerError::Validation(format!("authorAddressが不正です: {e}")))?;
        if recipient == Address::ZERO {
            return Err(SignerError::Validation(
                "authorAddressにゼロアドレスは指定できません".into(),
            ));
        }

        let name_chars = request.display_name().chars().count();
        if name_chars > MAX_NFT_NAME_CHARS {
            return Err(SignerError::Validation(format!(
                "nftNameは{MAX_NFT_NAME_CHARS}文字以内である必要があります（{name_chars}文字）"
            )));
        }

        if request.image.is_empty() {
            return Err(SignerError::Validation("imageが空です".into()));
        }
        if request.image.len() > self.config.max_image_bytes {
            return Err(SignerError::Validation(format!(
                "imageが上限を超えています: {} bytes (上限: {} bytes)",
                request.image.len(),
                self.config.max_image_bytes
            )));
        }

        Ok(recipient)
    }

    /// ミント要求からバウチャーを発行する。`now`はUNIX秒。
    pub async fn issue_voucher(
        &self,
        request: VoucherRequest,
        now: u64,
    ) -> Result<MintVoucher, SignerError> {
        // Step 1: 検証
        let recipient = self.validate_intent(&request)?;

        // Step 2: コレクションコントラクトの解決
        self.resolver
            .resolve(self.config.collection_address)
            .await
            .map_err(|e| SignerError::Dependency(e.to_string()))?;

        // Step 3: 有効期間
        let validity_start_timestamp = now;
        let validity_end_timestamp = now
            .checked_add(self.config.validity_window_secs)
            .ok_or_else(|| SignerError::Signing("有効期間の計算でオーバーフローしました".into()))?;

        // Step 4: メタデータ・uri・uid
        let metadata = NftMetadata {
            name: request.display_name().to_string(),
            description: self.config.description.clone(),
            image: request.image,
            properties: serde_json::Map::new(),
        };
        let uri = voucher_crypto::metadata_uri(&metadata)
            .map_err(|e| SignerError::Signing(e.to_string()))?;
        let uid = B256::from(rand::random::<[u8; 32]>());

        // Step 5: 署名
        let mint_request = MintRequest {
            to: recipient,
            royaltyRecipient: self.config.royalty_recipient,
            royaltyBps: U256::from(self.config.royalty_bps),
            primarySaleRecipient: self.config.primary_sale_recipient,
            uri,
            price: U256::ZERO,
            currency: voucher_crypto::NATIVE_TOKEN_ADDRESS,
            validityStartTimestamp: u128::from(validity_start_timestamp),
            validityEndTimestamp: u128::from(validity_end_timestamp),
            uid,
        };
        let signature =
            voucher_crypto::sign_mint_request(&self.config.signing_key, &mint_request, &self.domain)
                .map_err(|e| SignerError::Signing(e.to_string()))?;

        let uid = voucher_crypto::format_b256(&uid);
        tracing::info!(
            recipient = %voucher_crypto::format_address(&recipient),
            uid = %uid,
            valid_until = validity_end_timestamp,
            "バウチャーを発行しました"
        );

        Ok(MintVoucher {
            to: voucher_crypto::format_address(&recipient),
            royalty_recipient: voucher_crypto::format_address(&mint_request.royaltyRecipient),
            royalty_bps: self.config.royalty_bps,
            primary_sale_recipient: voucher_crypto::format_address(
                &mint_request.primarySaleRecipient,
            ),
            metadata,
            uri: mint_request.uri,
            price: mint_request.price.to_string(),
            currency: voucher_crypto::format_address(&mint_request.currency),
            validity_start_timestamp,
            validity_end_timestamp,
            uid,
            signature: voucher_crypto::encode_signature(&signature),
        })
    }
}
