//! # ミント実行
//!
//! ミント要求からバウチャーを取得し、コレクションコントラクトに提出する。
//!
//! ## 処理フロー
//! 1. Signer Serviceにバウチャーを要求
//! 2. バウチャーが要求内容と一致することを確認
//!    （署名者情報が既知であれば、署名がその署名者に復元されることも確認）
//! 3. `mintWithSignature`を提出して確定を待つ
//!
//! 1つのMinterで同時に実行できるのは1試行のみ。実行中の呼び出しは
//! 待機せず即座に`MintError::InProgress`で失敗する。
//! コントラクトに拒否されたバウチャーはローカルで再提出しない。


use std::sync::Arc;

use alloy_primitives::{Address, U256};
use alloy_sol_types::Eip712Domain;
use tokio::sync::Semaphore;
use voucher_types::{MintVoucher, MintedToken, SignerInfo, VoucherRequest};

use crate::attempt::{MintAttempt, MintPhase};
use crate::chain::CollectionContract;
use crate::client::SignerClient;
use crate::error::MintError;

/// 信頼する署名者。
#[derive(Debug, Clone)]
struct TrustedSigner {
    /// 署名者アドレス
    address: Address,
    /// バウチャー検証用のEIP-712ドメイン
    domain: Eip712Domain,
}

/// ミント実行者。
pub struct Minter {
    /// Signer Serviceクライアント
    client: SignerClient,
    /// 提出先のコレクションコントラクト
    contract: Arc<dyn CollectionContract>,
    /// 署名者情報（未設定なら署名者の確認は行わない）
    trusted_signer: Option<TrustedSigner>,
    /// 同時実行を1試行に制限するためのセマフォ
    in_flight: Semaphore,
}

impl Minter {
    /// Minterを構築する。
    pub fn new(client: SignerClient, contract: Arc<dyn CollectionContract>) -> Self {
        Self {
            client,
            contract,
            trusted_signer: None,
            in_flight: Semaphore::new(1),
        }
    }

    /// 署名者情報を設定する。以後、バウチャーの署名者がこのアドレスでなければ提出しない。
    pub fn with_trusted_signer(mut self, info: &SignerInfo) -> Result<Self, MintError> {
        if info.domain_name != voucher_crypto::DOMAIN_NAME
            || info.domain_version != voucher_crypto::DOMAIN_VERSION
        {
            return Err(MintError::Discovery(format!(
                "対応していないEIP-712ドメインです: {} v{}",
                info.domain_name, info.domain_version
            )));
        }
        let address = voucher_crypto::parse_address(&info.signer_address)
            .map_err(|e| MintError::Discovery(format!("signerAddress: {e}")))?;
        let collection = voucher_crypto::parse_address(&info.collection_address)
            .map_err(|e| MintError::Discovery(format!("collectionAddress: {e}")))?;

        self.trusted_signer = Some(TrustedSigner {
            address,
            domain: voucher_crypto::voucher_domain(info.chain_id, collection),
        });
        Ok(self)
    }

    /// ミント要求を実行する。
    pub async fn mint(&self, intent: VoucherRequest) -> Result<MintedToken, MintError> {
        let _permit = self
            .in_flight
            .try_acquire()
            .map_err(|_| MintError::InProgress)?;

        let mut attempt = MintAttempt::new();
        match self.run(&mut attempt, &intent).await {
            Ok(token) => {
                tracing::info!(
                    token_id = %token.token_id,
                    owner = %token.owner,
                    "ミントが完了しました"
                );
                Ok(token)
            }
            Err(e) => {
                attempt.fail(&e.to_string());
                tracing::warn!(class = ?e.class(), error = %e, "ミントに失敗しました");
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        attempt: &mut MintAttempt,
        intent: &VoucherRequest,
    ) -> Result<MintedToken, MintError> {
        attempt.advance(MintPhase::AwaitingVoucher)?;
        let voucher = self.client.request_voucher(intent).await?;

        attempt.advance(MintPhase::VoucherReceived)?;
        self.check_voucher(intent, &voucher)?;

        attempt.advance(MintPhase::AwaitingOnChainConfirmation)?;
        let token = self.contract.mint_with_signature(&voucher).await?;

        attempt.advance(MintPhase::Minted)?;
        Ok(token)
    }

    /// バウチャーが要求内容と一致し、信頼する署名者によるものであることを確認する。
    fn check_voucher(&self, intent: &VoucherRequest, voucher: &MintVoucher) -> Result<(), MintError> {
        let mismatch = |field: &str| MintError::VoucherMismatch(field.to_string());

        let expected_to = intent
            .author_address
            .as_deref()
            .and_then(|address| voucher_crypto::parse_address(address).ok());
        let actual_to = voucher_crypto::parse_address(&voucher.to).ok();
        if expected_to.is_none() || expected_to != actual_to {
            return Err(mismatch("to"));
        }
        if voucher.metadata.name != intent.display_name() {
            return Err(mismatch("metadata.name"));
        }
        if voucher.metadata.image != intent.image {
            return Err(mismatch("metadata.image"));
        }
        if voucher.validity_end_timestamp < voucher.validity_start_timestamp {
            return Err(mismatch("validity window"));
        }
        // 提出は送金を伴わないため、無料ミント以外は受け付けない
        if voucher_crypto::parse_amount("price", &voucher.price).ok() != Some(U256::ZERO) {
            return Err(mismatch("price"));
        }

        // uriとメタデータの整合性もここで確認される
        voucher_crypto::mint_request(voucher)
            .map_err(|e| MintError::VoucherMismatch(e.to_string()))?;

        if let Some(trusted) = &self.trusted_signer {
            let recovered = voucher_crypto::recover_voucher_signer(voucher, &trusted.domain)
                .map_err(|e| MintError::VoucherMismatch(e.to_string()))?;
            if recovered != trusted.address {
                return Err(MintError::VoucherMismatch(format!(
                    "署名者が一致しません: {}",
                    voucher_crypto::format_address(&recovered)
                )));
            }
        }
        Ok(())
    }
}
