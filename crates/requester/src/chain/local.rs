//! # ローカルコレクション
//!
//! コレクションコントラクトの検証内容をメモリ上で再現する実装。
//! テストと`voucher-mint --local`で使用する。
//!
//! 検証の順序と拒否理由はthirdweb `TokenERC721`の`verifyRequest`に合わせる。
//! 同じバウチャーの並行提出はロックで直列化され、成功するのは高々1つ。

use std::collections::{BTreeMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::Eip712Domain;
use tokio::sync::Mutex;
use voucher_types::{MintVoucher, MintedToken};

use super::{encode_request, ChainError, CollectionContract};

/// ミント済みトークン。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalToken {
    /// 所有者
    pub owner: Address,
    /// トークンURI
    pub uri: String,
    /// トークン単位のロイヤリティ（受取人, basis points）。未設定ならコレクションのデフォルト
    pub royalty: Option<(Address, U256)>,
}

/// コントラクトの内部状態。
#[derive(Debug)]
struct LocalState {
    /// ミンター権限を持つアドレス
    minters: HashSet<Address>,
    /// 使用済みuid
    minted_uids: HashSet<B256>,
    /// 次に割り当てるトークンID
    next_token_id: U256,
    /// トークンID → トークン
    tokens: BTreeMap<U256, LocalToken>,
    /// ブロックタイムスタンプの固定値（Noneならミント時点の現在時刻）
    block_timestamp: Option<u64>,
}

/// メモリ上のコレクションコントラクト。
#[derive(Debug)]
pub struct LocalCollection {
    /// コントラクトアドレス
    address: Address,
    /// EIP-712ドメイン
    domain: Eip712Domain,
    /// 内部状態
    state: Mutex<LocalState>,
}

impl LocalCollection {
    /// 空のコレクションを作成する。
    pub fn new(chain_id: u64, address: Address) -> Self {
        Self {
            address,
            domain: voucher_crypto::voucher_domain(chain_id, address),
            state: Mutex::new(LocalState {
                minters: HashSet::new(),
                minted_uids: HashSet::new(),
                next_token_id: U256::ZERO,
                tokens: BTreeMap::new(),
                block_timestamp: None,
            }),
        }
    }

    /// コントラクトアドレス。
    pub fn address(&self) -> Address {
        self.address
    }

    /// EIP-712ドメイン。
    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    /// ミンター権限を付与する。
    pub async fn grant_minter_role(&self, minter: Address) {
        self.state.lock().await.minters.insert(minter);
    }

    /// ブロックタイムスタンプを固定する。`None`で現在時刻に戻す。
    pub async fn set_block_timestamp(&self, timestamp: Option<u64>) {
        self.state.lock().await.block_timestamp = timestamp;
    }

    /// トークンを取得する。
    pub async fn token(&self, token_id: U256) -> Option<LocalToken> {
        self.state.lock().await.tokens.get(&token_id).cloned()
    }

    /// ミント済みトークン数。
    pub async fn total_minted(&self) -> usize {
        self.state.lock().await.tokens.len()
    }
}

#[async_trait::async_trait]
impl CollectionContract for LocalCollection {
    async fn mint_with_signature(&self, voucher: &MintVoucher) -> Result<MintedToken, ChainError> {
        let (request, signature) = encode_request(voucher)?;
        let digest = voucher_crypto::signing_hash(&request, &self.domain);
        let signer = voucher_crypto::recover_signer(&digest, &signature).ok();

        let mut state = self.state.lock().await;

        let authorized = signer.is_some_and(|signer| state.minters.contains(&signer));
        if !authorized || state.minted_uids.contains(&request.uid) {
            return Err(ChainError::Rejected("invalid signature".to_string()));
        }

        let now = u128::from(state.block_timestamp.unwrap_or_else(unix_now));
        if request.validityStartTimestamp > now || request.validityEndTimestamp < now {
            return Err(ChainError::Rejected("request expired".to_string()));
        }

        if request.to == Address::ZERO {
            return Err(ChainError::Rejected("recipient undefined".to_string()));
        }

        // 送金を伴わない提出のみを扱うため、有料のバウチャーは支払い不足となる
        if request.price != U256::ZERO {
            return Err(ChainError::Rejected("must send total price.".to_string()));
        }

        state.minted_uids.insert(request.uid);
        let token_id = state.next_token_id;
        state.next_token_id += U256::from(1);
        state.tokens.insert(
            token_id,
            LocalToken {
                owner: request.to,
                uri: request.uri,
                royalty: (request.royaltyRecipient != Address::ZERO)
                    .then_some((request.royaltyRecipient, request.royaltyBps)),
            },
        );

        let owner = voucher_crypto::format_address(&request.to);
        tracing::info!(token_id = %token_id, owner = %owner, uid = %voucher.uid, "ローカルコレクションでミントしました");

        Ok(MintedToken {
            token_id: token_id.to_string(),
            owner,
            transaction_hash: None,
            voucher_uid: voucher_crypto::format_b256(&request.uid),
        })
    }
}

/// 現在時刻（UNIX秒）
fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
