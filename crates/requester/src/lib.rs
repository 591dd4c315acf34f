//! # Avatar Mint Voucher Requester
//!
//! ミント要求をSigner Serviceに送信して署名済みバウチャーを取得し、
//! ユーザーのウォレットからコレクションコントラクトに提出する。
//!
//! ## 処理フロー
//! 1. ミント要求の構築（画像ファイルをdata URLに変換）
//! 2. Signer Serviceへのバウチャー要求
//! 3. バウチャーの内容確認（要求との一致、署名者の確認）
//! 4. `mintWithSignature`の提出（ガス代はユーザー負担）
//!
//! 1つの`Minter`で同時に進行できるミント試行は1つのみ。

pub mod attempt;
pub mod chain;
pub mod client;
pub mod error;
pub mod minter;
pub mod snapshot;
#[cfg(test)]
mod test_helpers;

pub use attempt::{MintAttempt, MintPhase};
pub use chain::{ChainError, CollectionContract, LocalCollection, RpcCollection};
pub use client::SignerClient;
pub use error::{ErrorClass, MintError};
pub use minter::Minter;
