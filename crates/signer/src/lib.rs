//! # Avatar Mint Signer Service
//!
//! ミント要求を受け取り、有効期間付きの署名済みバウチャーを発行するサーバー。
//! オンチェーンのミント手数料は要求者（バウチャーを提出するウォレット）が負担する。
//!
//! バイナリ`voucher-signer`はこのクレートを環境変数の設定で起動する。

pub mod config;
pub mod endpoints;
pub mod error;
pub mod resolver;
pub mod service;
#[cfg(test)]
mod test_helpers;

pub use config::{ConfigError, SignerConfig};
pub use error::SignerError;
pub use resolver::{CollectionResolver, ResolveError, RpcResolver};
pub use service::VoucherSigner;
