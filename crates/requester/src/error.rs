//! # Voucher Requester エラー型
//!
//! ユーザーに提示する際は`MintError::class()`で対処方法ごとに分類する。

use crate::attempt::TransitionError;
use crate::chain::ChainError;

/// ユーザーが取るべき対処による分類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// 入力内容の修正が必要（Signer Serviceが400を返した）
    FixInput,
    /// 時間をおいて再試行すれば成功しうる
    RetryLater,
    /// バウチャーが使用不能。新しいバウチャーを要求する必要がある
    VoucherDead,
}

impl ErrorClass {
    /// ユーザー向けの案内文。
    pub fn hint(&self) -> &'static str {
        match self {
            ErrorClass::FixInput => "入力内容を修正してから再度お試しください",
            ErrorClass::RetryLater => "時間をおいて再度お試しください",
            ErrorClass::VoucherDead => "このバウチャーは使用できません。新しいバウチャーを要求してください",
        }
    }
}

/// ミント試行のエラー型。
#[derive(Debug, thiserror::Error)]
pub enum MintError {
    /// 同じMinterで別のミント試行が進行中
    #[error("別のミント処理が進行中です")]
    InProgress,
    /// Signer Serviceが要求を拒否した（4xx）
    #[error("Signer Serviceが要求を拒否しました (HTTP {status}): {message}")]
    SignerRejected { status: u16, message: String },
    /// Signer Serviceが処理できなかった（5xx）
    #[error("Signer Serviceでエラーが発生しました (HTTP {status}): {message}")]
    SignerUnavailable { status: u16, message: String },
    /// Signer Serviceとの通信失敗
    #[error("Signer Serviceとの通信に失敗: {0}")]
    Transport(String),
    /// 成功レスポンスにsignedPayloadが含まれていない
    #[error("レスポンスに署名済みバウチャーが含まれていません")]
    MissingPayload,
    /// 署名者情報が不正
    #[error("署名者情報が不正です: {0}")]
    Discovery(String),
    /// バウチャーが要求内容または期待する署名者と一致しない
    #[error("バウチャーが要求と一致しません: {0}")]
    VoucherMismatch(String),
    /// コントラクトがミントを拒否した（期限切れ、使用済み、署名不正）
    #[error("コントラクトがミントを拒否しました: {0}")]
    Rejected(String),
    /// チェーンRPCとの通信失敗
    #[error("チェーンRPCとの通信に失敗: {0}")]
    Chain(String),
    /// トランザクションの確定待ちがタイムアウトした
    #[error("トランザクションの確定を確認できません: {0}")]
    Timeout(String),
    /// 状態遷移の不整合
    #[error(transparent)]
    Attempt(#[from] TransitionError),
}

impl MintError {
    /// 対処方法による分類。
    pub fn class(&self) -> ErrorClass {
        match self {
            MintError::SignerRejected { .. } => ErrorClass::FixInput,
            MintError::VoucherMismatch(_) | MintError::Rejected(_) => ErrorClass::VoucherDead,
            MintError::InProgress
            | MintError::SignerUnavailable { .. }
            | MintError::Transport(_)
            | MintError::MissingPayload
            | MintError::Discovery(_)
            | MintError::Chain(_)
            | MintError::Timeout(_)
            | MintError::Attempt(_) => ErrorClass::RetryLater,
        }
    }
}

impl From<ChainError> for MintError {
    fn from(error: ChainError) -> Self {
        match error {
            ChainError::Rejected(reason) => MintError::Rejected(reason),
            ChainError::Rpc(message) => MintError::Chain(message),
            ChainError::Timeout(message) => MintError::Timeout(message),
        }
    }
}
