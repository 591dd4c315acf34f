//! # ミント試行の状態遷移
//!
//! `Idle → AwaitingVoucher → VoucherReceived → AwaitingOnChainConfirmation → Minted`
//!
//! 遷移は前進のみ。終端でない状態からはいつでも`Failed`に遷移できる。
//! 各試行は一度きりで、再試行は新しい試行として最初からやり直す。

/// ミント試行のフェーズ。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintPhase {
    /// 開始前
    Idle,
    /// Signer Serviceの応答待ち
    AwaitingVoucher,
    /// バウチャー受領済み（提出前）
    VoucherReceived,
    /// トランザクションの確定待ち
    AwaitingOnChainConfirmation,
    /// ミント完了（終端）
    Minted,
    /// 失敗（終端）
    Failed,
}

impl MintPhase {
    /// 終端状態か。
    pub fn is_terminal(&self) -> bool {
        matches!(self, MintPhase::Minted | MintPhase::Failed)
    }

    /// `next`への遷移が許可されているか。
    pub fn can_transition_to(&self, next: MintPhase) -> bool {
        use MintPhase::*;
        match (self, next) {
            (Idle, AwaitingVoucher)
            | (AwaitingVoucher, VoucherReceived)
            | (VoucherReceived, AwaitingOnChainConfirmation)
            | (AwaitingOnChainConfirmation, Minted) => true,
            (current, Failed) => !current.is_terminal(),
            _ => false,
        }
    }
}

/// 許可されていない状態遷移。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("不正な状態遷移: {from:?} → {to:?}")]
pub struct TransitionError {
    /// 遷移元
    pub from: MintPhase,
    /// 遷移先
    pub to: MintPhase,
}

/// 1回分のミント試行。
#[derive(Debug)]
pub struct MintAttempt {
    phase: MintPhase,
}

impl Default for MintAttempt {
    fn default() -> Self {
        Self::new()
    }
}

impl MintAttempt {
    /// `Idle`状態の試行を作成する。
    pub fn new() -> Self {
        Self {
            phase: MintPhase::Idle,
        }
    }

    /// 現在のフェーズ。
    pub fn phase(&self) -> MintPhase {
        self.phase
    }

    /// 次のフェーズに進める。
    pub fn advance(&mut self, next: MintPhase) -> Result<(), TransitionError> {
        if !self.phase.can_transition_to(next) {
            return Err(TransitionError {
                from: self.phase,
                to: next,
            });
        }
        tracing::debug!(from = ?self.phase, to = ?next, "ミント試行の状態遷移");
        self.phase = next;
        Ok(())
    }

    /// 失敗として終了する。すでに終端状態なら何もしない。
    pub fn fail(&mut self, reason: &str) {
        if self.phase.is_terminal() {
            return;
        }
        tracing::debug!(from = ?self.phase, reason, "ミント試行が失敗しました");
        self.phase = MintPhase::Failed;
    }
}
