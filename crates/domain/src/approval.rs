//! # 承認ワークフロー
//!
//! 申請ごとに順序付きの承認ロール列（チェーン）を割り当て、
//! 現在の承認者による承認・却下を記録して進行させる。
//!
//! ## 構成
//!
//! | 型 / 関数 | 役割 |
//! |-----------|------|
//! | [`ApprovalChain`] | 部署テンプレートから解決した非空のロール列 |
//! | [`ApprovalStep`] | 台帳の 1 行。チェーン上の 1 ロールの判断状態 |
//! | [`ApprovalLedger`] | 申請 1 件分のステップ列（`sequence` 順） |
//! | [`initialize`] / [`authorize`] | エンジン。台帳の作成と判断の適用 |
//! | [`PendingApprovalsQuery`] | 承認待ち一覧の絞り込み条件 |
//!
//! ## 不変条件
//!
//! - 承認待ちの申請の `current_approver` は、最小 `sequence` の未判断ステップのロールに等しい
//! - 却下された申請は承認者を持たず、却下ステップより後のステップは未判断のまま残る
//! - 承認済みの申請は承認者を持たず、全ステップが承認済み
//! - 判断済みのステップは二度と変化しない

mod chain;
mod engine;
mod ledger;
mod pending;
mod step;

pub use chain::{ApprovalChain, ChainResolution, ChainSource};
pub use engine::{
    AuthorizedDecision,
    DecisionApplied,
    DecisionDeclined,
    DecisionOutcome,
    Initialized,
    authorize,
    initialize,
    verify_consistency,
};
pub use ledger::ApprovalLedger;
pub use pending::PendingApprovalsQuery;
pub use step::{
    ApprovalStep,
    ApprovalStepId,
    ApprovalStepRecord,
    Decision,
    NewApprovalStep,
    StepSequence,
    StepStatus,
};
