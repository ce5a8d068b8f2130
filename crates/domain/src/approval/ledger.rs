//! 承認台帳（申請 1 件分の承認ステップ列）。

use chrono::{DateTime, Utc};

use super::{
    ApprovalChain,
    ApprovalStep,
    ApprovalStepId,
    NewApprovalStep,
    StepSequence,
    StepStatus,
};
use crate::{DomainError, request::ApprovableRef, role::Role};

/// 承認台帳
///
/// ステップは作成時にまとめて作られ、以後追加・削除・並べ替えされない。
/// 内部では常に `sequence` の昇順で保持する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalLedger {
    approvable: ApprovableRef,
    steps:      Vec<ApprovalStep>,
}

impl ApprovalLedger {
    /// チェーンの各ロールに 1 ステップずつ、未判断のステップを作成する
    pub fn seed(approvable: ApprovableRef, chain: &ApprovalChain, now: DateTime<Utc>) -> Self {
        let mut sequence = StepSequence::first();
        let mut steps = Vec::with_capacity(chain.len());
        for approver_role in chain.roles() {
            steps.push(ApprovalStep::new(NewApprovalStep {
                id: ApprovalStepId::new(),
                approvable: approvable.clone(),
                sequence,
                approver_role,
                now,
            }));
            sequence = sequence.next();
        }
        Self { approvable, steps }
    }

    /// 保存済みのステップから台帳を復元する
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: 別の申請のステップが混ざっている、または `sequence` が重複している
    pub fn from_steps(
        approvable: ApprovableRef,
        mut steps: Vec<ApprovalStep>,
    ) -> Result<Self, DomainError> {
        if let Some(foreign) = steps.iter().find(|s| s.approvable() != &approvable) {
            return Err(DomainError::Validation(format!(
                "申請 {approvable} の台帳に別申請 {} のステップが含まれています",
                foreign.approvable()
            )));
        }
        steps.sort_by_key(ApprovalStep::sequence);
        if steps.windows(2).any(|w| w[0].sequence() == w[1].sequence()) {
            return Err(DomainError::Validation(format!(
                "申請 {approvable} の台帳でステップ順序が重複しています"
            )));
        }
        Ok(Self { approvable, steps })
    }

    pub fn approvable(&self) -> &ApprovableRef {
        &self.approvable
    }

    pub fn steps(&self) -> &[ApprovalStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<ApprovalStep> {
        self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// 指定ロールの未判断ステップのうち、`sequence` が最小のもの
    ///
    /// チェーン内に同じロールが複数ある場合は先のステップを返す。
    pub fn find_pending_step_for_role(&self, role: Role) -> Option<&ApprovalStep> {
        self.steps
            .iter()
            .filter(|s| s.is_pending() && s.approver_role() == role)
            .min_by_key(|s| s.sequence())
    }

    /// 未判断ステップのうち、`sequence` が最小のもの
    pub fn find_earliest_pending_step(&self) -> Option<&ApprovalStep> {
        self.steps
            .iter()
            .filter(|s| s.is_pending())
            .min_by_key(|s| s.sequence())
    }

    /// 全ステップが承認済みか
    pub fn is_fully_approved(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|s| s.status() == StepStatus::Approved)
    }

    /// 却下されたステップ
    pub fn rejected_step(&self) -> Option<&ApprovalStep> {
        self.steps.iter().find(|s| s.status() == StepStatus::Rejected)
    }

    /// 同じ ID のステップを差し替えた台帳を返す
    pub(crate) fn with_step(mut self, step: ApprovalStep) -> Result<Self, DomainError> {
        let slot = self
            .steps
            .iter_mut()
            .find(|s| s.id() == step.id())
            .ok_or_else(|| DomainError::NotFound {
                entity_type: "ApprovalStep",
                id:          step.id().to_string(),
            })?;
        *slot = step;
        Ok(self)
    }
}
