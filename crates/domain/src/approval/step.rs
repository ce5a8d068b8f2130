//! 承認ステップ（承認台帳の 1 行）。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{
    DomainError,
    request::ApprovableRef,
    role::Role,
    value_objects::DecisionComment,
};

define_uuid_id! {
    /// 承認ステップ ID
    pub struct ApprovalStepId;
}

/// ステップの処理順
///
/// チェーン上の位置を表し、1 から連番で振られる。
/// 同じロールが複数回現れる場合もこの値で順序が決まる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepSequence(i32);

impl StepSequence {
    pub fn first() -> Self {
        Self(1)
    }

    pub fn new(value: i32) -> Result<Self, DomainError> {
        if value < 1 {
            return Err(DomainError::Validation(format!(
                "ステップ順序は 1 以上である必要があります: {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for StepSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ステップステータス
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::str::FromStr for StepStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(DomainError::Validation(format!(
                "不正なステップステータス: {s}"
            ))),
        }
    }
}

/// 承認者の判断
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

impl std::str::FromStr for Decision {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(DomainError::Validation(format!("不正な判断: {s}"))),
        }
    }
}

impl From<Decision> for StepStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approved => Self::Approved,
            Decision::Rejected => Self::Rejected,
        }
    }
}

/// 承認ステップエンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalStep {
    id: ApprovalStepId,
    approvable: ApprovableRef,
    sequence: StepSequence,
    approver_role: Role,
    status: StepStatus,
    approver_name: Option<String>,
    comments: Option<DecisionComment>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// 承認ステップの新規作成パラメータ
pub struct NewApprovalStep {
    pub id: ApprovalStepId,
    pub approvable: ApprovableRef,
    pub sequence: StepSequence,
    pub approver_role: Role,
    pub now: DateTime<Utc>,
}

/// 承認ステップの DB 復元パラメータ
pub struct ApprovalStepRecord {
    pub id: ApprovalStepId,
    pub approvable: ApprovableRef,
    pub sequence: StepSequence,
    pub approver_role: Role,
    pub status: StepStatus,
    pub approver_name: Option<String>,
    pub comments: Option<DecisionComment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApprovalStep {
    /// 未判断のステップを作成する
    pub fn new(params: NewApprovalStep) -> Self {
        Self {
            id: params.id,
            approvable: params.approvable,
            sequence: params.sequence,
            approver_role: params.approver_role,
            status: StepStatus::Pending,
            approver_name: None,
            comments: None,
            created_at: params.now,
            updated_at: params.now,
        }
    }

    pub fn from_db(record: ApprovalStepRecord) -> Self {
        Self {
            id: record.id,
            approvable: record.approvable,
            sequence: record.sequence,
            approver_role: record.approver_role,
            status: record.status,
            approver_name: record.approver_name,
            comments: record.comments,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    pub fn id(&self) -> &ApprovalStepId {
        &self.id
    }

    pub fn approvable(&self) -> &ApprovableRef {
        &self.approvable
    }

    pub fn sequence(&self) -> StepSequence {
        self.sequence
    }

    pub fn approver_role(&self) -> Role {
        self.approver_role
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == StepStatus::Pending
    }

    /// 判断した承認者の表示名（判断前は `None`）
    pub fn approver_name(&self) -> Option<&str> {
        self.approver_name.as_deref()
    }

    pub fn comments(&self) -> Option<&DecisionComment> {
        self.comments.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// 判断を記録したステップを返す
    ///
    /// # Errors
    ///
    /// - `DomainError::Conflict`: 既に判断済みのステップの場合
    pub fn decided(
        self,
        decision: Decision,
        approver_name: String,
        comments: Option<DecisionComment>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if !self.is_pending() {
            return Err(DomainError::Conflict(format!(
                "ステップ {} は既に判断済みです（現在: {}）",
                self.sequence, self.status
            )));
        }
        Ok(Self {
            status: decision.into(),
            approver_name: Some(approver_name),
            comments,
            updated_at: now,
            ..self
        })
    }
}
