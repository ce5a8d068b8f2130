//! 申請の状態（承認待ち → 承認済み / 却下）。
//!
//! 状態遷移メソッドは crate 内（承認エンジン）からのみ呼ばれる。
//! プレゼンテーション層が `status` や `current_approver` を直接書き換える経路はない。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use super::{ApprovableRef, RequestDetails, RequestId, RequestKind};
use crate::{
    DomainError,
    role::Role,
    user::UserId,
    value_objects::{DepartmentName, Version},
};

/// 申請ステータス（DB / API 上の表現）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::str::FromStr for RequestStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(DomainError::Validation(format!("不正な申請ステータス: {s}"))),
        }
    }
}

/// 申請の状態
///
/// 承認待ちの間だけ「次に判断するロール」を持つ。終端状態は判断日時のみを持つ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestState {
    Pending { current_approver: Role },
    Approved { decided_at: DateTime<Utc> },
    Rejected { decided_at: DateTime<Utc> },
}

/// 申請（休暇・出張共通の外枠）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRequest {
    id:                   RequestId,
    requester_id:         UserId,
    requester_department: DepartmentName,
    details:              RequestDetails,
    state:                RequestState,
    version:              Version,
    created_at:           DateTime<Utc>,
    updated_at:           DateTime<Utc>,
}

/// 新規申請パラメータ
///
/// 承認者が未設定の、作成直後の申請を表す。承認チェーンの解決後に
/// [`crate::approval::initialize`] で承認待ちの [`ApprovalRequest`] になる。
pub struct NewApprovalRequest {
    pub id:                   RequestId,
    pub requester_id:         UserId,
    pub requester_department: DepartmentName,
    pub details:              RequestDetails,
    pub now:                  DateTime<Utc>,
}

/// 申請の DB 復元パラメータ
pub struct ApprovalRequestRecord {
    pub id:                   RequestId,
    pub requester_id:         UserId,
    pub requester_department: DepartmentName,
    pub details:              RequestDetails,
    pub status:               RequestStatus,
    pub current_approver:     Option<Role>,
    pub decided_at:           Option<DateTime<Utc>>,
    pub version:              Version,
    pub created_at:           DateTime<Utc>,
    pub updated_at:           DateTime<Utc>,
}

impl ApprovalRequest {
    /// 最初の承認者を設定して承認待ちの申請を作る
    pub(crate) fn initialized(params: NewApprovalRequest, first_approver: Role) -> Self {
        Self {
            id:                   params.id,
            requester_id:         params.requester_id,
            requester_department: params.requester_department,
            details:              params.details,
            state:                RequestState::Pending {
                current_approver: first_approver,
            },
            version:              Version::initial(),
            created_at:           params.now,
            updated_at:           params.now,
        }
    }

    /// DB から復元する
    ///
    /// ステータスと `current_approver` / `decided_at` の組み合わせが
    /// 不整合な場合はエラーを返す。
    pub fn from_db(record: ApprovalRequestRecord) -> Result<Self, DomainError> {
        let state = match (record.status, record.current_approver, record.decided_at) {
            (RequestStatus::Pending, Some(current_approver), _) => {
                RequestState::Pending { current_approver }
            }
            (RequestStatus::Approved, None, Some(decided_at)) => {
                RequestState::Approved { decided_at }
            }
            (RequestStatus::Rejected, None, Some(decided_at)) => {
                RequestState::Rejected { decided_at }
            }
            (status, current_approver, _) => {
                return Err(DomainError::Validation(format!(
                    "申請 {} の状態が不整合です（status: {status}, current_approver: {:?}）",
                    record.id, current_approver
                )));
            }
        };

        Ok(Self {
            id: record.id,
            requester_id: record.requester_id,
            requester_department: record.requester_department,
            details: record.details,
            state,
            version: record.version,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub fn kind(&self) -> RequestKind {
        self.details.kind()
    }

    /// 承認台帳から見たこの申請への参照
    pub fn approvable(&self) -> ApprovableRef {
        ApprovableRef::new(self.kind(), self.id.clone())
    }

    pub fn requester_id(&self) -> &UserId {
        &self.requester_id
    }

    /// 申請時点の申請者の所属部署（以後再解決しない）
    pub fn requester_department(&self) -> &DepartmentName {
        &self.requester_department
    }

    pub fn details(&self) -> &RequestDetails {
        &self.details
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn status(&self) -> RequestStatus {
        match self.state {
            RequestState::Pending { .. } => RequestStatus::Pending,
            RequestState::Approved { .. } => RequestStatus::Approved,
            RequestState::Rejected { .. } => RequestStatus::Rejected,
        }
    }

    /// 次に判断するロール。終端状態では `None`
    pub fn current_approver(&self) -> Option<Role> {
        match self.state {
            RequestState::Pending { current_approver } => Some(current_approver),
            RequestState::Approved { .. } | RequestState::Rejected { .. } => None,
        }
    }

    pub fn decided_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            RequestState::Pending { .. } => None,
            RequestState::Approved { decided_at } | RequestState::Rejected { decided_at } => {
                Some(decided_at)
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.state, RequestState::Pending { .. })
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.requester_id == user_id
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// 申請内容を差し替える
    ///
    /// 承認待ちの間だけ可能。ステータス・現在の承認者・申請時の部署は変えない。
    /// 種別の異なる内容には差し替えられない。
    pub fn revised(self, details: RequestDetails, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if self.is_terminal() {
            return Err(DomainError::Forbidden(format!(
                "承認待ちでない申請は変更できません（現在: {}）",
                self.status()
            )));
        }
        if details.kind() != self.kind() {
            return Err(DomainError::Validation(format!(
                "{} 申請の内容を {} に変更することはできません",
                self.kind(),
                details.kind()
            )));
        }
        Ok(Self {
            details,
            version: self.version.next(),
            updated_at: now,
            ..self
        })
    }

    // --- 状態遷移（承認エンジン専用） ---

    pub(crate) fn advanced_to(self, next_approver: Role, now: DateTime<Utc>) -> Result<Self, DomainError> {
        self.transition("次の承認者への移行", now, RequestState::Pending {
            current_approver: next_approver,
        })
    }

    pub(crate) fn approved(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        self.transition("承認完了", now, RequestState::Approved { decided_at: now })
    }

    pub(crate) fn rejected(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        self.transition("却下", now, RequestState::Rejected { decided_at: now })
    }

    fn transition(
        self,
        action: &str,
        now: DateTime<Utc>,
        next: RequestState,
    ) -> Result<Self, DomainError> {
        if self.is_terminal() {
            return Err(DomainError::Conflict(format!(
                "{action}は承認待ちの申請でのみ可能です（現在: {}）",
                self.status()
            )));
        }
        Ok(Self {
            state: next,
            version: self.version.next(),
            updated_at: now,
            ..self
        })
    }
}
