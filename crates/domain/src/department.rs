//! # 部署
//!
//! 部署は申請種別ごとの承認ロール列（ワークフローテンプレート）を保持する。
//! テンプレートは管理者による設定として JSON 配列のまま保存され、
//! 解釈（不正な値のフォールバックを含む）は [`crate::approval::ApprovalChain::resolve`] が担う。

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use crate::{request::RequestKind, value_objects::DepartmentName};

define_uuid_id! {
    /// 部署 ID
    pub struct DepartmentId;
}

/// 部署エンティティ
#[derive(Debug, Clone, PartialEq)]
pub struct Department {
    id:               DepartmentId,
    name:             DepartmentName,
    leave_workflow:   JsonValue,
    mission_workflow: JsonValue,
    created_at:       DateTime<Utc>,
    updated_at:       DateTime<Utc>,
}

/// 部署の新規作成パラメータ
pub struct NewDepartment {
    pub id:               DepartmentId,
    pub name:             DepartmentName,
    pub leave_workflow:   JsonValue,
    pub mission_workflow: JsonValue,
    pub now:              DateTime<Utc>,
}

/// 部署の DB 復元パラメータ
pub struct DepartmentRecord {
    pub id:               DepartmentId,
    pub name:             DepartmentName,
    pub leave_workflow:   JsonValue,
    pub mission_workflow: JsonValue,
    pub created_at:       DateTime<Utc>,
    pub updated_at:       DateTime<Utc>,
}

impl Department {
    pub fn new(params: NewDepartment) -> Self {
        Self {
            id:               params.id,
            name:             params.name,
            leave_workflow:   params.leave_workflow,
            mission_workflow: params.mission_workflow,
            created_at:       params.now,
            updated_at:       params.now,
        }
    }

    pub fn from_db(record: DepartmentRecord) -> Self {
        Self {
            id:               record.id,
            name:             record.name,
            leave_workflow:   record.leave_workflow,
            mission_workflow: record.mission_workflow,
            created_at:       record.created_at,
            updated_at:       record.updated_at,
        }
    }

    pub fn id(&self) -> &DepartmentId {
        &self.id
    }

    pub fn name(&self) -> &DepartmentName {
        &self.name
    }

    pub fn leave_workflow(&self) -> &JsonValue {
        &self.leave_workflow
    }

    pub fn mission_workflow(&self) -> &JsonValue {
        &self.mission_workflow
    }

    /// 申請種別に対応するテンプレート
    pub fn workflow_for(&self, kind: RequestKind) -> &JsonValue {
        match kind {
            RequestKind::Leave => &self.leave_workflow,
            RequestKind::Mission => &self.mission_workflow,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// テンプレートを差し替えた部署を返す
    ///
    /// 進行中の申請の承認台帳には影響しない。
    pub fn with_workflows(
        self,
        leave_workflow: JsonValue,
        mission_workflow: JsonValue,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            leave_workflow,
            mission_workflow,
            updated_at: now,
            ..self
        }
    }
}
