use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::DomainError;

define_uuid_id! {
    /// 申請 ID（休暇・出張で共通の採番）
    pub struct RequestId;
}

/// 申請種別
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestKind {
    /// 休暇申請
    Leave,
    /// 出張申請
    Mission,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// ログ・エラーで使うエンティティ名
    pub fn entity_type(&self) -> &'static str {
        match self {
            Self::Leave => "LeaveRequest",
            Self::Mission => "MissionRequest",
        }
    }
}

impl std::str::FromStr for RequestKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "leave" => Ok(Self::Leave),
            "mission" => Ok(Self::Mission),
            _ => Err(DomainError::Validation(format!("不正な申請種別: {s}"))),
        }
    }
}

/// 承認台帳から申請を指す参照
///
/// 台帳は休暇・出張の両方に共通の 1 種類であり、種別を判別子として持つ。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[display("{kind}:{id}")]
pub struct ApprovableRef {
    kind: RequestKind,
    id:   RequestId,
}

impl ApprovableRef {
    pub fn new(kind: RequestKind, id: RequestId) -> Self {
        Self { kind, id }
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn id(&self) -> &RequestId {
        &self.id
    }
}
