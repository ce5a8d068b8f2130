//! # ロール（役職）
//!
//! ユーザーの役職を表し、承認チェーンの各ステップで「誰が判断するか」を指定する。
//!
//! | ロール | 承認者として | 申請一覧の閲覧範囲 |
//! |-------|-------------|------------------|
//! | `employee` | - | 自分の申請のみ |
//! | `team_leader` | 自部署の申請のみ | 自分の申請のみ |
//! | `hr_manager` | 全社 | 休暇申請は全件 |
//! | `cfo` | 全社 | 出張申請は全件 |
//! | `ceo` | 全社 | 出張申請は全件 |
//! | `department_admin` | 全社 | 自分の申請のみ |
//! | `system_admin` | 全社 | 全件 |

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{DomainError, request::RequestKind};

/// 役職ロール
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Employee,
    TeamLeader,
    HrManager,
    Cfo,
    Ceo,
    DepartmentAdmin,
    SystemAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// 承認待ち一覧が申請者の部署で絞り込まれるロールか
    ///
    /// 部署スコープを持つのはチームリーダーのみ。
    pub fn is_department_scoped_approver(&self) -> bool {
        matches!(self, Self::TeamLeader)
    }

    /// 指定種別の申請を全件閲覧できるか
    pub fn can_view_all(&self, kind: RequestKind) -> bool {
        match kind {
            RequestKind::Leave => matches!(self, Self::SystemAdmin | Self::HrManager),
            RequestKind::Mission => matches!(self, Self::SystemAdmin | Self::Ceo | Self::Cfo),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "employee" => Ok(Self::Employee),
            "team_leader" => Ok(Self::TeamLeader),
            "hr_manager" => Ok(Self::HrManager),
            "cfo" => Ok(Self::Cfo),
            "ceo" => Ok(Self::Ceo),
            "department_admin" => Ok(Self::DepartmentAdmin),
            "system_admin" => Ok(Self::SystemAdmin),
            _ => Err(DomainError::Validation(format!("不正なロール: {s}"))),
        }
    }
}
