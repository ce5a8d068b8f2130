//! 承認チェーンの解決。
//!
//! 部署テンプレートが未設定・配列でない・空・未知のロールを含む場合は
//! 申請種別ごとの既定チェーンにフォールバックする。

use serde_json::Value as JsonValue;

use crate::{DomainError, department::Department, request::RequestKind, role::Role};

/// 承認チェーン（非空のロール列）
///
/// 先頭要素を分けて持つことで、空のチェーンを表現できないようにしている。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalChain {
    head: Role,
    tail: Vec<Role>,
}

/// チェーンの解決元
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ChainSource {
    /// 部署テンプレートをそのまま使った
    Configured,
    /// 部署が存在しないため既定チェーンを使った
    UnknownDepartment,
    /// テンプレートが未設定・不正なため既定チェーンを使った
    InvalidTemplate,
}

/// チェーン解決の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainResolution {
    pub chain:  ApprovalChain,
    pub source: ChainSource,
}

impl ApprovalChain {
    /// ロール列からチェーンを作成する
    ///
    /// 空のロール列は設定不備としてエラーにする。
    pub fn new(roles: Vec<Role>) -> Result<Self, DomainError> {
        let mut roles = roles.into_iter();
        let head = roles.next().ok_or_else(|| {
            DomainError::Validation("承認チェーンには 1 つ以上のロールが必要です".to_string())
        })?;
        Ok(Self {
            head,
            tail: roles.collect(),
        })
    }

    /// 申請種別ごとの既定チェーン
    ///
    /// - 休暇: `team_leader` → `hr_manager`
    /// - 出張: `team_leader` → `department_admin`
    pub fn default_for(kind: RequestKind) -> Self {
        let second = match kind {
            RequestKind::Leave => Role::HrManager,
            RequestKind::Mission => Role::DepartmentAdmin,
        };
        Self {
            head: Role::TeamLeader,
            tail: vec![second],
        }
    }

    /// テンプレート（JSON）を解釈する
    ///
    /// 文字列の配列で、全要素が既知のロールで、かつ空でない場合のみ `Some`。
    pub fn from_template(template: &JsonValue) -> Option<Self> {
        let roles = template
            .as_array()?
            .iter()
            .map(|value| value.as_str()?.parse::<Role>().ok())
            .collect::<Option<Vec<_>>>()?;
        Self::new(roles).ok()
    }

    /// 部署と申請種別から承認チェーンを解決する
    ///
    /// 同じ入力に対して常に同じ結果を返す。
    pub fn resolve(department: Option<&Department>, kind: RequestKind) -> ChainResolution {
        let Some(department) = department else {
            return ChainResolution {
                chain:  Self::default_for(kind),
                source: ChainSource::UnknownDepartment,
            };
        };

        match Self::from_template(department.workflow_for(kind)) {
            Some(chain) => ChainResolution {
                chain,
                source: ChainSource::Configured,
            },
            None => ChainResolution {
                chain:  Self::default_for(kind),
                source: ChainSource::InvalidTemplate,
            },
        }
    }

    /// 最初に判断するロール
    pub fn first(&self) -> Role {
        self.head
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        std::iter::once(self.head).chain(self.tail.iter().copied())
    }

    pub fn len(&self) -> usize {
        1 + self.tail.len()
    }

    /// 常に `false`（空のチェーンは存在しない）
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn to_vec(&self) -> Vec<Role> {
        self.roles().collect()
    }
}
