//! # 共通値オブジェクト
//!
//! 複数のエンティティで共有される値オブジェクトを定義する。
//!
//! | 型 | ラップ対象 | 用途 |
//! |---|-----------|------|
//! | [`Version`] | `u32` | 申請の楽観ロック用バージョン |
//! | [`UserName`] | `String` | ユーザー表示名 |
//! | [`Email`] | `String` | メールアドレス |
//! | [`DepartmentName`] | `String` | 部署名（ワークフローテンプレートのキー） |
//! | [`DecisionComment`] | `String` | 承認・却下時のコメント |

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// バージョン番号
///
/// 申請の更新ごとにインクリメントされ、同一申請への同時判断を検出するのに使う。
///
/// ```rust
/// use requestflow_domain::value_objects::Version;
///
/// let v1 = Version::initial();
/// assert_eq!(v1.next().as_u32(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u32);

impl Version {
    pub fn initial() -> Self {
        Self(1)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// DB の INTEGER 列に書き込むための変換
    pub fn as_i32(&self) -> i32 {
        i32::try_from(self.0).unwrap_or(i32::MAX)
    }
}

impl TryFrom<i32> for Version {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .ok()
            .filter(|v| *v >= 1)
            .map(Self)
            .ok_or_else(|| {
                DomainError::Validation(format!(
                    "バージョン番号は 1 以上である必要があります: {value}"
                ))
            })
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::initial()
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

define_validated_string! {
    /// ユーザー表示名（承認者名として承認ステップに転記される）
    pub struct UserName {
        label: "ユーザー名",
        max_length: 255,
        pii: true,
    }
}

define_validated_string! {
    /// メールアドレス
    pub struct Email {
        label: "メールアドレス",
        max_length: 255,
        pii: true,
    }
}

define_validated_string! {
    /// 部署名
    ///
    /// 部署ごとのワークフローテンプレートを引くキーであり、
    /// 申請作成時に申請者の所属としてコピーされる。
    pub struct DepartmentName {
        label: "部署名",
        max_length: 100,
    }
}

define_validated_string! {
    /// 承認・却下時のコメント
    pub struct DecisionComment {
        label: "コメント",
        max_length: 500,
    }
}

impl DecisionComment {
    /// 空文字や空白のみの入力は「コメントなし」として扱う
    pub fn optional(value: Option<String>) -> Result<Option<Self>, DomainError> {
        match value {
            Some(v) if !v.trim().is_empty() => Self::new(v).map(Some),
            _ => Ok(None),
        }
    }
}
