//! # ドメイン層エラー定義
//!
//! 申請・承認のビジネスルール違反を表すエラー型。
//!
//! | エラー種別 | HTTP ステータス | 用途 |
//! |-----------|----------------|------|
//! | `Validation` | 400 Bad Request | 入力値や保存データの検証失敗 |
//! | `NotFound` | 404 Not Found | 申請・ユーザー・部署が存在しない |
//! | `Conflict` | 409 Conflict | 判断済みステップの再判断、楽観ロック失敗 |
//! | `Forbidden` | 403 Forbidden | 申請者以外による削除など |
//!
//! 承認アクションの拒否（現在の承認者でない等）はこの型では表さず、
//! [`crate::approval::DecisionDeclined`] として明示的な結果値で返す。

use thiserror::Error;

/// ドメイン層で発生するエラー
#[derive(Debug, Error)]
pub enum DomainError {
    /// 入力値がビジネスルールに違反している
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// エンティティが見つからない
    #[error("{entity_type} が見つかりません: {id}")]
    NotFound {
        /// エンティティの種類（"LeaveRequest", "User" など）
        entity_type: &'static str,
        id:          String,
    },

    /// 状態の競合
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// 操作権限がない
    #[error("権限がありません: {0}")]
    Forbidden(String),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_not_found_のメッセージにエンティティ種別と_idが含まれる() {
        let error = DomainError::NotFound {
            entity_type: "LeaveRequest",
            id:          "abc".to_string(),
        };

        assert_eq!(error.to_string(), "LeaveRequest が見つかりません: abc");
    }
}
