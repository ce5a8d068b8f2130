//! # インフラ層エラー定義
//!
//! データベース操作で発生するエラーを表現する。
//!
//! `std::io::Error` と同じ struct + enum パターン:
//! - [`InfraError`]: 種別（[`InfraErrorKind`]）と [`SpanTrace`] を保持するラッパー
//! - [`InfraErrorKind`]: Database / Serialization / Conflict / Unexpected
//!
//! `From` 実装と convenience constructor は生成時点のスパンを自動で記録する。

use std::fmt;

use derive_more::Display;
use thiserror::Error;
use tracing_error::SpanTrace;

/// インフラ層で発生するエラー
#[derive(Display)]
#[display("{kind}")]
pub struct InfraError {
    kind:       InfraErrorKind,
    span_trace: SpanTrace,
}

/// インフラ層エラーの種別
#[derive(Debug, Error)]
pub enum InfraErrorKind {
    /// SQL の実行失敗、接続エラー、制約違反など
    #[error("データベースエラー: {0}")]
    Database(#[source] sqlx::Error),

    /// JSON 列の変換失敗
    #[error("シリアライズエラー: {0}")]
    Serialization(#[source] serde_json::Error),

    /// 楽観ロックの不一致、または判断済みステップへの書き込み
    ///
    /// 同じ申請への判断が同時に行われた場合に発生する。
    #[error("競合が発生しました: {entity}(id={id})")]
    Conflict { entity: String, id: String },

    /// 保存データがドメインの不変条件を満たさないなど
    #[error("予期しないエラー: {0}")]
    Unexpected(String),
}

impl InfraError {
    pub fn kind(&self) -> &InfraErrorKind {
        &self.kind
    }

    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// Conflict の場合に entity と id を返す
    pub fn as_conflict(&self) -> Option<(&str, &str)> {
        match &self.kind {
            InfraErrorKind::Conflict { entity, id } => Some((entity, id)),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.as_conflict().is_some()
    }

    fn with_kind(kind: InfraErrorKind) -> Self {
        Self {
            kind,
            span_trace: SpanTrace::capture(),
        }
    }

    pub fn conflict(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::with_kind(InfraErrorKind::Conflict {
            entity: entity.into(),
            id:     id.into(),
        })
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::with_kind(InfraErrorKind::Unexpected(msg.into()))
    }
}

impl fmt::Debug for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfraError")
            .field("kind", &self.kind)
            .field("span_trace", &self.span_trace)
            .finish()
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

impl From<sqlx::Error> for InfraError {
    fn from(source: sqlx::Error) -> Self {
        Self::with_kind(InfraErrorKind::Database(source))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(source: serde_json::Error) -> Self {
        Self::with_kind(InfraErrorKind::Serialization(source))
    }
}

impl From<requestflow_domain::DomainError> for InfraError {
    /// 行からエンティティへの復元失敗は保存データの不整合として扱う
    fn from(source: requestflow_domain::DomainError) -> Self {
        Self::unexpected(source.to_string())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use requestflow_domain::DomainError;
    use tracing_subscriber::layer::SubscriberExt as _;

    use super::*;

    fn with_error_layer(f: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(tracing_error::ErrorLayer::default());
        let _guard = tracing::subscriber::set_default(subscriber);
        f();
    }

    #[test]
    fn test_from_sqlx_errorでspan_traceがキャプチャされる() {
        with_error_layer(|| {
            let span = tracing::info_span!("find_leave_request");
            let _enter = span.enter();

            let err: InfraError = sqlx::Error::RowNotFound.into();

            assert!(matches!(err.kind(), InfraErrorKind::Database(_)));
            let trace = format!("{}", err.span_trace());
            assert!(trace.contains("find_leave_request"), "{trace}");
        });
    }

    #[test]
    fn test_conflictでspan_traceがキャプチャされる() {
        with_error_layer(|| {
            let span = tracing::info_span!("record_decision");
            let _enter = span.enter();

            let err = InfraError::conflict("ApprovalStep", "S-1");

            assert_eq!(err.as_conflict(), Some(("ApprovalStep", "S-1")));
            assert!(format!("{}", err.span_trace()).contains("record_decision"));
        });
    }

    #[test]
    fn test_displayは種別のメッセージを出力する() {
        let err = InfraError::conflict("LeaveRequest", "R-1");

        assert_eq!(err.to_string(), "競合が発生しました: LeaveRequest(id=R-1)");
        assert!(err.is_conflict());
    }

    #[test]
    fn test_ドメインエラーは予期しないエラーに変換される() {
        let err: InfraError = DomainError::Validation("不整合".to_string()).into();

        assert!(matches!(err.kind(), InfraErrorKind::Unexpected(msg) if msg.contains("不整合")));
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_sourceは種別に委譲する() {
        use std::error::Error;

        let err: InfraError = sqlx::Error::RowNotFound.into();

        assert!(err.source().is_some());
        assert!(InfraError::unexpected("x").source().is_none());
    }
}
