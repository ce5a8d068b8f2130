//! # Core Service エラー定義
//!
//! Core Service 固有のエラーと、HTTP レスポンス（RFC 7807）への変換を定義する。

use axum::{
   Json,
   http::StatusCode,
   response::{IntoResponse, Response},
};
use requestflow_domain::{DomainError, approval::DecisionDeclined};
use requestflow_infra::InfraError;
use requestflow_shared::{ErrorResponse, event_log::error as log_error};
use thiserror::Error;

/// Core Service で発生するエラー
#[derive(Debug, Error)]
pub enum CoreError {
   /// リソースが見つからない
   #[error("リソースが見つかりません: {0}")]
   NotFound(String),

   /// 不正なリクエスト
   #[error("不正なリクエスト: {0}")]
   BadRequest(String),

   /// 権限不足
   #[error("権限がありません: {0}")]
   Forbidden(String),

   /// 状態の競合
   #[error("競合が発生しました: {0}")]
   Conflict(String),

   /// 承認判断が受け付けられなかった
   #[error("承認処理を実行できません: {0}")]
   ApprovalDeclined(DecisionDeclined),

   /// データベースエラー
   #[error("データベースエラー: {0}")]
   Database(#[from] InfraError),

   /// 内部エラー
   #[error("内部エラー: {0}")]
   Internal(String),
}

impl From<DomainError> for CoreError {
   fn from(err: DomainError) -> Self {
      match err {
         DomainError::Validation(msg) => Self::BadRequest(msg),
         DomainError::NotFound { .. } => Self::NotFound(err.to_string()),
         DomainError::Conflict(msg) => Self::Conflict(msg),
         DomainError::Forbidden(msg) => Self::Forbidden(msg),
      }
   }
}

impl From<DecisionDeclined> for CoreError {
   fn from(reason: DecisionDeclined) -> Self {
      Self::ApprovalDeclined(reason)
   }
}

impl CoreError {
   fn to_error_response(&self) -> (StatusCode, ErrorResponse) {
      match self {
         CoreError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse::not_found(msg)),
         CoreError::BadRequest(msg) => {
            (StatusCode::BAD_REQUEST, ErrorResponse::validation_error(msg))
         }
         CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorResponse::forbidden(msg)),
         CoreError::Conflict(msg) => (StatusCode::CONFLICT, ErrorResponse::conflict(msg)),
         CoreError::ApprovalDeclined(_) => {
            (StatusCode::BAD_REQUEST, ErrorResponse::approval_declined())
         }
         CoreError::Database(e) => {
            tracing::error!(
               error.category = log_error::category::INFRASTRUCTURE,
               error.kind = log_error::kind::DATABASE,
               span_trace = %e.span_trace(),
               "データベースエラー: {}",
               e
            );
            (
               StatusCode::INTERNAL_SERVER_ERROR,
               ErrorResponse::internal_error(),
            )
         }
         CoreError::Internal(msg) => {
            tracing::error!(
               error.category = log_error::category::INFRASTRUCTURE,
               error.kind = log_error::kind::INTERNAL,
               "内部エラー: {}",
               msg
            );
            (
               StatusCode::INTERNAL_SERVER_ERROR,
               ErrorResponse::internal_error(),
            )
         }
      }
   }
}

impl IntoResponse for CoreError {
   fn into_response(self) -> Response {
      let (status, body) = self.to_error_response();
      (status, Json(body)).into_response()
   }
}
