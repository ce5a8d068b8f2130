//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュール（この `handler.rs`）で re-export し、フラットな API を提供
//! - ハンドラは入力の変換とレスポンスの組み立てのみを行い、ルールはユースケースに委譲

pub mod approval;
pub mod department;
pub mod health;
pub mod request;

pub use approval::{ApprovalState, decide, list_pending_approvals};
pub use department::{DepartmentState, list_departments, update_department_workflows};
pub use health::health_check;
pub use request::{
   ApprovalRequestDto,
   ApprovalRequestState,
   ApprovalStepDto,
   create_request,
   delete_request,
   get_request,
   list_requests,
   update_request,
};

use requestflow_domain::request::RequestKind;

use crate::error::CoreError;

/// パスの `{kind}`（`leave` / `mission`）を解釈する
fn parse_kind(kind: &str) -> Result<RequestKind, CoreError> {
   Ok(kind.parse::<RequestKind>()?)
}
