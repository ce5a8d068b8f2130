//! # リポジトリ実装
//!
//! - 読み取りメソッドはプールから直接読む
//! - 書き込みメソッドは [`crate::db::TxContext`] を必須引数に取る
//! - 行構造体（`sqlx::FromRow`）からエンティティへの変換は `TryFrom` に集約する

pub mod approval_request_repository;
pub mod approval_step_repository;
pub mod department_repository;
pub mod user_repository;

pub use approval_request_repository::{
   ApprovalRequestRepository,
   PostgresApprovalRequestRepository,
};
pub use approval_step_repository::{ApprovalStepRepository, PostgresApprovalStepRepository};
pub use department_repository::{DepartmentRepository, PostgresDepartmentRepository};
pub use user_repository::{PostgresUserRepository, UserRepository};
