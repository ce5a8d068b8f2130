//! # RequestFlow インフラ層
//!
//! 申請・承認台帳・部署・ユーザーの永続化（PostgreSQL）を担当する。
//!
//! ## 責務
//!
//! - **データベース接続**: 接続プールとマイグレーション（[`db`]）
//! - **トランザクション**: 書き込みは必ず [`db::TxContext`] 経由で行う
//! - **リポジトリ実装**: 申請・承認ステップ・部署・ユーザー（[`repository`]）
//! - **テスト用モック**: `test-utils` feature で有効になるインメモリ実装（`mock`）
//!
//! ## 依存関係
//!
//! ```text
//! core-service → infra → domain
//! ```

pub mod db;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod repository;

pub use error::{InfraError, InfraErrorKind};
