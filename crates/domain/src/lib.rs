//! # RequestFlow ドメイン層
//!
//! 休暇申請・出張申請と、その承認ワークフローを表現するドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **I/O を持たない**: 永続化や HTTP は一切扱わず、状態遷移と不変条件だけを担う
//! - **型で状態を表す**: 申請の状態は ADT、承認チェーンは非空を型で保証する
//! - **遷移は値を返す**: 状態遷移メソッドは `self` を消費して新しい値を返す
//!
//! ## 依存関係の方向
//!
//! ```text
//! core-service → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`approval`] - 承認チェーン、承認台帳、ワークフローエンジン
//! - [`request`] - 申請（休暇 / 出張）の状態と内容
//! - [`department`] - 部署と部署ごとのワークフローテンプレート
//! - [`user`] - ユーザー（申請者・承認者）
//! - [`role`] - 役職ロール
//! - [`value_objects`] - 共通値オブジェクト
//! - [`clock`] - 時刻プロバイダ
//! - [`error`] - ドメインエラー

#[macro_use]
mod macros;

pub mod approval;
pub mod clock;
pub mod department;
pub mod error;
pub mod request;
pub mod role;
pub mod user;
pub mod value_objects;

pub use error::DomainError;
