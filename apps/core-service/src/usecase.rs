//! # ユースケース層
//!
//! Core Service のアプリケーションロジックを実装する。
//!
//! - リポジトリは `Arc<dyn Trait>` で外部から注入する
//! - 書き込みは [`TransactionManager`](requestflow_infra::db::TransactionManager) の
//!   トランザクション内で行う
//! - ハンドラは薄く保ち、承認ルールはドメイン層の承認エンジンに委譲する

pub(crate) mod helpers;

pub mod decision;
pub mod department;
pub mod pending;
pub mod registry;
pub mod request;

use std::collections::HashMap;

pub use decision::{DecisionInput, DecisionResult, DecisionUseCaseImpl};
pub use department::{DepartmentUseCaseImpl, UpdateWorkflowsInput};
use itertools::Itertools;
pub use pending::{PendingApprovalItem, PendingApprovals, PendingApprovalUseCaseImpl};
pub use registry::WorkflowTemplateRegistry;
pub use request::{
   ApprovalRequestUseCaseImpl,
   CreateRequestInput,
   RequestWithLedger,
   UpdateRequestInput,
};
use requestflow_domain::{request::RequestKind, user::UserId};
use requestflow_infra::repository::UserRepository;
use requestflow_shared::event_log::event;

use crate::error::CoreError;

/// ユーザーが見つからないときの表示名
pub(crate) const UNKNOWN_USER_NAME: &str = "Unknown";

/// ユーザー ID のリストからユーザー名を一括解決する
///
/// 重複した ID は 1 回だけ問い合わせる。
pub(crate) async fn resolve_user_names(
   user_repo: &dyn UserRepository,
   user_ids: &[UserId],
) -> Result<HashMap<UserId, String>, CoreError> {
   let unique_ids: Vec<UserId> = user_ids.iter().unique().cloned().collect();
   if unique_ids.is_empty() {
      return Ok(HashMap::new());
   }

   let users = user_repo.find_by_ids(&unique_ids).await?;

   Ok(users
      .into_iter()
      .map(|user| (user.id().clone(), user.name().as_str().to_string()))
      .collect())
}

/// ビジネスイベントの `event.entity_type`
pub(crate) fn event_entity_type(kind: RequestKind) -> &'static str {
   match kind {
      RequestKind::Leave => event::entity_type::LEAVE_REQUEST,
      RequestKind::Mission => event::entity_type::MISSION_REQUEST,
   }
}
