//! # 承認待ち一覧ユースケース
//!
//! ロール（チームリーダーは部署も）を指定して、判断すべき休暇・出張申請を返す。

use std::sync::Arc;

use requestflow_domain::{
   approval::PendingApprovalsQuery,
   request::{ApprovalRequest, RequestKind},
   user::UserId,
};
use requestflow_infra::repository::{ApprovalRequestRepository, UserRepository};

use super::{UNKNOWN_USER_NAME, resolve_user_names};
use crate::error::CoreError;

/// 承認待ちの申請と申請者名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingApprovalItem {
   pub request:        ApprovalRequest,
   pub requester_name: String,
}

/// 種別ごとの承認待ち一覧（それぞれ古い順）
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PendingApprovals {
   pub leave:   Vec<PendingApprovalItem>,
   pub mission: Vec<PendingApprovalItem>,
}

pub struct PendingApprovalUseCaseImpl {
   request_repo: Arc<dyn ApprovalRequestRepository>,
   user_repo:    Arc<dyn UserRepository>,
}

impl PendingApprovalUseCaseImpl {
   pub fn new(
      request_repo: Arc<dyn ApprovalRequestRepository>,
      user_repo: Arc<dyn UserRepository>,
   ) -> Self {
      Self {
         request_repo,
         user_repo,
      }
   }

   #[tracing::instrument(skip_all, fields(role = %query.role()))]
   pub async fn list_pending(
      &self,
      query: &PendingApprovalsQuery,
   ) -> Result<PendingApprovals, CoreError> {
      let leave = self
         .request_repo
         .find_pending(RequestKind::Leave, query)
         .await?;
      let mission = self
         .request_repo
         .find_pending(RequestKind::Mission, query)
         .await?;

      let requester_ids: Vec<UserId> = leave
         .iter()
         .chain(mission.iter())
         .map(|r| r.requester_id().clone())
         .collect();
      let names = resolve_user_names(self.user_repo.as_ref(), &requester_ids).await?;

      let with_name = |requests: Vec<ApprovalRequest>| -> Vec<PendingApprovalItem> {
         requests
            .into_iter()
            .map(|request| {
               let requester_name = names
                  .get(request.requester_id())
                  .cloned()
                  .unwrap_or_else(|| UNKNOWN_USER_NAME.to_string());
               PendingApprovalItem {
                  request,
                  requester_name,
               }
            })
            .collect()
      };

      Ok(PendingApprovals {
         leave:   with_name(leave),
         mission: with_name(mission),
      })
   }
}
