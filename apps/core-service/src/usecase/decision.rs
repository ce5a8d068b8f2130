//! # 承認判断ユースケース
//!
//! 現在の承認者ロールによる承認・却下を、申請の行ロックを取った 1 トランザクションで確定する。
//!
//! ## 処理フロー
//!
//! 1. `FOR UPDATE` で申請を読み、承認台帳を取得する
//! 2. ドメインの承認エンジンで前提条件を検査する（[`authorize`]）
//! 3. 承認者名を解決し、判断を適用する
//! 4. ステップ（未判断のものだけ）と申請（楽観ロック）を更新してコミットする
//!
//! 4 の書き込みが競合した場合は、先に確定した判断を優先して
//! [`DecisionDeclined::Superseded`] を返す。

use std::sync::Arc;

use requestflow_domain::{
   approval::{
      ApprovalLedger,
      ApprovalStep,
      Decision,
      DecisionDeclined,
      DecisionOutcome,
      authorize,
   },
   clock::Clock,
   request::{ApprovableRef, ApprovalRequest},
   role::Role,
   value_objects::DecisionComment,
};
use requestflow_infra::{
   InfraError,
   db::TransactionManager,
   repository::{ApprovalRequestRepository, ApprovalStepRepository, UserRepository},
};
use requestflow_shared::{
   event_log::{error as log_error, event},
   log_business_event,
};

use super::{UNKNOWN_USER_NAME, event_entity_type, helpers::FindResultExt};
use crate::error::CoreError;

/// 承認判断の入力
#[derive(Debug, Clone)]
pub struct DecisionInput {
   pub approvable:  ApprovableRef,
   pub acting_role: Role,
   pub decision:    Decision,
   pub comments:    Option<String>,
}

/// 承認判断の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionResult {
   pub request:      ApprovalRequest,
   pub ledger:       ApprovalLedger,
   pub decided_step: ApprovalStep,
   pub outcome:      DecisionOutcome,
}

pub struct DecisionUseCaseImpl {
   request_repo: Arc<dyn ApprovalRequestRepository>,
   step_repo:    Arc<dyn ApprovalStepRepository>,
   user_repo:    Arc<dyn UserRepository>,
   clock:        Arc<dyn Clock>,
   tx_manager:   Arc<dyn TransactionManager>,
}

impl DecisionUseCaseImpl {
   pub fn new(
      request_repo: Arc<dyn ApprovalRequestRepository>,
      step_repo: Arc<dyn ApprovalStepRepository>,
      user_repo: Arc<dyn UserRepository>,
      clock: Arc<dyn Clock>,
      tx_manager: Arc<dyn TransactionManager>,
   ) -> Self {
      Self {
         request_repo,
         step_repo,
         user_repo,
         clock,
         tx_manager,
      }
   }

   /// 承認または却下する
   ///
   /// 受け付けられない判断（現在の承認者でない、判断できるステップがない、
   /// 先に別の判断が確定した）は [`CoreError::ApprovalDeclined`] となり、何も書き込まない。
   #[tracing::instrument(
      skip_all,
      fields(approvable = %input.approvable, acting_role = %input.acting_role, decision = %input.decision)
   )]
   pub async fn decide(&self, input: DecisionInput) -> Result<DecisionResult, CoreError> {
      let acting = input.acting_role;
      let comments = DecisionComment::optional(input.comments)?;

      let mut tx = self.tx_manager.begin().await?;

      let request = self
         .request_repo
         .find_for_update(&mut tx, &input.approvable)
         .await
         .or_not_found("申請")?;
      let ledger = self.step_repo.find_ledger(&input.approvable).await?;

      let authorized = match authorize(&request, &ledger, acting) {
         Ok(authorized) => authorized,
         Err(reason) => {
            log_declined(&input.approvable, reason);
            return Err(reason.into());
         }
      };

      let approver_name = self.resolve_approver_name(acting).await;
      let applied = authorized.apply(input.decision, approver_name, comments, self.clock.now())?;

      let superseded = |e: InfraError| {
         if e.is_conflict() {
            let reason = DecisionDeclined::Superseded { acting };
            log_declined(&input.approvable, reason);
            CoreError::from(reason)
         } else {
            CoreError::Database(e)
         }
      };

      self.step_repo
         .record_decision(&mut tx, &applied.decided_step)
         .await
         .map_err(superseded)?;
      self.request_repo
         .update_with_version_check(&mut tx, &applied.request, request.version())
         .await
         .map_err(superseded)?;
      tx.commit().await?;

      log_business_event!(
         event.category = event::category::APPROVAL,
         event.action = event::action::DECISION_RECORDED,
         event.entity_type = event_entity_type(input.approvable.kind()),
         event.entity_id = %input.approvable.id(),
         event.actor_role = %acting,
         event.result = event::result::SUCCESS,
         step_id = %applied.decided_step.id(),
         sequence = %applied.decided_step.sequence(),
         decision = %input.decision,
         "承認ステップを判断"
      );

      match applied.outcome {
         DecisionOutcome::Approved => {
            log_business_event!(
               event.category = event::category::APPROVAL,
               event.action = event::action::REQUEST_APPROVED,
               event.entity_type = event_entity_type(input.approvable.kind()),
               event.entity_id = %input.approvable.id(),
               event.actor_role = %acting,
               event.result = event::result::SUCCESS,
               "申請が承認された"
            );
         }
         DecisionOutcome::Rejected => {
            log_business_event!(
               event.category = event::category::APPROVAL,
               event.action = event::action::REQUEST_REJECTED,
               event.entity_type = event_entity_type(input.approvable.kind()),
               event.entity_id = %input.approvable.id(),
               event.actor_role = %acting,
               event.result = event::result::SUCCESS,
               "申請が却下された"
            );
         }
         DecisionOutcome::Advanced { next_approver } => {
            tracing::debug!(%next_approver, "次の承認者へ進んだ");
         }
      }

      Ok(DecisionResult {
         request:      applied.request,
         ledger:       applied.ledger,
         decided_step: applied.decided_step,
         outcome:      applied.outcome,
      })
   }

   /// 判断したロールの承認者名（最初に登録された保持者）
   ///
   /// 表示用の値なので、ユーザーの検索に失敗しても判断は止めず `Unknown` とする。
   async fn resolve_approver_name(&self, role: Role) -> String {
      match self.user_repo.find_first_by_role(role).await {
         Ok(Some(user)) => user.name().as_str().to_string(),
         Ok(None) => UNKNOWN_USER_NAME.to_string(),
         Err(e) => {
            tracing::warn!(
               error.category = log_error::category::INFRASTRUCTURE,
               error.kind = log_error::kind::DATABASE,
               %role,
               "承認者名を解決できないため Unknown として記録: {e}"
            );
            UNKNOWN_USER_NAME.to_string()
         }
      }
   }
}

fn log_declined(approvable: &ApprovableRef, reason: DecisionDeclined) {
   log_business_event!(
      event.category = event::category::APPROVAL,
      event.action = event::action::DECISION_DECLINED,
      event.entity_type = event_entity_type(approvable.kind()),
      event.entity_id = %approvable.id(),
      event.result = event::result::FAILURE,
      reason = %reason,
      "承認判断を受け付けなかった"
   );
}

#[cfg(test)]
mod tests {
   use async_trait::async_trait;
   use pretty_assertions::assert_eq;
   use requestflow_domain::{
      approval::StepStatus,
      clock::FixedClock,
      request::{RequestId, RequestKind, RequestStatus},
      user::{User, UserId},
   };
   use requestflow_infra::mock::{MockTransactionManager, MockUserRepository};
   use rstest::rstest;

   use super::*;
   use crate::test_utils::TestContext;

   fn input(approvable: &ApprovableRef, role: Role, decision: Decision) -> DecisionInput {
      DecisionInput {
         approvable: approvable.clone(),
         acting_role: role,
         decision,
         comments: None,
      }
   }

   fn statuses(ledger: &ApprovalLedger) -> Vec<StepStatus> {
      ledger.steps().iter().map(|s| s.status()).collect()
   }

   #[tokio::test]
   async fn test_承認すると次の承認者へ進む() {
      let ctx = TestContext::seeded();
      let created = ctx.create_leave(&ctx.users.it_employee).await;
      let approvable = created.request.approvable();

      let result = ctx
         .decision_usecase()
         .decide(input(&approvable, Role::TeamLeader, Decision::Approved))
         .await
         .unwrap();

      assert_eq!(
         result.outcome,
         DecisionOutcome::Advanced {
            next_approver: Role::Ceo
         }
      );
      assert_eq!(result.request.status(), RequestStatus::Pending);
      assert_eq!(result.request.current_approver(), Some(Role::Ceo));
      assert_eq!(
         statuses(&result.ledger),
         vec![StepStatus::Approved, StepStatus::Pending]
      );
      assert_eq!(result.decided_step.approver_name(), Some("佐藤 花子"));

      let stored = ctx.request_usecase().get_request(&approvable).await.unwrap();
      assert_eq!(stored.request, result.request);
      assert_eq!(stored.ledger, result.ledger);
   }

   #[tokio::test]
   async fn test_最後のステップを承認すると申請が承認される() {
      let ctx = TestContext::seeded();
      let created = ctx.create_leave(&ctx.users.it_employee).await;
      let approvable = created.request.approvable();
      let sut = ctx.decision_usecase();

      sut.decide(input(&approvable, Role::TeamLeader, Decision::Approved))
         .await
         .unwrap();
      let result = sut
         .decide(input(&approvable, Role::Ceo, Decision::Approved))
         .await
         .unwrap();

      assert_eq!(result.outcome, DecisionOutcome::Approved);
      assert_eq!(result.request.status(), RequestStatus::Approved);
      assert_eq!(result.request.current_approver(), None);
      assert_eq!(
         statuses(&result.ledger),
         vec![StepStatus::Approved, StepStatus::Approved]
      );
   }

   #[tokio::test]
   async fn test_却下すると以降のステップは未判断のまま終了する() {
      let ctx = TestContext::seeded();
      let created = ctx.create_mission(&ctx.users.sales_employee).await;
      let approvable = created.request.approvable();
      let sut = ctx.decision_usecase();

      sut.decide(input(&approvable, Role::TeamLeader, Decision::Approved))
         .await
         .unwrap();
      let result = sut
         .decide(DecisionInput {
            comments: Some("予算超過".to_string()),
            ..input(&approvable, Role::Cfo, Decision::Rejected)
         })
         .await
         .unwrap();

      assert_eq!(result.outcome, DecisionOutcome::Rejected);
      assert_eq!(result.request.status(), RequestStatus::Rejected);
      assert_eq!(result.request.current_approver(), None);
      assert_eq!(
         statuses(&result.ledger),
         vec![
            StepStatus::Approved,
            StepStatus::Rejected,
            StepStatus::Pending,
            StepStatus::Pending,
         ]
      );
      assert_eq!(
         result.decided_step.comments().map(|c| c.as_str()),
         Some("予算超過")
      );
   }

   #[tokio::test]
   async fn test_営業部の出張申請は4段階で承認される() {
      let ctx = TestContext::seeded();
      let created = ctx.create_mission(&ctx.users.sales_employee).await;
      let approvable = created.request.approvable();
      let sut = ctx.decision_usecase();

      let mut outcomes = Vec::new();
      for role in [Role::TeamLeader, Role::Cfo, Role::HrManager, Role::Ceo] {
         let result = sut
            .decide(input(&approvable, role, Decision::Approved))
            .await
            .unwrap();
         outcomes.push(result.outcome);
      }

      assert_eq!(
         outcomes,
         vec![
            DecisionOutcome::Advanced {
               next_approver: Role::Cfo
            },
            DecisionOutcome::Advanced {
               next_approver: Role::HrManager
            },
            DecisionOutcome::Advanced {
               next_approver: Role::Ceo
            },
            DecisionOutcome::Approved,
         ]
      );
      let stored = ctx.request_usecase().get_request(&approvable).await.unwrap();
      let names: Vec<Option<&str>> = stored
         .ledger
         .steps()
         .iter()
         .map(|s| s.approver_name())
         .collect();
      assert_eq!(
         names,
         vec![
            Some("佐藤 花子"),
            Some("田中 誠"),
            Some("鈴木 一郎"),
            Some("高橋 健"),
         ]
      );
   }

   #[rstest]
   #[case(Role::Ceo)]
   #[case(Role::HrManager)]
   #[case(Role::Employee)]
   #[tokio::test]
   async fn test_現在の承認者以外の判断は受け付けず何も変えない(#[case] role: Role) {
      let ctx = TestContext::seeded();
      let created = ctx.create_leave(&ctx.users.it_employee).await;
      let approvable = created.request.approvable();

      let result = ctx
         .decision_usecase()
         .decide(input(&approvable, role, Decision::Approved))
         .await;

      assert!(matches!(
         result,
         Err(CoreError::ApprovalDeclined(
            DecisionDeclined::NotCurrentApprover { .. }
         ))
      ));
      let stored = ctx.request_usecase().get_request(&approvable).await.unwrap();
      assert_eq!(stored, created);
   }

   #[tokio::test]
   async fn test_終了した申請への判断は受け付けない() {
      let ctx = TestContext::seeded();
      let created = ctx.create_leave(&ctx.users.it_employee).await;
      let approvable = created.request.approvable();
      let sut = ctx.decision_usecase();
      sut.decide(input(&approvable, Role::TeamLeader, Decision::Rejected))
         .await
         .unwrap();

      let result = sut
         .decide(input(&approvable, Role::Ceo, Decision::Approved))
         .await;

      assert!(matches!(
         result,
         Err(CoreError::ApprovalDeclined(
            DecisionDeclined::NotCurrentApprover { current: None, .. }
         ))
      ));
   }

   #[tokio::test]
   async fn test_書き込みが競合したら後続の判断は受け付けない() {
      let ctx = TestContext::seeded();
      let created = ctx.create_leave(&ctx.users.it_employee).await;
      let approvable = created.request.approvable();
      ctx.step_repo.conflict_next_decision();

      let result = ctx
         .decision_usecase()
         .decide(input(&approvable, Role::TeamLeader, Decision::Approved))
         .await;

      assert!(matches!(
         result,
         Err(CoreError::ApprovalDeclined(DecisionDeclined::Superseded {
            acting: Role::TeamLeader
         }))
      ));
      let stored = ctx.request_usecase().get_request(&approvable).await.unwrap();
      assert_eq!(stored, created);
   }

   #[tokio::test]
   async fn test_ロール保持者がいなければ承認者名はunknown() {
      let ctx = TestContext::seeded();
      let requester = ctx.add_user("申請者", Role::Employee, "Legal");
      let created = ctx.create_mission(&requester).await;
      let approvable = created.request.approvable();
      let sut = ctx.decision_usecase();

      sut.decide(input(&approvable, Role::TeamLeader, Decision::Approved))
         .await
         .unwrap();
      let result = sut
         .decide(input(&approvable, Role::DepartmentAdmin, Decision::Approved))
         .await
         .unwrap();

      assert_eq!(result.outcome, DecisionOutcome::Approved);
      assert_eq!(result.decided_step.approver_name(), Some(UNKNOWN_USER_NAME));
   }

   /// `find_first_by_role` だけが失敗するユーザーリポジトリ
   struct UnreachableDirectory(MockUserRepository);

   #[async_trait]
   impl UserRepository for UnreachableDirectory {
      async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError> {
         self.0.find_by_id(id).await
      }

      async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, InfraError> {
         self.0.find_by_ids(ids).await
      }

      async fn find_first_by_role(&self, _role: Role) -> Result<Option<User>, InfraError> {
         Err(InfraError::unexpected("directory down"))
      }
   }

   #[tokio::test]
   async fn test_承認者名の検索に失敗しても判断はunknownで記録される() {
      let ctx = TestContext::seeded();
      let created = ctx.create_leave(&ctx.users.it_employee).await;
      let approvable = created.request.approvable();
      let sut = DecisionUseCaseImpl::new(
         Arc::new(ctx.request_repo.clone()),
         Arc::new(ctx.step_repo.clone()),
         Arc::new(UnreachableDirectory(ctx.user_repo.clone())),
         Arc::new(FixedClock::new(ctx.now)),
         Arc::new(MockTransactionManager),
      );

      let result = sut
         .decide(input(&approvable, Role::TeamLeader, Decision::Approved))
         .await
         .unwrap();

      assert_eq!(
         result.outcome,
         DecisionOutcome::Advanced {
            next_approver: Role::Ceo
         }
      );
      assert_eq!(result.decided_step.approver_name(), Some(UNKNOWN_USER_NAME));
      let stored = ctx.request_usecase().get_request(&approvable).await.unwrap();
      assert_eq!(stored.request.current_approver(), Some(Role::Ceo));
      assert_eq!(
         stored.ledger.steps()[0].approver_name(),
         Some(UNKNOWN_USER_NAME)
      );
   }

   #[tokio::test]
   async fn test_存在しない申請への判断は404() {
      let ctx = TestContext::seeded();
      let approvable = ApprovableRef::new(RequestKind::Leave, RequestId::new());

      let result = ctx
         .decision_usecase()
         .decide(input(&approvable, Role::TeamLeader, Decision::Approved))
         .await;

      assert!(matches!(result, Err(CoreError::NotFound(_))));
   }

   #[tokio::test]
   async fn test_長すぎるコメントは400() {
      let ctx = TestContext::seeded();
      let created = ctx.create_leave(&ctx.users.it_employee).await;

      let result = ctx
         .decision_usecase()
         .decide(DecisionInput {
            comments: Some("あ".repeat(501)),
            ..input(&created.request.approvable(), Role::TeamLeader, Decision::Approved)
         })
         .await;

      assert!(matches!(result, Err(CoreError::BadRequest(_))));
   }
}
