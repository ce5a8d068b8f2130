//! # 申請ユースケース
//!
//! 休暇・出張申請の作成・取得・一覧・変更・削除。承認判断は [`super::decision`] が扱う。

use std::sync::Arc;

use requestflow_domain::{
   approval::{ApprovalLedger, initialize, verify_consistency},
   clock::Clock,
   request::{ApprovableRef, ApprovalRequest, NewApprovalRequest, RequestDetails, RequestId, RequestKind},
   user::UserId,
};
use requestflow_infra::{
   db::TransactionManager,
   repository::{ApprovalRequestRepository, ApprovalStepRepository, UserRepository},
};
use requestflow_shared::{
   event_log::{error as log_error, event},
   log_business_event,
};

use super::{WorkflowTemplateRegistry, event_entity_type, helpers::FindResultExt};
use crate::error::CoreError;

/// 申請作成入力
#[derive(Debug, Clone)]
pub struct CreateRequestInput {
   pub requester_id: UserId,
   pub details:      RequestDetails,
}

/// 申請内容の変更入力
#[derive(Debug, Clone)]
pub struct UpdateRequestInput {
   pub approvable: ApprovableRef,
   pub user_id:    UserId,
   pub details:    RequestDetails,
}

/// 申請と承認台帳の組
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestWithLedger {
   pub request: ApprovalRequest,
   pub ledger:  ApprovalLedger,
}

pub struct ApprovalRequestUseCaseImpl {
   request_repo: Arc<dyn ApprovalRequestRepository>,
   step_repo:    Arc<dyn ApprovalStepRepository>,
   user_repo:    Arc<dyn UserRepository>,
   registry:     WorkflowTemplateRegistry,
   clock:        Arc<dyn Clock>,
   tx_manager:   Arc<dyn TransactionManager>,
}

impl ApprovalRequestUseCaseImpl {
   pub fn new(
      request_repo: Arc<dyn ApprovalRequestRepository>,
      step_repo: Arc<dyn ApprovalStepRepository>,
      user_repo: Arc<dyn UserRepository>,
      registry: WorkflowTemplateRegistry,
      clock: Arc<dyn Clock>,
      tx_manager: Arc<dyn TransactionManager>,
   ) -> Self {
      Self {
         request_repo,
         step_repo,
         user_repo,
         registry,
         clock,
         tx_manager,
      }
   }

   /// 申請を作成し、承認待ちにする
   ///
   /// 1. 申請者を取得し、所属部署を確定する
   /// 2. 申請期間を検証する（開始日は今日より後）
   /// 3. 部署と種別から承認チェーンを解決する
   /// 4. 申請と承認台帳を 1 トランザクションで保存する
   #[tracing::instrument(skip_all, fields(requester_id = %input.requester_id, kind = %input.details.kind()))]
   pub async fn create_request(
      &self,
      input: CreateRequestInput,
   ) -> Result<RequestWithLedger, CoreError> {
      let requester = self
         .user_repo
         .find_by_id(&input.requester_id)
         .await
         .or_not_found("申請者")?;

      input.details.period().ensure_starts_after(self.clock.today())?;

      let kind = input.details.kind();
      let chain = self
         .registry
         .resolve_chain(requester.department(), kind)
         .await?;

      let initialized = initialize(
         NewApprovalRequest {
            id: RequestId::new(),
            requester_id: requester.id().clone(),
            requester_department: requester.department().clone(),
            details: input.details,
            now: self.clock.now(),
         },
         &chain,
      );

      let mut tx = self.tx_manager.begin().await?;
      self.request_repo.insert(&mut tx, &initialized.request).await?;
      self.step_repo
         .insert_ledger(&mut tx, &initialized.ledger)
         .await?;
      tx.commit().await?;

      log_business_event!(
         event.category = event::category::APPROVAL,
         event.action = event::action::REQUEST_CREATED,
         event.entity_type = event_entity_type(kind),
         event.entity_id = %initialized.request.id(),
         event.actor_id = %requester.id(),
         event.result = event::result::SUCCESS,
         current_approver = %chain.first(),
         steps = chain.len(),
         "申請を作成"
      );

      Ok(RequestWithLedger {
         request: initialized.request,
         ledger:  initialized.ledger,
      })
   }

   /// 申請と承認台帳を取得する
   ///
   /// 保存されている申請と台帳が食い違っている場合は内部エラーとする。
   pub async fn get_request(
      &self,
      approvable: &ApprovableRef,
   ) -> Result<RequestWithLedger, CoreError> {
      let request = self
         .request_repo
         .find_by_ref(approvable)
         .await
         .or_not_found("申請")?;
      let ledger = self.step_repo.find_ledger(approvable).await?;

      if let Err(e) = verify_consistency(&request, &ledger) {
         tracing::error!(
            error.category = log_error::category::INFRASTRUCTURE,
            error.kind = log_error::kind::LEDGER_INCONSISTENCY,
            %approvable,
            "申請と承認台帳が整合していません: {}",
            e
         );
         return Err(CoreError::Internal(format!(
            "申請 {approvable} の承認台帳が不整合です"
         )));
      }

      Ok(RequestWithLedger { request, ledger })
   }

   /// 閲覧者に見える申請の一覧（新しい順）
   ///
   /// 全件閲覧できるロール以外は自分の申請のみ。
   pub async fn list_requests(
      &self,
      kind: RequestKind,
      viewer_id: &UserId,
   ) -> Result<Vec<ApprovalRequest>, CoreError> {
      let viewer = self
         .user_repo
         .find_by_id(viewer_id)
         .await
         .or_not_found("ユーザー")?;

      let requests = if viewer.role().can_view_all(kind) {
         self.request_repo.find_all(kind).await?
      } else {
         self.request_repo
            .find_by_requester(kind, viewer.id())
            .await?
      };

      Ok(requests)
   }

   /// 承認待ちの申請の内容を変更する（申請者本人のみ）
   ///
   /// 変更するのは申請内容だけで、承認台帳・現在の承認者・申請時の部署はそのまま。
   /// 本人以外、または承認待ちでない申請は 403。期間は作成時と同じく検証する。
   #[tracing::instrument(skip_all, fields(approvable = %input.approvable, user_id = %input.user_id))]
   pub async fn update_request(
      &self,
      input: UpdateRequestInput,
   ) -> Result<RequestWithLedger, CoreError> {
      let mut tx = self.tx_manager.begin().await?;

      let request = self
         .request_repo
         .find_for_update(&mut tx, &input.approvable)
         .await
         .or_not_found("申請")?;

      if !request.is_owned_by(&input.user_id) {
         return Err(CoreError::Forbidden(
            "申請者以外は申請を変更できません".to_string(),
         ));
      }
      if request.is_terminal() {
         return Err(CoreError::Forbidden(format!(
            "承認待ちでない申請は変更できません（現在: {}）",
            request.status()
         )));
      }

      input.details.period().ensure_starts_after(self.clock.today())?;

      let expected_version = request.version();
      let revised = request.revised(input.details, self.clock.now())?;
      self.request_repo
         .update_details(&mut tx, &revised, expected_version)
         .await
         .map_err(|e| {
            if e.is_conflict() {
               CoreError::Conflict(format!("申請 {} は他の操作で更新されました", input.approvable))
            } else {
               CoreError::Database(e)
            }
         })?;
      tx.commit().await?;

      let ledger = self.step_repo.find_ledger(&input.approvable).await?;

      log_business_event!(
         event.category = event::category::APPROVAL,
         event.action = event::action::REQUEST_UPDATED,
         event.entity_type = event_entity_type(input.approvable.kind()),
         event.entity_id = %input.approvable.id(),
         event.actor_id = %input.user_id,
         event.result = event::result::SUCCESS,
         "申請内容を変更"
      );

      Ok(RequestWithLedger {
         request: revised,
         ledger,
      })
   }

   /// 申請を削除する（申請者本人のみ）
   ///
   /// 承認台帳も同じトランザクションで削除する。
   #[tracing::instrument(skip_all, fields(%approvable, %user_id))]
   pub async fn delete_request(
      &self,
      approvable: &ApprovableRef,
      user_id: &UserId,
   ) -> Result<(), CoreError> {
      let request = self
         .request_repo
         .find_by_ref(approvable)
         .await
         .or_not_found("申請")?;

      if !request.is_owned_by(user_id) {
         return Err(CoreError::Forbidden(
            "申請者以外は申請を削除できません".to_string(),
         ));
      }

      let mut tx = self.tx_manager.begin().await?;
      let removed_steps = self.step_repo.delete_ledger(&mut tx, approvable).await?;
      let deleted = self.request_repo.delete(&mut tx, approvable).await?;
      if !deleted {
         return Err(CoreError::NotFound("申請が見つかりません".to_string()));
      }
      tx.commit().await?;

      log_business_event!(
         event.category = event::category::APPROVAL,
         event.action = event::action::REQUEST_DELETED,
         event.entity_type = event_entity_type(approvable.kind()),
         event.entity_id = %approvable.id(),
         event.actor_id = %user_id,
         event.result = event::result::SUCCESS,
         removed_steps,
         "申請を削除"
      );

      Ok(())
   }
}
