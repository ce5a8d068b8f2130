//! # 部署ユースケース
//!
//! 部署一覧と、部署ごとのワークフローテンプレートの更新（管理者による設定入力）。

use std::sync::Arc;

use requestflow_domain::{
   approval::ApprovalChain,
   clock::Clock,
   department::{Department, DepartmentId, NewDepartment},
   request::RequestKind,
   value_objects::DepartmentName,
};
use requestflow_infra::{db::TransactionManager, repository::DepartmentRepository};
use requestflow_shared::{event_log::event, log_business_event};
use serde_json::Value as JsonValue;

use crate::error::CoreError;

/// テンプレート更新の入力
#[derive(Debug, Clone)]
pub struct UpdateWorkflowsInput {
   pub name:             DepartmentName,
   pub leave_workflow:   JsonValue,
   pub mission_workflow: JsonValue,
}

pub struct DepartmentUseCaseImpl {
   department_repo: Arc<dyn DepartmentRepository>,
   clock:           Arc<dyn Clock>,
   tx_manager:      Arc<dyn TransactionManager>,
}

impl DepartmentUseCaseImpl {
   pub fn new(
      department_repo: Arc<dyn DepartmentRepository>,
      clock: Arc<dyn Clock>,
      tx_manager: Arc<dyn TransactionManager>,
   ) -> Self {
      Self {
         department_repo,
         clock,
         tx_manager,
      }
   }

   /// 部署一覧（名前順）
   pub async fn list_departments(&self) -> Result<Vec<Department>, CoreError> {
      Ok(self.department_repo.find_all().await?)
   }

   /// 部署のテンプレートを差し替える。部署がなければ作成する
   ///
   /// 空配列は「既定チェーンを使う」として受け付ける。
   /// それ以外はロール名の非空配列でなければならない。
   #[tracing::instrument(skip_all, fields(department = %input.name))]
   pub async fn update_workflows(
      &self,
      input: UpdateWorkflowsInput,
   ) -> Result<Department, CoreError> {
      validate_template(RequestKind::Leave, &input.leave_workflow)?;
      validate_template(RequestKind::Mission, &input.mission_workflow)?;

      let now = self.clock.now();
      let department = match self.department_repo.find_by_name(&input.name).await? {
         Some(existing) => {
            existing.with_workflows(input.leave_workflow, input.mission_workflow, now)
         }
         None => Department::new(NewDepartment {
            id: DepartmentId::new(),
            name: input.name,
            leave_workflow: input.leave_workflow,
            mission_workflow: input.mission_workflow,
            now,
         }),
      };

      let mut tx = self.tx_manager.begin().await?;
      self.department_repo.upsert(&mut tx, &department).await?;
      tx.commit().await?;

      log_business_event!(
         event.category = event::category::DEPARTMENT,
         event.action = event::action::WORKFLOWS_UPDATED,
         event.entity_type = event::entity_type::DEPARTMENT,
         event.entity_id = %department.name(),
         event.result = event::result::SUCCESS,
         leave_workflow = %department.leave_workflow(),
         mission_workflow = %department.mission_workflow(),
         "ワークフローテンプレートを更新"
      );

      Ok(department)
   }
}

fn validate_template(kind: RequestKind, template: &JsonValue) -> Result<(), CoreError> {
   let is_empty_list = template.as_array().is_some_and(Vec::is_empty);
   if is_empty_list || ApprovalChain::from_template(template).is_some() {
      return Ok(());
   }
   Err(CoreError::BadRequest(format!(
      "{kind} のワークフローはロール名の配列で指定してください: {template}"
   )))
}
