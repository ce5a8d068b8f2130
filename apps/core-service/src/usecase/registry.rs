//! # ワークフローテンプレートレジストリ
//!
//! 部署名と申請種別から承認チェーンを解決する。部署設定はリポジトリ経由で注入され、
//! 解決ルール自体はドメイン層の [`ApprovalChain::resolve`] に従う。

use std::sync::Arc;

use requestflow_domain::{
   approval::{ApprovalChain, ChainSource},
   request::RequestKind,
   value_objects::DepartmentName,
};
use requestflow_infra::repository::DepartmentRepository;
use requestflow_shared::event_log::error as log_error;

use crate::error::CoreError;

/// 部署ごとの承認チェーンの解決
///
/// テンプレートに未知のロール名が 1 つでも含まれると、テンプレート全体を不正として
/// 既定チェーン（休暇: team_leader → hr_manager、出張: team_leader → department_admin）に
/// 切り替える。ロール名の綴り誤り（`"teamleader"` など）でも承認経路が変わるため、
/// 運用者は `error.kind = "workflow_template"` の警告ログで検知する。
/// 部署テンプレートの更新 API は未知のロールを 400 で拒否するので、
/// この経路に入るのは DB を直接書き換えた場合に限られる。
pub struct WorkflowTemplateRegistry {
   department_repo: Arc<dyn DepartmentRepository>,
}

impl WorkflowTemplateRegistry {
   pub fn new(department_repo: Arc<dyn DepartmentRepository>) -> Self {
      Self { department_repo }
   }

   /// 承認チェーンを解決する
   ///
   /// 部署が存在しない、またはテンプレートが不正な場合は既定チェーンを返し、
   /// テンプレート不正のときは運用者向けに警告を出す。
   #[tracing::instrument(skip_all, fields(%department, %kind))]
   pub async fn resolve_chain(
      &self,
      department: &DepartmentName,
      kind: RequestKind,
   ) -> Result<ApprovalChain, CoreError> {
      let found = self.department_repo.find_by_name(department).await?;
      let resolution = ApprovalChain::resolve(found.as_ref(), kind);

      match resolution.source {
         ChainSource::Configured => {
            tracing::debug!(chain = ?resolution.chain.to_vec(), "部署テンプレートを使用");
         }
         ChainSource::UnknownDepartment => {
            tracing::info!(chain = ?resolution.chain.to_vec(), "未登録の部署のため既定チェーンを使用");
         }
         ChainSource::InvalidTemplate => {
            tracing::warn!(
               error.category = log_error::category::CONFIGURATION,
               error.kind = log_error::kind::WORKFLOW_TEMPLATE,
               chain = ?resolution.chain.to_vec(),
               "部署テンプレートが不正なため既定チェーンを使用"
            );
         }
      }

      Ok(resolution.chain)
   }
}
