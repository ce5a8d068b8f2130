//! # ルーター構築
//!
//! リポジトリ一式からユースケースとハンドラ状態を組み立て、axum の `Router` を返す。
//! `main` からは PostgreSQL 実装、テストからはモック実装を渡す。

use std::sync::Arc;

use axum::{
   Router,
   routing::{get, post, put},
};
use requestflow_domain::clock::Clock;
use requestflow_infra::{
   db::TransactionManager,
   repository::{
      ApprovalRequestRepository,
      ApprovalStepRepository,
      DepartmentRepository,
      UserRepository,
   },
};
use tower_http::trace::TraceLayer;

use crate::{
   handler::{
      ApprovalRequestState,
      ApprovalState,
      DepartmentState,
      create_request,
      decide,
      delete_request,
      get_request,
      health_check,
      list_departments,
      list_pending_approvals,
      list_requests,
      update_department_workflows,
      update_request,
   },
   usecase::{
      ApprovalRequestUseCaseImpl,
      DecisionUseCaseImpl,
      DepartmentUseCaseImpl,
      PendingApprovalUseCaseImpl,
      WorkflowTemplateRegistry,
   },
};

/// ルーターが依存するコンポーネント
#[derive(Clone)]
pub struct AppDeps {
   pub department_repo: Arc<dyn DepartmentRepository>,
   pub user_repo:       Arc<dyn UserRepository>,
   pub request_repo:    Arc<dyn ApprovalRequestRepository>,
   pub step_repo:       Arc<dyn ApprovalStepRepository>,
   pub clock:           Arc<dyn Clock>,
   pub tx_manager:      Arc<dyn TransactionManager>,
}

pub fn build_router(deps: AppDeps) -> Router {
   let request_state = Arc::new(ApprovalRequestState {
      usecase: ApprovalRequestUseCaseImpl::new(
         deps.request_repo.clone(),
         deps.step_repo.clone(),
         deps.user_repo.clone(),
         WorkflowTemplateRegistry::new(deps.department_repo.clone()),
         deps.clock.clone(),
         deps.tx_manager.clone(),
      ),
   });

   let approval_state = Arc::new(ApprovalState {
      decision: DecisionUseCaseImpl::new(
         deps.request_repo.clone(),
         deps.step_repo.clone(),
         deps.user_repo.clone(),
         deps.clock.clone(),
         deps.tx_manager.clone(),
      ),
      pending:  PendingApprovalUseCaseImpl::new(deps.request_repo.clone(), deps.user_repo.clone()),
   });

   let department_state = Arc::new(DepartmentState {
      usecase: DepartmentUseCaseImpl::new(deps.department_repo, deps.clock, deps.tx_manager),
   });

   Router::new()
      .route("/health", get(health_check))
      // 申請 API
      .route(
         "/internal/requests/{kind}",
         get(list_requests).post(create_request),
      )
      .route(
         "/internal/requests/{kind}/{id}",
         get(get_request).put(update_request).delete(delete_request),
      )
      .with_state(request_state)
      // 承認 API
      .route("/internal/requests/{kind}/{id}/decision", post(decide))
      .route("/internal/pending-approvals", get(list_pending_approvals))
      .with_state(approval_state)
      // 部署 API
      .route("/internal/departments", get(list_departments))
      .route(
         "/internal/departments/{name}/workflows",
         put(update_department_workflows),
      )
      .with_state(department_state)
      .layer(TraceLayer::new_for_http())
}
