//! # 部署 API ハンドラ
//!
//! 部署一覧と、部署ごとのワークフローテンプレートの更新。

use std::sync::Arc;

use axum::{
   Json,
   extract::{Path, State},
   http::StatusCode,
   response::{IntoResponse, Response},
};
use requestflow_domain::{department::Department, value_objects::DepartmentName};
use requestflow_shared::ApiResponse;
use serde::{Deserialize, Serialize};

use crate::{
   error::CoreError,
   usecase::{DepartmentUseCaseImpl, UpdateWorkflowsInput},
};

pub struct DepartmentState {
   pub usecase: DepartmentUseCaseImpl,
}

/// テンプレート更新リクエスト
///
/// 各値はロール名の配列。空配列は既定チェーンを使う。
#[derive(Debug, Deserialize)]
pub struct UpdateWorkflowsRequest {
   pub leave_workflow:   serde_json::Value,
   pub mission_workflow: serde_json::Value,
}

/// 部署 DTO
#[derive(Debug, Serialize)]
pub struct DepartmentDto {
   pub id:               String,
   pub name:             String,
   pub leave_workflow:   serde_json::Value,
   pub mission_workflow: serde_json::Value,
   pub updated_at:       String,
}

impl From<&Department> for DepartmentDto {
   fn from(department: &Department) -> Self {
      Self {
         id:               department.id().to_string(),
         name:             department.name().as_str().to_string(),
         leave_workflow:   department.leave_workflow().clone(),
         mission_workflow: department.mission_workflow().clone(),
         updated_at:       department.updated_at().to_rfc3339(),
      }
   }
}

/// 部署一覧を取得する
///
/// ## エンドポイント
/// GET /internal/departments
pub async fn list_departments(
   State(state): State<Arc<DepartmentState>>,
) -> Result<Response, CoreError> {
   let departments = state.usecase.list_departments().await?;

   let response = ApiResponse::new(
      departments
         .iter()
         .map(DepartmentDto::from)
         .collect::<Vec<_>>(),
   );
   Ok((StatusCode::OK, Json(response)).into_response())
}

/// 部署のワークフローテンプレートを更新する
///
/// ## エンドポイント
/// PUT /internal/departments/{name}/workflows
pub async fn update_department_workflows(
   State(state): State<Arc<DepartmentState>>,
   Path(name): Path<String>,
   Json(req): Json<UpdateWorkflowsRequest>,
) -> Result<Response, CoreError> {
   let input = UpdateWorkflowsInput {
      name:             DepartmentName::new(name)?,
      leave_workflow:   req.leave_workflow,
      mission_workflow: req.mission_workflow,
   };

   let department = state.usecase.update_workflows(input).await?;

   let response = ApiResponse::new(DepartmentDto::from(&department));
   Ok((StatusCode::OK, Json(response)).into_response())
}
