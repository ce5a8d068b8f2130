//! # 承認 API ハンドラ
//!
//! 承認・却下の判断と、ロールごとの承認待ち一覧。

use std::sync::Arc;

use axum::{
   Json,
   extract::{Path, Query, State},
   http::StatusCode,
   response::{IntoResponse, Response},
};
use requestflow_domain::{
   approval::{DecisionOutcome, PendingApprovalsQuery},
   request::{ApprovableRef, RequestId},
   role::Role,
   value_objects::DepartmentName,
};
use requestflow_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ApprovalRequestDto, parse_kind};
use crate::{
   error::CoreError,
   usecase::{
      DecisionInput,
      DecisionUseCaseImpl,
      PendingApprovalItem,
      PendingApprovalUseCaseImpl,
   },
};

pub struct ApprovalState {
   pub decision: DecisionUseCaseImpl,
   pub pending:  PendingApprovalUseCaseImpl,
}

/// 承認・却下リクエスト
#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
   /// 操作者のロール（認証済みの呼び出し元から渡される）
   pub approver_role: String,
   /// `approved` または `rejected`
   pub decision:      String,
   pub comments:      Option<String>,
}

/// 承認待ち一覧のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct PendingApprovalsParams {
   pub role:       String,
   /// チームリーダーのみ適用される部署フィルタ
   pub department: Option<String>,
}

/// 判断結果 DTO
#[derive(Debug, Serialize)]
pub struct DecisionResultDto {
   /// `advanced` / `approved` / `rejected`
   pub outcome:       &'static str,
   pub next_approver: Option<String>,
   pub request:       ApprovalRequestDto,
}

/// 承認待ち DTO（申請に申請者名を添える）
#[derive(Debug, Serialize)]
pub struct PendingApprovalDto {
   #[serde(flatten)]
   pub request:        ApprovalRequestDto,
   pub requester_name: String,
}

impl From<&PendingApprovalItem> for PendingApprovalDto {
   fn from(item: &PendingApprovalItem) -> Self {
      Self {
         request:        ApprovalRequestDto::from(&item.request),
         requester_name: item.requester_name.clone(),
      }
   }
}

#[derive(Debug, Serialize)]
pub struct PendingApprovalsDto {
   pub leave:   Vec<PendingApprovalDto>,
   pub mission: Vec<PendingApprovalDto>,
}

/// 承認または却下する
///
/// ## エンドポイント
/// POST /internal/requests/{kind}/{id}/decision
///
/// 現在の承認者でない、判断できるステップがない、先に別の判断が確定した場合は
/// いずれも 400（"Unable to process approval"）を返す。
pub async fn decide(
   State(state): State<Arc<ApprovalState>>,
   Path((kind, id)): Path<(String, Uuid)>,
   Json(req): Json<DecisionRequest>,
) -> Result<Response, CoreError> {
   let input = DecisionInput {
      approvable:  ApprovableRef::new(parse_kind(&kind)?, RequestId::from_uuid(id)),
      acting_role: req.approver_role.parse()?,
      decision:    req.decision.parse()?,
      comments:    req.comments,
   };

   let result = state.decision.decide(input).await?;

   let (outcome, next_approver) = match result.outcome {
      DecisionOutcome::Advanced { next_approver } => ("advanced", Some(next_approver.to_string())),
      DecisionOutcome::Approved => ("approved", None),
      DecisionOutcome::Rejected => ("rejected", None),
   };
   let response = ApiResponse::new(DecisionResultDto {
      outcome,
      next_approver,
      request: ApprovalRequestDto::with_ledger(&result.request, &result.ledger),
   });
   Ok((StatusCode::OK, Json(response)).into_response())
}

/// ロールが判断すべき承認待ち一覧を取得する
///
/// ## エンドポイント
/// GET /internal/pending-approvals?role={role}&department={department}
pub async fn list_pending_approvals(
   State(state): State<Arc<ApprovalState>>,
   Query(params): Query<PendingApprovalsParams>,
) -> Result<Response, CoreError> {
   let role: Role = params.role.parse()?;
   let department = params
      .department
      .filter(|d| !d.trim().is_empty())
      .map(DepartmentName::new)
      .transpose()?;

   let pending = state
      .pending
      .list_pending(&PendingApprovalsQuery::new(role, department))
      .await?;

   let response = ApiResponse::new(PendingApprovalsDto {
      leave:   pending.leave.iter().map(PendingApprovalDto::from).collect(),
      mission: pending.mission.iter().map(PendingApprovalDto::from).collect(),
   });
   Ok((StatusCode::OK, Json(response)).into_response())
}
