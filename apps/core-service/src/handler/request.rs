//! # 申請 API ハンドラ
//!
//! 休暇・出張申請の作成・取得・一覧・変更・削除。`{kind}` は `leave` または `mission`。

use std::sync::Arc;

use axum::{
   Json,
   extract::{Path, Query, State},
   http::StatusCode,
   response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use requestflow_domain::{
   approval::{ApprovalLedger, ApprovalStep},
   request::{
      ApprovableRef,
      ApprovalRequest,
      DateRange,
      Destination,
      EstimatedBudget,
      LeaveDetails,
      LeaveReason,
      MissionDetails,
      MissionPurpose,
      RequestDetails,
      RequestId,
      RequestKind,
   },
   user::UserId,
};
use requestflow_shared::ApiResponse;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::parse_kind;
use crate::{
   error::CoreError,
   usecase::{
      ApprovalRequestUseCaseImpl,
      CreateRequestInput,
      RequestWithLedger,
      UpdateRequestInput,
   },
};

pub struct ApprovalRequestState {
   pub usecase: ApprovalRequestUseCaseImpl,
}

/// 休暇申請の作成・変更リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateLeaveRequest {
   /// 申請者のユーザー ID (内部 API 用)
   pub user_id:    Uuid,
   pub leave_type: String,
   pub start_date: NaiveDate,
   pub end_date:   NaiveDate,
   pub reason:     String,
}

/// 出張申請の作成・変更リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateMissionRequest {
   /// 申請者のユーザー ID (内部 API 用)
   pub user_id: Uuid,
   pub destination: String,
   pub purpose: String,
   pub start_date: NaiveDate,
   pub end_date: NaiveDate,
   pub estimated_budget: Decimal,
   pub transportation_mode: String,
   #[serde(default)]
   pub accommodation_needed: bool,
}

impl CreateLeaveRequest {
   fn into_input(self) -> Result<CreateRequestInput, CoreError> {
      Ok(CreateRequestInput {
         requester_id: UserId::from_uuid(self.user_id),
         details:      RequestDetails::Leave(LeaveDetails {
            leave_type: self.leave_type.parse()?,
            period:     DateRange::new(self.start_date, self.end_date)?,
            reason:     LeaveReason::new(self.reason)?,
         }),
      })
   }
}

impl CreateMissionRequest {
   fn into_input(self) -> Result<CreateRequestInput, CoreError> {
      Ok(CreateRequestInput {
         requester_id: UserId::from_uuid(self.user_id),
         details:      RequestDetails::Mission(MissionDetails {
            destination:          Destination::new(self.destination)?,
            purpose:              MissionPurpose::new(self.purpose)?,
            period:               DateRange::new(self.start_date, self.end_date)?,
            estimated_budget:     EstimatedBudget::new(self.estimated_budget)?,
            transportation_mode:  self.transportation_mode.parse()?,
            accommodation_needed: self.accommodation_needed,
         }),
      })
   }
}

/// 閲覧者・削除者を指定するクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct UserQuery {
   pub user_id: Uuid,
}

/// 承認ステップ DTO
#[derive(Debug, Serialize)]
pub struct ApprovalStepDto {
   pub id:            String,
   pub sequence:      i32,
   pub approver_role: String,
   pub status:        String,
   pub approver_name: Option<String>,
   pub comments:      Option<String>,
   pub updated_at:    String,
}

impl From<&ApprovalStep> for ApprovalStepDto {
   fn from(step: &ApprovalStep) -> Self {
      Self {
         id:            step.id().to_string(),
         sequence:      step.sequence().as_i32(),
         approver_role: step.approver_role().to_string(),
         status:        step.status().to_string(),
         approver_name: step.approver_name().map(str::to_string),
         comments:      step.comments().map(|c| c.as_str().to_string()),
         updated_at:    step.updated_at().to_rfc3339(),
      }
   }
}

/// 申請内容 DTO（種別ごとのフィールドを申請 DTO に展開する）
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RequestDetailsDto {
   Leave {
      leave_type: String,
      start_date: NaiveDate,
      end_date:   NaiveDate,
      reason:     String,
   },
   Mission {
      destination:          String,
      purpose:              String,
      start_date:           NaiveDate,
      end_date:             NaiveDate,
      estimated_budget:     Decimal,
      transportation_mode:  String,
      accommodation_needed: bool,
   },
}

impl From<&RequestDetails> for RequestDetailsDto {
   fn from(details: &RequestDetails) -> Self {
      match details {
         RequestDetails::Leave(d) => Self::Leave {
            leave_type: d.leave_type.to_string(),
            start_date: d.period.start(),
            end_date:   d.period.end(),
            reason:     d.reason.as_str().to_string(),
         },
         RequestDetails::Mission(d) => Self::Mission {
            destination:          d.destination.as_str().to_string(),
            purpose:              d.purpose.as_str().to_string(),
            start_date:           d.period.start(),
            end_date:             d.period.end(),
            estimated_budget:     d.estimated_budget.amount(),
            transportation_mode:  d.transportation_mode.to_string(),
            accommodation_needed: d.accommodation_needed,
         },
      }
   }
}

/// 申請 DTO
#[derive(Debug, Serialize)]
pub struct ApprovalRequestDto {
   pub id: String,
   pub kind: String,
   pub requester_id: String,
   pub requester_department: String,
   pub status: String,
   pub current_approver: Option<String>,
   #[serde(flatten)]
   pub details: RequestDetailsDto,
   pub decided_at: Option<String>,
   pub version: i32,
   pub created_at: String,
   pub updated_at: String,
   /// 詳細取得・判断結果でのみ返す
   #[serde(skip_serializing_if = "Option::is_none")]
   pub approval_steps: Option<Vec<ApprovalStepDto>>,
}

/// 一覧 API 用: 承認台帳なしの変換
impl From<&ApprovalRequest> for ApprovalRequestDto {
   fn from(request: &ApprovalRequest) -> Self {
      Self {
         id: request.id().to_string(),
         kind: request.kind().to_string(),
         requester_id: request.requester_id().to_string(),
         requester_department: request.requester_department().as_str().to_string(),
         status: request.status().to_string(),
         current_approver: request.current_approver().map(|r| r.to_string()),
         details: RequestDetailsDto::from(request.details()),
         decided_at: request.decided_at().map(|t| t.to_rfc3339()),
         version: request.version().as_i32(),
         created_at: request.created_at().to_rfc3339(),
         updated_at: request.updated_at().to_rfc3339(),
         approval_steps: None,
      }
   }
}

impl ApprovalRequestDto {
   /// 承認台帳（シーケンス順）付きで変換する
   pub fn with_ledger(request: &ApprovalRequest, ledger: &ApprovalLedger) -> Self {
      Self {
         approval_steps: Some(ledger.steps().iter().map(ApprovalStepDto::from).collect()),
         ..Self::from(request)
      }
   }
}

impl From<&RequestWithLedger> for ApprovalRequestDto {
   fn from(found: &RequestWithLedger) -> Self {
      Self::with_ledger(&found.request, &found.ledger)
   }
}

/// `{kind}` に応じてボディを休暇・出張のリクエストとして解釈する
fn parse_body(kind: RequestKind, body: serde_json::Value) -> Result<CreateRequestInput, CoreError> {
   match kind {
      RequestKind::Leave => serde_json::from_value::<CreateLeaveRequest>(body)
         .map_err(|e| CoreError::BadRequest(e.to_string()))?
         .into_input(),
      RequestKind::Mission => serde_json::from_value::<CreateMissionRequest>(body)
         .map_err(|e| CoreError::BadRequest(e.to_string()))?
         .into_input(),
   }
}

/// 申請を作成する
///
/// ## エンドポイント
/// POST /internal/requests/{kind}
///
/// ## 処理フロー
/// 1. `{kind}` に応じてボディを休暇・出張のリクエストとして解釈
/// 2. ユースケースを呼び出し
/// 3. 201 と承認台帳付きの申請を返す
pub async fn create_request(
   State(state): State<Arc<ApprovalRequestState>>,
   Path(kind): Path<String>,
   Json(body): Json<serde_json::Value>,
) -> Result<Response, CoreError> {
   let input = parse_body(parse_kind(&kind)?, body)?;

   let created = state.usecase.create_request(input).await?;

   let response = ApiResponse::new(ApprovalRequestDto::from(&created));
   Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// 申請一覧を取得する（新しい順）
///
/// ## エンドポイント
/// GET /internal/requests/{kind}?user_id={user_id}
pub async fn list_requests(
   State(state): State<Arc<ApprovalRequestState>>,
   Path(kind): Path<String>,
   Query(query): Query<UserQuery>,
) -> Result<Response, CoreError> {
   let kind = parse_kind(&kind)?;
   let viewer_id = UserId::from_uuid(query.user_id);

   let requests = state.usecase.list_requests(kind, &viewer_id).await?;

   let response = ApiResponse::new(
      requests
         .iter()
         .map(ApprovalRequestDto::from)
         .collect::<Vec<_>>(),
   );
   Ok((StatusCode::OK, Json(response)).into_response())
}

/// 申請を承認台帳付きで取得する
///
/// ## エンドポイント
/// GET /internal/requests/{kind}/{id}
pub async fn get_request(
   State(state): State<Arc<ApprovalRequestState>>,
   Path((kind, id)): Path<(String, Uuid)>,
) -> Result<Response, CoreError> {
   let approvable = ApprovableRef::new(parse_kind(&kind)?, RequestId::from_uuid(id));

   let found = state.usecase.get_request(&approvable).await?;

   let response = ApiResponse::new(ApprovalRequestDto::from(&found));
   Ok((StatusCode::OK, Json(response)).into_response())
}

/// 承認待ちの申請の内容を変更する（申請者本人のみ）
///
/// ## エンドポイント
/// PUT /internal/requests/{kind}/{id}
///
/// ボディは作成時と同じ形式。`user_id` は変更者として扱う。
pub async fn update_request(
   State(state): State<Arc<ApprovalRequestState>>,
   Path((kind, id)): Path<(String, Uuid)>,
   Json(body): Json<serde_json::Value>,
) -> Result<Response, CoreError> {
   let kind = parse_kind(&kind)?;
   let CreateRequestInput {
      requester_id,
      details,
   } = parse_body(kind, body)?;

   let updated = state
      .usecase
      .update_request(UpdateRequestInput {
         approvable: ApprovableRef::new(kind, RequestId::from_uuid(id)),
         user_id: requester_id,
         details,
      })
      .await?;

   let response = ApiResponse::new(ApprovalRequestDto::from(&updated));
   Ok((StatusCode::OK, Json(response)).into_response())
}

/// 申請を削除する（申請者本人のみ）
///
/// ## エンドポイント
/// DELETE /internal/requests/{kind}/{id}?user_id={user_id}
pub async fn delete_request(
   State(state): State<Arc<ApprovalRequestState>>,
   Path((kind, id)): Path<(String, Uuid)>,
   Query(query): Query<UserQuery>,
) -> Result<Response, CoreError> {
   let approvable = ApprovableRef::new(parse_kind(&kind)?, RequestId::from_uuid(id));
   let user_id = UserId::from_uuid(query.user_id);

   state.usecase.delete_request(&approvable, &user_id).await?;

   Ok(StatusCode::NO_CONTENT.into_response())
}
