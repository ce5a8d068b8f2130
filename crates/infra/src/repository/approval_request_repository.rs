//! ApprovalRequestRepository: 休暇申請・出張申請の永続化
//!
//! 申請は種別ごとに別テーブル（`leave_requests` / `mission_requests`）に保存する。
//! 読み取りは種別固有の列を NULL で埋めた共通の行形式（[`RequestRow`]）に揃え、
//! 両種別を同じコードパスで扱う。

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use requestflow_domain::{
   approval::PendingApprovalsQuery,
   request::{
      ApprovableRef,
      ApprovalRequest,
      ApprovalRequestRecord,
      DateRange,
      Destination,
      EstimatedBudget,
      LeaveDetails,
      LeaveReason,
      LeaveType,
      MissionDetails,
      MissionPurpose,
      RequestDetails,
      RequestId,
      RequestKind,
      RequestStatus,
      TransportationMode,
   },
   role::Role,
   user::UserId,
   value_objects::{DepartmentName, Version},
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

/// ApprovalRequestRepository トレイト
#[async_trait]
pub trait ApprovalRequestRepository: Send + Sync {
   async fn insert(&self, tx: &mut TxContext, request: &ApprovalRequest) -> Result<(), InfraError>;

   /// 楽観ロック付きで申請の状態（ステータス・承認者）を更新する
   ///
   /// DB 上のバージョンが `expected_version` と一致しない場合は `Conflict` を返す。
   async fn update_with_version_check(
      &self,
      tx: &mut TxContext,
      request: &ApprovalRequest,
      expected_version: Version,
   ) -> Result<(), InfraError>;

   /// 楽観ロック付きで申請内容（種別固有の列）を更新する
   ///
   /// ステータス・承認者の列には触れない。
   async fn update_details(
      &self,
      tx: &mut TxContext,
      request: &ApprovalRequest,
      expected_version: Version,
   ) -> Result<(), InfraError>;

   async fn find_by_ref(
      &self,
      approvable: &ApprovableRef,
   ) -> Result<Option<ApprovalRequest>, InfraError>;

   /// 行ロック（`FOR UPDATE`）を取得して申請を読み取る
   ///
   /// 同じ申請への判断はロックの取得順に直列化される。
   async fn find_for_update(
      &self,
      tx: &mut TxContext,
      approvable: &ApprovableRef,
   ) -> Result<Option<ApprovalRequest>, InfraError>;

   /// 種別の全申請を新しい順に取得する
   async fn find_all(&self, kind: RequestKind) -> Result<Vec<ApprovalRequest>, InfraError>;

   /// 申請者の申請を新しい順に取得する
   async fn find_by_requester(
      &self,
      kind: RequestKind,
      requester_id: &UserId,
   ) -> Result<Vec<ApprovalRequest>, InfraError>;

   /// 承認待ち一覧（古い順）
   ///
   /// 部署の絞り込みは申請者の現在の所属部署（`users.department`）で行う。
   async fn find_pending(
      &self,
      kind: RequestKind,
      query: &PendingApprovalsQuery,
   ) -> Result<Vec<ApprovalRequest>, InfraError>;

   /// 申請を削除する。削除した場合は `true`
   async fn delete(&self, tx: &mut TxContext, approvable: &ApprovableRef)
   -> Result<bool, InfraError>;
}

const LEAVE_SELECT: &str = r#"
   SELECT
      'leave'::text AS kind,
      id, requester_id, requester_department, start_date, end_date,
      leave_type, reason,
      NULL::varchar AS destination, NULL::text AS purpose, NULL::numeric AS estimated_budget,
      NULL::varchar AS transportation_mode, NULL::boolean AS accommodation_needed,
      status, current_approver, decided_at, version, created_at, updated_at
   FROM leave_requests
"#;

const MISSION_SELECT: &str = r#"
   SELECT
      'mission'::text AS kind,
      id, requester_id, requester_department, start_date, end_date,
      NULL::varchar AS leave_type, NULL::text AS reason,
      destination, purpose, estimated_budget,
      transportation_mode, accommodation_needed,
      status, current_approver, decided_at, version, created_at, updated_at
   FROM mission_requests
"#;

fn select_sql(kind: RequestKind) -> &'static str {
   match kind {
      RequestKind::Leave => LEAVE_SELECT,
      RequestKind::Mission => MISSION_SELECT,
   }
}

fn table_name(kind: RequestKind) -> &'static str {
   match kind {
      RequestKind::Leave => "leave_requests",
      RequestKind::Mission => "mission_requests",
   }
}

/// 休暇・出張共通の行形式
#[derive(sqlx::FromRow)]
struct RequestRow {
   kind:                 String,
   id:                   Uuid,
   requester_id:         Uuid,
   requester_department: String,
   start_date:           NaiveDate,
   end_date:             NaiveDate,
   leave_type:           Option<String>,
   reason:               Option<String>,
   destination:          Option<String>,
   purpose:              Option<String>,
   estimated_budget:     Option<Decimal>,
   transportation_mode:  Option<String>,
   accommodation_needed: Option<bool>,
   status:               String,
   current_approver:     Option<String>,
   decided_at:           Option<DateTime<Utc>>,
   version:              i32,
   created_at:           DateTime<Utc>,
   updated_at:           DateTime<Utc>,
}

fn required<T>(value: Option<T>, column: &str, id: Uuid) -> Result<T, InfraError> {
   value.ok_or_else(|| InfraError::unexpected(format!("申請 {id} の {column} が NULL です")))
}

impl TryFrom<RequestRow> for ApprovalRequest {
   type Error = InfraError;

   fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
      let period = DateRange::new(row.start_date, row.end_date)?;
      let details = match row.kind.parse::<RequestKind>()? {
         RequestKind::Leave => RequestDetails::Leave(LeaveDetails {
            leave_type: required(row.leave_type, "leave_type", row.id)?.parse::<LeaveType>()?,
            period,
            reason: LeaveReason::new(required(row.reason, "reason", row.id)?)?,
         }),
         RequestKind::Mission => RequestDetails::Mission(MissionDetails {
            destination: Destination::new(required(row.destination, "destination", row.id)?)?,
            purpose: MissionPurpose::new(required(row.purpose, "purpose", row.id)?)?,
            period,
            estimated_budget: EstimatedBudget::new(required(
               row.estimated_budget,
               "estimated_budget",
               row.id,
            )?)?,
            transportation_mode: required(row.transportation_mode, "transportation_mode", row.id)?
               .parse::<TransportationMode>()?,
            accommodation_needed: required(
               row.accommodation_needed,
               "accommodation_needed",
               row.id,
            )?,
         }),
      };

      let request = ApprovalRequest::from_db(ApprovalRequestRecord {
         id: RequestId::from_uuid(row.id),
         requester_id: UserId::from_uuid(row.requester_id),
         requester_department: DepartmentName::new(row.requester_department)?,
         details,
         status: row.status.parse::<RequestStatus>()?,
         current_approver: row
            .current_approver
            .as_deref()
            .map(str::parse::<Role>)
            .transpose()?,
         decided_at: row.decided_at,
         version: Version::try_from(row.version)?,
         created_at: row.created_at,
         updated_at: row.updated_at,
      })?;
      Ok(request)
   }
}

/// PostgreSQL 実装
pub struct PostgresApprovalRequestRepository {
   pool: PgPool,
}

impl PostgresApprovalRequestRepository {
   pub fn new(pool: PgPool) -> Self {
      Self { pool }
   }
}

#[async_trait]
impl ApprovalRequestRepository for PostgresApprovalRequestRepository {
   #[tracing::instrument(skip_all, level = "debug", fields(approvable = %request.approvable()))]
   async fn insert(&self, tx: &mut TxContext, request: &ApprovalRequest) -> Result<(), InfraError> {
      let status: &str = request.status().into();
      let current_approver = request.current_approver().map(|r| r.as_str());

      let query = match request.details() {
         RequestDetails::Leave(details) => sqlx::query(
            r#"
            INSERT INTO leave_requests (
               id, requester_id, requester_department, start_date, end_date,
               leave_type, reason,
               status, current_approver, decided_at, version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
         )
         .bind(request.id().as_uuid())
         .bind(request.requester_id().as_uuid())
         .bind(request.requester_department().as_str())
         .bind(details.period.start())
         .bind(details.period.end())
         .bind(details.leave_type.as_str())
         .bind(details.reason.as_str()),
         RequestDetails::Mission(details) => sqlx::query(
            r#"
            INSERT INTO mission_requests (
               id, requester_id, requester_department, start_date, end_date,
               destination, purpose, estimated_budget, transportation_mode, accommodation_needed,
               status, current_approver, decided_at, version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
         )
         .bind(request.id().as_uuid())
         .bind(request.requester_id().as_uuid())
         .bind(request.requester_department().as_str())
         .bind(details.period.start())
         .bind(details.period.end())
         .bind(details.destination.as_str())
         .bind(details.purpose.as_str())
         .bind(details.estimated_budget.amount())
         .bind(details.transportation_mode.as_str())
         .bind(details.accommodation_needed),
      };

      query
         .bind(status)
         .bind(current_approver)
         .bind(request.decided_at())
         .bind(request.version().as_i32())
         .bind(request.created_at())
         .bind(request.updated_at())
         .execute(tx.conn()?)
         .await?;

      Ok(())
   }

   #[tracing::instrument(
      skip_all,
      level = "debug",
      fields(approvable = %request.approvable(), %expected_version)
   )]
   async fn update_with_version_check(
      &self,
      tx: &mut TxContext,
      request: &ApprovalRequest,
      expected_version: Version,
   ) -> Result<(), InfraError> {
      let status: &str = request.status().into();
      let sql = format!(
         r#"
         UPDATE {} SET
            status = $1,
            current_approver = $2,
            decided_at = $3,
            version = $4,
            updated_at = $5
         WHERE id = $6 AND version = $7
         "#,
         table_name(request.kind())
      );

      let result = sqlx::query(&sql)
         .bind(status)
         .bind(request.current_approver().map(|r| r.as_str()))
         .bind(request.decided_at())
         .bind(request.version().as_i32())
         .bind(request.updated_at())
         .bind(request.id().as_uuid())
         .bind(expected_version.as_i32())
         .execute(tx.conn()?)
         .await?;

      if result.rows_affected() == 0 {
         return Err(InfraError::conflict(
            request.kind().entity_type(),
            request.id().to_string(),
         ));
      }

      Ok(())
   }

   #[tracing::instrument(
      skip_all,
      level = "debug",
      fields(approvable = %request.approvable(), %expected_version)
   )]
   async fn update_details(
      &self,
      tx: &mut TxContext,
      request: &ApprovalRequest,
      expected_version: Version,
   ) -> Result<(), InfraError> {
      let query = match request.details() {
         RequestDetails::Leave(details) => sqlx::query(
            r#"
            UPDATE leave_requests SET
               leave_type = $1,
               start_date = $2,
               end_date = $3,
               reason = $4,
               version = $5,
               updated_at = $6
            WHERE id = $7 AND version = $8
            "#,
         )
         .bind(details.leave_type.as_str())
         .bind(details.period.start())
         .bind(details.period.end())
         .bind(details.reason.as_str()),
         RequestDetails::Mission(details) => sqlx::query(
            r#"
            UPDATE mission_requests SET
               destination = $1,
               purpose = $2,
               start_date = $3,
               end_date = $4,
               estimated_budget = $5,
               transportation_mode = $6,
               accommodation_needed = $7,
               version = $8,
               updated_at = $9
            WHERE id = $10 AND version = $11
            "#,
         )
         .bind(details.destination.as_str())
         .bind(details.purpose.as_str())
         .bind(details.period.start())
         .bind(details.period.end())
         .bind(details.estimated_budget.amount())
         .bind(details.transportation_mode.as_str())
         .bind(details.accommodation_needed),
      };

      let result = query
         .bind(request.version().as_i32())
         .bind(request.updated_at())
         .bind(request.id().as_uuid())
         .bind(expected_version.as_i32())
         .execute(tx.conn()?)
         .await?;

      if result.rows_affected() == 0 {
         return Err(InfraError::conflict(
            request.kind().entity_type(),
            request.id().to_string(),
         ));
      }

      Ok(())
   }

   #[tracing::instrument(skip_all, level = "debug", fields(%approvable))]
   async fn find_by_ref(
      &self,
      approvable: &ApprovableRef,
   ) -> Result<Option<ApprovalRequest>, InfraError> {
      let sql = format!("{} WHERE id = $1", select_sql(approvable.kind()));
      let row = sqlx::query_as::<_, RequestRow>(&sql)
         .bind(approvable.id().as_uuid())
         .fetch_optional(&self.pool)
         .await?;

      row.map(ApprovalRequest::try_from).transpose()
   }

   #[tracing::instrument(skip_all, level = "debug", fields(%approvable))]
   async fn find_for_update(
      &self,
      tx: &mut TxContext,
      approvable: &ApprovableRef,
   ) -> Result<Option<ApprovalRequest>, InfraError> {
      let sql = format!("{} WHERE id = $1 FOR UPDATE", select_sql(approvable.kind()));
      let row = sqlx::query_as::<_, RequestRow>(&sql)
         .bind(approvable.id().as_uuid())
         .fetch_optional(tx.conn()?)
         .await?;

      row.map(ApprovalRequest::try_from).transpose()
   }

   #[tracing::instrument(skip_all, level = "debug", fields(%kind))]
   async fn find_all(&self, kind: RequestKind) -> Result<Vec<ApprovalRequest>, InfraError> {
      let sql = format!("{} ORDER BY created_at DESC, id DESC", select_sql(kind));
      let rows = sqlx::query_as::<_, RequestRow>(&sql)
         .fetch_all(&self.pool)
         .await?;

      rows.into_iter().map(ApprovalRequest::try_from).collect()
   }

   #[tracing::instrument(skip_all, level = "debug", fields(%kind, %requester_id))]
   async fn find_by_requester(
      &self,
      kind: RequestKind,
      requester_id: &UserId,
   ) -> Result<Vec<ApprovalRequest>, InfraError> {
      let sql = format!(
         "{} WHERE requester_id = $1 ORDER BY created_at DESC, id DESC",
         select_sql(kind)
      );
      let rows = sqlx::query_as::<_, RequestRow>(&sql)
         .bind(requester_id.as_uuid())
         .fetch_all(&self.pool)
         .await?;

      rows.into_iter().map(ApprovalRequest::try_from).collect()
   }

   #[tracing::instrument(skip_all, level = "debug", fields(%kind, role = %query.role()))]
   async fn find_pending(
      &self,
      kind: RequestKind,
      query: &PendingApprovalsQuery,
   ) -> Result<Vec<ApprovalRequest>, InfraError> {
      let sql = format!(
         r#"
         {}
         WHERE status = 'pending'
           AND current_approver = $1
           AND EXISTS (
              SELECT 1 FROM users u
              WHERE u.id = requester_id
                AND ($2::varchar IS NULL OR u.department = $2)
           )
         ORDER BY created_at, id
         "#,
         select_sql(kind)
      );
      let rows = sqlx::query_as::<_, RequestRow>(&sql)
         .bind(query.role().as_str())
         .bind(query.department_scope().map(DepartmentName::as_str))
         .fetch_all(&self.pool)
         .await?;

      rows.into_iter().map(ApprovalRequest::try_from).collect()
   }

   #[tracing::instrument(skip_all, level = "debug", fields(%approvable))]
   async fn delete(
      &self,
      tx: &mut TxContext,
      approvable: &ApprovableRef,
   ) -> Result<bool, InfraError> {
      let sql = format!("DELETE FROM {} WHERE id = $1", table_name(approvable.kind()));
      let result = sqlx::query(&sql)
         .bind(approvable.id().as_uuid())
         .execute(tx.conn()?)
         .await?;

      Ok(result.rows_affected() > 0)
   }
}
