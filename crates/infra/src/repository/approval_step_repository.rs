//! ApprovalStepRepository: 承認台帳の永続化
//!
//! 台帳は休暇・出張で共通の 1 テーブルに保存し、
//! `(approvable_type, approvable_id)` で申請を指す。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use requestflow_domain::{
   approval::{
      ApprovalLedger,
      ApprovalStep,
      ApprovalStepId,
      ApprovalStepRecord,
      StepSequence,
      StepStatus,
   },
   request::{ApprovableRef, RequestId, RequestKind},
   role::Role,
   value_objects::DecisionComment,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

/// ApprovalStepRepository トレイト
#[async_trait]
pub trait ApprovalStepRepository: Send + Sync {
   /// 台帳の全ステップを一括で作成する
   async fn insert_ledger(&self, tx: &mut TxContext, ledger: &ApprovalLedger)
   -> Result<(), InfraError>;

   /// 判断を記録する
   ///
   /// DB 上で未判断のステップにのみ書き込む。既に判断済みなら `Conflict` を返す。
   async fn record_decision(&self, tx: &mut TxContext, step: &ApprovalStep)
   -> Result<(), InfraError>;

   /// 申請の台帳を `sequence` 順で取得する
   async fn find_ledger(&self, approvable: &ApprovableRef) -> Result<ApprovalLedger, InfraError>;

   /// 申請の台帳を削除し、削除したステップ数を返す
   async fn delete_ledger(
      &self,
      tx: &mut TxContext,
      approvable: &ApprovableRef,
   ) -> Result<u64, InfraError>;
}

#[derive(sqlx::FromRow)]
struct ApprovalStepRow {
   id:              Uuid,
   approvable_type: String,
   approvable_id:   Uuid,
   sequence:        i32,
   approver_role:   String,
   status:          String,
   approver_name:   Option<String>,
   comments:        Option<String>,
   created_at:      DateTime<Utc>,
   updated_at:      DateTime<Utc>,
}

impl TryFrom<ApprovalStepRow> for ApprovalStep {
   type Error = InfraError;

   fn try_from(row: ApprovalStepRow) -> Result<Self, Self::Error> {
      Ok(ApprovalStep::from_db(ApprovalStepRecord {
         id:            ApprovalStepId::from_uuid(row.id),
         approvable:    ApprovableRef::new(
            row.approvable_type.parse::<RequestKind>()?,
            RequestId::from_uuid(row.approvable_id),
         ),
         sequence:      StepSequence::new(row.sequence)?,
         approver_role: row.approver_role.parse::<Role>()?,
         status:        row.status.parse::<StepStatus>()?,
         approver_name: row.approver_name,
         comments:      DecisionComment::optional(row.comments)?,
         created_at:    row.created_at,
         updated_at:    row.updated_at,
      }))
   }
}

/// PostgreSQL 実装
pub struct PostgresApprovalStepRepository {
   pool: PgPool,
}

impl PostgresApprovalStepRepository {
   pub fn new(pool: PgPool) -> Self {
      Self { pool }
   }
}

#[async_trait]
impl ApprovalStepRepository for PostgresApprovalStepRepository {
   #[tracing::instrument(
      skip_all,
      level = "debug",
      fields(approvable = %ledger.approvable(), steps = ledger.len())
   )]
   async fn insert_ledger(
      &self,
      tx: &mut TxContext,
      ledger: &ApprovalLedger,
   ) -> Result<(), InfraError> {
      if ledger.is_empty() {
         return Err(InfraError::unexpected(format!(
            "申請 {} の台帳にステップがありません",
            ledger.approvable()
         )));
      }

      let mut builder = QueryBuilder::<Postgres>::new(
         "INSERT INTO approval_steps (id, approvable_type, approvable_id, sequence, approver_role, \
          status, approver_name, comments, created_at, updated_at) ",
      );
      builder.push_values(ledger.steps(), |mut row, step| {
         let status: &'static str = step.status().into();
         row.push_bind(*step.id().as_uuid())
            .push_bind(step.approvable().kind().as_str())
            .push_bind(*step.approvable().id().as_uuid())
            .push_bind(step.sequence().as_i32())
            .push_bind(step.approver_role().as_str())
            .push_bind(status)
            .push_bind(step.approver_name().map(str::to_owned))
            .push_bind(step.comments().map(|c| c.as_str().to_owned()))
            .push_bind(step.created_at())
            .push_bind(step.updated_at());
      });
      builder.build().execute(tx.conn()?).await?;

      Ok(())
   }

   #[tracing::instrument(
      skip_all,
      level = "debug",
      fields(step_id = %step.id(), sequence = %step.sequence(), status = %step.status())
   )]
   async fn record_decision(
      &self,
      tx: &mut TxContext,
      step: &ApprovalStep,
   ) -> Result<(), InfraError> {
      let status: &str = step.status().into();
      let result = sqlx::query(
         r#"
         UPDATE approval_steps SET
            status = $1,
            approver_name = $2,
            comments = $3,
            updated_at = $4
         WHERE id = $5 AND status = 'pending'
         "#,
      )
      .bind(status)
      .bind(step.approver_name())
      .bind(step.comments().map(DecisionComment::as_str))
      .bind(step.updated_at())
      .bind(step.id().as_uuid())
      .execute(tx.conn()?)
      .await?;

      if result.rows_affected() == 0 {
         return Err(InfraError::conflict("ApprovalStep", step.id().to_string()));
      }

      Ok(())
   }

   #[tracing::instrument(skip_all, level = "debug", fields(%approvable))]
   async fn find_ledger(&self, approvable: &ApprovableRef) -> Result<ApprovalLedger, InfraError> {
      let rows = sqlx::query_as::<_, ApprovalStepRow>(
         r#"
         SELECT
            id, approvable_type, approvable_id, sequence, approver_role,
            status, approver_name, comments, created_at, updated_at
         FROM approval_steps
         WHERE approvable_type = $1 AND approvable_id = $2
         ORDER BY sequence
         "#,
      )
      .bind(approvable.kind().as_str())
      .bind(approvable.id().as_uuid())
      .fetch_all(&self.pool)
      .await?;

      let steps = rows
         .into_iter()
         .map(ApprovalStep::try_from)
         .collect::<Result<Vec<_>, _>>()?;
      Ok(ApprovalLedger::from_steps(approvable.clone(), steps)?)
   }

   #[tracing::instrument(skip_all, level = "debug", fields(%approvable))]
   async fn delete_ledger(
      &self,
      tx: &mut TxContext,
      approvable: &ApprovableRef,
   ) -> Result<u64, InfraError> {
      let result = sqlx::query(
         "DELETE FROM approval_steps WHERE approvable_type = $1 AND approvable_id = $2",
      )
      .bind(approvable.kind().as_str())
      .bind(approvable.id().as_uuid())
      .execute(tx.conn()?)
      .await?;

      Ok(result.rows_affected())
   }
}
