//! DepartmentRepository: 部署とワークフローテンプレートの永続化
//!
//! テンプレートは JSONB のまま読み書きし、解釈はドメイン層に任せる。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use requestflow_domain::{
   department::{Department, DepartmentId, DepartmentRecord},
   value_objects::DepartmentName,
};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

/// DepartmentRepository トレイト
#[async_trait]
pub trait DepartmentRepository: Send + Sync {
   /// 部署名で検索する
   async fn find_by_name(&self, name: &DepartmentName) -> Result<Option<Department>, InfraError>;

   /// 全部署を名前順で取得する
   async fn find_all(&self) -> Result<Vec<Department>, InfraError>;

   /// 部署を作成、または同名の部署のテンプレートを更新する
   async fn upsert(&self, tx: &mut TxContext, department: &Department) -> Result<(), InfraError>;
}

#[derive(sqlx::FromRow)]
struct DepartmentRow {
   id:               Uuid,
   name:             String,
   leave_workflow:   JsonValue,
   mission_workflow: JsonValue,
   created_at:       DateTime<Utc>,
   updated_at:       DateTime<Utc>,
}

impl TryFrom<DepartmentRow> for Department {
   type Error = InfraError;

   fn try_from(row: DepartmentRow) -> Result<Self, Self::Error> {
      Ok(Department::from_db(DepartmentRecord {
         id:               DepartmentId::from_uuid(row.id),
         name:             DepartmentName::new(row.name)?,
         leave_workflow:   row.leave_workflow,
         mission_workflow: row.mission_workflow,
         created_at:       row.created_at,
         updated_at:       row.updated_at,
      }))
   }
}

/// PostgreSQL 実装
pub struct PostgresDepartmentRepository {
   pool: PgPool,
}

impl PostgresDepartmentRepository {
   pub fn new(pool: PgPool) -> Self {
      Self { pool }
   }
}

#[async_trait]
impl DepartmentRepository for PostgresDepartmentRepository {
   #[tracing::instrument(skip_all, level = "debug", fields(%name))]
   async fn find_by_name(&self, name: &DepartmentName) -> Result<Option<Department>, InfraError> {
      let row = sqlx::query_as::<_, DepartmentRow>(
         r#"
         SELECT id, name, leave_workflow, mission_workflow, created_at, updated_at
         FROM departments
         WHERE name = $1
         "#,
      )
      .bind(name.as_str())
      .fetch_optional(&self.pool)
      .await?;

      row.map(Department::try_from).transpose()
   }

   #[tracing::instrument(skip_all, level = "debug")]
   async fn find_all(&self) -> Result<Vec<Department>, InfraError> {
      let rows = sqlx::query_as::<_, DepartmentRow>(
         r#"
         SELECT id, name, leave_workflow, mission_workflow, created_at, updated_at
         FROM departments
         ORDER BY name
         "#,
      )
      .fetch_all(&self.pool)
      .await?;

      rows.into_iter().map(Department::try_from).collect()
   }

   #[tracing::instrument(skip_all, level = "debug", fields(name = %department.name()))]
   async fn upsert(&self, tx: &mut TxContext, department: &Department) -> Result<(), InfraError> {
      sqlx::query(
         r#"
         INSERT INTO departments (id, name, leave_workflow, mission_workflow, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (name) DO UPDATE SET
            leave_workflow = EXCLUDED.leave_workflow,
            mission_workflow = EXCLUDED.mission_workflow,
            updated_at = EXCLUDED.updated_at
         "#,
      )
      .bind(department.id().as_uuid())
      .bind(department.name().as_str())
      .bind(department.leave_workflow())
      .bind(department.mission_workflow())
      .bind(department.created_at())
      .bind(department.updated_at())
      .execute(tx.conn()?)
      .await?;

      Ok(())
   }
}
