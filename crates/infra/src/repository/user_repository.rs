//! UserRepository: ユーザー（ディレクトリ）の参照
//!
//! 承認ワークフローが必要とするのは以下の参照のみ:
//! - 申請者の所属部署（チェーン解決）
//! - ロール保持者の表示名（承認者名の記録）
//! - 一覧表示用の申請者名

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use requestflow_domain::{
   role::Role,
   user::{User, UserId, UserRecord},
   value_objects::{DepartmentName, Email, UserName},
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// UserRepository トレイト
#[async_trait]
pub trait UserRepository: Send + Sync {
   async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError>;

   /// 複数 ID で一括取得する（存在しない ID は結果に含まれない）
   async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, InfraError>;

   /// 指定ロールを保持するユーザーのうち、最初に登録されたユーザー
   async fn find_first_by_role(&self, role: Role) -> Result<Option<User>, InfraError>;
}

#[derive(sqlx::FromRow)]
struct UserRow {
   id:         Uuid,
   name:       String,
   email:      String,
   role:       String,
   department: String,
   created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
   type Error = InfraError;

   fn try_from(row: UserRow) -> Result<Self, Self::Error> {
      Ok(User::from_db(UserRecord {
         id:         UserId::from_uuid(row.id),
         name:       UserName::new(row.name)?,
         email:      Email::new(row.email)?,
         role:       row.role.parse::<Role>()?,
         department: DepartmentName::new(row.department)?,
         created_at: row.created_at,
      }))
   }
}

/// PostgreSQL 実装
pub struct PostgresUserRepository {
   pool: PgPool,
}

impl PostgresUserRepository {
   pub fn new(pool: PgPool) -> Self {
      Self { pool }
   }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
   #[tracing::instrument(skip_all, level = "debug", fields(%id))]
   async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError> {
      let row = sqlx::query_as::<_, UserRow>(
         r#"
         SELECT id, name, email, role, department, created_at
         FROM users
         WHERE id = $1
         "#,
      )
      .bind(id.as_uuid())
      .fetch_optional(&self.pool)
      .await?;

      row.map(User::try_from).transpose()
   }

   #[tracing::instrument(skip_all, level = "debug", fields(count = ids.len()))]
   async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, InfraError> {
      if ids.is_empty() {
         return Ok(Vec::new());
      }
      let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();

      let rows = sqlx::query_as::<_, UserRow>(
         r#"
         SELECT id, name, email, role, department, created_at
         FROM users
         WHERE id = ANY($1)
         "#,
      )
      .bind(&uuids)
      .fetch_all(&self.pool)
      .await?;

      rows.into_iter().map(User::try_from).collect()
   }

   #[tracing::instrument(skip_all, level = "debug", fields(role = %role))]
   async fn find_first_by_role(&self, role: Role) -> Result<Option<User>, InfraError> {
      let row = sqlx::query_as::<_, UserRow>(
         r#"
         SELECT id, name, email, role, department, created_at
         FROM users
         WHERE role = $1
         ORDER BY created_at, id
         LIMIT 1
         "#,
      )
      .bind(role.as_str())
      .fetch_optional(&self.pool)
      .await?;

      row.map(User::try_from).transpose()
   }
}
