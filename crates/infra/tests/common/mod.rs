//! テスト共通フィクスチャ
//!
//! DB を使用する統合テストで共通利用するユーザー登録・申請生成ヘルパー。
//! 部署はマイグレーションのシードデータ（IT / Sales / HR / Finance / Admin）を使う。

// 各テストファイルが独立したクレートとしてコンパイルされるため、
// 使用しない関数に dead_code 警告が出る。モジュール全体で抑制する。
#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, Utc};
use requestflow_domain::{
   approval::{ApprovalChain, Initialized, initialize},
   request::{
      DateRange,
      LeaveDetails,
      LeaveReason,
      LeaveType,
      NewApprovalRequest,
      RequestDetails,
      RequestId,
   },
   role::Role,
   user::UserId,
   value_objects::DepartmentName,
};
use requestflow_infra::{
   db::{PgTransactionManager, TransactionManager},
   repository::{
      ApprovalRequestRepository,
      ApprovalStepRepository,
      PostgresApprovalRequestRepository,
      PostgresApprovalStepRepository,
   },
};
use sqlx::PgPool;
use uuid::Uuid;

/// テスト用の固定日時
pub fn test_now() -> DateTime<Utc> {
   DateTime::from_timestamp(1_780_000_000, 0).unwrap()
}

/// ユーザーを登録して ID を返す
pub async fn insert_user(pool: &PgPool, name: &str, role: Role, department: &str) -> UserId {
   let id = Uuid::now_v7();
   sqlx::query(
      r#"
      INSERT INTO users (id, name, email, role, department)
      VALUES ($1, $2, $3, $4, $5)
      "#,
   )
   .bind(id)
   .bind(name)
   .bind(format!("{id}@example.com"))
   .bind(role.as_str())
   .bind(department)
   .execute(pool)
   .await
   .expect("ユーザー登録に失敗");
   UserId::from_uuid(id)
}

/// 作成日時を指定してユーザーを登録する
pub async fn insert_user_at(
   pool: &PgPool,
   name: &str,
   role: Role,
   created_at: DateTime<Utc>,
) -> UserId {
   let id = insert_user(pool, name, role, "IT").await;
   sqlx::query("UPDATE users SET created_at = $2 WHERE id = $1")
      .bind(id.as_uuid())
      .bind(created_at)
      .execute(pool)
      .await
      .expect("作成日時の更新に失敗");
   id
}

pub fn leave_details() -> RequestDetails {
   RequestDetails::Leave(LeaveDetails {
      leave_type: LeaveType::Annual,
      period:     DateRange::new(
         NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
         NaiveDate::from_ymd_opt(2026, 7, 3).unwrap(),
      )
      .unwrap(),
      reason:     LeaveReason::new("家族旅行").unwrap(),
   })
}

/// 指定チェーンで初期化した休暇申請（未保存）
pub fn initialized_leave(
   requester_id: &UserId,
   department: &str,
   roles: Vec<Role>,
) -> Initialized {
   let chain = ApprovalChain::new(roles).unwrap();
   initialize(
      NewApprovalRequest {
         id: RequestId::new(),
         requester_id: requester_id.clone(),
         requester_department: DepartmentName::new(department).unwrap(),
         details: leave_details(),
         now: test_now(),
      },
      &chain,
   )
}

/// 申請と承認ステップを 1 トランザクションで保存する
pub async fn save_initialized(pool: &PgPool, initialized: &Initialized) {
   let tx_manager = PgTransactionManager::new(pool.clone());
   let request_repo = PostgresApprovalRequestRepository::new(pool.clone());
   let step_repo = PostgresApprovalStepRepository::new(pool.clone());

   let mut tx = tx_manager.begin().await.unwrap();
   request_repo
      .insert(&mut tx, &initialized.request)
      .await
      .unwrap();
   step_repo
      .insert_ledger(&mut tx, &initialized.ledger)
      .await
      .unwrap();
   tx.commit().await.unwrap();
}
