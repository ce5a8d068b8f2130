//! ApprovalRequestRepository 統合テスト
//!
//! 実行方法:
//! ```bash
//! cargo test -p requestflow-infra --test approval_request_repository_test -- --ignored
//! ```

mod common;

use chrono::NaiveDate;
use common::{initialized_leave, insert_user, save_initialized, test_now};
use pretty_assertions::assert_eq;
use requestflow_domain::{
   approval::{ApprovalChain, PendingApprovalsQuery, initialize},
   request::{
      ApprovableRef,
      DateRange,
      Destination,
      EstimatedBudget,
      LeaveDetails,
      LeaveReason,
      LeaveType,
      MissionDetails,
      MissionPurpose,
      NewApprovalRequest,
      RequestDetails,
      RequestId,
      RequestKind,
      RequestStatus,
      TransportationMode,
   },
   role::Role,
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
use rust_decimal::Decimal;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "DATABASE_URL の PostgreSQL が必要"]
async fn test_休暇申請を保存して取得できる(pool: PgPool) {
   let requester = insert_user(&pool, "申請者", Role::Employee, "IT").await;
   let initialized = initialized_leave(&requester, "IT", vec![Role::TeamLeader, Role::Ceo]);
   save_initialized(&pool, &initialized).await;
   let sut = PostgresApprovalRequestRepository::new(pool);

   let found = sut
      .find_by_ref(&initialized.request.approvable())
      .await
      .unwrap()
      .unwrap();

   assert_eq!(found, initialized.request);
   assert_eq!(found.status(), RequestStatus::Pending);
   assert_eq!(found.current_approver(), Some(Role::TeamLeader));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "DATABASE_URL の PostgreSQL が必要"]
async fn test_出張申請を保存して取得できる(pool: PgPool) {
   let requester = insert_user(&pool, "申請者", Role::Employee, "Sales").await;
   let details = RequestDetails::Mission(MissionDetails {
      destination:          Destination::new("大阪").unwrap(),
      purpose:              MissionPurpose::new("顧客訪問").unwrap(),
      period:               DateRange::new(
         NaiveDate::from_ymd_opt(2026, 8, 10).unwrap(),
         NaiveDate::from_ymd_opt(2026, 8, 12).unwrap(),
      )
      .unwrap(),
      estimated_budget:     EstimatedBudget::new(Decimal::new(12_345_050, 2)).unwrap(),
      transportation_mode:  TransportationMode::Train,
      accommodation_needed: true,
   });
   let chain = ApprovalChain::new(vec![Role::TeamLeader, Role::Cfo]).unwrap();
   let initialized = initialize(
      NewApprovalRequest {
         id: RequestId::new(),
         requester_id: requester,
         requester_department: DepartmentName::new("Sales").unwrap(),
         details,
         now: test_now(),
      },
      &chain,
   );
   save_initialized(&pool, &initialized).await;
   let sut = PostgresApprovalRequestRepository::new(pool);

   let found = sut
      .find_by_ref(&initialized.request.approvable())
      .await
      .unwrap()
      .unwrap();

   assert_eq!(found.kind(), RequestKind::Mission);
   assert_eq!(found.details(), initialized.request.details());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "DATABASE_URL の PostgreSQL が必要"]
async fn test_種別が違えば同じidでも見つからない(pool: PgPool) {
   let requester = insert_user(&pool, "申請者", Role::Employee, "IT").await;
   let initialized = initialized_leave(&requester, "IT", vec![Role::TeamLeader]);
   save_initialized(&pool, &initialized).await;
   let sut = PostgresApprovalRequestRepository::new(pool);

   let as_mission = ApprovableRef::new(RequestKind::Mission, initialized.request.id().clone());
   let result = sut.find_by_ref(&as_mission).await.unwrap();

   assert!(result.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "DATABASE_URL の PostgreSQL が必要"]
async fn test_申請者で絞り込める(pool: PgPool) {
   let alice = insert_user(&pool, "Alice", Role::Employee, "IT").await;
   let bob = insert_user(&pool, "Bob", Role::Employee, "IT").await;
   save_initialized(&pool, &initialized_leave(&alice, "IT", vec![Role::TeamLeader])).await;
   save_initialized(&pool, &initialized_leave(&alice, "IT", vec![Role::TeamLeader])).await;
   save_initialized(&pool, &initialized_leave(&bob, "IT", vec![Role::TeamLeader])).await;
   let sut = PostgresApprovalRequestRepository::new(pool);

   let alice_requests = sut
      .find_by_requester(RequestKind::Leave, &alice)
      .await
      .unwrap();
   let all = sut.find_all(RequestKind::Leave).await.unwrap();
   let missions = sut.find_all(RequestKind::Mission).await.unwrap();

   assert_eq!(alice_requests.len(), 2);
   assert!(alice_requests.iter().all(|r| r.is_owned_by(&alice)));
   assert_eq!(all.len(), 3);
   assert!(missions.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "DATABASE_URL の PostgreSQL が必要"]
async fn test_承認待ち一覧はチームリーダーのみ部署で絞り込む(pool: PgPool) {
   let it_member = insert_user(&pool, "IT 社員", Role::Employee, "IT").await;
   let sales_member = insert_user(&pool, "営業社員", Role::Employee, "Sales").await;
   save_initialized(&pool, &initialized_leave(&it_member, "IT", vec![Role::TeamLeader])).await;
   save_initialized(
      &pool,
      &initialized_leave(&sales_member, "Sales", vec![Role::TeamLeader]),
   )
   .await;
   save_initialized(&pool, &initialized_leave(&it_member, "IT", vec![Role::Ceo])).await;
   save_initialized(&pool, &initialized_leave(&sales_member, "Sales", vec![Role::Ceo])).await;
   let sut = PostgresApprovalRequestRepository::new(pool);
   let it = DepartmentName::new("IT").unwrap();

   let team_leader = sut
      .find_pending(
         RequestKind::Leave,
         &PendingApprovalsQuery::new(Role::TeamLeader, Some(it.clone())),
      )
      .await
      .unwrap();
   let ceo = sut
      .find_pending(
         RequestKind::Leave,
         &PendingApprovalsQuery::new(Role::Ceo, Some(it)),
      )
      .await
      .unwrap();

   assert_eq!(team_leader.len(), 1);
   assert_eq!(team_leader[0].requester_department().as_str(), "IT");
   assert_eq!(ceo.len(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "DATABASE_URL の PostgreSQL が必要"]
async fn test_承認待ち一覧は申請者の現在の部署で絞り込む(pool: PgPool) {
   let member = insert_user(&pool, "異動者", Role::Employee, "IT").await;
   save_initialized(&pool, &initialized_leave(&member, "IT", vec![Role::TeamLeader])).await;
   sqlx::query("UPDATE users SET department = 'Sales' WHERE id = $1")
      .bind(member.as_uuid())
      .execute(&pool)
      .await
      .unwrap();
   let sut = PostgresApprovalRequestRepository::new(pool);
   let pending_for = |department: &str| {
      PendingApprovalsQuery::new(Role::TeamLeader, Some(DepartmentName::new(department).unwrap()))
   };

   let sales = sut
      .find_pending(RequestKind::Leave, &pending_for("Sales"))
      .await
      .unwrap();
   let it = sut
      .find_pending(RequestKind::Leave, &pending_for("IT"))
      .await
      .unwrap();

   assert_eq!(sales.len(), 1);
   assert_eq!(sales[0].requester_department().as_str(), "IT");
   assert!(it.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "DATABASE_URL の PostgreSQL が必要"]
async fn test_申請のあるユーザーは削除できず台帳も残る(pool: PgPool) {
   let requester = insert_user(&pool, "申請者", Role::Employee, "IT").await;
   let initialized = initialized_leave(&requester, "IT", vec![Role::TeamLeader, Role::Ceo]);
   save_initialized(&pool, &initialized).await;

   let result = sqlx::query("DELETE FROM users WHERE id = $1")
      .bind(requester.as_uuid())
      .execute(&pool)
      .await;

   assert!(result.is_err());
   let approvable = initialized.request.approvable();
   let request = PostgresApprovalRequestRepository::new(pool.clone())
      .find_by_ref(&approvable)
      .await
      .unwrap();
   let ledger = PostgresApprovalStepRepository::new(pool)
      .find_ledger(&approvable)
      .await
      .unwrap();
   assert!(request.is_some());
   assert_eq!(ledger.steps().len(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "DATABASE_URL の PostgreSQL が必要"]
async fn test_申請内容を更新しても承認者は変わらない(pool: PgPool) {
   let requester = insert_user(&pool, "申請者", Role::Employee, "IT").await;
   let initialized = initialized_leave(&requester, "IT", vec![Role::TeamLeader, Role::Ceo]);
   save_initialized(&pool, &initialized).await;
   let sut = PostgresApprovalRequestRepository::new(pool.clone());
   let tx_manager = PgTransactionManager::new(pool);
   let details = RequestDetails::Leave(LeaveDetails {
      leave_type: LeaveType::Sick,
      period:     DateRange::new(
         NaiveDate::from_ymd_opt(2026, 7, 10).unwrap(),
         NaiveDate::from_ymd_opt(2026, 7, 11).unwrap(),
      )
      .unwrap(),
      reason:     LeaveReason::new("通院").unwrap(),
   });
   let revised = initialized
      .request
      .clone()
      .revised(details.clone(), test_now() + chrono::Duration::hours(1))
      .unwrap();

   let mut tx = tx_manager.begin().await.unwrap();
   sut.update_details(&mut tx, &revised, initialized.request.version())
      .await
      .unwrap();
   tx.commit().await.unwrap();

   let found = sut
      .find_by_ref(&revised.approvable())
      .await
      .unwrap()
      .unwrap();
   assert_eq!(found, revised);
   assert_eq!(found.details(), &details);
   assert_eq!(found.current_approver(), Some(Role::TeamLeader));

   let mut tx = tx_manager.begin().await.unwrap();
   let stale = sut
      .update_details(&mut tx, &revised, initialized.request.version())
      .await;
   assert!(stale.unwrap_err().is_conflict());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "DATABASE_URL の PostgreSQL が必要"]
async fn test_古いバージョンでの更新はconflictを返す(pool: PgPool) {
   let requester = insert_user(&pool, "申請者", Role::Employee, "IT").await;
   let initialized = initialized_leave(&requester, "IT", vec![Role::TeamLeader]);
   save_initialized(&pool, &initialized).await;
   let sut = PostgresApprovalRequestRepository::new(pool.clone());
   let tx_manager = PgTransactionManager::new(pool);
   let stale_version = initialized.request.version().next();

   let mut tx = tx_manager.begin().await.unwrap();
   let result = sut
      .update_with_version_check(&mut tx, &initialized.request, stale_version)
      .await;

   let err = result.unwrap_err();
   assert!(err.is_conflict());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "DATABASE_URL の PostgreSQL が必要"]
async fn test_削除すると承認ステップとともに消える(pool: PgPool) {
   let requester = insert_user(&pool, "申請者", Role::Employee, "IT").await;
   let initialized = initialized_leave(&requester, "IT", vec![Role::TeamLeader, Role::Ceo]);
   save_initialized(&pool, &initialized).await;
   let sut = PostgresApprovalRequestRepository::new(pool.clone());
   let step_repo = PostgresApprovalStepRepository::new(pool.clone());
   let tx_manager = PgTransactionManager::new(pool);
   let approvable = initialized.request.approvable();

   let mut tx = tx_manager.begin().await.unwrap();
   let removed_steps = step_repo.delete_ledger(&mut tx, &approvable).await.unwrap();
   let deleted = sut.delete(&mut tx, &approvable).await.unwrap();
   tx.commit().await.unwrap();

   assert_eq!(removed_steps, 2);
   assert!(deleted);
   assert!(sut.find_by_ref(&approvable).await.unwrap().is_none());
   assert!(step_repo.find_ledger(&approvable).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "DATABASE_URL の PostgreSQL が必要"]
async fn test_存在しない申請の削除はfalseを返す(pool: PgPool) {
   let sut = PostgresApprovalRequestRepository::new(pool.clone());
   let tx_manager = PgTransactionManager::new(pool);
   let approvable = ApprovableRef::new(RequestKind::Leave, RequestId::new());

   let mut tx = tx_manager.begin().await.unwrap();
   let deleted = sut.delete(&mut tx, &approvable).await.unwrap();

   assert!(!deleted);
}
