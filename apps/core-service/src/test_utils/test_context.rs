//! テストコンテキスト
//!
//! 初期データ（部署 5 件と各ロールのユーザー）を投入したモックリポジトリと固定時計を保持し、
//! 同じリポジトリを共有するユースケース・ルーターを組み立てる。

use std::sync::{
   Arc,
   atomic::{AtomicI64, Ordering},
};

use axum::Router;
use chrono::{DateTime, Duration, TimeZone, Utc};
use requestflow_domain::{
   clock::FixedClock,
   department::{Department, DepartmentId, NewDepartment},
   request::{
      DateRange,
      Destination,
      EstimatedBudget,
      LeaveDetails,
      LeaveReason,
      LeaveType,
      MissionDetails,
      MissionPurpose,
      RequestDetails,
      TransportationMode,
   },
   role::Role,
   user::{User, UserId, UserRecord},
   value_objects::{DepartmentName, Email, UserName},
};
use requestflow_infra::mock::{
   MockApprovalRequestRepository,
   MockApprovalStepRepository,
   MockDepartmentRepository,
   MockTransactionManager,
   MockUserRepository,
};
use rust_decimal::Decimal;
use serde_json::{Value as JsonValue, json};

use crate::{
   app::{AppDeps, build_router},
   usecase::{
      ApprovalRequestUseCaseImpl,
      CreateRequestInput,
      DecisionUseCaseImpl,
      DepartmentUseCaseImpl,
      PendingApprovalUseCaseImpl,
      RequestWithLedger,
      WorkflowTemplateRegistry,
   },
};

/// テスト用の部署を作る
pub fn department(name: &str, leave: JsonValue, mission: JsonValue) -> Department {
   Department::new(NewDepartment {
      id:               DepartmentId::new(),
      name:             DepartmentName::new(name).unwrap(),
      leave_workflow:   leave,
      mission_workflow: mission,
      now:              Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
   })
}

/// 初期データとして登録したユーザーの ID
#[derive(Debug, Clone)]
pub struct SeededUsers {
   pub it_employee:       UserId,
   pub it_team_leader:    UserId,
   pub sales_employee:    UserId,
   pub sales_team_leader: UserId,
   pub hr_manager:        UserId,
   pub cfo:               UserId,
   pub ceo:               UserId,
   pub system_admin:      UserId,
}

pub struct TestContext {
   pub now:             DateTime<Utc>,
   pub department_repo: MockDepartmentRepository,
   pub user_repo:       MockUserRepository,
   pub request_repo:    MockApprovalRequestRepository,
   pub step_repo:       MockApprovalStepRepository,
   pub users:           SeededUsers,
   user_seq:            Arc<AtomicI64>,
}

impl TestContext {
   /// 部署と各ロールのユーザーを登録したコンテキスト
   ///
   /// `department_admin` の保持者は登録しない。
   pub fn seeded() -> Self {
      let department_repo = MockDepartmentRepository::new();
      for (name, leave, mission) in [
         ("IT", json!(["team_leader", "ceo"]), json!(["team_leader", "ceo"])),
         (
            "Sales",
            json!(["team_leader", "cfo", "hr_manager"]),
            json!(["team_leader", "cfo", "hr_manager", "ceo"]),
         ),
         ("HR", json!(["ceo"]), json!(["ceo"])),
         ("Finance", json!(["cfo"]), json!(["cfo", "ceo"])),
         ("Admin", json!(["ceo"]), json!(["ceo"])),
      ] {
         department_repo.add_department(department(name, leave, mission));
      }

      let user_repo = MockUserRepository::new();
      let mut ctx = Self {
         now: Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap(),
         department_repo,
         request_repo: MockApprovalRequestRepository::with_users(user_repo.clone()),
         user_repo,
         step_repo: MockApprovalStepRepository::new(),
         users: SeededUsers {
            it_employee:       UserId::new(),
            it_team_leader:    UserId::new(),
            sales_employee:    UserId::new(),
            sales_team_leader: UserId::new(),
            hr_manager:        UserId::new(),
            cfo:               UserId::new(),
            ceo:               UserId::new(),
            system_admin:      UserId::new(),
         },
         user_seq: Arc::new(AtomicI64::new(0)),
      };

      ctx.users = SeededUsers {
         it_employee:       ctx.add_user("山田 太郎", Role::Employee, "IT"),
         it_team_leader:    ctx.add_user("佐藤 花子", Role::TeamLeader, "IT"),
         sales_employee:    ctx.add_user("伊藤 美咲", Role::Employee, "Sales"),
         sales_team_leader: ctx.add_user("渡辺 翔", Role::TeamLeader, "Sales"),
         hr_manager:        ctx.add_user("鈴木 一郎", Role::HrManager, "HR"),
         cfo:               ctx.add_user("田中 誠", Role::Cfo, "Finance"),
         ceo:               ctx.add_user("高橋 健", Role::Ceo, "Admin"),
         system_admin:      ctx.add_user("小林 直樹", Role::SystemAdmin, "Admin"),
      };
      ctx
   }

   /// ユーザーを登録する。登録順に `created_at` が 1 秒ずつ進む
   pub fn add_user(&self, name: &str, role: Role, department: &str) -> UserId {
      let seq = self.user_seq.fetch_add(1, Ordering::SeqCst);
      let id = UserId::new();
      self.user_repo.add_user(User::from_db(UserRecord {
         id: id.clone(),
         name: UserName::new(name).unwrap(),
         email: Email::new(format!("user{seq}@example.com")).unwrap(),
         role,
         department: DepartmentName::new(department).unwrap(),
         created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(seq),
      }));
      id
   }

   /// ユーザーを別の部署へ異動させる
   pub fn transfer_user(&self, id: &UserId, department: &str) {
      self.user_repo
         .transfer(id, DepartmentName::new(department).unwrap());
   }

   fn clock(&self) -> Arc<FixedClock> {
      Arc::new(FixedClock::new(self.now))
   }

   pub fn request_usecase(&self) -> ApprovalRequestUseCaseImpl {
      ApprovalRequestUseCaseImpl::new(
         Arc::new(self.request_repo.clone()),
         Arc::new(self.step_repo.clone()),
         Arc::new(self.user_repo.clone()),
         WorkflowTemplateRegistry::new(Arc::new(self.department_repo.clone())),
         self.clock(),
         Arc::new(MockTransactionManager),
      )
   }

   pub fn decision_usecase(&self) -> DecisionUseCaseImpl {
      DecisionUseCaseImpl::new(
         Arc::new(self.request_repo.clone()),
         Arc::new(self.step_repo.clone()),
         Arc::new(self.user_repo.clone()),
         self.clock(),
         Arc::new(MockTransactionManager),
      )
   }

   pub fn pending_usecase(&self) -> PendingApprovalUseCaseImpl {
      PendingApprovalUseCaseImpl::new(
         Arc::new(self.request_repo.clone()),
         Arc::new(self.user_repo.clone()),
      )
   }

   pub fn department_usecase(&self) -> DepartmentUseCaseImpl {
      DepartmentUseCaseImpl::new(
         Arc::new(self.department_repo.clone()),
         self.clock(),
         Arc::new(MockTransactionManager),
      )
   }

   /// モックリポジトリを共有するルーター
   pub fn router(&self) -> Router {
      build_router(AppDeps {
         department_repo: Arc::new(self.department_repo.clone()),
         user_repo:       Arc::new(self.user_repo.clone()),
         request_repo:    Arc::new(self.request_repo.clone()),
         step_repo:       Arc::new(self.step_repo.clone()),
         clock:           self.clock(),
         tx_manager:      Arc::new(MockTransactionManager),
      })
   }

   pub async fn create_leave(&self, requester_id: &UserId) -> RequestWithLedger {
      self.create(requester_id, leave_details(self)).await
   }

   pub async fn create_mission(&self, requester_id: &UserId) -> RequestWithLedger {
      self.create(requester_id, mission_details(self)).await
   }

   async fn create(&self, requester_id: &UserId, details: RequestDetails) -> RequestWithLedger {
      self.request_usecase()
         .create_request(CreateRequestInput {
            requester_id: requester_id.clone(),
            details,
         })
         .await
         .unwrap()
   }
}

fn upcoming_period(ctx: &TestContext) -> DateRange {
   let today = ctx.now.date_naive();
   DateRange::new(today + Duration::days(30), today + Duration::days(32)).unwrap()
}

/// 30 日後から 3 日間の年次休暇
pub fn leave_details(ctx: &TestContext) -> RequestDetails {
   RequestDetails::Leave(LeaveDetails {
      leave_type: LeaveType::Annual,
      period:     upcoming_period(ctx),
      reason:     LeaveReason::new("家族旅行").unwrap(),
   })
}

/// 30 日後から 3 日間の大阪出張
pub fn mission_details(ctx: &TestContext) -> RequestDetails {
   RequestDetails::Mission(MissionDetails {
      destination:          Destination::new("大阪").unwrap(),
      purpose:              MissionPurpose::new("顧客訪問").unwrap(),
      period:               upcoming_period(ctx),
      estimated_budget:     EstimatedBudget::new(Decimal::new(8_000_000, 2)).unwrap(),
      transportation_mode:  TransportationMode::Train,
      accommodation_needed: true,
   })
}
