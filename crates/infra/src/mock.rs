//! # テスト用モックリポジトリ
//!
//! ユースケーステストで使用するインメモリ実装。
//! `test-utils` feature を有効にすると他クレートからも利用できる。
//!
//! ```toml
//! [dev-dependencies]
//! requestflow-infra = { workspace = true, features = ["test-utils"] }
//! ```
//!
//! PostgreSQL 実装と同じく、楽観ロックの不一致と判断済みステップへの書き込みは
//! `Conflict` を返す。トランザクションのロールバックは再現しない。

use std::sync::{
   Arc,
   Mutex,
   atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use requestflow_domain::{
   approval::{ApprovalLedger, ApprovalStep, PendingApprovalsQuery},
   department::Department,
   request::{ApprovableRef, ApprovalRequest, RequestKind},
   role::Role,
   user::{User, UserId, UserRecord},
   value_objects::{DepartmentName, Version},
};

use crate::{
   db::{TransactionManager, TxContext},
   error::InfraError,
   repository::{
      ApprovalRequestRepository,
      ApprovalStepRepository,
      DepartmentRepository,
      UserRepository,
   },
};

// ===== MockDepartmentRepository =====

#[derive(Clone, Default)]
pub struct MockDepartmentRepository {
   departments: Arc<Mutex<Vec<Department>>>,
}

impl MockDepartmentRepository {
   pub fn new() -> Self {
      Self::default()
   }

   pub fn add_department(&self, department: Department) {
      self.departments.lock().unwrap().push(department);
   }
}

#[async_trait]
impl DepartmentRepository for MockDepartmentRepository {
   async fn find_by_name(&self, name: &DepartmentName) -> Result<Option<Department>, InfraError> {
      Ok(self
         .departments
         .lock()
         .unwrap()
         .iter()
         .find(|d| d.name() == name)
         .cloned())
   }

   async fn find_all(&self) -> Result<Vec<Department>, InfraError> {
      let mut departments = self.departments.lock().unwrap().clone();
      departments.sort_by(|a, b| a.name().as_str().cmp(b.name().as_str()));
      Ok(departments)
   }

   async fn upsert(&self, _tx: &mut TxContext, department: &Department) -> Result<(), InfraError> {
      let mut departments = self.departments.lock().unwrap();
      match departments.iter_mut().find(|d| d.name() == department.name()) {
         Some(existing) => {
            *existing = existing.clone().with_workflows(
               department.leave_workflow().clone(),
               department.mission_workflow().clone(),
               department.updated_at(),
            );
         }
         None => departments.push(department.clone()),
      }
      Ok(())
   }
}

// ===== MockUserRepository =====

#[derive(Clone, Default)]
pub struct MockUserRepository {
   users: Arc<Mutex<Vec<User>>>,
}

impl MockUserRepository {
   pub fn new() -> Self {
      Self::default()
   }

   pub fn add_user(&self, user: User) {
      self.users.lock().unwrap().push(user);
   }

   /// ユーザーの所属部署を変更する（異動）
   pub fn transfer(&self, id: &UserId, department: DepartmentName) {
      let mut users = self.users.lock().unwrap();
      if let Some(user) = users.iter_mut().find(|u| u.id() == id) {
         *user = User::from_db(UserRecord {
            id: user.id().clone(),
            name: user.name().clone(),
            email: user.email().clone(),
            role: user.role(),
            department,
            created_at: user.created_at(),
         });
      }
   }

   fn department_of(&self, id: &UserId) -> Option<DepartmentName> {
      self.users
         .lock()
         .unwrap()
         .iter()
         .find(|u| u.id() == id)
         .map(|u| u.department().clone())
   }
}

#[async_trait]
impl UserRepository for MockUserRepository {
   async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError> {
      Ok(self
         .users
         .lock()
         .unwrap()
         .iter()
         .find(|u| u.id() == id)
         .cloned())
   }

   async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, InfraError> {
      Ok(self
         .users
         .lock()
         .unwrap()
         .iter()
         .filter(|u| ids.contains(u.id()))
         .cloned()
         .collect())
   }

   async fn find_first_by_role(&self, role: Role) -> Result<Option<User>, InfraError> {
      Ok(self
         .users
         .lock()
         .unwrap()
         .iter()
         .filter(|u| u.role() == role)
         .min_by_key(|u| u.created_at())
         .cloned())
   }
}

// ===== MockApprovalRequestRepository =====

/// 承認待ち一覧の部署絞り込みは、共有するユーザーリポジトリの現在の所属部署で行う
#[derive(Clone, Default)]
pub struct MockApprovalRequestRepository {
   requests: Arc<Mutex<Vec<ApprovalRequest>>>,
   users:    MockUserRepository,
}

impl MockApprovalRequestRepository {
   pub fn new() -> Self {
      Self::default()
   }

   /// 申請者の所属部署を `users` から参照するリポジトリ
   pub fn with_users(users: MockUserRepository) -> Self {
      Self {
         requests: Arc::default(),
         users,
      }
   }

   /// 保存されている申請の件数
   pub fn len(&self) -> usize {
      self.requests.lock().unwrap().len()
   }

   pub fn is_empty(&self) -> bool {
      self.len() == 0
   }

   fn newest_first(mut requests: Vec<ApprovalRequest>) -> Vec<ApprovalRequest> {
      requests.sort_by_key(|r| std::cmp::Reverse(r.created_at()));
      requests
   }
}

#[async_trait]
impl ApprovalRequestRepository for MockApprovalRequestRepository {
   async fn insert(&self, _tx: &mut TxContext, request: &ApprovalRequest) -> Result<(), InfraError> {
      self.requests.lock().unwrap().push(request.clone());
      Ok(())
   }

   async fn update_with_version_check(
      &self,
      _tx: &mut TxContext,
      request: &ApprovalRequest,
      expected_version: Version,
   ) -> Result<(), InfraError> {
      let mut requests = self.requests.lock().unwrap();
      match requests
         .iter_mut()
         .find(|r| r.approvable() == request.approvable() && r.version() == expected_version)
      {
         Some(stored) => {
            *stored = request.clone();
            Ok(())
         }
         None => Err(InfraError::conflict(
            request.kind().entity_type(),
            request.id().to_string(),
         )),
      }
   }

   async fn update_details(
      &self,
      tx: &mut TxContext,
      request: &ApprovalRequest,
      expected_version: Version,
   ) -> Result<(), InfraError> {
      self.update_with_version_check(tx, request, expected_version)
         .await
   }

   async fn find_by_ref(
      &self,
      approvable: &ApprovableRef,
   ) -> Result<Option<ApprovalRequest>, InfraError> {
      Ok(self
         .requests
         .lock()
         .unwrap()
         .iter()
         .find(|r| &r.approvable() == approvable)
         .cloned())
   }

   async fn find_for_update(
      &self,
      _tx: &mut TxContext,
      approvable: &ApprovableRef,
   ) -> Result<Option<ApprovalRequest>, InfraError> {
      self.find_by_ref(approvable).await
   }

   async fn find_all(&self, kind: RequestKind) -> Result<Vec<ApprovalRequest>, InfraError> {
      let requests = self
         .requests
         .lock()
         .unwrap()
         .iter()
         .filter(|r| r.kind() == kind)
         .cloned()
         .collect();
      Ok(Self::newest_first(requests))
   }

   async fn find_by_requester(
      &self,
      kind: RequestKind,
      requester_id: &UserId,
   ) -> Result<Vec<ApprovalRequest>, InfraError> {
      let requests = self
         .requests
         .lock()
         .unwrap()
         .iter()
         .filter(|r| r.kind() == kind && r.requester_id() == requester_id)
         .cloned()
         .collect();
      Ok(Self::newest_first(requests))
   }

   async fn find_pending(
      &self,
      kind: RequestKind,
      query: &PendingApprovalsQuery,
   ) -> Result<Vec<ApprovalRequest>, InfraError> {
      let mut requests: Vec<ApprovalRequest> = self
         .requests
         .lock()
         .unwrap()
         .iter()
         .filter(|r| r.kind() == kind)
         .filter(|r| {
            self.users
               .department_of(r.requester_id())
               .is_some_and(|department| query.matches(r, &department))
         })
         .cloned()
         .collect();
      requests.sort_by_key(ApprovalRequest::created_at);
      Ok(requests)
   }

   async fn delete(
      &self,
      _tx: &mut TxContext,
      approvable: &ApprovableRef,
   ) -> Result<bool, InfraError> {
      let mut requests = self.requests.lock().unwrap();
      let before = requests.len();
      requests.retain(|r| &r.approvable() != approvable);
      Ok(requests.len() < before)
   }
}

// ===== MockApprovalStepRepository =====

#[derive(Clone, Default)]
pub struct MockApprovalStepRepository {
   steps:                  Arc<Mutex<Vec<ApprovalStep>>>,
   conflict_next_decision: Arc<AtomicBool>,
}

impl MockApprovalStepRepository {
   pub fn new() -> Self {
      Self::default()
   }

   /// 次の `record_decision` を、別の判断が先に確定したものとして失敗させる
   pub fn conflict_next_decision(&self) {
      self.conflict_next_decision.store(true, Ordering::SeqCst);
   }

   /// 全申請分のステップ
   pub fn all_steps(&self) -> Vec<ApprovalStep> {
      self.steps.lock().unwrap().clone()
   }
}

#[async_trait]
impl ApprovalStepRepository for MockApprovalStepRepository {
   async fn insert_ledger(
      &self,
      _tx: &mut TxContext,
      ledger: &ApprovalLedger,
   ) -> Result<(), InfraError> {
      self.steps
         .lock()
         .unwrap()
         .extend(ledger.steps().iter().cloned());
      Ok(())
   }

   async fn record_decision(
      &self,
      _tx: &mut TxContext,
      step: &ApprovalStep,
   ) -> Result<(), InfraError> {
      if self.conflict_next_decision.swap(false, Ordering::SeqCst) {
         return Err(InfraError::conflict("ApprovalStep", step.id().to_string()));
      }
      let mut steps = self.steps.lock().unwrap();
      match steps.iter_mut().find(|s| s.id() == step.id() && s.is_pending()) {
         Some(stored) => {
            *stored = step.clone();
            Ok(())
         }
         None => Err(InfraError::conflict("ApprovalStep", step.id().to_string())),
      }
   }

   async fn find_ledger(&self, approvable: &ApprovableRef) -> Result<ApprovalLedger, InfraError> {
      let steps = self
         .steps
         .lock()
         .unwrap()
         .iter()
         .filter(|s| s.approvable() == approvable)
         .cloned()
         .collect();
      Ok(ApprovalLedger::from_steps(approvable.clone(), steps)?)
   }

   async fn delete_ledger(
      &self,
      _tx: &mut TxContext,
      approvable: &ApprovableRef,
   ) -> Result<u64, InfraError> {
      let mut steps = self.steps.lock().unwrap();
      let before = steps.len();
      steps.retain(|s| s.approvable() != approvable);
      Ok((before - steps.len()) as u64)
   }
}

// ===== MockTransactionManager =====

pub struct MockTransactionManager;

#[async_trait]
impl TransactionManager for MockTransactionManager {
   async fn begin(&self) -> Result<TxContext, InfraError> {
      Ok(TxContext::mock())
   }
}
