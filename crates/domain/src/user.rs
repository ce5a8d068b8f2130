//! # ユーザー
//!
//! 申請者・承認者の双方を表す。承認ワークフローが参照するのは
//! 役職（承認者名の解決）と所属部署（承認チェーンの解決、チームリーダーの閲覧範囲）。

use chrono::{DateTime, Utc};

use crate::{
    role::Role,
    value_objects::{DepartmentName, Email, UserName},
};

define_uuid_id! {
    /// ユーザー ID
    pub struct UserId;
}

/// ユーザーエンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id:         UserId,
    name:       UserName,
    email:      Email,
    role:       Role,
    department: DepartmentName,
    created_at: DateTime<Utc>,
}

/// ユーザーの DB 復元パラメータ
pub struct UserRecord {
    pub id:         UserId,
    pub name:       UserName,
    pub email:      Email,
    pub role:       Role,
    pub department: DepartmentName,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn from_db(record: UserRecord) -> Self {
        Self {
            id:         record.id,
            name:       record.name,
            email:      record.email,
            role:       record.role,
            department: record.department,
            created_at: record.created_at,
        }
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn name(&self) -> &UserName {
        &self.name
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn department(&self) -> &DepartmentName {
        &self.department
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
