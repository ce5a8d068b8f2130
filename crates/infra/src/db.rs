//! # PostgreSQL データベース接続管理
//!
//! 接続プールの作成、マイグレーション、トランザクション境界を提供する。
//!
//! ## トランザクション
//!
//! 書き込み系のリポジトリメソッドは [`TxContext`] を必須引数に取る。
//! 承認判断のように「読み取り → 判断 → 書き込み」を 1 単位で行う処理は、
//! 同じ `TxContext` の中で申請行をロックしてから書き込む。

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction, postgres::PgPoolOptions};

use crate::error::InfraError;

/// 接続プールの設定
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// データベースマイグレーションを実行する
///
/// 適用済みのマイグレーションはスキップされる。
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

/// PostgreSQL 接続プールを作成する
///
/// アプリケーション起動時に一度だけ呼び出し、全リポジトリで共有する。
pub async fn create_pool(database_url: &str, settings: &PoolSettings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect(database_url)
        .await
}

/// トランザクションコンテキスト
///
/// 1. [`TransactionManager::begin`] で作成
/// 2. 書き込みメソッドに `&mut TxContext` として渡す
/// 3. [`TxContext::commit`] でコミット、コミットせずにドロップするとロールバック
pub struct TxContext(TxContextInner);

enum TxContextInner {
    Pg(Transaction<'static, Postgres>),
    #[cfg(any(test, feature = "test-utils"))]
    Mock,
}

impl TxContext {
    pub(crate) async fn begin_pg(pool: &PgPool) -> Result<Self, InfraError> {
        Ok(Self(TxContextInner::Pg(pool.begin().await?)))
    }

    /// インメモリリポジトリ用の TxContext
    #[cfg(any(test, feature = "test-utils"))]
    pub fn mock() -> Self {
        Self(TxContextInner::Mock)
    }

    pub async fn commit(self) -> Result<(), InfraError> {
        match self.0 {
            TxContextInner::Pg(tx) => {
                tx.commit().await?;
                Ok(())
            }
            #[cfg(any(test, feature = "test-utils"))]
            TxContextInner::Mock => Ok(()),
        }
    }

    /// トランザクション内のコネクション
    pub(crate) fn conn(&mut self) -> Result<&mut PgConnection, InfraError> {
        match &mut self.0 {
            TxContextInner::Pg(tx) => Ok(&mut **tx),
            #[cfg(any(test, feature = "test-utils"))]
            TxContextInner::Mock => Err(InfraError::unexpected(
                "Mock TxContext は PostgreSQL リポジトリでは使用できません",
            )),
        }
    }
}

/// トランザクション管理 trait
///
/// ユースケース層は `PgPool` に直接依存せず、この trait 経由でトランザクションを開始する。
#[async_trait]
pub trait TransactionManager: Send + Sync {
    async fn begin(&self) -> Result<TxContext, InfraError>;
}

/// PostgreSQL 用 TransactionManager
pub struct PgTransactionManager {
    pool: PgPool,
}

impl PgTransactionManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionManager for PgTransactionManager {
    async fn begin(&self) -> Result<TxContext, InfraError> {
        TxContext::begin_pg(&self.pool).await
    }
}
