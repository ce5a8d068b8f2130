//! # Core Service サーバー
//!
//! 休暇申請・出張申請の承認ワークフローを実行する内部サービス。
//!
//! ## アクセス制御
//!
//! Core Service は内部ネットワークからのみアクセス可能とする。
//! 認証は前段で済んでおり、呼び出し元のユーザー ID・ロール・部署は信頼された入力として受け取る。
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `CORE_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `CORE_PORT` | No | ポート番号（デフォルト: `13001`） |
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `DATABASE_MAX_CONNECTIONS` | No | 最大接続数（デフォルト: `10`） |
//! | `LOG_FORMAT` | No | `json` / `pretty`（デフォルト: `pretty`） |
//! | `RUST_LOG` | No | ログフィルタ（デフォルト: `info,requestflow=debug`） |
//!
//! ## 起動方法
//!
//! ```bash
//! DATABASE_URL=postgres://... cargo run -p requestflow-core-service
//! ```

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use requestflow_core_service::{
   app::{AppDeps, build_router},
   config::CoreConfig,
};
use requestflow_domain::clock::SystemClock;
use requestflow_infra::{
   db::{self, PgTransactionManager, PoolSettings},
   repository::{
      PostgresApprovalRequestRepository,
      PostgresApprovalStepRepository,
      PostgresDepartmentRepository,
      PostgresUserRepository,
   },
};
use requestflow_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
   // .env ファイルを読み込む（存在する場合）
   dotenvy::dotenv().ok();

   init_tracing(&TracingConfig::from_env("core-service"));

   let config = CoreConfig::from_env()?;
   tracing::info!(
      "Core Service サーバーを起動します: {}:{}",
      config.host,
      config.port
   );

   let pool = db::create_pool(
      &config.database_url,
      &PoolSettings {
         max_connections: config.database_max_connections,
         ..PoolSettings::default()
      },
   )
   .await
   .context("データベース接続に失敗しました")?;
   tracing::info!("データベースに接続しました");

   db::run_migrations(&pool)
      .await
      .context("マイグレーションの適用に失敗しました")?;

   let app = build_router(AppDeps {
      department_repo: Arc::new(PostgresDepartmentRepository::new(pool.clone())),
      user_repo:       Arc::new(PostgresUserRepository::new(pool.clone())),
      request_repo:    Arc::new(PostgresApprovalRequestRepository::new(pool.clone())),
      step_repo:       Arc::new(PostgresApprovalStepRepository::new(pool.clone())),
      clock:           Arc::new(SystemClock),
      tx_manager:      Arc::new(PgTransactionManager::new(pool)),
   });

   let addr: SocketAddr = format!("{}:{}", config.host, config.port)
      .parse()
      .context("バインドアドレスが不正です")?;
   let listener = TcpListener::bind(addr)
      .await
      .with_context(|| format!("{addr} にバインドできません"))?;
   tracing::info!("Core Service サーバーが起動しました: {}", addr);

   axum::serve(listener, app).await.context("サーバーが異常終了しました")?;

   Ok(())
}
