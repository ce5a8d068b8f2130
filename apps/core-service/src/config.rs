//! # Core Service 設定
//!
//! 環境変数から Core Service サーバーの設定を読み込む。

use std::env;

use anyhow::Context as _;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 13001;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Core Service サーバーの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
   /// バインドアドレス
   pub host: String,
   /// ポート番号
   pub port: u16,
   /// データベース接続 URL
   pub database_url: String,
   /// コネクションプールの最大接続数
   pub database_max_connections: u32,
}

impl CoreConfig {
   /// 環境変数から設定を読み込む
   pub fn from_env() -> anyhow::Result<Self> {
      Self::from_lookup(|key| env::var(key).ok())
   }

   /// キーから値を引く関数を受け取って設定を組み立てる
   fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
      let port = match lookup("CORE_PORT") {
         Some(value) => value
            .parse()
            .with_context(|| format!("CORE_PORT は有効なポート番号である必要があります: {value}"))?,
         None => DEFAULT_PORT,
      };
      let database_max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
         Some(value) => value.parse().with_context(|| {
            format!("DATABASE_MAX_CONNECTIONS は正の整数である必要があります: {value}")
         })?,
         None => DEFAULT_MAX_CONNECTIONS,
      };

      Ok(Self {
         host: lookup("CORE_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
         port,
         database_url: lookup("DATABASE_URL").context("DATABASE_URL が設定されていません")?,
         database_max_connections,
      })
   }
}
