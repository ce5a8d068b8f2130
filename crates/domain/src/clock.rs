//! # Clock（時刻プロバイダ）
//!
//! `created_at` / `updated_at` の打刻と、申請期間の「今日より後」判定に使う。
//! テストでは [`FixedClock`] を注入して時刻を固定する。

use chrono::{DateTime, NaiveDate, Utc};

/// 現在時刻を提供するトレイト
pub trait Clock: Send + Sync {
   fn now(&self) -> DateTime<Utc>;

   /// 現在日付（UTC）
   fn today(&self) -> NaiveDate {
      self.now().date_naive()
   }
}

/// システム時刻を返す実装
pub struct SystemClock;

impl Clock for SystemClock {
   fn now(&self) -> DateTime<Utc> {
      Utc::now()
   }
}

/// 固定時刻を返すテスト用実装
pub struct FixedClock {
   now: DateTime<Utc>,
}

impl FixedClock {
   pub fn new(now: DateTime<Utc>) -> Self {
      Self { now }
   }
}

impl Clock for FixedClock {
   fn now(&self) -> DateTime<Utc> {
      self.now
   }
}
