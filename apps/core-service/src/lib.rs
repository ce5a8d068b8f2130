//! # Core Service ライブラリ
//!
//! 承認ワークフローのユースケースと HTTP ハンドラを公開する。
//! 統合テストからルーターとテストユーティリティを利用できる。

pub mod app;
pub mod config;
pub mod error;
pub mod handler;
pub mod usecase;

// テストユーティリティ（内部実装、ドキュメントからは隠す）
#[cfg(any(test, feature = "test-utils"))]
#[doc(hidden)]
pub mod test_utils;
