//! # RequestFlow 共有ユーティリティ
//!
//! サービス間で共通のレスポンス型とログ基盤を提供する。
//!
//! - ビジネスロジックは含めない
//! - axum には依存しない（`IntoResponse` への変換は各サービスの責務）

pub mod api_response;
pub mod error_response;
pub mod event_log;
pub mod health;
pub mod observability;

pub use api_response::ApiResponse;
pub use error_response::ErrorResponse;
pub use health::HealthResponse;
