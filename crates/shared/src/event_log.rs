//! # ビジネスイベントログの構造化ヘルパー
//!
//! [`log_business_event!`] で出力したイベントには `event.kind = "business_event"` が付与され、
//! `jq 'select(.["event.kind"] == "business_event")'` で抽出できる。
//!
//! フィールド名はドット記法（`event.category`、`event.action`）。JSON 出力ではフラットなキーになる。

/// ビジネスイベントを `info` レベルで出力する。
///
/// 慣例として以下のフィールドを付ける:
///
/// - `event.category`: [`event::category`]
/// - `event.action`: [`event::action`]
/// - `event.entity_type` / `event.entity_id`: 対象の申請
/// - `event.actor_id` または `event.actor_role`: 操作者
/// - `event.result`: [`event::result`]
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// イベントフィールドの定数
pub mod event {
    /// イベントカテゴリ
    pub mod category {
        pub const APPROVAL: &str = "approval";
        pub const DEPARTMENT: &str = "department";
    }

    /// イベントアクション
    pub mod action {
        // 申請
        pub const REQUEST_CREATED: &str = "request.created";
        pub const REQUEST_APPROVED: &str = "request.approved";
        pub const REQUEST_REJECTED: &str = "request.rejected";
        pub const REQUEST_UPDATED: &str = "request.updated";
        pub const REQUEST_DELETED: &str = "request.deleted";

        // 承認ステップ
        pub const DECISION_RECORDED: &str = "decision.recorded";
        pub const DECISION_DECLINED: &str = "decision.declined";

        // 部署
        pub const WORKFLOWS_UPDATED: &str = "department.workflows_updated";
    }

    /// エンティティ種別
    pub mod entity_type {
        pub const LEAVE_REQUEST: &str = "leave_request";
        pub const MISSION_REQUEST: &str = "mission_request";
        pub const DEPARTMENT: &str = "department";
    }

    /// イベント結果
    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const FAILURE: &str = "failure";
    }
}

/// エラーコンテキストフィールドの定数
///
/// `tracing::error!(error.category = ..., error.kind = ..., ...)` の形で使う。
pub mod error {
    /// エラーカテゴリ
    pub mod category {
        pub const INFRASTRUCTURE: &str = "infrastructure";
        /// 部署テンプレートなど運用側の設定不備
        pub const CONFIGURATION: &str = "configuration";
    }

    /// エラー種別
    pub mod kind {
        pub const DATABASE: &str = "database";
        pub const INTERNAL: &str = "internal";
        pub const WORKFLOW_TEMPLATE: &str = "workflow_template";
        pub const LEDGER_INCONSISTENCY: &str = "ledger_inconsistency";
    }
}
