//! # テストユーティリティ
//!
//! ユースケーステストと統合テストで共有する、モックリポジトリ一式と標準データ。

mod test_context;

pub use test_context::{SeededUsers, TestContext, department, leave_details, mission_details};
