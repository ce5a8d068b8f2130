//! # 申請
//!
//! 休暇申請・出張申請を共通の形（[`ApprovalRequest`]）で扱う。
//!
//! ## 型の対応
//!
//! | 型 | 役割 |
//! |---|------|
//! | [`RequestKind`] | 申請種別（`leave` / `mission`）。テンプレートの選択に使う |
//! | [`ApprovableRef`] | 承認台帳から申請を指す多相参照（種別 + ID） |
//! | [`RequestDetails`] | 申請種別ごとの内容 |
//! | [`ApprovalRequest`] | 申請の状態（承認待ち / 承認済み / 却下） |

mod details;
mod kind;
mod state;

pub use details::{
    DateRange,
    Destination,
    EstimatedBudget,
    LeaveDetails,
    LeaveReason,
    LeaveType,
    MissionDetails,
    MissionPurpose,
    RequestDetails,
    TransportationMode,
};
pub use kind::{ApprovableRef, RequestId, RequestKind};
pub use state::{
    ApprovalRequest,
    ApprovalRequestRecord,
    NewApprovalRequest,
    RequestState,
    RequestStatus,
};
