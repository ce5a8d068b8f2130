//! 申請種別ごとの内容と、その検証ルール。

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use super::RequestKind;
use crate::DomainError;

define_validated_string! {
    /// 休暇理由
    pub struct LeaveReason {
        label: "休暇理由",
        max_length: 1000,
    }
}

define_validated_string! {
    /// 出張先
    pub struct Destination {
        label: "出張先",
        max_length: 255,
    }
}

define_validated_string! {
    /// 出張目的
    pub struct MissionPurpose {
        label: "出張目的",
        max_length: 1000,
    }
}

/// 休暇種別
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    Annual,
    Sick,
    Personal,
    Maternity,
    Emergency,
}

impl LeaveType {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl std::str::FromStr for LeaveType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "annual" => Ok(Self::Annual),
            "sick" => Ok(Self::Sick),
            "personal" => Ok(Self::Personal),
            "maternity" => Ok(Self::Maternity),
            "emergency" => Ok(Self::Emergency),
            _ => Err(DomainError::Validation(format!("不正な休暇種別: {s}"))),
        }
    }
}

/// 交通手段
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransportationMode {
    Flight,
    Car,
    Train,
    Bus,
}

impl TransportationMode {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl std::str::FromStr for TransportationMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flight" => Ok(Self::Flight),
            "car" => Ok(Self::Car),
            "train" => Ok(Self::Train),
            "bus" => Ok(Self::Bus),
            _ => Err(DomainError::Validation(format!("不正な交通手段: {s}"))),
        }
    }
}

/// 申請期間
///
/// # 不変条件
///
/// - `end` は `start` より後
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end:   NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DomainError> {
        if end <= start {
            return Err(DomainError::Validation(format!(
                "終了日は開始日より後である必要があります: {start} - {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// 新規申請の期間が未来日から始まることを検証する
    pub fn ensure_starts_after(&self, today: NaiveDate) -> Result<(), DomainError> {
        if self.start <= today {
            return Err(DomainError::Validation(format!(
                "開始日は {today} より後である必要があります: {}",
                self.start
            )));
        }
        Ok(())
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

/// 出張の概算予算（0 以上、小数点以下 2 桁）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EstimatedBudget(Decimal);

impl EstimatedBudget {
    pub fn new(amount: Decimal) -> Result<Self, DomainError> {
        if amount < Decimal::ZERO {
            return Err(DomainError::Validation(format!(
                "概算予算は 0 以上である必要があります: {amount}"
            )));
        }
        Ok(Self(amount.round_dp(2)))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }
}

/// 休暇申請の内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveDetails {
    pub leave_type: LeaveType,
    pub period:     DateRange,
    pub reason:     LeaveReason,
}

/// 出張申請の内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionDetails {
    pub destination:          Destination,
    pub purpose:              MissionPurpose,
    pub period:               DateRange,
    pub estimated_budget:     EstimatedBudget,
    pub transportation_mode:  TransportationMode,
    pub accommodation_needed: bool,
}

/// 申請内容
///
/// 申請種別はこの列挙のバリアントで決まる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestDetails {
    Leave(LeaveDetails),
    Mission(MissionDetails),
}

impl RequestDetails {
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Leave(_) => RequestKind::Leave,
            Self::Mission(_) => RequestKind::Mission,
        }
    }

    pub fn period(&self) -> &DateRange {
        match self {
            Self::Leave(details) => &details.period,
            Self::Mission(details) => &details.period,
        }
    }
}
