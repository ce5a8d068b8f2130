//! 承認待ち一覧の絞り込み条件。

use crate::{
    request::{ApprovalRequest, RequestStatus},
    role::Role,
    value_objects::DepartmentName,
};

/// 「ロール R が判断すべき申請」の検索条件
///
/// 部署による絞り込みはチームリーダーにのみ適用される。
/// 他のロールに部署が渡されても無視し、全社の承認待ちを対象とする。
///
/// 絞り込みに使うのは申請者の**現在の**所属部署。申請時に記録した
/// `requester_department` は承認チェーンの決定にだけ使い、異動後は新しい部署の
/// チームリーダーの一覧に載る。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingApprovalsQuery {
    role:       Role,
    department: Option<DepartmentName>,
}

impl PendingApprovalsQuery {
    pub fn new(role: Role, department: Option<DepartmentName>) -> Self {
        Self { role, department }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// 実際に適用する部署スコープ
    pub fn department_scope(&self) -> Option<&DepartmentName> {
        if self.role.is_department_scoped_approver() {
            self.department.as_ref()
        } else {
            None
        }
    }

    /// `requester_department` には申請者の現在の所属部署を渡す
    pub fn matches(&self, request: &ApprovalRequest, requester_department: &DepartmentName) -> bool {
        request.status() == RequestStatus::Pending
            && request.current_approver() == Some(self.role)
            && self
                .department_scope()
                .is_none_or(|department| requester_department == department)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::{
        approval::{ApprovalChain, initialize},
        request::{
            DateRange,
            LeaveDetails,
            LeaveReason,
            LeaveType,
            NewApprovalRequest,
            RequestDetails,
            RequestId,
        },
        user::UserId,
    };

    fn pending_request(department: &str, first: Role) -> ApprovalRequest {
        let params = NewApprovalRequest {
            id: RequestId::new(),
            requester_id: UserId::new(),
            requester_department: DepartmentName::new(department).unwrap(),
            details: RequestDetails::Leave(LeaveDetails {
                leave_type: LeaveType::Sick,
                period:     DateRange::new(
                    NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
                    NaiveDate::from_ymd_opt(2026, 5, 2).unwrap(),
                )
                .unwrap(),
                reason:     LeaveReason::new("通院").unwrap(),
            }),
            now: DateTime::from_timestamp(1_772_000_000, 0).unwrap(),
        };
        initialize(params, &ApprovalChain::new(vec![first]).unwrap()).request
    }

    fn dept(name: &str) -> Option<DepartmentName> {
        Some(DepartmentName::new(name).unwrap())
    }

    #[rstest]
    #[case::同じ部署(dept("IT"), true)]
    #[case::別部署(dept("Sales"), false)]
    #[case::部署指定なし(None, true)]
    fn test_チームリーダーは部署で絞り込まれる(
        #[case] department: Option<DepartmentName>,
        #[case] expected: bool,
    ) {
        let query = PendingApprovalsQuery::new(Role::TeamLeader, department);

        let it = DepartmentName::new("IT").unwrap();

        assert_eq!(
            query.matches(&pending_request("IT", Role::TeamLeader), &it),
            expected
        );
    }

    #[test]
    fn test_異動した申請者の申請は現在の部署で絞り込まれる() {
        let request = pending_request("IT", Role::TeamLeader);
        let sales = DepartmentName::new("Sales").unwrap();

        assert!(PendingApprovalsQuery::new(Role::TeamLeader, dept("Sales")).matches(&request, &sales));
        assert!(!PendingApprovalsQuery::new(Role::TeamLeader, dept("IT")).matches(&request, &sales));
    }

    #[rstest]
    #[case(Role::HrManager)]
    #[case(Role::Cfo)]
    #[case(Role::Ceo)]
    #[case(Role::DepartmentAdmin)]
    fn test_チームリーダー以外は部署指定を無視する(#[case] role: Role) {
        let query = PendingApprovalsQuery::new(role, dept("Sales"));

        assert_eq!(query.department_scope(), None);
        assert!(query.matches(&pending_request("IT", role), &DepartmentName::new("IT").unwrap()));
    }

    #[test]
    fn test_別ロールが承認者の申請は含まれない() {
        let query = PendingApprovalsQuery::new(Role::Ceo, None);

        assert!(!query.matches(
            &pending_request("IT", Role::TeamLeader),
            &DepartmentName::new("IT").unwrap()
        ));
    }
}
