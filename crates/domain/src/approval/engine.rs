//! 承認エンジン（状態機械）。
//!
//! - [`initialize`]: 作成直後の申請に承認チェーンを割り当て、台帳を作る
//! - [`authorize`] → [`AuthorizedDecision::apply`]: 判断の前提条件を検査し、判断を適用する
//!
//! 前提条件の検査と適用を分けているのは、その間に承認者名の解決（外部参照）を挟むため。
//! 前提条件を満たさない場合は [`DecisionDeclined`] を返し、申請・台帳は一切変化しない。

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{ApprovalChain, ApprovalLedger, ApprovalStep, Decision, StepStatus};
use crate::{
    DomainError,
    request::{ApprovalRequest, NewApprovalRequest, RequestState},
    role::Role,
    value_objects::DecisionComment,
};

/// [`initialize`] の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Initialized {
    pub request: ApprovalRequest,
    pub ledger:  ApprovalLedger,
}

/// 申請を承認待ちにし、チェーンの各ロールに未判断ステップを作る
///
/// チェーンは非空なので必ず成功する。`current_approver` はチェーンの先頭。
pub fn initialize(params: NewApprovalRequest, chain: &ApprovalChain) -> Initialized {
    let now = params.now;
    let request = ApprovalRequest::initialized(params, chain.first());
    let ledger = ApprovalLedger::seed(request.approvable(), chain, now);
    Initialized { request, ledger }
}

/// 判断が受け付けられなかった理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecisionDeclined {
    /// 操作者のロールが現在の承認者ではない（終端状態の申請を含む）
    #[error("{acting} は現在の承認者ではありません（現在: {current:?}）")]
    NotCurrentApprover { acting: Role, current: Option<Role> },

    /// 操作者のロールに対応する未判断ステップがない
    #[error("{acting} が判断できる承認待ちステップがありません")]
    NoPendingStep { acting: Role },

    /// 読み取り後に別の判断が先に確定した
    #[error("{acting} の判断中に申請が更新されました")]
    Superseded { acting: Role },
}

/// 前提条件を満たした判断（適用前）
#[derive(Debug, Clone)]
pub struct AuthorizedDecision {
    request: ApprovalRequest,
    ledger:  ApprovalLedger,
    step:    ApprovalStep,
}

/// 判断の適用結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionApplied {
    pub request:      ApprovalRequest,
    pub ledger:       ApprovalLedger,
    pub decided_step: ApprovalStep,
    pub outcome:      DecisionOutcome,
}

/// 判断によって申請がどうなったか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOutcome {
    /// 次の承認者へ進んだ
    Advanced { next_approver: Role },
    /// 最後のステップが承認され、申請が承認された
    Approved,
    /// 却下された
    Rejected,
}

/// 判断の前提条件を検査する
///
/// - 申請の `current_approver` が `acting_role` と一致すること
/// - `acting_role` の未判断ステップが存在すること（複数あれば `sequence` 最小）
pub fn authorize(
    request: &ApprovalRequest,
    ledger: &ApprovalLedger,
    acting_role: Role,
) -> Result<AuthorizedDecision, DecisionDeclined> {
    let current = request.current_approver();
    if current != Some(acting_role) {
        return Err(DecisionDeclined::NotCurrentApprover {
            acting: acting_role,
            current,
        });
    }

    let step = ledger
        .find_pending_step_for_role(acting_role)
        .ok_or(DecisionDeclined::NoPendingStep {
            acting: acting_role,
        })?;

    Ok(AuthorizedDecision {
        request: request.clone(),
        ledger:  ledger.clone(),
        step:    step.clone(),
    })
}

impl AuthorizedDecision {
    pub fn request(&self) -> &ApprovalRequest {
        &self.request
    }

    /// 判断対象のステップ
    pub fn step(&self) -> &ApprovalStep {
        &self.step
    }

    /// 判断を適用する
    ///
    /// 却下なら申請は即座に却下で終端となり、以降のステップには触れない。
    /// 承認なら最小 `sequence` の未判断ステップのロールへ進み、なければ承認で終端となる。
    pub fn apply(
        self,
        decision: Decision,
        approver_name: String,
        comments: Option<DecisionComment>,
        now: DateTime<Utc>,
    ) -> Result<DecisionApplied, DomainError> {
        let decided_step = self.step.decided(decision, approver_name, comments, now)?;
        let ledger = self.ledger.with_step(decided_step.clone())?;

        let (request, outcome) = match decision {
            Decision::Rejected => (self.request.rejected(now)?, DecisionOutcome::Rejected),
            Decision::Approved => match ledger.find_earliest_pending_step() {
                Some(next) => {
                    let next_approver = next.approver_role();
                    (
                        self.request.advanced_to(next_approver, now)?,
                        DecisionOutcome::Advanced { next_approver },
                    )
                }
                None => (self.request.approved(now)?, DecisionOutcome::Approved),
            },
        };

        Ok(DecisionApplied {
            request,
            ledger,
            decided_step,
            outcome,
        })
    }
}

/// 申請の状態と台帳が整合しているかを検査する
///
/// 台帳のステータス列は「承認済みの接頭辞 + (未判断 | 却下 + 未判断*)」の形でなければならず、
/// 申請の状態はその形と一致していなければならない。
pub fn verify_consistency(
    request: &ApprovalRequest,
    ledger: &ApprovalLedger,
) -> Result<(), DomainError> {
    let statuses: Vec<StepStatus> = ledger.steps().iter().map(ApprovalStep::status).collect();
    let approved_prefix = statuses
        .iter()
        .take_while(|s| **s == StepStatus::Approved)
        .count();
    let rest = &statuses[approved_prefix..];
    let all_pending = |steps: &[StepStatus]| steps.iter().all(|s| *s == StepStatus::Pending);

    let consistent = match request.state() {
        RequestState::Pending { current_approver } => {
            !rest.is_empty()
                && all_pending(rest)
                && ledger
                    .find_earliest_pending_step()
                    .map(ApprovalStep::approver_role)
                    == Some(*current_approver)
        }
        RequestState::Rejected { .. } => match rest.split_first() {
            Some((first, later)) => *first == StepStatus::Rejected && all_pending(later),
            None => false,
        },
        RequestState::Approved { .. } => !statuses.is_empty() && rest.is_empty(),
    };

    if consistent {
        Ok(())
    } else {
        Err(DomainError::Validation(format!(
            "申請 {} の状態（{}）と承認台帳（{:?}）が整合しません",
            request.approvable(),
            request.status(),
            statuses
        )))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};
    use rust_decimal::Decimal;

    use super::*;
    use crate::{
        approval::StepSequence,
        request::{
            DateRange,
            Destination,
            EstimatedBudget,
            LeaveDetails,
            LeaveReason,
            LeaveType,
            MissionDetails,
            MissionPurpose,
            RequestDetails,
            RequestId,
            RequestStatus,
            TransportationMode,
        },
        user::UserId,
        value_objects::DepartmentName,
    };

    #[fixture]
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_772_000_000, 0).unwrap()
    }

    fn period() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 4, 3).unwrap(),
        )
        .unwrap()
    }

    fn leave_details() -> RequestDetails {
        RequestDetails::Leave(LeaveDetails {
            leave_type: LeaveType::Annual,
            period:     period(),
            reason:     LeaveReason::new("帰省").unwrap(),
        })
    }

    fn mission_details() -> RequestDetails {
        RequestDetails::Mission(MissionDetails {
            destination:          Destination::new("Osaka").unwrap(),
            purpose:              MissionPurpose::new("顧客訪問").unwrap(),
            period:               period(),
            estimated_budget:     EstimatedBudget::new(Decimal::new(50_000, 0)).unwrap(),
            transportation_mode:  TransportationMode::Train,
            accommodation_needed: true,
        })
    }

    fn new_request(department: &str, details: RequestDetails, now: DateTime<Utc>) -> NewApprovalRequest {
        NewApprovalRequest {
            id: RequestId::new(),
            requester_id: UserId::new(),
            requester_department: DepartmentName::new(department).unwrap(),
            details,
            now,
        }
    }

    fn chain(roles: &[Role]) -> ApprovalChain {
        ApprovalChain::new(roles.to_vec()).unwrap()
    }

    fn decide(
        state: &Initialized,
        role: Role,
        decision: Decision,
        comment: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Initialized, DecisionDeclined> {
        let authorized = authorize(&state.request, &state.ledger, role)?;
        let applied = authorized
            .apply(
                decision,
                format!("{role} さん"),
                comment.map(|c| DecisionComment::new(c).unwrap()),
                now,
            )
            .unwrap();
        verify_consistency(&applied.request, &applied.ledger).unwrap();
        Ok(Initialized {
            request: applied.request,
            ledger:  applied.ledger,
        })
    }

    fn statuses(ledger: &ApprovalLedger) -> Vec<StepStatus> {
        ledger.steps().iter().map(ApprovalStep::status).collect()
    }

    #[rstest]
    #[case(vec![Role::TeamLeader, Role::HrManager])]
    #[case(vec![Role::Ceo])]
    #[case(vec![Role::TeamLeader, Role::Cfo, Role::HrManager, Role::Ceo])]
    fn test_initialize_はチェーンと同数の未判断ステップを作り先頭を承認者にする(
        now: DateTime<Utc>,
        #[case] roles: Vec<Role>,
    ) {
        let chain = chain(&roles);

        let initialized = initialize(new_request("IT", leave_details(), now), &chain);

        assert_eq!(initialized.ledger.len(), roles.len());
        assert!(initialized.ledger.steps().iter().all(ApprovalStep::is_pending));
        assert_eq!(initialized.request.status(), RequestStatus::Pending);
        assert_eq!(initialized.request.current_approver(), Some(roles[0]));
        assert_eq!(initialized.ledger.approvable(), &initialized.request.approvable());
        verify_consistency(&initialized.request, &initialized.ledger).unwrap();
    }

    #[rstest]
    fn test_承認を順に重ねると承認者が進み最後に承認済みになる(now: DateTime<Utc>) {
        let roles = [Role::TeamLeader, Role::Cfo, Role::HrManager, Role::Ceo];
        let mut state = initialize(new_request("Sales", mission_details(), now), &chain(&roles));

        for (i, role) in roles.iter().enumerate() {
            state = decide(&state, *role, Decision::Approved, None, now).unwrap();
            let expected_next = roles.get(i + 1).copied();
            assert_eq!(state.request.current_approver(), expected_next);
        }

        assert_eq!(state.request.status(), RequestStatus::Approved);
        assert_eq!(state.request.current_approver(), None);
        assert_eq!(statuses(&state.ledger), vec![StepStatus::Approved; 4]);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(2)]
    fn test_却下は即座に終端となり以降のステップは変化しない(
        now: DateTime<Utc>,
        #[case] reject_at: usize,
    ) {
        let roles = [Role::TeamLeader, Role::Cfo, Role::Ceo];
        let mut state = initialize(new_request("Sales", mission_details(), now), &chain(&roles));
        for role in &roles[..reject_at] {
            state = decide(&state, *role, Decision::Approved, None, now).unwrap();
        }

        state = decide(&state, roles[reject_at], Decision::Rejected, Some("不可"), now).unwrap();

        assert_eq!(state.request.status(), RequestStatus::Rejected);
        assert_eq!(state.request.current_approver(), None);
        let rejected = state.ledger.rejected_step().unwrap();
        assert_eq!(rejected.sequence().as_i32(), reject_at as i32 + 1);
        assert!(state.ledger.steps()[reject_at + 1..].iter().all(ApprovalStep::is_pending));

        // 以降のロールは誰も判断できない
        for role in &roles[reject_at + 1..] {
            let declined = decide(&state, *role, Decision::Approved, None, now).unwrap_err();
            assert_eq!(
                declined,
                DecisionDeclined::NotCurrentApprover {
                    acting:  *role,
                    current: None,
                }
            );
        }
    }

    #[rstest]
    #[case(Role::HrManager)]
    #[case(Role::Ceo)]
    #[case(Role::Employee)]
    fn test_現在の承認者以外の判断は拒否され何も変化しない(
        now: DateTime<Utc>,
        #[case] acting: Role,
    ) {
        let state = initialize(
            new_request("IT", leave_details(), now),
            &chain(&[Role::TeamLeader, Role::HrManager]),
        );
        let before = state.clone();

        let result = authorize(&state.request, &state.ledger, acting);

        assert_eq!(
            result.unwrap_err(),
            DecisionDeclined::NotCurrentApprover {
                acting,
                current: Some(Role::TeamLeader),
            }
        );
        assert_eq!(state, before);
    }

    #[rstest]
    fn test_同じロールで2回続けて判断すると2回目は拒否される(now: DateTime<Utc>) {
        let state = initialize(
            new_request("IT", leave_details(), now),
            &chain(&[Role::TeamLeader, Role::HrManager]),
        );

        let state = decide(&state, Role::TeamLeader, Decision::Approved, None, now).unwrap();
        let second = decide(&state, Role::TeamLeader, Decision::Approved, None, now);

        assert_eq!(
            second.unwrap_err(),
            DecisionDeclined::NotCurrentApprover {
                acting:  Role::TeamLeader,
                current: Some(Role::HrManager),
            }
        );
    }

    #[rstest]
    fn test_承認者が一致しても未判断ステップがなければ拒否される(now: DateTime<Utc>) {
        let state = initialize(
            new_request("IT", leave_details(), now),
            &chain(&[Role::TeamLeader, Role::HrManager]),
        );
        // 別経路で先にステップが判断された台帳（読み取り後の競合を模す）
        let raced = decide(&state, Role::TeamLeader, Decision::Approved, None, now).unwrap();

        let result = authorize(&state.request, &raced.ledger, Role::TeamLeader);

        assert_eq!(
            result.unwrap_err(),
            DecisionDeclined::NoPendingStep {
                acting: Role::TeamLeader,
            }
        );
    }

    #[rstest]
    fn test_重複ロールは順序の早いステップから判断される(now: DateTime<Utc>) {
        let state = initialize(
            new_request("IT", leave_details(), now),
            &chain(&[Role::TeamLeader, Role::TeamLeader]),
        );

        let authorized = authorize(&state.request, &state.ledger, Role::TeamLeader).unwrap();
        assert_eq!(authorized.step().sequence(), StepSequence::first());

        let state = decide(&state, Role::TeamLeader, Decision::Approved, None, now).unwrap();
        assert_eq!(state.request.current_approver(), Some(Role::TeamLeader));

        let state = decide(&state, Role::TeamLeader, Decision::Approved, None, now).unwrap();
        assert_eq!(state.request.status(), RequestStatus::Approved);
    }

    #[rstest]
    fn test_it部署の休暇申請_チームリーダー承認後に人事が却下する(now: DateTime<Utc>) {
        let chain = ApprovalChain::resolve(None, crate::request::RequestKind::Leave).chain;
        let state = initialize(new_request("IT", leave_details(), now), &chain);
        assert_eq!(state.request.current_approver(), Some(Role::TeamLeader));

        let later = now + Duration::hours(1);
        let state = decide(&state, Role::TeamLeader, Decision::Approved, None, later).unwrap();
        assert_eq!(state.request.status(), RequestStatus::Pending);
        assert_eq!(state.request.current_approver(), Some(Role::HrManager));

        let state = decide(
            &state,
            Role::HrManager,
            Decision::Rejected,
            Some("insufficient notice"),
            later,
        )
        .unwrap();

        assert_eq!(state.request.status(), RequestStatus::Rejected);
        assert_eq!(state.request.current_approver(), None);
        assert_eq!(state.request.decided_at(), Some(later));
        assert_eq!(
            statuses(&state.ledger),
            vec![StepStatus::Approved, StepStatus::Rejected]
        );
        let rejected = &state.ledger.steps()[1];
        assert_eq!(
            rejected.comments().map(DecisionComment::as_str),
            Some("insufficient notice")
        );
        assert_eq!(rejected.approver_name(), Some("hr_manager さん"));
    }

    #[rstest]
    fn test_適用結果のoutcomeは申請の遷移先を表す(now: DateTime<Utc>) {
        let state = initialize(
            new_request("Finance", mission_details(), now),
            &chain(&[Role::Cfo, Role::Ceo]),
        );

        let first = authorize(&state.request, &state.ledger, Role::Cfo)
            .unwrap()
            .apply(Decision::Approved, "CFO".to_string(), None, now)
            .unwrap();
        assert_eq!(
            first.outcome,
            DecisionOutcome::Advanced {
                next_approver: Role::Ceo,
            }
        );
        assert_eq!(first.decided_step.approver_role(), Role::Cfo);
        assert_eq!(first.request.version().as_u32(), 2);

        let second = authorize(&first.request, &first.ledger, Role::Ceo)
            .unwrap()
            .apply(Decision::Approved, "CEO".to_string(), None, now)
            .unwrap();
        assert_eq!(second.outcome, DecisionOutcome::Approved);
    }

    #[rstest]
    fn test_verify_consistency_は承認者と台帳の不一致を検出する(now: DateTime<Utc>) {
        let state = initialize(
            new_request("IT", leave_details(), now),
            &chain(&[Role::TeamLeader, Role::HrManager]),
        );
        let advanced = decide(&state, Role::TeamLeader, Decision::Approved, None, now).unwrap();

        // 申請は先頭のまま、台帳だけ進んでいる
        let result = verify_consistency(&state.request, &advanced.ledger);

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
