//! # Decision Requests and Settlement Planning
//!
//! [`DecisionRequest::validate`] checks a request on its own, before any
//! store is touched. [`plan`] then works out, against the claimed case,
//! what the decision does: which terminal status it produces and whether
//! money is drawn from the respondent caregiver's wallet.
//!
//! | kind                                   | respondent | money  | wallet  | settlement        |
//! |----------------------------------------|------------|--------|---------|-------------------|
//! | favor_complainant / partial_favor      | caregiver  | > 0    | charged | caregiver_wallet  |
//! | favor_complainant / partial_favor      | careseeker | > 0    | -       | external          |
//! | any                                    | any        | 0      | -       | none              |
//!
//! `favor_respondent` and `no_fault` never carry money.

use serde::{Deserialize, Serialize};

use carelink_core::{Amount, Timestamp, UserId};
use carelink_dispute::case::{require_text, MAX_TEXT_LEN};
use carelink_dispute::{
    AdminDecision, DecisionKind, DisputeCase, DisputeStatus, PartyRole, Settlement,
};

use crate::error::ResolutionError;

/// An admin's decision as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub kind: DecisionKind,
    pub resolution: String,
    #[serde(default)]
    pub refund_amount: Option<Amount>,
    #[serde(default)]
    pub compensation_amount: Option<Amount>,
    #[serde(default)]
    pub actions: Vec<String>,
    pub decided_by: UserId,
    #[serde(default)]
    pub notes: Option<String>,
}

impl DecisionRequest {
    /// Validate and normalize: text trimmed, blank actions dropped, zero
    /// amounts folded to `None`.
    pub fn validate(&self) -> Result<DecisionRequest, ResolutionError> {
        let resolution = require_text("resolution", &self.resolution, MAX_TEXT_LEN)
            .map_err(|e| ResolutionError::InvalidDecision(e.to_string()))?;
        let refund = non_zero(self.refund_amount, "refund_amount")?;
        let compensation = non_zero(self.compensation_amount, "compensation_amount")?;

        if !self.kind.finds_respondent_at_fault() && (refund.is_some() || compensation.is_some()) {
            return Err(ResolutionError::InvalidDecision(format!(
                "a {} decision cannot carry a refund or compensation",
                self.kind
            )));
        }

        let actions = self
            .actions
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect();
        let notes = match self.notes.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(text) => Some(
                require_text("notes", text, MAX_TEXT_LEN)
                    .map_err(|e| ResolutionError::InvalidDecision(e.to_string()))?,
            ),
        };

        Ok(DecisionRequest {
            kind: self.kind,
            resolution,
            refund_amount: refund,
            compensation_amount: compensation,
            actions,
            decided_by: self.decided_by,
            notes,
        })
    }

    pub fn total_amount(&self) -> Amount {
        self.refund_amount.unwrap_or(Amount::ZERO) + self.compensation_amount.unwrap_or(Amount::ZERO)
    }

    /// Whether the decision dismisses the complaint outright.
    pub fn dismisses(&self) -> bool {
        matches!(self.kind, DecisionKind::FavorRespondent | DecisionKind::NoFault)
            && self.total_amount().is_zero()
            && self.actions.is_empty()
    }
}

fn non_zero(amount: Option<Amount>, field: &str) -> Result<Option<Amount>, ResolutionError> {
    match amount {
        None => Ok(None),
        Some(a) => {
            let a = a
                .require_non_negative(field)
                .map_err(|e| ResolutionError::InvalidDecision(e.to_string()))?;
            Ok((!a.is_zero()).then_some(a))
        }
    }
}

/// What a validated decision does to a specific case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionPlan {
    /// The decision to record. `ledger_transaction` is filled in by the
    /// engine once the wallet has been charged.
    pub decision: AdminDecision,
    pub target: DisputeStatus,
    /// Amount to draw from the respondent caregiver's wallet.
    pub charge: Option<Amount>,
}

/// Plan a validated request against `case`.
pub fn plan(case: &DisputeCase, request: &DecisionRequest, now: Timestamp) -> DecisionPlan {
    let total = request.total_amount();
    let settlement = if total.is_zero() || !request.kind.finds_respondent_at_fault() {
        Settlement::None
    } else {
        match case.respondent.role {
            PartyRole::Caregiver => Settlement::CaregiverWallet,
            PartyRole::Careseeker => Settlement::External,
        }
    };
    let target = if request.dismisses() {
        DisputeStatus::Rejected
    } else {
        DisputeStatus::Resolved
    };

    DecisionPlan {
        decision: AdminDecision {
            kind: request.kind,
            resolution: request.resolution.clone(),
            refund_amount: request.refund_amount,
            compensation_amount: request.compensation_amount,
            actions: request.actions.clone(),
            decided_by: request.decided_by,
            decided_at: now,
            notes: request.notes.clone(),
            settlement,
            ledger_transaction: None,
        },
        target,
        charge: (settlement == Settlement::CaregiverWallet).then_some(total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carelink_core::BookingId;
    use carelink_dispute::{DisputeType, NewDispute, Party, RequestedResolution};

    fn request(kind: DecisionKind) -> DecisionRequest {
        DecisionRequest {
            kind,
            resolution: "  Caregiver left the shift early  ".into(),
            refund_amount: None,
            compensation_amount: None,
            actions: vec![],
            decided_by: UserId::new(),
            notes: None,
        }
    }

    fn case(respondent: PartyRole) -> DisputeCase {
        let complainant = match respondent {
            PartyRole::Caregiver => PartyRole::Careseeker,
            PartyRole::Careseeker => PartyRole::Caregiver,
        };
        DisputeCase::open(
            NewDispute {
                complainant: Party {
                    user_id: UserId::new(),
                    role: complainant,
                },
                respondent: Party {
                    user_id: UserId::new(),
                    role: respondent,
                },
                booking: BookingId::new(),
                dispute_type: DisputeType::ServiceQuality,
                title: "Shift cut short".into(),
                description: "Left two hours early".into(),
                severity: Default::default(),
                priority: Default::default(),
                requested_resolution: RequestedResolution::Refund,
                requested_amount: None,
                evidence: vec![],
                deadline: None,
            },
            Timestamp::now(),
        )
        .unwrap()
    }

    #[test]
    fn validation_normalizes() {
        let mut req = request(DecisionKind::PartialFavor);
        req.refund_amount = Some(Amount::new(2_500));
        req.compensation_amount = Some(Amount::ZERO);
        req.actions = vec![" warn caregiver ".into(), "  ".into()];
        req.notes = Some("   ".into());
        let v = req.validate().unwrap();
        assert_eq!(v.resolution, "Caregiver left the shift early");
        assert_eq!(v.compensation_amount, None);
        assert_eq!(v.actions, vec!["warn caregiver".to_string()]);
        assert_eq!(v.notes, None);
        assert_eq!(v.total_amount(), Amount::new(2_500));
    }

    #[test]
    fn blank_resolution_and_negative_amounts_are_rejected() {
        let mut req = request(DecisionKind::FavorComplainant);
        req.resolution = "  ".into();
        assert!(matches!(req.validate(), Err(ResolutionError::InvalidDecision(_))));

        let mut req = request(DecisionKind::FavorComplainant);
        req.refund_amount = Some(Amount::new(-1));
        assert!(matches!(req.validate(), Err(ResolutionError::InvalidDecision(_))));
    }

    #[test]
    fn dismissals_cannot_carry_money() {
        for kind in [DecisionKind::FavorRespondent, DecisionKind::NoFault] {
            let mut req = request(kind);
            req.compensation_amount = Some(Amount::new(100));
            assert!(matches!(req.validate(), Err(ResolutionError::InvalidDecision(_))));

            // An explicit zero is fine.
            let mut req = request(kind);
            req.refund_amount = Some(Amount::ZERO);
            assert!(req.validate().is_ok());
        }
    }

    #[test]
    fn caregiver_at_fault_is_charged() {
        let mut req = request(DecisionKind::FavorComplainant);
        req.refund_amount = Some(Amount::new(3_000));
        req.compensation_amount = Some(Amount::new(500));
        let p = plan(&case(PartyRole::Caregiver), &req.validate().unwrap(), Timestamp::now());
        assert_eq!(p.charge, Some(Amount::new(3_500)));
        assert_eq!(p.decision.settlement, Settlement::CaregiverWallet);
        assert_eq!(p.target, DisputeStatus::Resolved);
    }

    #[test]
    fn careseeker_respondent_settles_externally() {
        let mut req = request(DecisionKind::FavorComplainant);
        req.refund_amount = Some(Amount::new(3_000));
        let p = plan(&case(PartyRole::Careseeker), &req.validate().unwrap(), Timestamp::now());
        assert_eq!(p.charge, None);
        assert_eq!(p.decision.settlement, Settlement::External);
    }

    #[test]
    fn terminal_status_by_kind() {
        let c = case(PartyRole::Caregiver);
        let now = Timestamp::now();

        let p = plan(&c, &request(DecisionKind::NoFault).validate().unwrap(), now);
        assert_eq!(p.target, DisputeStatus::Rejected);
        assert_eq!(p.decision.settlement, Settlement::None);

        let mut req = request(DecisionKind::FavorRespondent);
        req.actions = vec!["remind careseeker of cancellation policy".into()];
        let p = plan(&c, &req.validate().unwrap(), now);
        assert_eq!(p.target, DisputeStatus::Resolved);

        // At fault but no money: resolved, nothing charged.
        let p = plan(&c, &request(DecisionKind::FavorComplainant).validate().unwrap(), now);
        assert_eq!(p.target, DisputeStatus::Resolved);
        assert_eq!(p.charge, None);
    }
}
