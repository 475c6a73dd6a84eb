//! # Dispute Status Machine
//!
//! Pure lifecycle rules. [`DisputeStatus::transition_to`] validates a
//! requested move and returns the [`Transition`] to apply; it performs no
//! I/O and never mutates a case.
//!
//! ## Transition Graph
//!
//! ```text
//! pending ──▶ under_review ◀──▶ awaiting_response
//!    │             │                  │
//!    │             ├──▶ resolved ◀────┤    (decision only)
//!    │             ├──▶ rejected ◀────┘    (decision only)
//!    └─────────────┴──▶ withdrawn          (complainant only)
//! ```
//!
//! `resolved` and `rejected` are reachable only through the resolution
//! engine. `withdrawn` is reachable only by the complainant.

use serde::{Deserialize, Serialize};

use crate::error::DisputeError;

/// Lifecycle status of a dispute case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Pending,
    UnderReview,
    AwaitingResponse,
    /// Terminal, with an admin decision.
    Resolved,
    /// Terminal, with an admin decision that found no fault and imposed nothing.
    Rejected,
    /// Terminal, complainant-initiated. Never carries a decision.
    Withdrawn,
}

impl DisputeStatus {
    pub fn all() -> &'static [DisputeStatus] {
        &[
            Self::Pending,
            Self::UnderReview,
            Self::AwaitingResponse,
            Self::Resolved,
            Self::Rejected,
            Self::Withdrawn,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::UnderReview => "under_review",
            Self::AwaitingResponse => "awaiting_response",
            Self::Resolved => "resolved",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|st| st.as_str() == s)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Rejected | Self::Withdrawn)
    }

    /// Terminal statuses that must carry an admin decision.
    pub fn is_decided(&self) -> bool {
        matches!(self, Self::Resolved | Self::Rejected)
    }

    /// Statuses from which the resolution engine may decide.
    pub fn accepts_decision(&self) -> bool {
        matches!(self, Self::UnderReview | Self::AwaitingResponse)
    }

    /// Every edge leaving this status, regardless of who may take it.
    pub fn valid_transitions(&self) -> &'static [DisputeStatus] {
        match self {
            Self::Pending => &[Self::UnderReview, Self::Withdrawn],
            Self::UnderReview => &[
                Self::AwaitingResponse,
                Self::Resolved,
                Self::Rejected,
                Self::Withdrawn,
            ],
            Self::AwaitingResponse => &[Self::UnderReview, Self::Resolved, Self::Rejected],
            Self::Resolved | Self::Rejected | Self::Withdrawn => &[],
        }
    }

    /// Validate a move to `target` requested through `trigger`.
    ///
    /// `designate` names the party (or parties) an `awaiting_response`
    /// target waits on; it is ignored for every other target.
    ///
    /// # Errors
    ///
    /// - [`DisputeError::InvalidState`] when the resolution engine targets a
    ///   case that is not yet under review.
    /// - [`DisputeError::InvalidArgument`] when `awaiting_response` does not
    ///   designate exactly one party.
    /// - [`DisputeError::InvalidTransition`] for everything else.
    pub fn transition_to(
        self,
        target: DisputeStatus,
        trigger: Trigger,
        designate: ResponseGate,
    ) -> Result<Transition, DisputeError> {
        let reject = |reason: &str| DisputeError::InvalidTransition {
            from: self,
            to: target,
            reason: reason.to_string(),
        };

        if self.is_terminal() {
            return Err(reject("case is already closed"));
        }
        if self == target {
            return Err(reject("case is already in this status"));
        }

        match target {
            Self::Resolved | Self::Rejected => {
                if trigger != Trigger::Decision {
                    return Err(reject("only an admin decision can close a case this way"));
                }
                if !self.accepts_decision() {
                    return Err(DisputeError::InvalidState {
                        status: self,
                        operation: "decide".to_string(),
                    });
                }
            }
            Self::Withdrawn => {
                if trigger != Trigger::Complainant {
                    return Err(reject("only the complainant can withdraw"));
                }
                if !matches!(self, Self::Pending | Self::UnderReview) {
                    return Err(reject("withdrawal is only possible before a response is requested"));
                }
            }
            Self::UnderReview => match (self, trigger) {
                (Self::Pending, Trigger::Admin)
                | (Self::AwaitingResponse, Trigger::Admin)
                | (Self::AwaitingResponse, Trigger::PartyResponse) => {}
                _ => return Err(reject("not permitted for this actor")),
            },
            Self::AwaitingResponse => {
                if trigger != Trigger::Admin || self != Self::UnderReview {
                    return Err(reject("an admin must request a response from a case under review"));
                }
                if !designate.is_single() {
                    return Err(DisputeError::InvalidArgument(
                        "awaiting_response must designate exactly one party".to_string(),
                    ));
                }
            }
            Self::Pending => return Err(reject("a case never returns to pending")),
        }

        let gate = if target == Self::AwaitingResponse {
            designate
        } else {
            ResponseGate::closed()
        };
        Ok(Transition {
            from: self,
            to: target,
            gate,
        })
    }
}

impl std::fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who or what is asking for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// An admin action: explicit status change or any first admin touch.
    Admin,
    /// The case's complainant acting on their own case.
    Complainant,
    /// A response from the party the case is awaiting.
    PartyResponse,
    /// The resolution engine committing a decision.
    Decision,
}

/// Which parties may currently add a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseGate {
    pub complainant: bool,
    pub respondent: bool,
}

impl ResponseGate {
    /// The gate of a freshly filed case: the respondent may answer.
    pub fn initial() -> Self {
        Self {
            complainant: false,
            respondent: true,
        }
    }

    pub fn closed() -> Self {
        Self::default()
    }

    pub fn complainant() -> Self {
        Self {
            complainant: true,
            respondent: false,
        }
    }

    pub fn respondent() -> Self {
        Self {
            complainant: false,
            respondent: true,
        }
    }

    pub fn is_single(&self) -> bool {
        self.complainant != self.respondent
    }
}

/// A validated status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: DisputeStatus,
    pub to: DisputeStatus,
    /// Response flags after the move.
    pub gate: ResponseGate,
}

impl Transition {
    pub fn closes_case(&self) -> bool {
        self.to.is_terminal()
    }
}
