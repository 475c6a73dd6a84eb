//! Read-side aggregation over dispute cases.
//!
//! Counts are computed from one listing of the store and carry that
//! listing's [`Watermark`]. Every known status, type, priority and
//! severity appears in its map, with zero when no case has it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use carelink_core::Watermark;
use carelink_dispute::{DisputeCase, DisputeStatus, DisputeType, Priority, Severity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DisputeStatistics {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub by_severity: BTreeMap<String, usize>,
    /// Open cases that no admin has been assigned to.
    pub unassigned_open: usize,
    /// Cases awaiting manual reconciliation.
    pub flagged_for_reconciliation: usize,
    #[schema(value_type = Object)]
    pub watermark: Watermark,
}

impl DisputeStatistics {
    pub fn from_cases(cases: &[DisputeCase], watermark: Watermark) -> Self {
        let mut by_status = zeroed(DisputeStatus::all().iter().map(DisputeStatus::as_str));
        let mut by_type = zeroed(DisputeType::all().iter().map(DisputeType::as_str));
        let mut by_priority = zeroed(Priority::all().iter().map(Priority::as_str));
        let mut by_severity = zeroed(Severity::all().iter().map(Severity::as_str));
        let mut unassigned_open = 0;
        let mut flagged_for_reconciliation = 0;

        for case in cases {
            bump(&mut by_status, case.status.as_str());
            bump(&mut by_type, case.dispute_type.as_str());
            bump(&mut by_priority, case.priority.as_str());
            bump(&mut by_severity, case.severity.as_str());
            if !case.status.is_terminal() && case.assigned_to.is_none() {
                unassigned_open += 1;
            }
            if case.reconciliation.is_some() {
                flagged_for_reconciliation += 1;
            }
        }

        Self {
            total: cases.len(),
            by_status,
            by_type,
            by_priority,
            by_severity,
            unassigned_open,
            flagged_for_reconciliation,
            watermark,
        }
    }
}

fn zeroed<'a>(keys: impl Iterator<Item = &'a str>) -> BTreeMap<String, usize> {
    keys.map(|k| (k.to_string(), 0)).collect()
}

fn bump(map: &mut BTreeMap<String, usize>, key: &str) {
    *map.entry(key.to_string()).or_default() += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use carelink_core::{BookingId, Timestamp, UserId};
    use carelink_dispute::{NewDispute, Party, PartyRole, RequestedResolution};

    fn case(dispute_type: DisputeType, severity: Severity) -> DisputeCase {
        DisputeCase::open(
            NewDispute {
                complainant: Party {
                    user_id: UserId::new(),
                    role: PartyRole::Careseeker,
                },
                respondent: Party {
                    user_id: UserId::new(),
                    role: PartyRole::Caregiver,
                },
                booking: BookingId::new(),
                dispute_type,
                title: "Late".into(),
                description: "Arrived an hour late".into(),
                severity,
                priority: Priority::Medium,
                requested_resolution: RequestedResolution::Apology,
                requested_amount: None,
                evidence: vec![],
                deadline: None,
            },
            Timestamp::now(),
        )
        .unwrap()
    }

    #[test]
    fn counts_every_dimension() {
        let mut assigned = case(DisputeType::PaymentIssue, Severity::High);
        assigned.assign(UserId::new(), Timestamp::now()).unwrap();
        let cases = vec![
            case(DisputeType::ServiceQuality, Severity::Low),
            case(DisputeType::ServiceQuality, Severity::High),
            assigned,
        ];
        let watermark = Watermark::from_updates(cases.iter().map(|c| c.updated_at));
        let stats = DisputeStatistics::from_cases(&cases, watermark);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_status["pending"], 2);
        assert_eq!(stats.by_status["under_review"], 1);
        assert_eq!(stats.by_status["resolved"], 0);
        assert_eq!(stats.by_type["service_quality"], 2);
        assert_eq!(stats.by_severity["high"], 2);
        assert_eq!(stats.by_priority["medium"], 3);
        assert_eq!(stats.unassigned_open, 2);
        assert_eq!(stats.flagged_for_reconciliation, 0);
        assert_eq!(stats.watermark.records, 3);
    }

    #[test]
    fn empty_store_still_lists_every_key() {
        let stats = DisputeStatistics::from_cases(&[], Watermark::from_updates([]));
        assert_eq!(stats.total, 0);
        assert_eq!(stats.by_status.len(), DisputeStatus::all().len());
        assert!(stats.watermark.last_updated.is_none());
    }
}
