//! Respondent satisfaction with a closed case.
//!
//! Purely additive: recording a rating never changes status and never
//! touches the ledger. See [`DisputeCase::rate`](crate::DisputeCase::rate).

use serde::{Deserialize, Serialize};

use carelink_core::Timestamp;

use crate::case::{require_text, MAX_TEXT_LEN};
use crate::error::DisputeError;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Satisfaction {
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub rated_at: Timestamp,
}

impl Satisfaction {
    pub fn new(rating: i64, feedback: Option<String>, now: Timestamp) -> Result<Self, DisputeError> {
        let rating = validate_rating(rating)?;
        let feedback = match feedback.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(text) => Some(require_text("feedback", text, MAX_TEXT_LEN)?),
        };
        Ok(Self {
            rating,
            feedback,
            rated_at: now,
        })
    }
}

pub fn validate_rating(rating: i64) -> Result<u8, DisputeError> {
    u8::try_from(rating)
        .ok()
        .filter(|r| (MIN_RATING..=MAX_RATING).contains(r))
        .ok_or_else(|| {
            DisputeError::InvalidArgument(format!(
                "rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds() {
        for ok in 1..=5 {
            assert!(validate_rating(ok).is_ok());
        }
        for bad in [0, 6, -1, 256] {
            assert!(matches!(
                validate_rating(bad),
                Err(DisputeError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn blank_feedback_is_dropped() {
        let s = Satisfaction::new(3, Some("   ".into()), Timestamp::now()).unwrap();
        assert_eq!(s.feedback, None);
        let s = Satisfaction::new(5, Some(" Thanks ".into()), Timestamp::now()).unwrap();
        assert_eq!(s.feedback.as_deref(), Some("Thanks"));
    }
}
