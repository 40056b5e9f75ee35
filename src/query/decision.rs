//! Keyword decision rules and the canned justifications attached to them.

use rand::Rng;

use crate::config::FallbackPolicy;
use crate::models::{Decision, Justification};

/// Outcome of the decision rules, before justification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub decision: Decision,
    pub confidence: u8,
    pub amount: u64,
    pub rule: Rule,
}

/// Which rule produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Exclusion,
    KneeSurgery,
    Dental,
    Emergency,
    Fallback,
}

pub const REJECTION_CONFIDENCE: u8 = 95;
pub const KNEE_SURGERY: (u8, u64) = (92, 150_000);
pub const DENTAL: (u8, u64) = (88, 25_000);
pub const EMERGENCY: (u8, u64) = (95, 75_000);

const FALLBACK_CONFIDENCE: std::ops::Range<u8> = 75..95;
const FALLBACK_AMOUNT: std::ops::Range<u64> = 10_000..50_000;

/// Offset between the first and second justification confidence.
const SECONDARY_CONFIDENCE_OFFSET: u8 = 5;

/// Apply the rules in priority order to lowercased text.
pub fn decide<R: Rng>(text: &str, fallback: FallbackPolicy, rng: &mut R) -> Verdict {
    let approved = |rule, (confidence, amount): (u8, u64)| Verdict {
        decision: Decision::Approved,
        confidence,
        amount,
        rule,
    };

    if text.contains("pre-existing") || text.contains("heart surgery") {
        Verdict {
            decision: Decision::Rejected,
            confidence: REJECTION_CONFIDENCE,
            amount: 0,
            rule: Rule::Exclusion,
        }
    } else if text.contains("knee surgery") {
        approved(Rule::KneeSurgery, KNEE_SURGERY)
    } else if text.contains("dental") {
        approved(Rule::Dental, DENTAL)
    } else if text.contains("emergency") {
        approved(Rule::Emergency, EMERGENCY)
    } else {
        let values = match fallback {
            FallbackPolicy::Randomized => (
                rng.gen_range(FALLBACK_CONFIDENCE),
                rng.gen_range(FALLBACK_AMOUNT),
            ),
            FallbackPolicy::Fixed { confidence, amount } => (confidence.min(100), amount),
        };
        approved(Rule::Fallback, values)
    }
}

/// The two canned justifications for a verdict.
pub fn justify(verdict: &Verdict) -> Vec<Justification> {
    let (primary, secondary) = match verdict.decision {
        Decision::Approved => (
            (
                "The procedure is covered under the policy's hospitalization benefits.",
                "Policy Document, Section 4.2: Covered Procedures",
            ),
            (
                "The waiting period for the claimed treatment has been satisfied.",
                "Policy Document, Section 3.1: Waiting Periods",
            ),
        ),
        Decision::Rejected => (
            (
                "The claim relates to a condition excluded under the policy terms.",
                "Policy Document, Section 5.1: Exclusions",
            ),
            (
                "Pre-existing and cardiac conditions are not covered during the initial policy period.",
                "Policy Document, Section 5.3: Pre-existing Conditions",
            ),
        ),
    };

    vec![
        Justification {
            text: primary.0.to_string(),
            source: primary.1.to_string(),
            confidence: verdict.confidence,
        },
        Justification {
            text: secondary.0.to_string(),
            source: secondary.1.to_string(),
            confidence: verdict.confidence.saturating_sub(SECONDARY_CONFIDENCE_OFFSET),
        },
    ]
}
