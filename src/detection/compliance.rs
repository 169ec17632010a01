//! Compliance evaluator
//!
//! Pure scoring over the normalized detection structure. Confidence only
//! gates whether a category counts as detected; it never scales the score.

use super::normalize::{DetectionResult, PpeItem};

/// Minimum score (percent of categories detected) considered compliant.
/// 3-of-4 or better passes.
pub const COMPLIANCE_THRESHOLD: f32 = 75.0;

/// Percentage of required PPE categories detected
pub fn compliance_score(detected_count: usize) -> f32 {
    detected_count as f32 / PpeItem::ALL.len() as f32 * 100.0
}

pub fn is_compliant(score: f32) -> bool {
    score >= COMPLIANCE_THRESHOLD
}

/// Fill in the derived verdict fields on a normalized result
pub fn evaluate(result: &mut DetectionResult) {
    result.compliance_score = compliance_score(result.detected_count());
    result.is_compliant = is_compliant(result.compliance_score);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_steps() {
        assert_eq!(compliance_score(0), 0.0);
        assert_eq!(compliance_score(1), 25.0);
        assert_eq!(compliance_score(2), 50.0);
        assert_eq!(compliance_score(3), 75.0);
        assert_eq!(compliance_score(4), 100.0);
    }

    #[test]
    fn test_compliance_boundary() {
        assert!(!is_compliant(compliance_score(2)));
        assert!(is_compliant(compliance_score(3)));
        assert!(is_compliant(compliance_score(4)));
        assert!(is_compliant(75.0));
        assert!(!is_compliant(74.9));
    }
}
