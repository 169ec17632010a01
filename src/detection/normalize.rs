//! Detection result normalizer
//!
//! Maps the raw class/confidence list returned by the detection API onto the
//! four tracked PPE categories. Class labels are matched case-insensitively by
//! substring against fixed synonym sets, gated by a per-category confidence
//! threshold. When several raw detections land in the same category the
//! recorded confidence is the maximum across them: a re-detection must never
//! lower an already-established confidence.

use serde::{Deserialize, Serialize};

use super::compliance;
use super::provider::DetectionOutcome;

/// The four tracked PPE categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PpeItem {
    Helmet,
    Mask,
    Gloves,
    Jacket,
}

impl PpeItem {
    pub const ALL: [PpeItem; 4] = [
        PpeItem::Helmet,
        PpeItem::Mask,
        PpeItem::Gloves,
        PpeItem::Jacket,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PpeItem::Helmet => "helmet",
            PpeItem::Mask => "mask",
            PpeItem::Gloves => "gloves",
            PpeItem::Jacket => "jacket",
        }
    }

    /// Model class labels that map onto this category
    pub fn synonyms(self) -> &'static [&'static str] {
        match self {
            PpeItem::Helmet => &["helmet", "hard_hat", "safety_helmet"],
            PpeItem::Mask => &["mask", "face_mask", "respirator", "n95"],
            PpeItem::Gloves => &["gloves", "safety_gloves", "work_gloves"],
            PpeItem::Jacket => &["jacket", "safety_jacket", "high_visibility", "hi_vis", "vest"],
        }
    }

    /// Minimum confidence for a raw detection to count toward this category
    pub fn confidence_threshold(self) -> f32 {
        0.5
    }
}

/// One raw detection as returned by the detection API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDetection {
    pub label: String,
    pub confidence: f32,
}

/// Normalized per-category detection state plus the derived compliance verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub helmet_detected: bool,
    pub mask_detected: bool,
    pub gloves_detected: bool,
    pub jacket_detected: bool,

    pub helmet_confidence: f32,
    pub mask_confidence: f32,
    pub gloves_confidence: f32,
    pub jacket_confidence: f32,

    pub is_compliant: bool,
    pub compliance_score: f32,

    /// True when the detection service was unreachable or returned nothing
    /// usable. The verdict is still computed (score 0, non-compliant) but an
    /// upstream outage stays distinguishable from a worker wearing nothing.
    pub detector_degraded: bool,
}

impl DetectionResult {
    pub fn empty(degraded: bool) -> Self {
        Self {
            helmet_detected: false,
            mask_detected: false,
            gloves_detected: false,
            jacket_detected: false,
            helmet_confidence: 0.0,
            mask_confidence: 0.0,
            gloves_confidence: 0.0,
            jacket_confidence: 0.0,
            is_compliant: false,
            compliance_score: 0.0,
            detector_degraded: degraded,
        }
    }

    pub fn item(&self, item: PpeItem) -> (bool, f32) {
        match item {
            PpeItem::Helmet => (self.helmet_detected, self.helmet_confidence),
            PpeItem::Mask => (self.mask_detected, self.mask_confidence),
            PpeItem::Gloves => (self.gloves_detected, self.gloves_confidence),
            PpeItem::Jacket => (self.jacket_detected, self.jacket_confidence),
        }
    }

    pub fn detected_count(&self) -> usize {
        PpeItem::ALL.iter().filter(|&&i| self.item(i).0).count()
    }

    pub fn missing_items(&self) -> Vec<PpeItem> {
        PpeItem::ALL
            .iter()
            .copied()
            .filter(|&i| !self.item(i).0)
            .collect()
    }

    /// Record an accepted detection for a category, keeping the max confidence
    fn record(&mut self, item: PpeItem, confidence: f32) {
        let (detected, conf) = match item {
            PpeItem::Helmet => (&mut self.helmet_detected, &mut self.helmet_confidence),
            PpeItem::Mask => (&mut self.mask_detected, &mut self.mask_confidence),
            PpeItem::Gloves => (&mut self.gloves_detected, &mut self.gloves_confidence),
            PpeItem::Jacket => (&mut self.jacket_detected, &mut self.jacket_confidence),
        };
        *detected = true;
        *conf = conf.max(confidence);
    }
}

/// Normalize a raw detection outcome into the four-slot PPE structure and
/// compute the compliance verdict
pub fn normalize(outcome: &DetectionOutcome) -> DetectionResult {
    let mut result = DetectionResult::empty(outcome.degraded);

    for raw in &outcome.raw {
        let label = raw.label.to_lowercase();

        for item in PpeItem::ALL {
            let matches = item.synonyms().iter().any(|syn| label.contains(syn));
            if matches && raw.confidence >= item.confidence_threshold() {
                result.record(item, raw.confidence);
            }
        }
    }

    compliance::evaluate(&mut result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(label: &str, confidence: f32) -> RawDetection {
        RawDetection {
            label: label.to_string(),
            confidence,
        }
    }

    fn outcome(detections: Vec<RawDetection>) -> DetectionOutcome {
        DetectionOutcome {
            raw: detections,
            degraded: false,
        }
    }

    #[test]
    fn test_three_of_four_is_compliant() {
        let result = normalize(&outcome(vec![
            raw("hard_hat", 0.9),
            raw("n95", 0.8),
            raw("safety_gloves", 0.6),
        ]));

        assert!(result.helmet_detected);
        assert!(result.mask_detected);
        assert!(result.gloves_detected);
        assert!(!result.jacket_detected);
        assert_eq!(result.compliance_score, 75.0);
        assert!(result.is_compliant);
        assert_eq!(result.missing_items(), vec![PpeItem::Jacket]);
    }

    #[test]
    fn test_empty_detections_are_max_non_compliance() {
        let result = normalize(&outcome(vec![]));

        assert_eq!(result.detected_count(), 0);
        assert_eq!(result.compliance_score, 0.0);
        assert!(!result.is_compliant);
        assert!(!result.detector_degraded);
    }

    #[test]
    fn test_degraded_outcome_is_flagged() {
        let result = normalize(&DetectionOutcome::unavailable());

        assert_eq!(result.compliance_score, 0.0);
        assert!(!result.is_compliant);
        assert!(result.detector_degraded);
    }

    #[test]
    fn test_duplicate_detection_keeps_max_confidence() {
        let result = normalize(&outcome(vec![raw("helmet", 0.9), raw("hard_hat", 0.6)]));
        assert!(result.helmet_detected);
        assert_eq!(result.helmet_confidence, 0.9);

        // Order must not matter either
        let reversed = normalize(&outcome(vec![raw("hard_hat", 0.6), raw("helmet", 0.9)]));
        assert_eq!(reversed.helmet_confidence, 0.9);
    }

    #[test]
    fn test_below_threshold_detection_is_rejected() {
        let result = normalize(&outcome(vec![raw("helmet", 0.49)]));
        assert!(!result.helmet_detected);
        assert_eq!(result.helmet_confidence, 0.0);

        let accepted = normalize(&outcome(vec![raw("helmet", 0.5)]));
        assert!(accepted.helmet_detected);
    }

    #[test]
    fn test_label_match_is_case_insensitive_substring() {
        let result = normalize(&outcome(vec![
            raw("Worker-Safety_Helmet", 0.7),
            raw("HI_VIS-vest", 0.8),
        ]));
        assert!(result.helmet_detected);
        assert!(result.jacket_detected);
        assert!(!result.mask_detected);
        assert!(!result.gloves_detected);
    }

    #[test]
    fn test_score_is_always_a_quarter_step() {
        let sequences: Vec<Vec<RawDetection>> = vec![
            vec![],
            vec![raw("helmet", 0.9)],
            vec![raw("helmet", 0.9), raw("mask", 0.9)],
            vec![raw("helmet", 0.9), raw("mask", 0.9), raw("gloves", 0.9)],
            vec![
                raw("helmet", 0.9),
                raw("mask", 0.9),
                raw("gloves", 0.9),
                raw("vest", 0.9),
            ],
        ];

        for (count, detections) in sequences.into_iter().enumerate() {
            let result = normalize(&outcome(detections));
            assert_eq!(result.compliance_score, count as f32 * 25.0);
            assert_eq!(result.is_compliant, result.compliance_score >= 75.0);
        }
    }
}
