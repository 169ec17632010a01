//! PPE detection pipeline - remote provider, normalizer and evaluator

pub mod compliance;
pub mod normalize;
pub mod provider;

pub use normalize::{normalize, DetectionResult, PpeItem, RawDetection};
pub use provider::{DetectionOutcome, DetectionProvider, ImageSource, RoboflowDetector};
