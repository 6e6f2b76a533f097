//! Reliability estimation, weighted fusion and calibration.
//!
//! These three stages form a single pipeline: each detector's reliability
//! reshapes its static prior, the resulting weights fuse the raw scores, and
//! the calibrator shrinks the fused score according to how much the
//! detectors disagree.

pub mod calibration;
pub mod reliability;
pub mod weights;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use calibration::{
    CalibratedVerdict, Calibration, ConflictPair, DisagreementAnalysis, DisagreementClass,
    Recommendation, VerdictLabel, analyze_disagreement, calibrate,
};
pub use reliability::{ReliabilityAssessment, assess, estimate};
pub use weights::{DetectorWeight, FusionOutcome, ReliabilityWeights, fuse};

/// One detector's clamped score together with its final fusion weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WeightedScore {
    pub detector: String,
    pub score: f64,
    pub weight: f64,
    pub confidence: f64,
}
