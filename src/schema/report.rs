use super::evidence::WeightAdjustment;
use crate::fingerprint::{AttributionResult, FingerprintRejection};
use crate::fusion::{
    CalibratedVerdict, DisagreementAnalysis, DisagreementClass, ReliabilityWeights, VerdictLabel,
};
use crate::spatial::SpatialAnalysis;
use crate::uncertainty::UncertaintyEstimate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Top-level keys of a serialized report, in output order.
pub const REPORT_FIELDS: &[&str] = &[
    "version",
    "verdict",
    "disagreement",
    "weights",
    "adjustments",
    "spatial",
    "uncertainty",
    "attribution",
    "fingerprint_rejections",
    "summary",
];

/// Everything the fusion core concluded about one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FusionReport {
    pub version: String,
    pub verdict: CalibratedVerdict,
    pub disagreement: DisagreementAnalysis,
    pub weights: ReliabilityWeights,
    pub adjustments: Vec<WeightAdjustment>,
    /// Absent when no detector reported region scores.
    pub spatial: Option<SpatialAnalysis>,
    pub uncertainty: UncertaintyEstimate,
    /// Absent when no valid fingerprint was reported.
    pub attribution: Option<AttributionResult>,
    #[serde(default)]
    pub fingerprint_rejections: Vec<FingerprintRejection>,
    pub summary: String,
}

impl FusionReport {
    /// Calibrated verdict leans AI (`LIKELY_AI` or `AI_GENERATED`).
    pub fn is_ai(&self) -> bool {
        matches!(
            self.verdict.label,
            VerdictLabel::LikelyAi | VerdictLabel::AiGenerated
        )
    }

    pub fn is_composite(&self) -> bool {
        self.spatial.as_ref().is_some_and(|s| s.is_composite)
    }

    pub fn needs_review(&self) -> bool {
        self.uncertainty.reliability.human_review_recommended
    }

    pub fn is_degraded(&self) -> bool {
        self.weights.degraded
    }

    pub fn is_conflict(&self) -> bool {
        self.disagreement.classification == DisagreementClass::Conflict
    }

    /// Generator named by fingerprint attribution, if any.
    pub fn generator(&self) -> Option<&str> {
        self.attribution
            .as_ref()
            .and_then(|a| a.identified_generator.as_deref())
    }
}
