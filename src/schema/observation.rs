use super::features::FeatureVector;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Health reported by a detector alongside its score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DetectorStatus {
    #[default]
    Success,
    Fallback,
    Error,
}

/// Anchor regions a detector may score independently.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

impl Region {
    pub const ALL: [Region; 5] = [
        Region::TopLeft,
        Region::TopRight,
        Region::BottomLeft,
        Region::BottomRight,
        Region::Center,
    ];

    /// Normalized `(x, y)` lattice position of the anchor.
    pub fn anchor(self) -> (f64, f64) {
        match self {
            Region::TopLeft => (0.0, 0.0),
            Region::TopRight => (1.0, 0.0),
            Region::BottomLeft => (0.0, 1.0),
            Region::BottomRight => (1.0, 1.0),
            Region::Center => (0.5, 0.5),
        }
    }
}

pub type RegionScores = BTreeMap<Region, f64>;

/// One detector's opinion about one image.
///
/// Produced by an external detector collaborator; the fusion core only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectorObservation {
    pub name: String,
    pub raw_score: f64,
    pub internal_confidence: f64,
    #[serde(default)]
    pub status: DetectorStatus,
    #[serde(default)]
    pub latency_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_scores: Option<RegionScores>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<FeatureVector>,
}

impl DetectorObservation {
    pub fn new(name: impl Into<String>, raw_score: f64, internal_confidence: f64) -> Self {
        Self {
            name: name.into(),
            raw_score,
            internal_confidence,
            status: DetectorStatus::Success,
            latency_ms: 0.0,
            region_scores: None,
            fingerprint: None,
        }
    }

    pub fn with_status(mut self, status: DetectorStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_latency(mut self, latency_ms: f64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_regions(mut self, regions: RegionScores) -> Self {
        self.region_scores = Some(regions);
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: FeatureVector) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    /// Raw score clamped to `[0, 1]`; a non-finite score reads as neutral.
    pub fn score(&self) -> f64 {
        if self.raw_score.is_finite() {
            self.raw_score.clamp(0.0, 1.0)
        } else {
            0.5
        }
    }

    /// Self-reported confidence clamped to `[0, 1]`; non-finite reads as 0.
    pub fn confidence(&self) -> f64 {
        if self.internal_confidence.is_finite() {
            self.internal_confidence.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == DetectorStatus::Error
    }
}

/// An auxiliary analysis branch that votes in uncertainty quantification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EnsembleVoter {
    pub name: String,
    pub score: f64,
    /// Relative weight against the (normalized) detector weights.
    pub weight: f64,
    pub confidence: f64,
}

/// Everything the fusion core needs for one image.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisRequest {
    pub observations: Vec<DetectorObservation>,
    /// Independent region-score source blended into the spatial map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auxiliary_regions: Option<RegionScores>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ensemble: Vec<EnsembleVoter>,
}

impl AnalysisRequest {
    pub fn new(observations: Vec<DetectorObservation>) -> Self {
        Self {
            observations,
            auxiliary_regions: None,
            ensemble: Vec::new(),
        }
    }

    pub fn with_auxiliary_regions(mut self, regions: RegionScores) -> Self {
        self.auxiliary_regions = Some(regions);
        self
    }

    pub fn with_ensemble(mut self, voters: Vec<EnsembleVoter>) -> Self {
        self.ensemble = voters;
        self
    }
}
