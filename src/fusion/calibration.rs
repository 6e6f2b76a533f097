//! Disagreement-aware calibration
//!
//! Measures how much the detectors disagree and shrinks the fused score
//! toward neutral in proportion:
//!
//! ```text
//! calibrated = neutral + (fused - neutral) * (1 - lambda * disagreement)
//! ```
//!
//! At zero disagreement the fused score passes through untouched.

use super::WeightedScore;
use crate::config::{CalibrationConfig, VerdictBands};
use crate::stats;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Tolerance for the inclusive conflict boundaries.
const BOUNDARY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DisagreementClass {
    Agreement,
    Mild,
    Moderate,
    Severe,
    Conflict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    HighConfidence,
    ModerateConfidence,
    LowConfidence,
    HumanReviewRecommended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictLabel {
    Real,
    LikelyReal,
    Uncertain,
    LikelyAi,
    AiGenerated,
}

impl VerdictBands {
    /// Five-way label for a calibrated score. Monotonic: a higher score never
    /// maps to a more "real" label.
    pub fn label(&self, score: f64) -> VerdictLabel {
        if score >= self.ai_generated {
            VerdictLabel::AiGenerated
        } else if score >= self.likely_ai {
            VerdictLabel::LikelyAi
        } else if score >= self.uncertain {
            VerdictLabel::Uncertain
        } else if score >= self.likely_real {
            VerdictLabel::LikelyReal
        } else {
            VerdictLabel::Real
        }
    }
}

/// Unordered pair of detectors that land on opposite sides of the decision
/// boundary. Names are stored in lexicographic order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct ConflictPair {
    pub first: String,
    pub second: String,
}

impl ConflictPair {
    pub fn new(a: &str, b: &str) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self {
            first: first.to_string(),
            second: second.to_string(),
        }
    }

    pub fn contains(&self, detector: &str) -> bool {
        self.first == detector || self.second == detector
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DisagreementAnalysis {
    pub score: f64,
    pub std_dev: f64,
    pub range: f64,
    pub classification: DisagreementClass,
    pub conflicting_pairs: Vec<ConflictPair>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CalibratedVerdict {
    pub raw_score: f64,
    pub calibrated_score: f64,
    pub trust_score: f64,
    pub recommendation: Recommendation,
    pub label: VerdictLabel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub disagreement: DisagreementAnalysis,
    pub verdict: CalibratedVerdict,
}

fn classify(score: f64, has_conflict: bool, config: &CalibrationConfig) -> DisagreementClass {
    if has_conflict {
        DisagreementClass::Conflict
    } else if score < config.mild_threshold {
        DisagreementClass::Agreement
    } else if score < config.moderate_threshold {
        DisagreementClass::Mild
    } else if score < config.severe_threshold {
        DisagreementClass::Moderate
    } else {
        DisagreementClass::Severe
    }
}

/// Pairs where one detector scores at or above `neutral + margin` and the
/// other at or below `neutral - margin`.
pub fn conflicting_pairs(scores: &[WeightedScore], config: &CalibrationConfig) -> Vec<ConflictPair> {
    let high = config.neutral + config.conflict_margin - BOUNDARY_EPSILON;
    let low = config.neutral - config.conflict_margin + BOUNDARY_EPSILON;

    let mut pairs = Vec::new();
    for (i, a) in scores.iter().enumerate() {
        for b in &scores[i + 1..] {
            let opposed = (a.score >= high && b.score <= low) || (b.score >= high && a.score <= low);
            if opposed {
                pairs.push(ConflictPair::new(&a.detector, &b.detector));
            }
        }
    }
    pairs.sort();
    pairs.dedup();
    pairs
}

pub fn analyze_disagreement(
    scores: &[WeightedScore],
    config: &CalibrationConfig,
) -> DisagreementAnalysis {
    let values: Vec<f64> = scores.iter().map(|s| s.score).collect();
    let weights: Vec<f64> = scores.iter().map(|s| s.weight).collect();

    let std_dev = stats::weighted_std(&values, &weights);
    let range = stats::range(&values);
    let score = stats::clamp_unit(((2.0 * std_dev + range) / 2.0).min(1.0));

    let conflicting_pairs = conflicting_pairs(scores, config);
    let classification = classify(score, !conflicting_pairs.is_empty(), config);

    if classification == DisagreementClass::Conflict {
        log::debug!(
            "detector conflict: {} pair(s), disagreement {:.3}",
            conflicting_pairs.len(),
            score
        );
    }

    DisagreementAnalysis {
        score,
        std_dev,
        range,
        classification,
        conflicting_pairs,
    }
}

/// Shrink `fused` toward neutral by `lambda * disagreement`.
pub fn shrink(fused: f64, disagreement: f64, config: &CalibrationConfig) -> f64 {
    if disagreement == 0.0 {
        return fused;
    }
    let factor = 1.0 - config.shrinkage * disagreement;
    stats::clamp_unit(config.neutral + (fused - config.neutral) * factor)
}

fn recommend(
    classification: DisagreementClass,
    trust: f64,
    config: &CalibrationConfig,
) -> Recommendation {
    if classification == DisagreementClass::Conflict {
        Recommendation::HumanReviewRecommended
    } else if trust < config.moderate_trust {
        Recommendation::LowConfidence
    } else if trust < config.high_trust {
        Recommendation::ModerateConfidence
    } else {
        Recommendation::HighConfidence
    }
}

/// Calibrate a fused score against the disagreement of its inputs.
///
/// `degraded` marks fusion that fell back to the static prior; such results
/// are forced to `conflict` with capped trust so they are never reported as
/// high-confidence.
pub fn calibrate(
    fused: f64,
    scores: &[WeightedScore],
    degraded: bool,
    config: &CalibrationConfig,
) -> Calibration {
    let fused = stats::clamp_unit(fused);
    let mut disagreement = analyze_disagreement(scores, config);

    let calibrated_score = shrink(fused, disagreement.score, config);
    let mut trust_score = stats::clamp_unit(1.0 - disagreement.score);

    if degraded {
        disagreement.classification = DisagreementClass::Conflict;
        trust_score = trust_score.min(config.degraded_trust_cap);
    }

    let recommendation = recommend(disagreement.classification, trust_score, config);
    let label = config.bands.label(calibrated_score);

    Calibration {
        disagreement,
        verdict: CalibratedVerdict {
            raw_score: fused,
            calibrated_score,
            trust_score,
            recommendation,
            label,
        },
    }
}
