//! Reliability-weighted fusion
//!
//! Scales each detector's static prior by its reliability, normalizes the
//! result into a weight vector that sums to one (with a per-detector floor)
//! and fuses the raw scores with it. Every detector gets an audit record.

use super::reliability::{self, ReliabilityAssessment};
use super::WeightedScore;
use crate::config::{ReliabilityConfig, WeightingConfig};
use crate::schema::{DetectorObservation, ReliabilityFactor, WeightAdjustment};
use crate::stats;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Adjusted weights below this total count as "no usable detector".
const ZERO_TOTAL: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectorWeight {
    pub detector: String,
    pub weight: f64,
}

/// Normalized per-detector weights, in observation order.
///
/// Weights sum to 1 and none is below the configured floor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ReliabilityWeights {
    pub entries: Vec<DetectorWeight>,
    /// True when no detector was usable and the static prior was used instead.
    pub degraded: bool,
}

impl ReliabilityWeights {
    /// Weight of the first detector with this name.
    pub fn get(&self, detector: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.detector == detector)
            .map(|e| e.weight)
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.weight).collect()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.weight).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FusionOutcome {
    pub weights: ReliabilityWeights,
    pub fused_score: f64,
    pub adjustments: Vec<WeightAdjustment>,
}

impl FusionOutcome {
    /// The `(score, weight, confidence)` set consumed by calibration and
    /// uncertainty quantification.
    pub fn weighted_scores(&self, observations: &[DetectorObservation]) -> Vec<WeightedScore> {
        observations
            .iter()
            .zip(&self.weights.entries)
            .map(|(obs, entry)| WeightedScore {
                detector: obs.name.clone(),
                score: obs.score(),
                weight: entry.weight,
                confidence: obs.confidence(),
            })
            .collect()
    }

    pub fn is_degraded(&self) -> bool {
        self.weights.degraded
    }
}

/// Normalize to sum 1; uniform when the input sums to (about) zero.
pub fn normalize(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let total: f64 = values.iter().sum();
    if !(total.is_finite() && total > ZERO_TOTAL) {
        return vec![1.0 / values.len() as f64; values.len()];
    }
    values.iter().map(|v| v / total).collect()
}

/// Lift every weight to at least `floor` while keeping the sum at 1.
///
/// Uses `w' = floor + (1 - n * floor) * w`, which preserves the ordering of
/// the input weights. When `n * floor >= 1` the only feasible answer is uniform.
pub fn apply_floor(weights: &[f64], floor: f64) -> Vec<f64> {
    let n = weights.len() as f64;
    if floor <= 0.0 || weights.is_empty() {
        return weights.to_vec();
    }
    if n * floor >= 1.0 {
        return vec![1.0 / n; weights.len()];
    }
    let scale = 1.0 - n * floor;
    weights.iter().map(|w| floor + scale * w).collect()
}

fn prior_of(detector: &str, priors: &WeightingConfig) -> f64 {
    let w = priors.base_weight(detector);
    if w.is_finite() { w.max(0.0) } else { 0.0 }
}

/// Fuse detector observations into a single probability.
pub fn fuse(
    observations: &[DetectorObservation],
    priors: &WeightingConfig,
    reliability_config: &ReliabilityConfig,
) -> FusionOutcome {
    if observations.is_empty() {
        return FusionOutcome {
            weights: ReliabilityWeights {
                entries: Vec::new(),
                degraded: true,
            },
            fused_score: 0.5,
            adjustments: Vec::new(),
        };
    }

    let base: Vec<f64> = observations
        .iter()
        .map(|o| prior_of(&o.name, priors))
        .collect();
    let assessments: Vec<ReliabilityAssessment> = observations
        .iter()
        .map(|o| reliability::assess(o, reliability_config))
        .collect();

    let adjusted: Vec<f64> = base
        .iter()
        .zip(&assessments)
        .map(|(b, a)| b * a.reliability)
        .collect();
    let total: f64 = adjusted.iter().sum();
    let all_errored = observations.iter().all(DetectorObservation::is_error);
    let degraded = all_errored || !(total.is_finite() && total > ZERO_TOTAL);

    let original = normalize(&base);
    let normalized = if degraded {
        log::warn!(
            "no usable detectors among {}; falling back to static prior",
            observations.len()
        );
        original.clone()
    } else {
        normalize(&adjusted)
    };
    let final_weights = apply_floor(&normalized, priors.weight_floor);

    let scores: Vec<f64> = observations.iter().map(DetectorObservation::score).collect();
    let fused_score = stats::clamp_unit(stats::weighted_mean(&scores, &final_weights));

    let adjustments = observations
        .iter()
        .zip(&assessments)
        .zip(original.iter().zip(&final_weights))
        .map(|((obs, assessment), (&orig, &adj))| {
            let name = obs.name.clone();
            let rel = assessment.reliability;
            if degraded {
                return WeightAdjustment::static_prior(name, orig, adj, rel);
            }
            match assessment.factor {
                ReliabilityFactor::Error => WeightAdjustment::errored(name, orig, adj, rel),
                ReliabilityFactor::Fallback => WeightAdjustment::fallback(name, orig, adj, rel),
                ReliabilityFactor::Latency => {
                    WeightAdjustment::slow(name, orig, adj, rel, obs.latency_ms)
                }
                ReliabilityFactor::LowConfidence => {
                    WeightAdjustment::low_confidence(name, orig, adj, rel, obs.confidence())
                }
                ReliabilityFactor::Nominal | ReliabilityFactor::StaticPrior => {
                    WeightAdjustment::nominal(name, orig, adj, rel)
                }
            }
        })
        .collect();

    let entries = observations
        .iter()
        .zip(&final_weights)
        .map(|(obs, &weight)| DetectorWeight {
            detector: obs.name.clone(),
            weight,
        })
        .collect();

    log::debug!(
        "fused {} detectors into {:.4} (degraded={})",
        observations.len(),
        fused_score,
        degraded
    );

    FusionOutcome {
        weights: ReliabilityWeights { entries, degraded },
        fused_score,
        adjustments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DetectorStatus;

    fn observations() -> Vec<DetectorObservation> {
        vec![
            DetectorObservation::new("semantic_vision", 0.9, 0.95),
            DetectorObservation::new("frequency_spectrum", 0.7, 0.6).with_latency(4_000.0),
            DetectorObservation::new("metadata", 0.2, 0.4).with_status(DetectorStatus::Fallback),
        ]
    }

    fn run(obs: &[DetectorObservation]) -> FusionOutcome {
        fuse(obs, &WeightingConfig::default(), &ReliabilityConfig::default())
    }

    #[test]
    fn weights_sum_to_one() {
        let outcome = run(&observations());
        assert!((outcome.weights.total() - 1.0).abs() < 1e-9);
        assert!(!outcome.is_degraded());
    }

    #[test]
    fn weights_respect_floor() {
        let mut priors = WeightingConfig::default();
        priors.base_weights.insert("metadata".into(), 0.0);
        let outcome = fuse(&observations(), &priors, &ReliabilityConfig::default());
        for entry in &outcome.weights.entries {
            assert!(entry.weight >= priors.weight_floor - 1e-15, "{:?}", entry);
        }
        assert!((outcome.weights.get("metadata").unwrap() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn reliable_detector_gains_weight() {
        let outcome = run(&observations());
        let vision = &outcome.adjustments[0];
        assert!(vision.adjusted_weight > vision.original_weight);
        assert_eq!(vision.factor, ReliabilityFactor::Nominal);
        assert_eq!(outcome.adjustments[1].factor, ReliabilityFactor::Latency);
        assert_eq!(outcome.adjustments[2].factor, ReliabilityFactor::Fallback);
    }

    #[test]
    fn fused_score_is_weighted_sum() {
        let obs = observations();
        let outcome = run(&obs);
        let expected: f64 = obs
            .iter()
            .zip(outcome.weights.values())
            .map(|(o, w)| o.raw_score * w)
            .sum();
        assert!((outcome.fused_score - expected).abs() < 1e-12);
    }

    #[test]
    fn all_errored_falls_back_to_static_prior() {
        let obs: Vec<_> = observations()
            .into_iter()
            .map(|o| o.with_status(DetectorStatus::Error))
            .collect();
        let outcome = run(&obs);
        assert!(outcome.is_degraded());
        assert!((outcome.weights.total() - 1.0).abs() < 1e-9);
        assert!(
            outcome
                .adjustments
                .iter()
                .all(|a| a.factor == ReliabilityFactor::StaticPrior)
        );
        // semantic_vision 0.35 vs frequency 0.20 vs metadata 0.15 keeps its lead.
        assert!(outcome.weights.get("semantic_vision") > outcome.weights.get("metadata"));
    }

    #[test]
    fn zero_priors_fall_back_to_uniform() {
        let mut priors = WeightingConfig::default();
        priors.base_weights.clear();
        priors.default_base_weight = 0.0;
        let outcome = fuse(&observations(), &priors, &ReliabilityConfig::default());
        assert!(outcome.is_degraded());
        for w in outcome.weights.values() {
            assert!((w - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn empty_input_is_degraded_and_neutral() {
        let outcome = run(&[]);
        assert!(outcome.is_degraded());
        assert_eq!(outcome.fused_score, 0.5);
        assert!(outcome.weights.is_empty());
    }

    #[test]
    fn floor_larger_than_share_gives_uniform() {
        let w = apply_floor(&[0.9, 0.1, 0.0], 0.4);
        assert_eq!(w, vec![1.0 / 3.0; 3]);
    }

    #[test]
    fn floor_preserves_order_and_sum() {
        let w = apply_floor(&[0.7, 0.2, 0.1, 0.0], 0.05);
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(w.windows(2).all(|p| p[0] >= p[1]));
        assert!((w[3] - 0.05).abs() < 1e-15);
    }

    #[test]
    fn weighted_scores_follow_observation_order() {
        let obs = observations();
        let outcome = run(&obs);
        let scored = outcome.weighted_scores(&obs);
        assert_eq!(scored.len(), 3);
        assert_eq!(scored[2].detector, "metadata");
        assert_eq!(scored[2].score, 0.2);
        assert_eq!(scored[2].confidence, 0.4);
    }
}
