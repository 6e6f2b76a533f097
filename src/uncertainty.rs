//! Uncertainty quantification over the detector ensemble.
//!
//! Splits the uncertainty of a verdict into an aleatoric part (detectors that
//! are individually unsure) and an epistemic part (detectors that disagree
//! with each other), and turns both into a reliability rating.

use crate::config::UncertaintyConfig;
use crate::fusion::weights::normalize;
use crate::fusion::{Calibration, DisagreementClass, WeightedScore};
use crate::schema::EnsembleVoter;
use crate::stats;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    /// Coverage level, e.g. 0.95.
    pub level: f64,
}

impl ConfidenceInterval {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UncertaintyDecomposition {
    pub aleatoric: f64,
    pub epistemic: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReliabilityLevel {
    VeryLow,
    Low,
    Moderate,
    High,
}

impl ReliabilityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ReliabilityLevel::VeryLow => "very_low",
            ReliabilityLevel::Low => "low",
            ReliabilityLevel::Moderate => "moderate",
            ReliabilityLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VerdictReliability {
    pub score: f64,
    pub level: ReliabilityLevel,
    pub human_review_recommended: bool,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UncertaintyEstimate {
    pub prediction: f64,
    pub confidence_interval: ConfidenceInterval,
    pub std_dev: f64,
    pub decomposition: UncertaintyDecomposition,
    pub reliability: VerdictReliability,
    pub voter_count: usize,
}

struct Voter {
    score: f64,
    weight: f64,
    confidence: f64,
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

fn collect_voters(scores: &[WeightedScore], ensemble: &[EnsembleVoter]) -> Vec<Voter> {
    let detectors = scores.iter().map(|s| Voter {
        score: stats::clamp_unit(s.score),
        weight: non_negative(s.weight),
        confidence: stats::clamp_unit(s.confidence),
    });
    let auxiliary = ensemble.iter().map(|v| Voter {
        score: if v.score.is_finite() {
            stats::clamp_unit(v.score)
        } else {
            0.5
        },
        weight: non_negative(v.weight),
        confidence: stats::clamp_unit(v.confidence),
    });
    let mut voters: Vec<Voter> = detectors.chain(auxiliary).collect();

    let raw: Vec<f64> = voters.iter().map(|v| v.weight).collect();
    for (voter, weight) in voters.iter_mut().zip(normalize(&raw)) {
        voter.weight = weight;
    }
    voters
}

/// Combine two independent uncertainties: `1 - (1 - a)(1 - e)`.
pub fn combine(aleatoric: f64, epistemic: f64) -> f64 {
    stats::clamp_unit(1.0 - (1.0 - aleatoric) * (1.0 - epistemic))
}

fn level_for(score: f64, config: &UncertaintyConfig) -> ReliabilityLevel {
    if score >= config.high_reliability {
        ReliabilityLevel::High
    } else if score >= config.moderate_reliability {
        ReliabilityLevel::Moderate
    } else if score >= config.low_reliability {
        ReliabilityLevel::Low
    } else {
        ReliabilityLevel::VeryLow
    }
}

fn explain(
    level: ReliabilityLevel,
    decomposition: &UncertaintyDecomposition,
    calibration: &Calibration,
) -> String {
    let disagreement = &calibration.disagreement;
    if disagreement.classification == DisagreementClass::Conflict {
        if disagreement.conflicting_pairs.is_empty() {
            return "no usable detectors; verdict rests on static priors".to_string();
        }
        let pairs: Vec<String> = disagreement
            .conflicting_pairs
            .iter()
            .map(|p| format!("{} vs {}", p.first, p.second))
            .collect();
        return format!("detectors conflict ({})", pairs.join(", "));
    }
    match level {
        ReliabilityLevel::High => "detectors agree and report high confidence".to_string(),
        _ if decomposition.epistemic >= decomposition.aleatoric => format!(
            "disagreement between detectors dominates (epistemic {:.2})",
            decomposition.epistemic
        ),
        _ => format!(
            "individual detectors are unsure (aleatoric {:.2})",
            decomposition.aleatoric
        ),
    }
}

/// Quantify the uncertainty of a calibrated verdict.
///
/// `scores` are the detectors with their final fusion weights; `ensemble`
/// adds auxiliary voters with their own relative weights. All voter weights
/// are normalized together.
pub fn quantify(
    scores: &[WeightedScore],
    ensemble: &[EnsembleVoter],
    calibration: &Calibration,
    config: &UncertaintyConfig,
) -> UncertaintyEstimate {
    let voters = collect_voters(scores, ensemble);
    let level = config.level;

    let (prediction, std_dev, aleatoric) = if voters.is_empty() {
        (0.5, 0.0, 1.0)
    } else {
        let values: Vec<f64> = voters.iter().map(|v| v.score).collect();
        let weights: Vec<f64> = voters.iter().map(|v| v.weight).collect();
        let aleatoric: f64 = voters.iter().map(|v| v.weight * (1.0 - v.confidence)).sum();
        (
            stats::weighted_mean(&values, &weights),
            stats::weighted_std(&values, &weights),
            stats::clamp_unit(aleatoric),
        )
    };

    let half_width = level.z_score() * std_dev;
    let confidence_interval = ConfidenceInterval {
        lower: stats::clamp_unit(prediction - half_width),
        upper: stats::clamp_unit(prediction + half_width),
        level: level.level(),
    };

    let epistemic = (config.epistemic_scale * std_dev).min(1.0);
    let decomposition = UncertaintyDecomposition {
        aleatoric,
        epistemic,
        total: combine(aleatoric, epistemic),
    };

    let score = stats::clamp_unit(
        0.5 * calibration.verdict.trust_score + 0.5 * (1.0 - decomposition.total),
    );
    let reliability_level = level_for(score, config);
    let human_review_recommended = matches!(
        reliability_level,
        ReliabilityLevel::Low | ReliabilityLevel::VeryLow
    ) || calibration.disagreement.classification == DisagreementClass::Conflict;

    let reliability = VerdictReliability {
        score,
        level: reliability_level,
        human_review_recommended,
        reason: explain(reliability_level, &decomposition, calibration),
    };

    UncertaintyEstimate {
        prediction,
        confidence_interval,
        std_dev,
        decomposition,
        reliability,
        voter_count: voters.len(),
    }
}
