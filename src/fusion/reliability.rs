//! Reliability estimation
//!
//! Converts a detector's self-reported confidence, health status and latency
//! into a single reliability scalar in `[floor, 1]`.

use crate::config::ReliabilityConfig;
use crate::schema::{DetectorObservation, DetectorStatus, ReliabilityFactor};

/// Reliability of one detector plus the factor that drove it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReliabilityAssessment {
    pub reliability: f64,
    pub factor: ReliabilityFactor,
    /// `latency / max_expected_latency`, capped at 1.
    pub latency_ratio: f64,
}

fn status_multiplier(status: DetectorStatus, config: &ReliabilityConfig) -> f64 {
    match status {
        DetectorStatus::Success => 1.0,
        DetectorStatus::Fallback => config.fallback_multiplier,
        DetectorStatus::Error => 0.0,
    }
}

fn latency_ratio(latency_ms: f64, config: &ReliabilityConfig) -> f64 {
    if latency_ms.is_nan() {
        return 1.0;
    }
    (latency_ms.max(0.0) / config.max_expected_latency_ms).min(1.0)
}

/// Reliability scalar for one observation.
pub fn estimate(observation: &DetectorObservation, config: &ReliabilityConfig) -> f64 {
    assess(observation, config).reliability
}

pub fn assess(observation: &DetectorObservation, config: &ReliabilityConfig) -> ReliabilityAssessment {
    let ratio = latency_ratio(observation.latency_ms, config);

    if observation.is_error() {
        return ReliabilityAssessment {
            reliability: config.floor,
            factor: ReliabilityFactor::Error,
            latency_ratio: ratio,
        };
    }

    let confidence = observation.confidence();
    // Latency penalty is capped at 50%.
    let latency_score = 1.0 - 0.5 * ratio;

    let raw = config.confidence_weight * confidence
        + config.status_weight * status_multiplier(observation.status, config)
        + config.latency_weight * latency_score;
    let reliability = if raw.is_finite() {
        raw.clamp(config.floor, 1.0)
    } else {
        config.floor
    };

    let factor = if observation.status == DetectorStatus::Fallback {
        ReliabilityFactor::Fallback
    } else if ratio >= config.slow_latency_ratio {
        ReliabilityFactor::Latency
    } else if confidence < config.low_confidence {
        ReliabilityFactor::LowConfidence
    } else {
        ReliabilityFactor::Nominal
    };

    ReliabilityAssessment {
        reliability,
        factor,
        latency_ratio: ratio,
    }
}
