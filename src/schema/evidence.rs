use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The dominant influence on a detector's reliability.
#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReliabilityFactor {
    Error,
    Fallback,
    Latency,
    LowConfidence,
    Nominal,
    /// Fusion fell back to the static prior because no detector was usable.
    StaticPrior,
}

/// Audit record explaining how one detector's weight moved during fusion.
#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, PartialEq)]
pub struct WeightAdjustment {
    pub detector: String,
    /// Normalized static prior before reliability was applied.
    pub original_weight: f64,
    /// Final normalized weight used for fusion.
    pub adjusted_weight: f64,
    pub reliability: f64,
    pub factor: ReliabilityFactor,
    pub reason: String,
}

fn direction(original: f64, adjusted: f64) -> &'static str {
    let delta = adjusted - original;
    if delta > 1e-3 {
        "raised"
    } else if delta < -1e-3 {
        "lowered"
    } else {
        "kept"
    }
}

impl WeightAdjustment {
    fn build(
        detector: impl Into<String>,
        original_weight: f64,
        adjusted_weight: f64,
        reliability: f64,
        factor: ReliabilityFactor,
        cause: String,
    ) -> Self {
        let reason = format!(
            "{}; weight {} from {:.3} to {:.3}",
            cause,
            direction(original_weight, adjusted_weight),
            original_weight,
            adjusted_weight
        );
        Self {
            detector: detector.into(),
            original_weight,
            adjusted_weight,
            reliability,
            factor,
            reason,
        }
    }

    /// Detector reported `status = error` and was pinned to the reliability floor.
    pub fn errored(
        detector: impl Into<String>,
        original_weight: f64,
        adjusted_weight: f64,
        floor: f64,
    ) -> Self {
        Self::build(
            detector,
            original_weight,
            adjusted_weight,
            floor,
            ReliabilityFactor::Error,
            format!("detector errored, reliability pinned to floor {:.2}", floor),
        )
    }

    /// Detector answered from a degraded fallback path.
    pub fn fallback(
        detector: impl Into<String>,
        original_weight: f64,
        adjusted_weight: f64,
        reliability: f64,
    ) -> Self {
        Self::build(
            detector,
            original_weight,
            adjusted_weight,
            reliability,
            ReliabilityFactor::Fallback,
            format!("fallback mode, reliability {:.2}", reliability),
        )
    }

    pub fn slow(
        detector: impl Into<String>,
        original_weight: f64,
        adjusted_weight: f64,
        reliability: f64,
        latency_ms: f64,
    ) -> Self {
        Self::build(
            detector,
            original_weight,
            adjusted_weight,
            reliability,
            ReliabilityFactor::Latency,
            format!(
                "high latency ({:.0} ms), reliability {:.2}",
                latency_ms, reliability
            ),
        )
    }

    pub fn low_confidence(
        detector: impl Into<String>,
        original_weight: f64,
        adjusted_weight: f64,
        reliability: f64,
        confidence: f64,
    ) -> Self {
        Self::build(
            detector,
            original_weight,
            adjusted_weight,
            reliability,
            ReliabilityFactor::LowConfidence,
            format!(
                "low internal confidence ({:.2}), reliability {:.2}",
                confidence, reliability
            ),
        )
    }

    pub fn nominal(
        detector: impl Into<String>,
        original_weight: f64,
        adjusted_weight: f64,
        reliability: f64,
    ) -> Self {
        Self::build(
            detector,
            original_weight,
            adjusted_weight,
            reliability,
            ReliabilityFactor::Nominal,
            format!("healthy detector, reliability {:.2}", reliability),
        )
    }

    /// No detector was usable; the weight is the static prior.
    pub fn static_prior(
        detector: impl Into<String>,
        original_weight: f64,
        adjusted_weight: f64,
        reliability: f64,
    ) -> Self {
        Self::build(
            detector,
            original_weight,
            adjusted_weight,
            reliability,
            ReliabilityFactor::StaticPrior,
            "no usable detectors, falling back to static prior".to_string(),
        )
    }
}
