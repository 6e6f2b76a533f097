//! Fingerprint attribution
//!
//! Picks the most trustworthy valid fingerprint reported by the detectors,
//! ranks it against the generator registry and votes on whether the image
//! is AI-generated and by which source.

pub mod matcher;
pub mod registry;
pub mod similarity;

use crate::config::FingerprintConfig;
use crate::schema::{DetectorObservation, FeatureVector};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use matcher::{AiIndicator, FingerprintVote, GeneratorMatch, VoteRule, decide, rank};
pub use registry::{GeneratorRegistry, GeneratorSignature, RegistryError, SignatureKind};
pub use similarity::{SimilarityBreakdown, compare, matching_features};

/// A detector fingerprint that failed validation and was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FingerprintRejection {
    pub detector: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AttributionResult {
    /// Detector whose fingerprint was matched.
    pub source_detector: String,
    pub is_ai_generated: bool,
    pub ai_confidence: f64,
    pub identified_generator: Option<String>,
    pub indicators: Vec<AiIndicator>,
    pub rules: Vec<VoteRule>,
    /// Every registry entry, best first.
    pub all_matches: Vec<GeneratorMatch>,
}

impl AttributionResult {
    pub fn top_match(&self) -> Option<&GeneratorMatch> {
        self.all_matches.first()
    }
}

/// The fingerprint to match, plus every malformed one that was skipped.
///
/// Valid fingerprints are ranked by the reporting detector's internal
/// confidence; ties go to the earlier observation.
pub fn select_fingerprint(
    observations: &[DetectorObservation],
) -> (Option<(&str, &FeatureVector)>, Vec<FingerprintRejection>) {
    let mut rejections = Vec::new();
    let mut candidates: Vec<(&DetectorObservation, &FeatureVector)> = Vec::new();

    for obs in observations {
        let Some(fingerprint) = &obs.fingerprint else {
            continue;
        };
        match fingerprint.validate() {
            Ok(()) => candidates.push((obs, fingerprint)),
            Err(e) => {
                log::warn!("skipping fingerprint from {}: {}", obs.name, e);
                rejections.push(FingerprintRejection {
                    detector: obs.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    candidates.sort_by(|a, b| b.0.confidence().total_cmp(&a.0.confidence()));
    let selected = candidates
        .first()
        .map(|(obs, fingerprint)| (obs.name.as_str(), *fingerprint));
    (selected, rejections)
}

/// Rank and vote on one fingerprint.
pub fn attribute_features(
    source_detector: &str,
    image: &FeatureVector,
    registry: &GeneratorRegistry,
    config: &FingerprintConfig,
) -> AttributionResult {
    let all_matches = rank(image, registry, config);
    let vote = decide(image, &all_matches, config);
    AttributionResult {
        source_detector: source_detector.to_string(),
        is_ai_generated: vote.is_ai_generated,
        ai_confidence: vote.ai_confidence,
        identified_generator: vote.identified_generator,
        indicators: vote.indicators,
        rules: vote.rules,
        all_matches,
    }
}

/// Select a fingerprint from the observations and attribute it.
pub fn attribute(
    observations: &[DetectorObservation],
    registry: &GeneratorRegistry,
    config: &FingerprintConfig,
) -> (Option<AttributionResult>, Vec<FingerprintRejection>) {
    let (selected, rejections) = select_fingerprint(observations);
    let result = selected
        .map(|(detector, image)| attribute_features(detector, image, registry, config));
    (result, rejections)
}
