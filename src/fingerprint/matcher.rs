//! Ranking against the registry and the AI/real vote.

use super::registry::{GeneratorRegistry, SignatureKind};
use super::similarity::{self, SimilarityBreakdown};
use crate::config::FingerprintConfig;
use crate::schema::{FeatureVector, NoiseType};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GeneratorMatch {
    pub name: String,
    pub kind: SignatureKind,
    /// Overall similarity in `[0, 1]`.
    pub confidence: f64,
    pub matching_features: Vec<String>,
    pub similarity: SimilarityBreakdown,
}

impl GeneratorMatch {
    pub fn is_real_photo(&self) -> bool {
        self.kind == SignatureKind::RealPhoto
    }
}

/// Image-level evidence that counts toward an AI verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AiIndicator {
    SmoothTexture,
    LowRepetition,
    SyntheticNoise,
    CorroboratedFeatures,
    StrongMatch,
}

/// Which rule carried the AI verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VoteRule {
    IndicatorMajority,
    GeneratorMargin,
    DecisiveFeatures,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FingerprintVote {
    pub is_ai_generated: bool,
    pub ai_confidence: f64,
    pub identified_generator: Option<String>,
    pub indicators: Vec<AiIndicator>,
    pub rules: Vec<VoteRule>,
}

/// Score the image against every signature, best first.
///
/// The sort is stable, so equal similarities keep registry order.
pub fn rank(
    image: &FeatureVector,
    registry: &GeneratorRegistry,
    config: &FingerprintConfig,
) -> Vec<GeneratorMatch> {
    let mut matches: Vec<GeneratorMatch> = registry
        .iter()
        .map(|sig| {
            let similarity = similarity::compare(image, &sig.features, &config.weights);
            GeneratorMatch {
                name: sig.name.clone(),
                kind: sig.kind,
                confidence: similarity.overall,
                matching_features: similarity::matching_features(image, &sig.features, config),
                similarity,
            }
        })
        .collect();
    matches.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    matches
}

fn indicators(
    image: &FeatureVector,
    leader: Option<&GeneratorMatch>,
    config: &FingerprintConfig,
) -> Vec<AiIndicator> {
    let mut found = Vec::new();
    if image.texture_profile.smoothness > config.smoothness_threshold {
        found.push(AiIndicator::SmoothTexture);
    }
    if image.texture_profile.repetitiveness < config.repetitiveness_threshold {
        found.push(AiIndicator::LowRepetition);
    }
    if image.noise_profile.noise_type == NoiseType::Uniform
        || image.noise_profile.level < config.low_noise_level
    {
        found.push(AiIndicator::SyntheticNoise);
    }
    if let Some(leader) = leader {
        if leader.matching_features.len() >= config.corroborating_features {
            found.push(AiIndicator::CorroboratedFeatures);
        }
        if leader.confidence > config.match_threshold {
            found.push(AiIndicator::StrongMatch);
        }
    }
    found
}

/// Decide AI vs real from a ranked match list.
///
/// `matches` must be sorted best first, as returned by [`rank`]. Feature
/// tags and match strength only count when a generator leads the ranking;
/// when the real-photo baseline is the best match they support "real".
pub fn decide(
    image: &FeatureVector,
    matches: &[GeneratorMatch],
    config: &FingerprintConfig,
) -> FingerprintVote {
    let leader = matches.first().filter(|m| !m.is_real_photo());
    let top = matches.iter().find(|m| !m.is_real_photo());
    let real_similarity = matches
        .iter()
        .find(|m| m.is_real_photo())
        .map_or(0.0, |m| m.confidence);

    let indicators = indicators(image, leader, config);
    let top_similarity = top.map_or(0.0, |m| m.confidence);
    let top_tags = leader.map_or(0, |m| m.matching_features.len());

    let mut rules = Vec::new();
    if indicators.len() >= config.min_indicators {
        rules.push(VoteRule::IndicatorMajority);
    }
    if top.is_some()
        && top_similarity - real_similarity >= config.real_photo_margin - 1e-12
        && indicators.len() >= config.corroborated_indicators
    {
        rules.push(VoteRule::GeneratorMargin);
    }
    if top_tags >= config.decisive_features {
        rules.push(VoteRule::DecisiveFeatures);
    }

    let is_ai_generated = !rules.is_empty();
    let ai_confidence = if is_ai_generated {
        (top_similarity
            + config.indicator_boost * indicators.len() as f64
            + config.feature_boost * top_tags as f64)
            .min(config.confidence_cap)
    } else {
        (1.0 - real_similarity).max(config.confidence_floor)
    };

    FingerprintVote {
        is_ai_generated,
        ai_confidence: crate::stats::clamp_unit(ai_confidence),
        identified_generator: if is_ai_generated {
            top.map(|m| m.name.clone())
        } else {
            None
        },
        indicators,
        rules,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::test_vectors::flat;

    fn hand_match(name: &str, kind: SignatureKind, confidence: f64, tags: usize) -> GeneratorMatch {
        GeneratorMatch {
            name: name.to_string(),
            kind,
            confidence,
            matching_features: (0..tags).map(|i| format!("feature {}", i)).collect(),
            similarity: SimilarityBreakdown {
                spectral: confidence,
                color: confidence,
                texture: confidence,
                noise: confidence,
                overall: confidence,
            },
        }
    }

    fn synthetic_looking() -> FeatureVector {
        let mut v = flat();
        v.texture_profile.smoothness = 0.9;
        v.texture_profile.repetitiveness = 0.1;
        v.noise_profile.noise_type = NoiseType::Uniform;
        v
    }

    #[test]
    fn boosted_confidence_for_strong_match() {
        let matches = vec![
            hand_match("Midjourney", SignatureKind::Generator, 0.8, 3),
            hand_match("Real Photo", SignatureKind::RealPhoto, 0.4, 1),
        ];
        let vote = decide(&synthetic_looking(), &matches, &FingerprintConfig::default());
        assert!(vote.is_ai_generated);
        assert!(vote.ai_confidence > 0.8);
        assert_eq!(vote.ai_confidence, 0.95);
        assert_eq!(vote.identified_generator.as_deref(), Some("Midjourney"));
        assert_eq!(vote.indicators.len(), 5);
        assert_eq!(
            vote.rules,
            vec![
                VoteRule::IndicatorMajority,
                VoteRule::GeneratorMargin,
                VoteRule::DecisiveFeatures
            ]
        );
    }

    #[test]
    fn photo_like_image_is_real() {
        let mut image = flat();
        image.noise_profile.level = 0.35;
        let matches = vec![
            hand_match("Real Photo", SignatureKind::RealPhoto, 0.9, 5),
            hand_match("Flux", SignatureKind::Generator, 0.6, 1),
        ];
        let vote = decide(&image, &matches, &FingerprintConfig::default());
        assert!(!vote.is_ai_generated);
        assert!(vote.identified_generator.is_none());
        assert!((vote.ai_confidence - 0.1).abs() < 1e-12);
        assert!(vote.rules.is_empty());
    }

    #[test]
    fn non_ai_confidence_has_a_floor() {
        let matches = vec![hand_match("Real Photo", SignatureKind::RealPhoto, 1.0, 0)];
        let vote = decide(&flat(), &matches, &FingerprintConfig::default());
        assert!(!vote.is_ai_generated);
        assert_eq!(vote.ai_confidence, 0.05);
    }

    #[test]
    fn margin_rule_needs_two_indicators() {
        let mut image = flat();
        image.texture_profile.smoothness = 0.9;
        image.noise_profile.level = 0.3;
        let matches = vec![
            hand_match("DALL-E 3", SignatureKind::Generator, 0.75, 1),
            hand_match("Real Photo", SignatureKind::RealPhoto, 0.5, 0),
        ];
        let vote = decide(&image, &matches, &FingerprintConfig::default());
        // smooth texture + strong match
        assert_eq!(vote.indicators.len(), 2);
        assert_eq!(vote.rules, vec![VoteRule::GeneratorMargin]);
        assert!(vote.is_ai_generated);
    }

    #[test]
    fn ranking_is_sorted_and_stable() {
        let registry = GeneratorRegistry::builtin();
        let image = registry.get("Flux").unwrap().features.clone();
        let matches = rank(&image, &registry, &FingerprintConfig::default());
        assert_eq!(matches.len(), registry.len());
        assert_eq!(matches[0].name, "Flux");
        assert!((matches[0].confidence - 1.0).abs() < 1e-12);
        assert!(
            matches
                .windows(2)
                .all(|w| w[0].confidence >= w[1].confidence)
        );
    }

    #[test]
    fn ties_keep_registry_order() {
        use super::super::registry::GeneratorSignature;
        let twin = |name: &str, kind| GeneratorSignature {
            name: name.to_string(),
            kind,
            characteristics: Vec::new(),
            features: flat(),
        };
        let registry = GeneratorRegistry::new(vec![
            twin("Zeta", SignatureKind::Generator),
            twin("Alpha", SignatureKind::Generator),
            twin("Baseline", SignatureKind::RealPhoto),
        ])
        .unwrap();
        let names: Vec<String> = rank(&flat(), &registry, &FingerprintConfig::default())
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Baseline"]);
    }
}
