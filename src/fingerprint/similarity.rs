//! Component-wise similarity between two feature vectors.

use crate::config::{FingerprintConfig, SimilarityWeights};
use crate::schema::{FeatureVector, NoiseType};
use crate::stats;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Credit given when the noise types differ.
const NOISE_TYPE_PARTIAL: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SimilarityBreakdown {
    pub spectral: f64,
    pub color: f64,
    pub texture: f64,
    pub noise: f64,
    pub overall: f64,
}

fn closeness(a: f64, b: f64) -> f64 {
    stats::clamp_unit(1.0 - (a - b).abs())
}

/// Shortest angular distance between two hues, in degrees (0..=180).
pub fn hue_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).abs() % 360.0;
    d.min(360.0 - d)
}

pub fn spectral_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mean_diff = a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum::<f64>() / a.len() as f64;
    stats::clamp_unit(1.0 - mean_diff)
}

pub fn color_similarity(a: &FeatureVector, b: &FeatureVector) -> f64 {
    let (a, b) = (&a.color_profile, &b.color_profile);
    let temperature = if a.temperature == b.temperature { 1.0 } else { 0.0 };
    0.3 * closeness(a.saturation_mean, b.saturation_mean)
        + 0.2 * closeness(a.saturation_variance, b.saturation_variance)
        + 0.3 * (1.0 - hue_distance(a.dominant_hue, b.dominant_hue) / 180.0)
        + 0.2 * temperature
}

pub fn texture_similarity(a: &FeatureVector, b: &FeatureVector) -> f64 {
    let (a, b) = (&a.texture_profile, &b.texture_profile);
    (closeness(a.smoothness, b.smoothness)
        + closeness(a.repetitiveness, b.repetitiveness)
        + closeness(a.detail_level, b.detail_level))
        / 3.0
}

fn noise_type_score(a: NoiseType, b: NoiseType) -> f64 {
    if a == b { 1.0 } else { NOISE_TYPE_PARTIAL }
}

pub fn noise_similarity(a: &FeatureVector, b: &FeatureVector) -> f64 {
    let (a, b) = (&a.noise_profile, &b.noise_profile);
    0.8 * noise_type_score(a.noise_type, b.noise_type) + 0.2 * closeness(a.level, b.level)
}

pub fn compare(a: &FeatureVector, b: &FeatureVector, weights: &SimilarityWeights) -> SimilarityBreakdown {
    let spectral = spectral_similarity(&a.spectral_bands, &b.spectral_bands);
    let color = color_similarity(a, b);
    let texture = texture_similarity(a, b);
    let noise = noise_similarity(a, b);
    let overall = stats::clamp_unit(
        weights.spectral * spectral
            + weights.color * color
            + weights.texture * texture
            + weights.noise * noise,
    );
    SimilarityBreakdown {
        spectral,
        color,
        texture,
        noise,
        overall,
    }
}

/// Human-readable tags for the features on which `image` matches `reference`.
pub fn matching_features(
    image: &FeatureVector,
    reference: &FeatureVector,
    config: &FingerprintConfig,
) -> Vec<String> {
    let tol = config.feature_tolerance;
    let near = |a: f64, b: f64| (a - b).abs() <= tol;
    let (ic, rc) = (&image.color_profile, &reference.color_profile);
    let (it, rt) = (&image.texture_profile, &reference.texture_profile);
    let (inz, rn) = (&image.noise_profile, &reference.noise_profile);

    let mut tags = Vec::new();
    if spectral_similarity(&image.spectral_bands, &reference.spectral_bands) >= config.spectral_match {
        tags.push("spectral distribution");
    }
    if near(ic.saturation_mean, rc.saturation_mean) {
        tags.push("color saturation");
    }
    if hue_distance(ic.dominant_hue, rc.dominant_hue) <= config.hue_tolerance {
        tags.push("dominant hue");
    }
    if ic.temperature == rc.temperature {
        tags.push("color temperature");
    }
    if near(it.smoothness, rt.smoothness) {
        tags.push("texture smoothness");
    }
    if near(it.repetitiveness, rt.repetitiveness) {
        tags.push("pattern repetition");
    }
    if near(it.detail_level, rt.detail_level) {
        tags.push("detail level");
    }
    if near(inz.level, rn.level) {
        tags.push("noise level");
    }
    if inz.noise_type == rn.noise_type {
        tags.push("noise type");
    }
    tags.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::test_vectors::flat;
    use crate::schema::ColorTemperature;

    #[test]
    fn identical_vectors_are_fully_similar() {
        let v = flat();
        let s = compare(&v, &v, &SimilarityWeights::default());
        assert!((s.overall - 1.0).abs() < 1e-12);
        assert!((s.color - 1.0).abs() < 1e-12);
        assert_eq!(matching_features(&v, &v, &FingerprintConfig::default()).len(), 9);
    }

    #[test]
    fn hue_wraps_around() {
        assert_eq!(hue_distance(350.0, 10.0), 20.0);
        assert_eq!(hue_distance(0.0, 180.0), 180.0);
        assert_eq!(hue_distance(90.0, 90.0), 0.0);
    }

    #[test]
    fn noise_type_mismatch_gets_partial_credit() {
        let a = flat();
        let mut b = flat();
        b.noise_profile.noise_type = NoiseType::Structured;
        // 0.8 * 0.25 + 0.2 * 1.0
        assert!((noise_similarity(&a, &b) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn color_components_are_weighted() {
        let a = flat();
        let mut b = flat();
        b.color_profile.temperature = ColorTemperature::Warm;
        b.color_profile.dominant_hue = 0.0;
        // saturation terms 0.5, hue 0, temperature 0
        assert!((color_similarity(&a, &b) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn spectral_mismatch_in_length_is_zero() {
        assert_eq!(spectral_similarity(&[0.5, 0.5], &[1.0]), 0.0);
    }

    #[test]
    fn tags_respect_tolerances() {
        let a = flat();
        let mut b = flat();
        b.texture_profile.smoothness = 0.65;
        b.color_profile.dominant_hue = 215.0;
        let tags = matching_features(&a, &b, &FingerprintConfig::default());
        assert!(!tags.contains(&"texture smoothness".to_string()));
        assert!(!tags.contains(&"dominant hue".to_string()));
        assert!(tags.contains(&"pattern repetition".to_string()));
    }
}
