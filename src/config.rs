use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "SYNTHSENSE_CONFIG";

const SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn require_unit(field: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(invalid(field, format!("{} is outside 0..=1", value)));
    }
    Ok(())
}

fn require_sum_to_one(field: &str, parts: &[f64]) -> Result<(), ConfigError> {
    let sum: f64 = parts.iter().sum();
    if (sum - 1.0).abs() > SUM_TOLERANCE {
        return Err(invalid(field, format!("weights sum to {}, expected 1", sum)));
    }
    Ok(())
}

fn require_ascending(field: &str, values: &[f64]) -> Result<(), ConfigError> {
    if values.windows(2).any(|w| w[0] >= w[1]) {
        return Err(invalid(field, format!("{:?} must be strictly ascending", values)));
    }
    Ok(())
}

/// Tunable constants for the whole fusion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct FusionConfig {
    #[serde(default)]
    pub reliability: ReliabilityConfig,
    #[serde(default)]
    pub fusion: WeightingConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub spatial: SpatialConfig,
    #[serde(default)]
    pub uncertainty: UncertaintyConfig,
    #[serde(default)]
    pub fingerprint: FingerprintConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ReliabilityConfig {
    /// Weight of the detector's self-reported confidence (alpha).
    pub confidence_weight: f64,
    /// Weight of the status multiplier (beta).
    pub status_weight: f64,
    /// Weight of the latency score (gamma).
    pub latency_weight: f64,
    pub fallback_multiplier: f64,
    pub max_expected_latency_ms: f64,
    pub floor: f64,
    /// Latency ratio above which latency is reported as the dominant factor.
    pub slow_latency_ratio: f64,
    /// Confidence below which low confidence is reported as the dominant factor.
    pub low_confidence: f64,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            confidence_weight: 0.5,
            status_weight: 0.3,
            latency_weight: 0.2,
            fallback_multiplier: 0.5,
            max_expected_latency_ms: 5000.0,
            floor: 0.1,
            slow_latency_ratio: 0.5,
            low_confidence: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WeightingConfig {
    /// Prior for detectors missing from `base_weights`.
    pub default_base_weight: f64,
    /// Minimum normalized weight any detector keeps.
    pub weight_floor: f64,
    /// Static prior per detector name.
    pub base_weights: BTreeMap<String, f64>,
}

impl Default for WeightingConfig {
    fn default() -> Self {
        let base_weights = [
            ("semantic_vision", 0.35),
            ("frequency_spectrum", 0.20),
            ("noise_residual", 0.15),
            ("compression_artifacts", 0.15),
            ("metadata", 0.15),
        ]
        .into_iter()
        .map(|(name, weight)| (name.to_string(), weight))
        .collect();

        Self {
            default_base_weight: 0.15,
            weight_floor: 0.02,
            base_weights,
        }
    }
}

impl WeightingConfig {
    pub fn base_weight(&self, detector: &str) -> f64 {
        self.base_weights
            .get(detector)
            .copied()
            .unwrap_or(self.default_base_weight)
    }
}

/// Calibrated-score boundaries for the five verdict labels.
///
/// Each field is the inclusive lower bound of its label; anything below
/// `likely_real` is `REAL`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct VerdictBands {
    pub ai_generated: f64,
    pub likely_ai: f64,
    pub uncertain: f64,
    pub likely_real: f64,
}

impl Default for VerdictBands {
    fn default() -> Self {
        Self {
            ai_generated: 0.85,
            likely_ai: 0.65,
            uncertain: 0.35,
            likely_real: 0.15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CalibrationConfig {
    pub neutral: f64,
    pub conflict_margin: f64,
    /// Shrinkage constant lambda, strictly inside (0, 1).
    pub shrinkage: f64,
    pub mild_threshold: f64,
    pub moderate_threshold: f64,
    pub severe_threshold: f64,
    pub moderate_trust: f64,
    pub high_trust: f64,
    pub degraded_trust_cap: f64,
    pub bands: VerdictBands,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            neutral: 0.5,
            conflict_margin: 0.4,
            shrinkage: 0.5,
            mild_threshold: 0.15,
            moderate_threshold: 0.30,
            severe_threshold: 0.50,
            moderate_trust: 0.5,
            high_trust: 0.75,
            degraded_trust_cap: 0.25,
            bands: VerdictBands::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SpatialConfig {
    pub rows: usize,
    pub cols: usize,
    /// Share of the detector-derived region scores when blending with an auxiliary source.
    pub primary_blend: f64,
    pub suspicious_threshold: f64,
    pub medium_severity: f64,
    pub high_severity: f64,
    pub composite_uniformity: f64,
    pub variance_threshold: f64,
    pub low_bound: f64,
    pub high_bound: f64,
    pub authentic_threshold: f64,
    pub discontinuity_threshold: f64,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            rows: 3,
            cols: 3,
            primary_blend: 0.7,
            suspicious_threshold: 0.6,
            medium_severity: 0.65,
            high_severity: 0.8,
            composite_uniformity: 0.5,
            variance_threshold: 0.4,
            low_bound: 0.35,
            high_bound: 0.65,
            authentic_threshold: 0.2,
            discontinuity_threshold: 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    P90,
    #[default]
    P95,
    P99,
}

impl ConfidenceLevel {
    pub fn z_score(self) -> f64 {
        match self {
            ConfidenceLevel::P90 => 1.645,
            ConfidenceLevel::P95 => 1.96,
            ConfidenceLevel::P99 => 2.576,
        }
    }

    pub fn level(self) -> f64 {
        match self {
            ConfidenceLevel::P90 => 0.90,
            ConfidenceLevel::P95 => 0.95,
            ConfidenceLevel::P99 => 0.99,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct UncertaintyConfig {
    pub level: ConfidenceLevel,
    /// Multiplier mapping the voter standard deviation onto [0, 1].
    pub epistemic_scale: f64,
    pub high_reliability: f64,
    pub moderate_reliability: f64,
    pub low_reliability: f64,
}

impl Default for UncertaintyConfig {
    fn default() -> Self {
        Self {
            level: ConfidenceLevel::P95,
            epistemic_scale: 2.0,
            high_reliability: 0.75,
            moderate_reliability: 0.55,
            low_reliability: 0.35,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SimilarityWeights {
    pub spectral: f64,
    pub color: f64,
    pub texture: f64,
    pub noise: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            spectral: 0.4,
            color: 0.25,
            texture: 0.25,
            noise: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FingerprintConfig {
    pub smoothness_threshold: f64,
    pub repetitiveness_threshold: f64,
    pub low_noise_level: f64,
    pub match_threshold: f64,
    /// Indicators needed on their own to call an image AI-generated.
    pub min_indicators: usize,
    /// Indicators needed when the top generator clearly beats the real-photo baseline.
    pub corroborated_indicators: usize,
    /// Matching feature tags on the top match that decide on their own.
    pub decisive_features: usize,
    /// Feature tags on the top match that count as one indicator.
    pub corroborating_features: usize,
    pub real_photo_margin: f64,
    pub indicator_boost: f64,
    pub feature_boost: f64,
    pub confidence_cap: f64,
    pub confidence_floor: f64,
    pub feature_tolerance: f64,
    pub hue_tolerance: f64,
    pub spectral_match: f64,
    pub weights: SimilarityWeights,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            smoothness_threshold: 0.75,
            repetitiveness_threshold: 0.3,
            low_noise_level: 0.15,
            match_threshold: 0.7,
            min_indicators: 3,
            corroborated_indicators: 2,
            decisive_features: 3,
            corroborating_features: 2,
            real_photo_margin: 0.1,
            indicator_boost: 0.02,
            feature_boost: 0.03,
            confidence_cap: 0.95,
            confidence_floor: 0.05,
            feature_tolerance: 0.1,
            hue_tolerance: 20.0,
            spectral_match: 0.9,
            weights: SimilarityWeights::default(),
        }
    }
}

impl FusionConfig {
    /// Load from `$SYNTHSENSE_CONFIG` or the user config dir, falling back to defaults.
    pub fn load() -> Self {
        if let Some(config_path) = Self::config_file_path()
            && config_path.exists()
        {
            match Self::from_path(&config_path) {
                Ok(config) => return config,
                Err(e) => log::warn!(
                    "ignoring config at {}: {}",
                    config_path.display(),
                    e
                ),
            }
        }
        Self::default()
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let config_path = Self::config_file_path().ok_or_else(|| {
            invalid("config path", "no config directory available on this platform")
        })?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&config_path, self.to_toml_string()?).map_err(|source| {
            ConfigError::Io {
                path: config_path.clone(),
                source,
            }
        })?;
        Ok(config_path)
    }

    pub fn config_file_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|mut path| {
            path.push("synthsense");
            path.push("config.toml");
            path
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.reliability;
        for (field, value) in [
            ("reliability.confidence_weight", r.confidence_weight),
            ("reliability.status_weight", r.status_weight),
            ("reliability.latency_weight", r.latency_weight),
            ("reliability.fallback_multiplier", r.fallback_multiplier),
            ("reliability.slow_latency_ratio", r.slow_latency_ratio),
            ("reliability.low_confidence", r.low_confidence),
        ] {
            require_unit(field, value)?;
        }
        require_sum_to_one(
            "reliability",
            &[r.confidence_weight, r.status_weight, r.latency_weight],
        )?;
        if !(r.max_expected_latency_ms.is_finite() && r.max_expected_latency_ms > 0.0) {
            return Err(invalid(
                "reliability.max_expected_latency_ms",
                "must be a positive number of milliseconds",
            ));
        }
        if !(r.floor.is_finite() && (0.0..1.0).contains(&r.floor)) {
            return Err(invalid("reliability.floor", "must be in 0..1"));
        }

        let f = &self.fusion;
        for (name, weight) in &f.base_weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(invalid(
                    &format!("fusion.base_weights.{}", name),
                    "must be a non-negative number",
                ));
            }
        }
        if !f.default_base_weight.is_finite() || f.default_base_weight < 0.0 {
            return Err(invalid(
                "fusion.default_base_weight",
                "must be a non-negative number",
            ));
        }
        if !(f.weight_floor.is_finite() && (0.0..1.0).contains(&f.weight_floor)) {
            return Err(invalid("fusion.weight_floor", "must be in 0..1"));
        }

        let c = &self.calibration;
        require_unit("calibration.neutral", c.neutral)?;
        if !(c.shrinkage > 0.0 && c.shrinkage < 1.0) {
            return Err(invalid("calibration.shrinkage", "must be strictly inside 0..1"));
        }
        if !(c.conflict_margin > 0.0 && c.conflict_margin <= 0.5) {
            return Err(invalid("calibration.conflict_margin", "must be in (0, 0.5]"));
        }
        require_ascending(
            "calibration thresholds",
            &[c.mild_threshold, c.moderate_threshold, c.severe_threshold],
        )?;
        require_ascending("calibration trust", &[c.moderate_trust, c.high_trust])?;
        require_unit("calibration.degraded_trust_cap", c.degraded_trust_cap)?;
        let b = &c.bands;
        for (field, value) in [
            ("calibration.bands.ai_generated", b.ai_generated),
            ("calibration.bands.likely_ai", b.likely_ai),
            ("calibration.bands.uncertain", b.uncertain),
            ("calibration.bands.likely_real", b.likely_real),
        ] {
            require_unit(field, value)?;
        }
        require_ascending(
            "calibration.bands",
            &[b.likely_real, b.uncertain, b.likely_ai, b.ai_generated],
        )?;

        let s = &self.spatial;
        if s.rows < 2 || s.cols < 2 {
            return Err(invalid("spatial", "grid needs at least 2 rows and 2 columns"));
        }
        require_unit("spatial.primary_blend", s.primary_blend)?;
        require_ascending(
            "spatial severity",
            &[s.suspicious_threshold, s.medium_severity, s.high_severity],
        )?;
        require_ascending("spatial bounds", &[s.low_bound, s.high_bound])?;
        for (field, value) in [
            ("spatial.composite_uniformity", s.composite_uniformity),
            ("spatial.variance_threshold", s.variance_threshold),
            ("spatial.authentic_threshold", s.authentic_threshold),
            ("spatial.discontinuity_threshold", s.discontinuity_threshold),
        ] {
            require_unit(field, value)?;
        }

        let u = &self.uncertainty;
        if !(u.epistemic_scale.is_finite() && u.epistemic_scale > 0.0) {
            return Err(invalid("uncertainty.epistemic_scale", "must be positive"));
        }
        require_ascending(
            "uncertainty reliability",
            &[u.low_reliability, u.moderate_reliability, u.high_reliability],
        )?;

        let fp = &self.fingerprint;
        let w = &fp.weights;
        for (field, value) in [
            ("fingerprint.weights.spectral", w.spectral),
            ("fingerprint.weights.color", w.color),
            ("fingerprint.weights.texture", w.texture),
            ("fingerprint.weights.noise", w.noise),
        ] {
            require_unit(field, value)?;
        }
        require_sum_to_one(
            "fingerprint.weights",
            &[w.spectral, w.color, w.texture, w.noise],
        )?;
        if fp.confidence_floor >= fp.confidence_cap {
            return Err(invalid(
                "fingerprint.confidence_floor",
                "must be below fingerprint.confidence_cap",
            ));
        }
        require_unit("fingerprint.confidence_cap", fp.confidence_cap)?;
        require_unit("fingerprint.confidence_floor", fp.confidence_floor)?;

        Ok(())
    }
}
