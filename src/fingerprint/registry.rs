//! Registry of known generator signatures.
//!
//! The registry is built once (from the built-in table or a TOML file),
//! validated, and then shared read-only by every analysis.

use crate::schema::{
    ColorProfile, ColorTemperature, FeatureVector, FingerprintError, NoiseProfile, NoiseType,
    TextureProfile,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("signature '{name}' is invalid: {source}")]
    Invalid {
        name: String,
        #[source]
        source: FingerprintError,
    },
    #[error("registry has no real_photo baseline signature")]
    MissingRealPhoto,
    #[error("duplicate signature name '{0}'")]
    Duplicate(String),
    #[error("registry is empty")]
    Empty,
    #[error("invalid registry TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignatureKind {
    Generator,
    RealPhoto,
}

/// Reference fingerprint for one image source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GeneratorSignature {
    pub name: String,
    pub kind: SignatureKind,
    #[serde(default)]
    pub characteristics: Vec<String>,
    pub features: FeatureVector,
}

impl GeneratorSignature {
    pub fn is_real_photo(&self) -> bool {
        self.kind == SignatureKind::RealPhoto
    }
}

/// Immutable, validated set of signatures. Order is significant: it breaks
/// similarity ties during ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GeneratorRegistry {
    signatures: Vec<GeneratorSignature>,
}

fn color(
    saturation_mean: f64,
    saturation_variance: f64,
    dominant_hue: f64,
    temperature: ColorTemperature,
) -> ColorProfile {
    ColorProfile {
        saturation_mean,
        saturation_variance,
        dominant_hue,
        temperature,
    }
}

fn texture(smoothness: f64, repetitiveness: f64, detail_level: f64) -> TextureProfile {
    TextureProfile {
        smoothness,
        repetitiveness,
        detail_level,
    }
}

fn noise(level: f64, noise_type: NoiseType, frequency: f64) -> NoiseProfile {
    NoiseProfile {
        level,
        noise_type,
        frequency,
    }
}

fn signature(
    name: &str,
    kind: SignatureKind,
    characteristics: &[&str],
    features: FeatureVector,
) -> GeneratorSignature {
    GeneratorSignature {
        name: name.to_string(),
        kind,
        characteristics: characteristics.iter().map(|c| c.to_string()).collect(),
        features,
    }
}

fn builtin_signatures() -> Vec<GeneratorSignature> {
    use ColorTemperature::*;
    use NoiseType::*;
    use SignatureKind::*;

    vec![
        signature(
            "Midjourney",
            Generator,
            &["painterly lighting", "saturated warm palette", "very smooth surfaces"],
            FeatureVector {
                spectral_bands: vec![0.22, 0.20, 0.16, 0.13, 0.11, 0.08, 0.06, 0.04],
                color_profile: color(0.72, 0.18, 28.0, Warm),
                texture_profile: texture(0.86, 0.22, 0.74),
                noise_profile: noise(0.08, Uniform, 0.35),
            },
        ),
        signature(
            "DALL-E 3",
            Generator,
            &["clean illustrative rendering", "low noise floor", "cool highlights"],
            FeatureVector {
                spectral_bands: vec![0.25, 0.21, 0.17, 0.12, 0.09, 0.07, 0.05, 0.04],
                color_profile: color(0.62, 0.14, 200.0, Neutral),
                texture_profile: texture(0.90, 0.18, 0.58),
                noise_profile: noise(0.05, Uniform, 0.30),
            },
        ),
        signature(
            "Stable Diffusion XL",
            Generator,
            &["diffusion grain", "repeated micro-texture", "warm midtones"],
            FeatureVector {
                spectral_bands: vec![0.19, 0.18, 0.15, 0.13, 0.12, 0.10, 0.08, 0.05],
                color_profile: color(0.58, 0.22, 35.0, Warm),
                texture_profile: texture(0.78, 0.34, 0.66),
                noise_profile: noise(0.14, Gaussian, 0.48),
            },
        ),
        signature(
            "Adobe Firefly",
            Generator,
            &["stock-photo polish", "muted cool palette", "soft detail"],
            FeatureVector {
                spectral_bands: vec![0.21, 0.19, 0.16, 0.14, 0.11, 0.09, 0.06, 0.04],
                color_profile: color(0.55, 0.12, 210.0, Cool),
                texture_profile: texture(0.82, 0.20, 0.52),
                noise_profile: noise(0.07, Uniform, 0.28),
            },
        ),
        signature(
            "Flux",
            Generator,
            &["photorealistic detail", "structured noise", "balanced spectrum"],
            FeatureVector {
                spectral_bands: vec![0.18, 0.17, 0.15, 0.14, 0.12, 0.10, 0.08, 0.06],
                color_profile: color(0.50, 0.20, 30.0, Neutral),
                texture_profile: texture(0.74, 0.26, 0.78),
                noise_profile: noise(0.12, Structured, 0.52),
            },
        ),
        signature(
            "Real Photo",
            RealPhoto,
            &["sensor noise", "flat high-frequency spectrum", "natural saturation"],
            FeatureVector {
                spectral_bands: vec![0.15, 0.14, 0.13, 0.13, 0.12, 0.12, 0.11, 0.10],
                color_profile: color(0.42, 0.28, 40.0, Neutral),
                texture_profile: texture(0.45, 0.12, 0.82),
                noise_profile: noise(0.32, Gaussian, 0.68),
            },
        ),
    ]
}

#[derive(Deserialize)]
struct RegistryFile {
    signatures: Vec<GeneratorSignature>,
}

impl GeneratorRegistry {
    /// Validate and wrap a list of signatures.
    pub fn new(signatures: Vec<GeneratorSignature>) -> Result<Self, RegistryError> {
        let registry = Self { signatures };
        registry.validate()?;
        Ok(registry)
    }

    /// The built-in signature table. Always valid.
    pub fn builtin() -> Self {
        Self {
            signatures: builtin_signatures(),
        }
    }

    /// Parse a `[[signatures]]` TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = toml::from_str(content)?;
        Self::new(file.signatures)
    }

    pub fn from_path(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_toml_str(&content)?;
        log::debug!(
            "loaded {} signatures from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.signatures.is_empty() {
            return Err(RegistryError::Empty);
        }
        let mut seen = BTreeSet::new();
        for sig in &self.signatures {
            if !seen.insert(sig.name.as_str()) {
                return Err(RegistryError::Duplicate(sig.name.clone()));
            }
            sig.features
                .validate()
                .map_err(|source| RegistryError::Invalid {
                    name: sig.name.clone(),
                    source,
                })?;
        }
        if !self.signatures.iter().any(GeneratorSignature::is_real_photo) {
            return Err(RegistryError::MissingRealPhoto);
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratorSignature> {
        self.signatures.iter()
    }

    pub fn get(&self, name: &str) -> Option<&GeneratorSignature> {
        self.signatures.iter().find(|s| s.name == name)
    }

    /// The real-photo baseline (the first one, if several are registered).
    pub fn real_photo(&self) -> Option<&GeneratorSignature> {
        self.signatures.iter().find(|s| s.is_real_photo())
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
