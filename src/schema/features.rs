use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Number of frequency bands in a spectral fingerprint.
pub const SPECTRAL_BANDS: usize = 8;

/// Allowed deviation of the spectral band sum from 1.0.
pub const BAND_SUM_TOLERANCE: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FingerprintError {
    #[error("expected {expected} spectral bands, got {actual}")]
    WrongDimensionality { expected: usize, actual: usize },
    #[error("non-finite value in {field}")]
    NonFinite { field: String },
    #[error("{field} = {value} is outside {min}..={max}")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("spectral bands sum to {sum:.3}, expected 1.0")]
    BandSum { sum: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ColorTemperature {
    Warm,
    Neutral,
    Cool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum NoiseType {
    Gaussian,
    Uniform,
    Structured,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ColorProfile {
    pub saturation_mean: f64,
    pub saturation_variance: f64,
    /// Dominant hue in degrees, 0-360.
    pub dominant_hue: f64,
    pub temperature: ColorTemperature,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TextureProfile {
    pub smoothness: f64,
    pub repetitiveness: f64,
    pub detail_level: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NoiseProfile {
    pub level: f64,
    #[serde(rename = "type")]
    pub noise_type: NoiseType,
    pub frequency: f64,
}

/// Descriptive fingerprint of an image, as extracted by a detector.
///
/// Every component is normalized to `[0, 1]` except the dominant hue
/// (degrees) and the categorical fields. The spectral bands are kept as a
/// `Vec` so a malformed vector can still be deserialized and then rejected
/// by [`FeatureVector::validate`] instead of failing the whole request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FeatureVector {
    pub spectral_bands: Vec<f64>,
    pub color_profile: ColorProfile,
    pub texture_profile: TextureProfile,
    pub noise_profile: NoiseProfile,
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), FingerprintError> {
    if !value.is_finite() {
        return Err(FingerprintError::NonFinite {
            field: field.to_string(),
        });
    }
    if value < min || value > max {
        return Err(FingerprintError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(())
}

impl FeatureVector {
    pub fn validate(&self) -> Result<(), FingerprintError> {
        if self.spectral_bands.len() != SPECTRAL_BANDS {
            return Err(FingerprintError::WrongDimensionality {
                expected: SPECTRAL_BANDS,
                actual: self.spectral_bands.len(),
            });
        }
        for (i, band) in self.spectral_bands.iter().enumerate() {
            check_range(&format!("spectral_bands[{}]", i), *band, 0.0, 1.0)?;
        }
        let sum: f64 = self.spectral_bands.iter().sum();
        if (sum - 1.0).abs() > BAND_SUM_TOLERANCE {
            return Err(FingerprintError::BandSum { sum });
        }

        let color = &self.color_profile;
        check_range("color_profile.saturation_mean", color.saturation_mean, 0.0, 1.0)?;
        check_range(
            "color_profile.saturation_variance",
            color.saturation_variance,
            0.0,
            1.0,
        )?;
        check_range("color_profile.dominant_hue", color.dominant_hue, 0.0, 360.0)?;

        let texture = &self.texture_profile;
        check_range("texture_profile.smoothness", texture.smoothness, 0.0, 1.0)?;
        check_range("texture_profile.repetitiveness", texture.repetitiveness, 0.0, 1.0)?;
        check_range("texture_profile.detail_level", texture.detail_level, 0.0, 1.0)?;

        let noise = &self.noise_profile;
        check_range("noise_profile.level", noise.level, 0.0, 1.0)?;
        check_range("noise_profile.frequency", noise.frequency, 0.0, 1.0)?;

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

#[cfg(test)]
pub(crate) mod test_vectors {
    use super::*;

    /// A well-formed vector with a flat spectrum and mid-range profiles.
    pub fn flat() -> FeatureVector {
        FeatureVector {
            spectral_bands: vec![0.125; SPECTRAL_BANDS],
            color_profile: ColorProfile {
                saturation_mean: 0.5,
                saturation_variance: 0.2,
                dominant_hue: 180.0,
                temperature: ColorTemperature::Neutral,
            },
            texture_profile: TextureProfile {
                smoothness: 0.5,
                repetitiveness: 0.5,
                detail_level: 0.5,
            },
            noise_profile: NoiseProfile {
                level: 0.3,
                noise_type: NoiseType::Gaussian,
                frequency: 0.5,
            },
        }
    }
}
