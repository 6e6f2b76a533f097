pub mod evidence;
pub mod features;
pub mod observation;
pub mod report;

// Re-export commonly used types
pub use evidence::{ReliabilityFactor, WeightAdjustment};
pub use features::{
    BAND_SUM_TOLERANCE, ColorProfile, ColorTemperature, FeatureVector, FingerprintError,
    NoiseProfile, NoiseType, SPECTRAL_BANDS, TextureProfile,
};
pub use observation::{
    AnalysisRequest, DetectorObservation, DetectorStatus, EnsembleVoter, Region, RegionScores,
};
pub use report::{FusionReport, REPORT_FIELDS};

#[cfg(test)]
pub(crate) use features::test_vectors;

pub const SCHEMA_VERSION: &str = "0.1.0";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_version_constant() {
        assert_eq!(SCHEMA_VERSION, "0.1.0");
    }

    #[test]
    fn report_schema_lists_every_field() {
        let schema = schemars::schema_for!(FusionReport);
        let json = serde_json::to_value(&schema).unwrap();
        let properties = json["properties"].as_object().unwrap();
        for field in REPORT_FIELDS {
            assert!(properties.contains_key(*field), "missing {}", field);
        }
        assert_eq!(properties.len(), REPORT_FIELDS.len());
    }

    #[test]
    fn request_schema_has_observations() {
        let schema = schemars::schema_for!(AnalysisRequest);
        let json = serde_json::to_value(&schema).unwrap();
        assert!(json["properties"]["observations"].is_object());
    }
}
