use crate::config::{ConfigError, FusionConfig};
use crate::fingerprint::{self, GeneratorRegistry, RegistryError};
use crate::fusion::{self, DisagreementClass, Recommendation};
use crate::schema::{AnalysisRequest, DetectorObservation, FusionReport, SCHEMA_VERSION};
use crate::spatial;
use crate::uncertainty;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum FusionError {
    #[error("no detector observations supplied")]
    NoObservations,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Runs reliability weighting, calibration, spatial mapping, uncertainty
/// quantification and fingerprint attribution over one request.
///
/// Holds only immutable state; share it freely across threads.
#[derive(Debug, Clone)]
pub struct FusionEngine {
    config: FusionConfig,
    registry: Arc<GeneratorRegistry>,
}

impl FusionEngine {
    pub fn new() -> Self {
        Self {
            config: FusionConfig::default(),
            registry: Arc::new(GeneratorRegistry::builtin()),
        }
    }

    pub fn with_config(mut self, config: FusionConfig) -> Result<Self, FusionError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn with_registry(mut self, registry: Arc<GeneratorRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Set the static prior for one detector.
    pub fn register_prior(mut self, detector: impl Into<String>, weight: f64) -> Self {
        let weight = if weight.is_finite() { weight.max(0.0) } else { 0.0 };
        self.config.fusion.base_weights.insert(detector.into(), weight);
        self
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    pub fn registry(&self) -> &GeneratorRegistry {
        &self.registry
    }

    pub fn analyze_observations(
        &self,
        observations: &[DetectorObservation],
    ) -> Result<FusionReport, FusionError> {
        self.analyze(&AnalysisRequest::new(observations.to_vec()))
    }

    pub fn analyze(&self, request: &AnalysisRequest) -> Result<FusionReport, FusionError> {
        let observations = &request.observations;
        if observations.is_empty() {
            return Err(FusionError::NoObservations);
        }
        let config = &self.config;

        let outcome = fusion::fuse(observations, &config.fusion, &config.reliability);
        let scores = outcome.weighted_scores(observations);
        let calibration = fusion::calibrate(
            outcome.fused_score,
            &scores,
            outcome.is_degraded(),
            &config.calibration,
        );

        let spatial = spatial::analyze(
            observations,
            request.auxiliary_regions.as_ref(),
            &config.spatial,
        );
        let uncertainty =
            uncertainty::quantify(&scores, &request.ensemble, &calibration, &config.uncertainty);
        let (attribution, fingerprint_rejections) =
            fingerprint::attribute(observations, &self.registry, &config.fingerprint);

        let mut report = FusionReport {
            version: SCHEMA_VERSION.to_string(),
            verdict: calibration.verdict,
            disagreement: calibration.disagreement,
            weights: outcome.weights,
            adjustments: outcome.adjustments,
            spatial,
            uncertainty,
            attribution,
            fingerprint_rejections,
            summary: String::new(),
        };
        report.summary = summarize(&report);

        log::debug!("{}", report.summary);
        Ok(report)
    }
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn agreement_phrase(class: DisagreementClass) -> &'static str {
    match class {
        DisagreementClass::Agreement => "detectors agree",
        DisagreementClass::Mild => "detectors mostly agree",
        DisagreementClass::Moderate => "detectors partly disagree",
        DisagreementClass::Severe => "detectors strongly disagree",
        DisagreementClass::Conflict => "detectors conflict",
    }
}

/// One-sentence description of a report.
pub fn summarize(report: &FusionReport) -> String {
    let verdict = &report.verdict;
    let label = serde_json::to_value(verdict.label)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();

    let mut parts = vec![if report.is_degraded() {
        "no usable detectors".to_string()
    } else {
        agreement_phrase(report.disagreement.classification).to_string()
    }];
    if report.is_composite() {
        parts.push("composite image suspected".to_string());
    }
    if let Some(generator) = report.generator() {
        parts.push(format!("fingerprint matches {}", generator));
    }
    if verdict.recommendation == Recommendation::HumanReviewRecommended
        || report.needs_review()
    {
        parts.push("human review recommended".to_string());
    }

    format!(
        "{} (calibrated {:.2}, trust {:.2}): {}.",
        label,
        verdict.calibrated_score,
        verdict.trust_score,
        parts.join("; ")
    )
}
