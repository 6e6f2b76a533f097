use synthsense::config::{CalibrationConfig, FingerprintConfig, SpatialConfig, WeightingConfig};
use synthsense::fingerprint::{GeneratorRegistry, rank};
use synthsense::fusion::calibration::shrink;
use synthsense::fusion::weights::{apply_floor, normalize};
use synthsense::fusion::{self, VerdictLabel, WeightedScore, analyze_disagreement};
use synthsense::schema::{DetectorObservation, DetectorStatus, Region, RegionScores};
use synthsense::spatial;

fn equal(scores: &[f64]) -> Vec<WeightedScore> {
    let w = 1.0 / scores.len() as f64;
    scores
        .iter()
        .enumerate()
        .map(|(i, &score)| WeightedScore {
            detector: format!("d{}", i),
            score,
            weight: w,
            confidence: 1.0,
        })
        .collect()
}

#[test]
fn disagreement_grows_with_spread() {
    let config = CalibrationConfig::default();
    let mut previous = -1.0;
    for step in 0..=10 {
        let d = step as f64 * 0.05;
        let analysis = analyze_disagreement(&equal(&[0.5 - d, 0.5, 0.5 + d]), &config);
        assert!(
            analysis.score >= previous,
            "spread {} gave {} after {}",
            d,
            analysis.score,
            previous
        );
        assert!((0.0..=1.0).contains(&analysis.score));
        previous = analysis.score;
    }
}

#[test]
fn identical_scores_are_left_alone() {
    let config = CalibrationConfig::default();
    for &s in &[0.0, 0.12, 0.5, 0.77, 1.0] {
        let analysis = analyze_disagreement(&equal(&[s, s, s, s]), &config);
        assert_eq!(analysis.score, 0.0);
        let calibration = fusion::calibrate(s, &equal(&[s, s, s, s]), false, &config);
        assert_eq!(calibration.verdict.calibrated_score, s);
        assert_eq!(calibration.verdict.trust_score, 1.0);
    }
}

#[test]
fn shrinking_never_moves_away_from_neutral() {
    let config = CalibrationConfig::default();
    for f in 0..=20 {
        let fused = f as f64 / 20.0;
        for d in 0..=10 {
            let disagreement = d as f64 / 10.0;
            let calibrated = shrink(fused, disagreement, &config);
            assert!((0.0..=1.0).contains(&calibrated));
            assert!((calibrated - 0.5).abs() <= (fused - 0.5).abs() + 1e-12);
        }
    }
}

#[test]
fn fused_weights_always_sum_to_one() {
    let cases = vec![
        vec![DetectorObservation::new("semantic_vision", 0.7, 0.9)],
        vec![
            DetectorObservation::new("semantic_vision", 0.7, 0.9).with_latency(9000.0),
            DetectorObservation::new("unknown_model", 0.2, 0.1),
            DetectorObservation::new("metadata", 0.4, 0.5).with_status(DetectorStatus::Fallback),
        ],
        vec![
            DetectorObservation::new("noise_residual", 0.9, 0.9).with_status(DetectorStatus::Error),
            DetectorObservation::new("compression", 0.3, 0.9).with_status(DetectorStatus::Error),
        ],
    ];
    for observations in cases {
        let outcome = fusion::fuse(
            &observations,
            &WeightingConfig::default(),
            &Default::default(),
        );
        assert!((outcome.weights.total() - 1.0).abs() < 1e-9);
        assert!(outcome.weights.values().iter().all(|w| *w >= 0.0));
        assert!((0.0..=1.0).contains(&outcome.fused_score));
    }
}

#[test]
fn floor_keeps_order_and_sum() {
    let weights = normalize(&[5.0, 0.0, 1.0, 2.0]);
    let floored = apply_floor(&weights, 0.05);
    assert!((floored.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    assert!(floored.iter().all(|w| *w >= 0.05));
    assert!(floored[0] > floored[3] && floored[3] > floored[2] && floored[2] > floored[1]);
}

#[test]
fn uniformity_is_a_unit_value() {
    assert_eq!(spatial::uniformity(&[0.4; 9]), 1.0);
    assert_eq!(spatial::uniformity(&[0.0, 1.0, 0.0, 1.0]), 0.0);
    let u = spatial::uniformity(&[0.2, 0.3, 0.5, 0.4]);
    assert!(u > 0.0 && u < 1.0);
}

#[test]
fn flat_map_is_never_composite() {
    let regions: RegionScores = Region::ALL.iter().map(|r| (*r, 0.55)).collect();
    let analysis = spatial::map_regions(&regions, &SpatialConfig::default()).unwrap();
    assert!(!analysis.is_composite);
    assert_eq!(analysis.uniformity_score, 1.0);
    assert!(analysis.hotspots.is_empty());
}

#[test]
fn noisy_map_around_055_is_never_composite() {
    let config = SpatialConfig::default();
    let jitter = [-0.1, 0.07, -0.04, 0.1, -0.02, 0.05, -0.08, 0.03];
    for shift in 0..jitter.len() {
        let regions: RegionScores = Region::ALL
            .iter()
            .enumerate()
            .map(|(i, r)| (*r, 0.55 + jitter[(i + shift) % jitter.len()]))
            .collect();
        let analysis = spatial::map_regions(&regions, &config).unwrap();
        assert!(
            !analysis.is_composite,
            "composite for {:?} (uniformity {})",
            regions,
            analysis.uniformity_score
        );
        assert!(analysis.min_score >= 0.45 - 1e-12);
        assert!(analysis.max_score <= 0.65 + 1e-12);
    }
}

#[test]
fn ranking_is_descending_and_complete() {
    let registry = GeneratorRegistry::builtin();
    let config = FingerprintConfig::default();
    for signature in registry.iter() {
        let ranked = rank(&signature.features, &registry, &config);
        assert_eq!(ranked.len(), registry.len());
        assert!(
            ranked
                .windows(2)
                .all(|pair| pair[0].confidence >= pair[1].confidence)
        );
        assert!(ranked.iter().all(|m| (0.0..=1.0).contains(&m.confidence)));
    }
}

#[test]
fn verdict_bands_are_monotone() {
    let bands = CalibrationConfig::default().bands;
    let mut previous = bands.label(0.0);
    assert_eq!(previous, VerdictLabel::Real);
    for step in 1..=100 {
        let label = bands.label(step as f64 / 100.0);
        assert!(label >= previous, "{:?} after {:?}", label, previous);
        previous = label;
    }
    assert_eq!(previous, VerdictLabel::AiGenerated);
}
