//! Spatial attribution: turns sparse per-region detector scores into a dense
//! heatmap, locates hotspots and flags images that look like composites of
//! real and synthetic content.

pub mod color;
pub mod grid;

use crate::config::SpatialConfig;
use crate::schema::{DetectorObservation, Region, RegionScores};
use crate::stats;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use grid::{AnomalyTag, Anchors, CellBounds, GridCell, SpatialGrid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HotspotSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Hotspot {
    pub row: usize,
    pub col: usize,
    pub score: f64,
    pub severity: HotspotSeverity,
    /// Coarse location such as `top-left` or `center`.
    pub position: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SpatialAnalysis {
    pub grid: SpatialGrid,
    pub hotspots: Vec<Hotspot>,
    pub uniformity_score: f64,
    pub is_composite: bool,
    pub min_score: f64,
    pub max_score: f64,
    pub mean_score: f64,
    /// Anchor scores after blending and gap filling.
    pub region_scores: RegionScores,
}

/// Confidence-weighted mean per region across non-errored detectors.
///
/// Returns `None` when no detector reported region scores.
pub fn aggregate_regions(observations: &[DetectorObservation]) -> Option<RegionScores> {
    let mut sums: BTreeMap<Region, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for obs in observations.iter().filter(|o| !o.is_error()) {
        let Some(regions) = &obs.region_scores else {
            continue;
        };
        for (&region, &value) in regions {
            if !value.is_finite() {
                continue;
            }
            let entry = sums.entry(region).or_default();
            entry.0.push(stats::clamp_unit(value));
            entry.1.push(obs.confidence());
        }
    }

    let aggregated: RegionScores = sums
        .into_iter()
        .map(|(region, (values, weights))| (region, stats::weighted_mean(&values, &weights)))
        .collect();
    if aggregated.is_empty() {
        None
    } else {
        Some(aggregated)
    }
}

/// Blend detector-derived and auxiliary region scores, `primary_blend` to the
/// primary source. A region reported by only one source keeps that source's value.
pub fn blend_regions(
    primary: Option<&RegionScores>,
    auxiliary: Option<&RegionScores>,
    primary_blend: f64,
) -> Option<RegionScores> {
    let primary = primary.filter(|p| !p.is_empty());
    let auxiliary = auxiliary.filter(|a| !a.is_empty());

    match (primary, auxiliary) {
        (None, None) => None,
        (Some(p), None) => Some(p.clone()),
        (None, Some(a)) => Some(a.clone()),
        (Some(p), Some(a)) => {
            let blended = Region::ALL
                .iter()
                .filter_map(|region| {
                    let value = match (p.get(region), a.get(region)) {
                        (Some(pv), Some(av)) => primary_blend * pv + (1.0 - primary_blend) * av,
                        (Some(pv), None) => *pv,
                        (None, Some(av)) => *av,
                        (None, None) => return None,
                    };
                    Some((*region, value))
                })
                .collect();
            Some(blended)
        }
    }
}

fn describe_position(row: usize, col: usize, rows: usize, cols: usize) -> String {
    fn band(index: usize, count: usize) -> usize {
        if count < 2 {
            return 1;
        }
        let t = index as f64 / (count - 1) as f64;
        if t < 1.0 / 3.0 {
            0
        } else if t > 2.0 / 3.0 {
            2
        } else {
            1
        }
    }
    let vertical = ["top", "middle", "bottom"][band(row, rows)];
    let horizontal = ["left", "center", "right"][band(col, cols)];
    if vertical == "middle" && horizontal == "center" {
        "center".to_string()
    } else {
        format!("{}-{}", vertical, horizontal)
    }
}

fn severity(score: f64, config: &SpatialConfig) -> HotspotSeverity {
    if score >= config.high_severity {
        HotspotSeverity::High
    } else if score >= config.medium_severity {
        HotspotSeverity::Medium
    } else {
        HotspotSeverity::Low
    }
}

/// Cells at or above the suspicious threshold, strongest first.
pub fn find_hotspots(grid: &SpatialGrid, config: &SpatialConfig) -> Vec<Hotspot> {
    let mut hotspots: Vec<Hotspot> = grid
        .cells
        .iter()
        .filter(|c| c.score >= config.suspicious_threshold)
        .map(|c| Hotspot {
            row: c.row,
            col: c.col,
            score: c.score,
            severity: severity(c.score, config),
            position: describe_position(c.row, c.col, grid.rows, grid.cols),
        })
        .collect();
    // Stable: equal scores stay in row-major order.
    hotspots.sort_by(|a, b| b.score.total_cmp(&a.score));
    hotspots
}

/// `1 - 2 * std`, floored at zero; exactly 1 for a uniform grid.
pub fn uniformity(scores: &[f64]) -> f64 {
    (1.0 - 2.0 * stats::std_dev(scores)).max(0.0)
}

pub fn is_composite(uniformity: f64, min: f64, max: f64, config: &SpatialConfig) -> bool {
    uniformity < config.composite_uniformity
        && (max - min) > config.variance_threshold
        && min < config.low_bound
        && max > config.high_bound
}

/// Build the heatmap and derived statistics for a set of anchor scores.
///
/// Returns `None` when no anchor carries a usable score.
pub fn map_regions(regions: &RegionScores, config: &SpatialConfig) -> Option<SpatialAnalysis> {
    let anchors = Anchors::complete(regions)?;
    let grid = grid::densify(&anchors, config);
    let scores = grid.scores();

    let (min_score, max_score) = stats::min_max(&scores);
    let mean_score = stats::mean(&scores);
    let uniformity_score = uniformity(&scores);
    let is_composite = is_composite(uniformity_score, min_score, max_score, config);
    let hotspots = find_hotspots(&grid, config);

    if is_composite {
        log::debug!(
            "composite pattern: uniformity {:.3}, range {:.3}..{:.3}",
            uniformity_score,
            min_score,
            max_score
        );
    }

    Some(SpatialAnalysis {
        grid,
        hotspots,
        uniformity_score,
        is_composite,
        min_score,
        max_score,
        mean_score,
        region_scores: anchors.to_region_scores(),
    })
}

/// Aggregate, blend and map in one step.
pub fn analyze(
    observations: &[DetectorObservation],
    auxiliary: Option<&RegionScores>,
    config: &SpatialConfig,
) -> Option<SpatialAnalysis> {
    let primary = aggregate_regions(observations);
    let blended = blend_regions(primary.as_ref(), auxiliary, config.primary_blend)?;
    map_regions(&blended, config)
}
