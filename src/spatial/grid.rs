//! Dense heatmap grid interpolated from the five anchor regions.

use super::color;
use crate::config::SpatialConfig;
use crate::schema::{Region, RegionScores};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Radius around the image center inside which the center anchor pulls
/// interpolated cells toward itself.
const CENTER_RADIUS: f64 = 0.5;

const CORNERS: [Region; 4] = [
    Region::TopLeft,
    Region::TopRight,
    Region::BottomLeft,
    Region::BottomRight,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyTag {
    StrongSyntheticSignal,
    SyntheticSignal,
    AuthenticSignal,
    BoundaryDiscontinuity,
}

/// Normalized cell rectangle; `(x, y)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CellBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
    pub bounds: CellBounds,
    pub score: f64,
    /// Hex color from the real/uncertain/AI ramp.
    pub color: String,
    pub anomaly_tags: Vec<AnomalyTag>,
}

/// Row-major grid of cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SpatialGrid {
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<GridCell>,
}

impl SpatialGrid {
    pub fn cell(&self, row: usize, col: usize) -> Option<&GridCell> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get(row * self.cols + col)
    }

    pub fn scores(&self) -> Vec<f64> {
        self.cells.iter().map(|c| c.score).collect()
    }
}

/// Anchor values with any missing region filled in, indexed like [`Region::ALL`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchors {
    pub top_left: f64,
    pub top_right: f64,
    pub bottom_left: f64,
    pub bottom_right: f64,
    pub center: f64,
}

impl Anchors {
    /// Fill missing anchors with the mean of the present ones. `None` when no
    /// region carries a finite score.
    pub fn complete(regions: &RegionScores) -> Option<Self> {
        let present: Vec<f64> = regions
            .values()
            .filter(|v| v.is_finite())
            .map(|v| crate::stats::clamp_unit(*v))
            .collect();
        if present.is_empty() {
            return None;
        }
        let fill = crate::stats::mean(&present);
        let get = |region: Region| {
            regions
                .get(&region)
                .filter(|v| v.is_finite())
                .map(|v| crate::stats::clamp_unit(*v))
                .unwrap_or(fill)
        };
        Some(Self {
            top_left: get(Region::TopLeft),
            top_right: get(Region::TopRight),
            bottom_left: get(Region::BottomLeft),
            bottom_right: get(Region::BottomRight),
            center: get(Region::Center),
        })
    }

    pub fn get(&self, region: Region) -> f64 {
        match region {
            Region::TopLeft => self.top_left,
            Region::TopRight => self.top_right,
            Region::BottomLeft => self.bottom_left,
            Region::BottomRight => self.bottom_right,
            Region::Center => self.center,
        }
    }

    pub fn to_region_scores(self) -> RegionScores {
        Region::ALL.iter().map(|&r| (r, self.get(r))).collect()
    }

    fn is_uniform(&self) -> bool {
        let v = self.top_left;
        self.top_right == v && self.bottom_left == v && self.bottom_right == v && self.center == v
    }

    /// Interpolated score at lattice position `(u, v)`, both in `[0, 1]`.
    pub fn sample(&self, u: f64, v: f64) -> f64 {
        if self.is_uniform() {
            return self.top_left;
        }
        let bilinear: f64 = CORNERS
            .iter()
            .map(|&region| {
                let (x, y) = region.anchor();
                (1.0 - (u - x).abs()) * (1.0 - (v - y).abs()) * self.get(region)
            })
            .sum();
        let (cx, cy) = Region::Center.anchor();
        let distance = ((u - cx).powi(2) + (v - cy).powi(2)).sqrt();
        let pull = (1.0 - distance / CENTER_RADIUS).max(0.0);
        crate::stats::clamp_unit((1.0 - pull) * bilinear + pull * self.center)
    }
}

fn lattice(index: usize, count: usize) -> f64 {
    if count < 2 {
        0.5
    } else {
        index as f64 / (count - 1) as f64
    }
}

fn tags_for(score: f64, neighbours: &[f64], config: &SpatialConfig) -> Vec<AnomalyTag> {
    let mut tags = Vec::new();
    if score >= config.high_severity {
        tags.push(AnomalyTag::StrongSyntheticSignal);
    } else if score >= config.suspicious_threshold {
        tags.push(AnomalyTag::SyntheticSignal);
    } else if score <= config.authentic_threshold {
        tags.push(AnomalyTag::AuthenticSignal);
    }
    if neighbours
        .iter()
        .any(|n| (n - score).abs() > config.discontinuity_threshold)
    {
        tags.push(AnomalyTag::BoundaryDiscontinuity);
    }
    tags
}

/// Build a `rows x cols` grid from the anchors.
pub fn densify(anchors: &Anchors, config: &SpatialConfig) -> SpatialGrid {
    let rows = config.rows.max(1);
    let cols = config.cols.max(1);

    let scores: Vec<f64> = (0..rows)
        .flat_map(|r| (0..cols).map(move |c| (r, c)))
        .map(|(r, c)| anchors.sample(lattice(c, cols), lattice(r, rows)))
        .collect();

    let at = |r: usize, c: usize| scores[r * cols + c];

    let cells = (0..rows)
        .flat_map(|r| (0..cols).map(move |c| (r, c)))
        .map(|(row, col)| {
            let score = at(row, col);
            let mut neighbours = Vec::with_capacity(4);
            if row > 0 {
                neighbours.push(at(row - 1, col));
            }
            if row + 1 < rows {
                neighbours.push(at(row + 1, col));
            }
            if col > 0 {
                neighbours.push(at(row, col - 1));
            }
            if col + 1 < cols {
                neighbours.push(at(row, col + 1));
            }

            GridCell {
                row,
                col,
                bounds: CellBounds {
                    x: col as f64 / cols as f64,
                    y: row as f64 / rows as f64,
                    width: 1.0 / cols as f64,
                    height: 1.0 / rows as f64,
                },
                score,
                color: color::score_to_hex(score),
                anomaly_tags: tags_for(score, &neighbours, config),
            }
        })
        .collect();

    SpatialGrid { rows, cols, cells }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchors(tl: f64, tr: f64, bl: f64, br: f64, c: f64) -> Anchors {
        Anchors {
            top_left: tl,
            top_right: tr,
            bottom_left: bl,
            bottom_right: br,
            center: c,
        }
    }

    #[test]
    fn anchors_are_reproduced_at_their_positions() {
        let a = anchors(0.9, 0.1, 0.85, 0.15, 0.4);
        for region in Region::ALL {
            let (x, y) = region.anchor();
            assert_eq!(a.sample(x, y), a.get(region), "{:?}", region);
        }
    }

    #[test]
    fn three_by_three_places_anchors_on_lattice() {
        let grid = densify(&anchors(0.9, 0.1, 0.85, 0.15, 0.5), &SpatialConfig::default());
        assert_eq!(grid.cells.len(), 9);
        assert_eq!(grid.cell(0, 0).unwrap().score, 0.9);
        assert_eq!(grid.cell(0, 2).unwrap().score, 0.1);
        assert_eq!(grid.cell(2, 0).unwrap().score, 0.85);
        assert_eq!(grid.cell(2, 2).unwrap().score, 0.15);
        assert_eq!(grid.cell(1, 1).unwrap().score, 0.5);
    }

    #[test]
    fn edge_midpoints_average_their_corners() {
        let grid = densify(&anchors(0.9, 0.1, 0.85, 0.15, 0.5), &SpatialConfig::default());
        assert!((grid.cell(0, 1).unwrap().score - 0.5).abs() < 1e-12);
        assert!((grid.cell(1, 0).unwrap().score - 0.875).abs() < 1e-12);
        assert!((grid.cell(1, 2).unwrap().score - 0.125).abs() < 1e-12);
    }

    #[test]
    fn uniform_anchors_give_uniform_grid() {
        let config = SpatialConfig {
            rows: 5,
            cols: 4,
            ..SpatialConfig::default()
        };
        let grid = densify(&anchors(0.55, 0.55, 0.55, 0.55, 0.55), &config);
        assert_eq!(grid.cells.len(), 20);
        assert!(grid.cells.iter().all(|c| c.score == 0.55));
    }

    #[test]
    fn bounds_tile_the_image() {
        let grid = densify(&anchors(0.2, 0.4, 0.6, 0.8, 0.5), &SpatialConfig::default());
        let cell = grid.cell(2, 1).unwrap();
        assert!((cell.bounds.x - 1.0 / 3.0).abs() < 1e-12);
        assert!((cell.bounds.y - 2.0 / 3.0).abs() < 1e-12);
        let area: f64 = grid
            .cells
            .iter()
            .map(|c| c.bounds.width * c.bounds.height)
            .sum();
        assert!((area - 1.0).abs() < 1e-12);
    }

    #[test]
    fn tags_mark_signals_and_edges() {
        let grid = densify(&anchors(0.9, 0.1, 0.85, 0.15, 0.5), &SpatialConfig::default());
        let tl = grid.cell(0, 0).unwrap();
        assert!(tl.anomaly_tags.contains(&AnomalyTag::StrongSyntheticSignal));
        let tr = grid.cell(0, 2).unwrap();
        assert!(tr.anomaly_tags.contains(&AnomalyTag::AuthenticSignal));
        let center = grid.cell(1, 1).unwrap();
        assert!(center.anomaly_tags.is_empty());
        let ml = grid.cell(1, 0).unwrap();
        assert_eq!(ml.anomaly_tags, vec![AnomalyTag::StrongSyntheticSignal]);
    }

    #[test]
    fn sharp_corner_is_a_discontinuity() {
        let grid = densify(&anchors(1.0, 0.0, 0.0, 0.0, 0.0), &SpatialConfig::default());
        let tl = grid.cell(0, 0).unwrap();
        assert_eq!(
            tl.anomaly_tags,
            vec![
                AnomalyTag::StrongSyntheticSignal,
                AnomalyTag::BoundaryDiscontinuity
            ]
        );
        let br = grid.cell(2, 2).unwrap();
        assert_eq!(br.anomaly_tags, vec![AnomalyTag::AuthenticSignal]);
    }

    #[test]
    fn missing_anchors_use_mean_of_present() {
        let mut regions = RegionScores::new();
        regions.insert(Region::TopLeft, 0.8);
        regions.insert(Region::BottomRight, 0.2);
        let a = Anchors::complete(&regions).unwrap();
        assert_eq!(a.top_left, 0.8);
        assert_eq!(a.center, 0.5);
        assert_eq!(a.top_right, 0.5);
        assert!(Anchors::complete(&RegionScores::new()).is_none());
    }
}
