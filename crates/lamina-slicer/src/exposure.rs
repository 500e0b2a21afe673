//! Multi-layer exposure analysis.
//!
//! Decides which parts of a ring are exposed to air within a
//! ±`skin_layer_count` window instead of relying on a fixed top/bottom
//! layer count. Coverage is estimated by sampling the ring on a grid of
//! `resolution` spacing and testing each sample against the rings of the
//! neighboring layers, not by exact polygon clipping.
//!
//! Two kinds of regions come out:
//!
//! - **exposed areas**: samples with no material anywhere in the window
//!   above (or below), kept when the local coverage of their tile is under
//!   [`FULL_COVERAGE`];
//! - **fully covered regions**: samples that do have material somewhere
//!   above and somewhere below, but not on every symmetric layer pair
//!   `(i + k, i - k)`. These are the closing and opening faces of internal
//!   cavities and the shoulders of stepped parts.

use std::collections::BTreeMap;
use std::ops::Range;

use lamina_math::Point2;
use serde::{Deserialize, Serialize};

use crate::nesting::ClassifiedLayer;
use crate::path::{point_in_polygon, Bounds, Path};

/// Local coverage needed for a tile to count as backed.
pub const FULL_COVERAGE: f64 = 0.90;

/// Tile edge length, in samples.
const TILE_CELLS: usize = 4;

/// Cap on samples along one axis; the step grows to respect it.
const MAX_CELLS_PER_AXIS: usize = 1024;

/// Neighboring layers in scope for one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposureWindow {
    /// Layer being analyzed.
    pub layer_index: usize,
    /// Layers to look at in each direction.
    pub skin_layer_count: usize,
    /// Layers in the model.
    pub total_layers: usize,
}

impl ExposureWindow {
    /// Create a window.
    pub fn new(layer_index: usize, skin_layer_count: usize, total_layers: usize) -> Self {
        Self {
            layer_index,
            skin_layer_count,
            total_layers,
        }
    }

    /// Indices above the layer that exist in the model, nearest first.
    pub fn layers_above(&self) -> Range<usize> {
        let end = (self.layer_index + self.skin_layer_count + 1).min(self.total_layers);
        (self.layer_index + 1)..end.max(self.layer_index + 1)
    }

    /// Indices below the layer, lowest first.
    pub fn layers_below(&self) -> Range<usize> {
        self.layer_index.saturating_sub(self.skin_layer_count)..self.layer_index
    }

    /// The window runs off the top of the model.
    pub fn clipped_above(&self) -> bool {
        self.layer_index + self.skin_layer_count >= self.total_layers
    }

    /// The window runs off the bottom of the model.
    pub fn clipped_below(&self) -> bool {
        self.layer_index < self.skin_layer_count
    }

    /// Layer belongs to the fixed top or bottom shell.
    pub fn is_shell(&self) -> bool {
        self.clipped_above() || self.clipped_below()
    }
}

/// A neighboring ring that overlaps the analyzed ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoveringRegion {
    /// Layer the ring belongs to.
    pub layer_index: usize,
    /// The ring.
    pub path: Path,
}

/// Exposure of one ring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExposureResult {
    /// Overlapping rings from layers above (not merged).
    pub covering_regions_above: Vec<CoveringRegion>,
    /// Overlapping rings from layers below (not merged).
    pub covering_regions_below: Vec<CoveringRegion>,
    /// Parts of the ring without backing above or below.
    pub exposed_areas: Vec<Path>,
    /// Backed parts whose backing does not line up above and below.
    pub fully_covered_regions: Vec<Path>,
    /// Fraction of the ring with material somewhere above.
    pub coverage_above: f64,
    /// Fraction of the ring with material somewhere below.
    pub coverage_below: f64,
    /// No layer exists far enough above: top surface.
    pub exposed_above: bool,
    /// No layer exists far enough below: bottom surface.
    pub exposed_below: bool,
}

impl ExposureResult {
    /// Any part of the ring needs skin.
    pub fn needs_skin(&self) -> bool {
        !self.exposed_areas.is_empty() || !self.fully_covered_regions.is_empty()
    }
}

/// Analyze one ring of layer `layer_index` against its neighbors.
///
/// `layers` must hold every layer's classified rings, indexed by layer.
/// `resolution` is the sample spacing in mm.
pub fn compute_exposure(
    path: &Path,
    layer_index: usize,
    skin_layer_count: usize,
    total_layers: usize,
    layers: &[ClassifiedLayer],
    resolution: f64,
) -> ExposureResult {
    let window = ExposureWindow::new(layer_index, skin_layer_count, total_layers);
    let bounds = path.bounds();
    let mut result = ExposureResult {
        exposed_above: window.clipped_above(),
        exposed_below: window.clipped_below(),
        ..Default::default()
    };

    let above: Vec<Candidates<'_>> = window
        .layers_above()
        .filter_map(|j| layers.get(j))
        .map(|layer| Candidates::collect(layer, &bounds))
        .collect();
    // Nearest first, to line up with `above`.
    let below: Vec<Candidates<'_>> = window
        .layers_below()
        .rev()
        .filter_map(|j| layers.get(j))
        .map(|layer| Candidates::collect(layer, &bounds))
        .collect();

    if result.exposed_above || result.exposed_below {
        // Top or bottom surface: the whole ring is exposed.
        result.covering_regions_above = above.iter().flat_map(|c| c.regions()).collect();
        result.covering_regions_below = below.iter().flat_map(|c| c.regions()).collect();
        result.exposed_areas.push(path.clone());
        return result;
    }

    let grid = Grid::new(&bounds, resolution);
    let nested: Vec<&Path> = layers
        .get(layer_index)
        .map(|layer| {
            layer
                .paths
                .iter()
                .filter(|other| *other != path)
                .filter(|other| other.points.first().is_some_and(|p| point_in_polygon(p, path)))
                .collect()
        })
        .unwrap_or_default();
    let own = grid.own_samples(path, &nested);
    let own_count = own.iter().filter(|&&o| o).count();

    let above_solid: Vec<Vec<bool>> = above.iter().map(|c| c.solid_mask(&grid, &own)).collect();
    let below_solid: Vec<Vec<bool>> = below.iter().map(|c| c.solid_mask(&grid, &own)).collect();
    let union_above = union_mask(&own, &above_solid);
    let union_below = union_mask(&own, &below_solid);

    result.covering_regions_above = covering(&above, &grid, &own);
    result.covering_regions_below = covering(&below, &grid, &own);

    if own_count == 0 {
        // Ring is smaller than a sample cell; nothing measurable.
        result.coverage_above = 1.0;
        result.coverage_below = 1.0;
        return result;
    }
    result.coverage_above = count(&union_above) as f64 / own_count as f64;
    result.coverage_below = count(&union_below) as f64 / own_count as f64;

    let exposed = grid.tile_exposure(&own, &union_above, &union_below);
    let pairs: Vec<(Option<&[bool]>, Option<&[bool]>)> = (0..skin_layer_count)
        .map(|k| {
            (
                above_solid.get(k).map(Vec::as_slice),
                below_solid.get(k).map(Vec::as_slice),
            )
        })
        .collect();
    let mut closing = fully_covered_mask(&own, &union_above, &union_below, &pairs);
    for (c, e) in closing.iter_mut().zip(&exposed) {
        *c &= !e;
    }

    result.exposed_areas = grid.regions(&exposed);
    result.fully_covered_regions = grid.regions(&closing);
    result
}

/// Regions of `path` backed from above and below whose backing does not
/// hold on every symmetric layer pair of `window`.
///
/// `above` and `below` are the covering rings of the window's layers,
/// as reported by [`compute_exposure`].
pub fn resolve_fully_covered_regions(
    path: &Path,
    window: &ExposureWindow,
    above: &[CoveringRegion],
    below: &[CoveringRegion],
    resolution: f64,
) -> Vec<Path> {
    let grid = Grid::new(&path.bounds(), resolution);
    let own = grid.own_samples(path, &[]);

    let by_distance = |regions: &[CoveringRegion]| {
        let mut groups: BTreeMap<usize, Vec<&Path>> = BTreeMap::new();
        for region in regions {
            let k = region.layer_index.abs_diff(window.layer_index);
            if (1..=window.skin_layer_count).contains(&k) {
                groups.entry(k).or_default().push(&region.path);
            }
        }
        (1..=window.skin_layer_count)
            .map(|k| {
                let rings = groups.remove(&k).unwrap_or_default();
                grid.even_odd_mask(&own, &rings)
            })
            .collect::<Vec<_>>()
    };
    let above_solid = by_distance(above);
    let below_solid = by_distance(below);

    let union_above = union_mask(&own, &above_solid);
    let union_below = union_mask(&own, &below_solid);
    let pairs: Vec<(Option<&[bool]>, Option<&[bool]>)> = above_solid
        .iter()
        .zip(&below_solid)
        .map(|(a, b)| (Some(a.as_slice()), Some(b.as_slice())))
        .collect();

    grid.regions(&fully_covered_mask(&own, &union_above, &union_below, &pairs))
}

/// Rings of one neighboring layer whose bounds overlap the analyzed ring.
struct Candidates<'a> {
    layer_index: usize,
    rings: Vec<(&'a Path, Bounds)>,
}

impl<'a> Candidates<'a> {
    /// Uses the layer's cached bounds, or recomputes them when the cache
    /// does not match the rings.
    fn collect(layer: &'a ClassifiedLayer, bounds: &Bounds) -> Self {
        let cached = layer.bounds.len() == layer.paths.len();
        let rings = layer
            .paths
            .iter()
            .enumerate()
            .map(|(i, path)| {
                let b = if cached { layer.bounds[i] } else { path.bounds() };
                (path, b)
            })
            .filter(|(_, b)| b.overlaps(bounds))
            .collect();
        Self {
            layer_index: layer.index,
            rings,
        }
    }

    fn regions(&self) -> impl Iterator<Item = CoveringRegion> + '_ {
        self.rings.iter().map(|(path, _)| CoveringRegion {
            layer_index: self.layer_index,
            path: (*path).clone(),
        })
    }

    /// Even-odd solidity at each owned sample.
    fn solid_mask(&self, grid: &Grid, own: &[bool]) -> Vec<bool> {
        (0..grid.len())
            .map(|idx| {
                if !own[idx] {
                    return false;
                }
                let p = grid.center(idx);
                let hits = self
                    .rings
                    .iter()
                    .filter(|(path, b)| b.contains(&p) && point_in_polygon(&p, path))
                    .count();
                hits % 2 == 1
            })
            .collect()
    }
}

/// Candidate rings that contain at least one owned sample.
fn covering(sets: &[Candidates<'_>], grid: &Grid, own: &[bool]) -> Vec<CoveringRegion> {
    let samples: Vec<Point2> = (0..grid.len())
        .filter(|&idx| own[idx])
        .map(|idx| grid.center(idx))
        .collect();
    sets.iter()
        .flat_map(|set| {
            set.rings
                .iter()
                .filter(|(path, b)| {
                    samples
                        .iter()
                        .any(|p| b.contains(p) && point_in_polygon(p, path))
                })
                .map(|(path, _)| CoveringRegion {
                    layer_index: set.layer_index,
                    path: (*path).clone(),
                })
        })
        .collect()
}

fn union_mask(own: &[bool], masks: &[Vec<bool>]) -> Vec<bool> {
    (0..own.len())
        .map(|idx| own[idx] && masks.iter().any(|m| m[idx]))
        .collect()
}

/// Samples backed somewhere above and below but not by every pair.
/// A missing layer in a pair counts as no material.
fn fully_covered_mask(
    own: &[bool],
    union_above: &[bool],
    union_below: &[bool],
    pairs: &[(Option<&[bool]>, Option<&[bool]>)],
) -> Vec<bool> {
    (0..own.len())
        .map(|idx| {
            own[idx]
                && union_above[idx]
                && union_below[idx]
                && pairs.iter().any(|(a, b)| {
                    let a = a.is_some_and(|m| m[idx]);
                    let b = b.is_some_and(|m| m[idx]);
                    !(a && b)
                })
        })
        .collect()
}

fn count(mask: &[bool]) -> usize {
    mask.iter().filter(|&&m| m).count()
}

/// Regular sample grid over a ring's bounding box. Samples sit at cell
/// centers; index = `row * cols + col`.
struct Grid {
    min_x: f64,
    min_y: f64,
    step: f64,
    cols: usize,
    rows: usize,
}

impl Grid {
    fn new(bounds: &Bounds, resolution: f64) -> Self {
        if bounds.is_empty() {
            return Self {
                min_x: 0.0,
                min_y: 0.0,
                step: 1.0,
                cols: 0,
                rows: 0,
            };
        }
        let longest = bounds.width().max(bounds.height());
        let step = resolution.max(longest / MAX_CELLS_PER_AXIS as f64).max(1e-3);
        Self {
            min_x: bounds.min_x,
            min_y: bounds.min_y,
            step,
            cols: ((bounds.width() / step).ceil() as usize).max(1),
            rows: ((bounds.height() / step).ceil() as usize).max(1),
        }
    }

    fn len(&self) -> usize {
        self.cols * self.rows
    }

    fn center(&self, idx: usize) -> Point2 {
        let (row, col) = (idx / self.cols, idx % self.cols);
        Point2::new(
            self.min_x + (col as f64 + 0.5) * self.step,
            self.min_y + (row as f64 + 0.5) * self.step,
        )
    }

    /// Samples inside `path` and outside every ring nested in it.
    fn own_samples(&self, path: &Path, nested: &[&Path]) -> Vec<bool> {
        (0..self.len())
            .map(|idx| {
                let p = self.center(idx);
                point_in_polygon(&p, path) && !nested.iter().any(|n| point_in_polygon(&p, n))
            })
            .collect()
    }

    fn even_odd_mask(&self, own: &[bool], rings: &[&Path]) -> Vec<bool> {
        (0..self.len())
            .map(|idx| {
                own[idx] && {
                    let p = self.center(idx);
                    rings.iter().filter(|r| point_in_polygon(&p, r)).count() % 2 == 1
                }
            })
            .collect()
    }

    /// Uncovered samples of tiles whose local coverage falls short in
    /// either direction.
    fn tile_exposure(&self, own: &[bool], above: &[bool], below: &[bool]) -> Vec<bool> {
        let mut exposed = vec![false; self.len()];
        for tile_row in (0..self.rows).step_by(TILE_CELLS) {
            for tile_col in (0..self.cols).step_by(TILE_CELLS) {
                let cells: Vec<usize> = (tile_row..(tile_row + TILE_CELLS).min(self.rows))
                    .flat_map(|r| {
                        (tile_col..(tile_col + TILE_CELLS).min(self.cols))
                            .map(move |c| r * self.cols + c)
                    })
                    .filter(|&idx| own[idx])
                    .collect();
                if cells.is_empty() {
                    continue;
                }
                let total = cells.len() as f64;
                let local_above = cells.iter().filter(|&&i| above[i]).count() as f64 / total;
                let local_below = cells.iter().filter(|&&i| below[i]).count() as f64 / total;

                for &idx in &cells {
                    if (local_above < FULL_COVERAGE && !above[idx])
                        || (local_below < FULL_COVERAGE && !below[idx])
                    {
                        exposed[idx] = true;
                    }
                }
            }
        }
        exposed
    }

    /// Merge set samples into axis-aligned rectangles: runs along each
    /// row, stacked while consecutive rows repeat the same run.
    fn regions(&self, mask: &[bool]) -> Vec<Path> {
        let mut done: Vec<(usize, usize, usize, usize)> = Vec::new();
        // (col_start, col_end, row_start, row_end), inclusive
        let mut open: Vec<(usize, usize, usize, usize)> = Vec::new();

        for row in 0..self.rows {
            let mut runs = Vec::new();
            let mut col = 0;
            while col < self.cols {
                if mask[row * self.cols + col] {
                    let start = col;
                    while col + 1 < self.cols && mask[row * self.cols + col + 1] {
                        col += 1;
                    }
                    runs.push((start, col));
                }
                col += 1;
            }

            let mut next_open = Vec::with_capacity(runs.len());
            for (c0, c1) in runs {
                if let Some(pos) = open.iter().position(|r| r.0 == c0 && r.1 == c1) {
                    let mut rect = open.swap_remove(pos);
                    rect.3 = row;
                    next_open.push(rect);
                } else {
                    next_open.push((c0, c1, row, row));
                }
            }
            done.append(&mut open);
            open = next_open;
        }
        done.append(&mut open);
        done.sort_by_key(|r| (r.2, r.0));

        done.into_iter()
            .map(|(c0, c1, r0, r1)| {
                let x0 = self.min_x + c0 as f64 * self.step;
                let x1 = self.min_x + (c1 + 1) as f64 * self.step;
                let y0 = self.min_y + r0 as f64 * self.step;
                let y1 = self.min_y + (r1 + 1) as f64 * self.step;
                Path::closed(vec![
                    Point2::new(x0, y0),
                    Point2::new(x1, y0),
                    Point2::new(x1, y1),
                    Point2::new(x0, y1),
                ])
            })
            .collect()
    }
}
