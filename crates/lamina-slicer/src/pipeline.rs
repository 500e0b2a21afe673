//! Two-phase slicing driver.
//!
//! Phase 1 stitches and classifies every layer independently. Phase 2
//! needs the rings of neighboring layers for exposure analysis, so it
//! starts once every layer is classified; it then runs walls and skin per
//! ring, again independently per layer.

use lamina_math::Point2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SlicerConfig;
use crate::error::Result;
use crate::exposure::{compute_exposure, ExposureResult, ExposureWindow};
use crate::nesting::{classify_layer, ClassifiedLayer, NestingInfo};
use crate::path::{travel_order, Path, Segment3};
use crate::skin::{resolve_skin, RingEvent, RingState, SkinDecision, SkinRegion};
use crate::stitch::{project_segments, stitch_segments_traced};
use crate::trace::{emit, LayerTrace, TraceKind, TraceSink};
use crate::wall::{generate_walls, Obstacle, WallDrop, WallKind, WallRequest, WallSet};

/// One emitted loop, tagged for the toolpath writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedPolyline {
    /// Loop role.
    #[serde(rename = "type")]
    pub kind: WallKind,
    /// Ring the loop came from.
    pub ring_id: usize,
    /// Loop geometry.
    pub points: Path,
}

/// What happened to one ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingReport {
    /// Ring index within the layer.
    pub ring_id: usize,
    /// Ring classification.
    pub nesting: NestingInfo,
    /// Final state.
    pub state: RingState,
    /// Structural walls emitted.
    pub walls_emitted: usize,
    /// First dropped wall, if any.
    pub dropped: Option<WallDrop>,
    /// Exposed region count from exposure analysis.
    pub exposed_regions: usize,
    /// Fully covered region count from exposure analysis.
    pub fully_covered_regions: usize,
    /// Error that abandoned the ring.
    pub fault: Option<String>,
}

/// Toolpaths of one layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayerToolpaths {
    /// Layer index.
    pub index: usize,
    /// Loops in print order: per ring, outer wall, inner walls, skin.
    pub polylines: Vec<TypedPolyline>,
    /// Skin per ring that got any.
    pub skin_regions: Vec<SkinRegion>,
    /// Per-ring outcome, in print order.
    pub rings: Vec<RingReport>,
}

impl LayerToolpaths {
    /// Number of loops of a kind.
    pub fn count(&self, kind: WallKind) -> usize {
        self.polylines.iter().filter(|p| p.kind == kind).count()
    }

    /// Some ring on this layer got skin.
    pub fn has_skin(&self) -> bool {
        self.count(WallKind::Skin) > 0
    }

    /// Rings abandoned on an invariant violation.
    pub fn faults(&self) -> impl Iterator<Item = &RingReport> {
        self.rings.iter().filter(|r| r.fault.is_some())
    }
}

/// Slice per-layer cross-section segments into toolpaths.
///
/// `layers[i]` holds the unordered segments of layer `i`.
pub fn slice_layers(
    layers: &[Vec<Segment3>],
    config: &SlicerConfig,
    trace: &dyn TraceSink,
) -> Result<Vec<LayerToolpaths>> {
    config.validate()?;
    info!(
        layers = layers.len(),
        wall_count = config.wall_count,
        skin_layer_count = config.skin_layer_count,
        exposure = config.exposure_detection_enabled,
        "slicing"
    );

    let classified: Vec<ClassifiedLayer> = layers
        .par_iter()
        .enumerate()
        .map(|(index, segments)| {
            let scoped = LayerTrace::new(index, trace);
            let paths = stitch_segments_traced(&project_segments(segments), &scoped);
            classify_layer(index, paths, &scoped)
        })
        .collect();

    generate_toolpaths(&classified, config, trace)
}

/// Walls and skin for already classified layers.
///
/// `layers` must be indexed by layer: `layers[i].index == i`.
pub fn generate_toolpaths(
    layers: &[ClassifiedLayer],
    config: &SlicerConfig,
    trace: &dyn TraceSink,
) -> Result<Vec<LayerToolpaths>> {
    config.validate()?;

    let out: Vec<LayerToolpaths> = layers
        .par_iter()
        .map(|layer| process_layer(layer, layers, config, trace))
        .collect();

    let skin_layers = out.iter().filter(|l| l.has_skin()).count();
    let faults: usize = out.iter().map(|l| l.faults().count()).sum();
    info!(
        layers = out.len(),
        skin_layers,
        faults,
        "slicing finished"
    );
    Ok(out)
}

fn process_layer(
    layer: &ClassifiedLayer,
    layers: &[ClassifiedLayer],
    config: &SlicerConfig,
    trace: &dyn TraceSink,
) -> LayerToolpaths {
    let scoped = LayerTrace::new(layer.index, trace);
    let window = ExposureWindow::new(layer.index, config.skin_layer_count, layers.len());

    let exposures: Vec<Option<ExposureResult>> = (0..layer.len())
        .map(|ring| ring_exposure(layer, ring, layers, config, &scoped))
        .collect();
    let decisions: Vec<SkinDecision> = (0..layer.len())
        .map(|ring| {
            let info = layer.nesting[ring];
            // Holes follow the structure they cut into.
            let owner = if info.is_hole {
                info.parent.unwrap_or(ring)
            } else {
                ring
            };
            if !layer.paths[owner].closed {
                return SkinDecision::Skip;
            }
            SkinDecision::for_ring(&window, exposures[owner].as_ref())
        })
        .collect();

    // Structures settle first: a hole only gets skin if its parent did.
    let mut wall_sets: Vec<Option<Result<WallSet>>> = (0..layer.len()).map(|_| None).collect();
    let (structures, holes): (Vec<usize>, Vec<usize>) =
        (0..layer.len()).partition(|&ring| !layer.nesting[ring].is_hole);
    for ring in structures.into_iter().chain(holes) {
        let info = layer.nesting[ring];
        let mut emit_skin = decisions[ring].wants_skin();
        if let (true, Some(parent)) = (info.is_hole, info.parent) {
            let parent_skin =
                matches!(&wall_sets[parent], Some(Ok(set)) if set.skin_loop().is_some());
            if emit_skin && !parent_skin {
                debug!(layer = layer.index, ring, parent, "parent has no skin, hole skin skipped");
                emit_skin = false;
            }
        }
        let request = wall_request(layer, ring, config, emit_skin);
        wall_sets[ring] = Some(generate_walls(&request, &scoped));
    }

    let mut out = LayerToolpaths {
        index: layer.index,
        ..Default::default()
    };

    for ring in travel_order(&layer.paths, Point2::origin()) {
        let info = layer.nesting[ring];
        let decision = &decisions[ring];
        let (exposed_regions, fully_covered_regions) = exposures[ring]
            .as_ref()
            .map_or((0, 0), |e| (e.exposed_areas.len(), e.fully_covered_regions.len()));

        let mut report = RingReport {
            ring_id: ring,
            nesting: info,
            state: RingState::NoWall,
            walls_emitted: 0,
            dropped: None,
            exposed_regions,
            fully_covered_regions,
            fault: None,
        };

        let walls = match wall_sets[ring].take() {
            Some(Ok(walls)) => walls,
            Some(Err(err)) => {
                warn!(layer = layer.index, ring, error = %err, "ring abandoned");
                emit(
                    &scoped,
                    TraceKind::RingFault {
                        ring,
                        message: err.to_string(),
                    },
                );
                report.fault = Some(err.to_string());
                out.rings.push(report);
                continue;
            }
            None => continue,
        };

        report.state = RingState::after_walls(&walls, config.wall_count);
        report.walls_emitted = walls.walls_emitted;
        report.dropped = walls.dropped;

        if decision.wants_skin() {
            let skin_loop = walls.skin_loop();
            report.state = report.state.advance(RingEvent::Skin {
                emitted: skin_loop.is_some(),
            });
            if skin_loop.is_some() {
                out.skin_regions.push(resolve_skin(
                    ring,
                    skin_loop,
                    decision,
                    info.is_hole,
                    config.exposure_detection_resolution,
                ));
            } else {
                emit(&scoped, TraceKind::SkinSkipped { ring });
            }
        }

        out.polylines.extend(walls.loops.into_iter().map(|l| TypedPolyline {
            kind: l.kind,
            ring_id: l.ring_id,
            points: l.points,
        }));
        out.rings.push(report);
    }

    debug!(
        layer = layer.index,
        rings = layer.len(),
        outer = out.count(WallKind::Outer),
        inner = out.count(WallKind::Inner),
        skin = out.count(WallKind::Skin),
        "layer done"
    );
    out
}

fn wall_request<'a>(
    layer: &'a ClassifiedLayer,
    ring: usize,
    config: &SlicerConfig,
    emit_skin: bool,
) -> WallRequest<'a> {
    let info = layer.nesting[ring];
    WallRequest {
        layer: layer.index,
        ring_id: ring,
        path: &layer.paths[ring],
        nesting: info,
        nozzle_diameter: config.nozzle_diameter,
        wall_count: config.wall_count,
        obstacles: layer
            .clearance_obstacles(ring)
            .into_iter()
            .map(|j| Obstacle {
                path: &layer.paths[j],
                encloses: info.is_hole && info.parent == Some(j),
            })
            .collect(),
        emit_skin,
    }
}

/// Exposure of a closed structure ring, when detection is on.
fn ring_exposure(
    layer: &ClassifiedLayer,
    ring: usize,
    layers: &[ClassifiedLayer],
    config: &SlicerConfig,
    trace: &dyn TraceSink,
) -> Option<ExposureResult> {
    let path = &layer.paths[ring];
    if !config.exposure_detection_enabled || layer.nesting[ring].is_hole || !path.closed {
        return None;
    }
    let result = compute_exposure(
        path,
        layer.index,
        config.skin_layer_count,
        layers.len(),
        layers,
        config.exposure_detection_resolution,
    );
    emit(
        trace,
        TraceKind::Exposure {
            ring,
            coverage_above: result.coverage_above,
            coverage_below: result.coverage_below,
            exposed: result.exposed_areas.len(),
            fully_covered: result.fully_covered_regions.len(),
        },
    );
    Some(result)
}
