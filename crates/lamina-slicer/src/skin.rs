//! Skin decisions and skin region assembly.

use lamina_math::Point2;
use serde::{Deserialize, Serialize};

use crate::exposure::{ExposureResult, ExposureWindow};
use crate::path::{point_in_polygon, Path};
use crate::wall::WallSet;

/// Where a ring is in wall and skin generation.
///
/// ```text
/// NoWall -> OuterWallsOk -> InnerWallsOk    -> SkinEmitted | SkinSkipped
///                        -> InnerSuppressed -> SkinSkipped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RingState {
    /// No wall validated yet (or none could be).
    #[default]
    NoWall,
    /// The outer wall validated.
    OuterWallsOk,
    /// Every requested wall validated.
    InnerWallsOk,
    /// Some inner wall was dropped.
    InnerSuppressed,
    /// Skin boundary emitted.
    SkinEmitted,
    /// Skin was wanted but not emitted.
    SkinSkipped,
}

/// Input to [`RingState::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingEvent {
    /// The outer wall passed validation.
    OuterWall,
    /// Inner wall generation finished.
    InnerWalls {
        /// Every requested wall was emitted.
        complete: bool,
    },
    /// Skin generation finished.
    Skin {
        /// A skin boundary came out.
        emitted: bool,
    },
}

impl RingState {
    /// Apply one event. Events that do not fit the current state leave it
    /// unchanged.
    pub fn advance(self, event: RingEvent) -> Self {
        use RingEvent::*;
        use RingState::*;
        match (self, event) {
            (NoWall, OuterWall) => OuterWallsOk,
            (OuterWallsOk, InnerWalls { complete: true }) => InnerWallsOk,
            (OuterWallsOk, InnerWalls { complete: false }) => InnerSuppressed,
            (InnerWallsOk, Skin { emitted: true }) => SkinEmitted,
            (InnerWallsOk, Skin { emitted: false }) => SkinSkipped,
            (InnerSuppressed, Skin { .. }) => SkinSkipped,
            (state, _) => state,
        }
    }

    /// State reached after wall generation.
    pub fn after_walls(walls: &WallSet, wall_count: u32) -> Self {
        if walls.walls_emitted == 0 {
            return RingState::NoWall;
        }
        RingState::NoWall
            .advance(RingEvent::OuterWall)
            .advance(RingEvent::InnerWalls {
                complete: !walls.walls_suppressed(wall_count),
            })
    }

    /// Inner walls were dropped, so skin is off the table.
    pub fn is_suppressed(self) -> bool {
        matches!(self, RingState::InnerSuppressed | RingState::SkinSkipped)
    }
}

/// Whether and where a ring gets skin.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum SkinDecision {
    /// Top or bottom shell: solid everywhere inside the skin loop.
    Shell,
    /// Interior layer: solid only over these regions.
    Regions(Vec<Path>),
    /// No skin.
    #[default]
    Skip,
}

impl SkinDecision {
    /// Decide for a structure ring.
    ///
    /// `exposure` is `None` when exposure detection is disabled, in which
    /// case only shell layers get skin.
    pub fn for_ring(window: &ExposureWindow, exposure: Option<&ExposureResult>) -> Self {
        if window.is_shell() {
            return SkinDecision::Shell;
        }
        match exposure {
            Some(result) if result.needs_skin() => SkinDecision::Regions(
                result
                    .exposed_areas
                    .iter()
                    .chain(&result.fully_covered_regions)
                    .cloned()
                    .collect(),
            ),
            _ => SkinDecision::Skip,
        }
    }

    /// Any skin at all.
    pub fn wants_skin(&self) -> bool {
        !matches!(self, SkinDecision::Skip)
    }
}

/// Skin output for one ring.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SkinRegion {
    /// Ring the skin belongs to.
    pub ring_id: usize,
    /// The skin loop bounding the solid fill.
    pub boundary: Option<Path>,
    /// Areas to fill solid. Empty for holes: their boundary only carves
    /// the enclosing structure's fill.
    pub fill: Vec<Path>,
}

impl SkinRegion {
    /// Nothing to print.
    pub fn is_empty(&self) -> bool {
        self.boundary.is_none() && self.fill.is_empty()
    }
}

/// Build the skin region of a ring.
///
/// `skin_loop` is the loop emitted after the innermost wall; without one
/// there is no skin. Region fills are clipped to the loop on a grid of
/// `resolution` spacing.
pub fn resolve_skin(
    ring_id: usize,
    skin_loop: Option<&Path>,
    decision: &SkinDecision,
    is_hole: bool,
    resolution: f64,
) -> SkinRegion {
    let Some(skin) = skin_loop else {
        return SkinRegion {
            ring_id,
            ..Default::default()
        };
    };
    if !decision.wants_skin() {
        return SkinRegion {
            ring_id,
            ..Default::default()
        };
    }

    let fill = match decision {
        _ if is_hole => Vec::new(),
        SkinDecision::Shell => vec![skin.clone()],
        SkinDecision::Regions(regions) => regions
            .iter()
            .flat_map(|r| clip_to_loop(r, skin, resolution))
            .collect(),
        SkinDecision::Skip => Vec::new(),
    };

    SkinRegion {
        ring_id,
        boundary: Some(skin.clone()),
        fill,
    }
}

/// Keep the cells of `region` whose centers fall inside `skin`, merged
/// into one strip per run along each row.
fn clip_to_loop(region: &Path, skin: &Path, resolution: f64) -> Vec<Path> {
    let b = region.bounds();
    if b.is_empty() || !b.overlaps(&skin.bounds()) {
        return Vec::new();
    }
    let step = resolution.max(1e-3);
    let cols = ((b.width() / step).round() as usize).max(1);
    let rows = ((b.height() / step).round() as usize).max(1);
    let (dx, dy) = (b.width() / cols as f64, b.height() / rows as f64);

    let mut strips = Vec::new();
    for row in 0..rows {
        let y0 = b.min_y + row as f64 * dy;
        let cy = y0 + dy * 0.5;
        let mut run: Option<usize> = None;
        for col in 0..=cols {
            let inside = col < cols && {
                let center = Point2::new(b.min_x + (col as f64 + 0.5) * dx, cy);
                point_in_polygon(&center, region) && point_in_polygon(&center, skin)
            };
            match (inside, run) {
                (true, None) => run = Some(col),
                (false, Some(start)) => {
                    let x0 = b.min_x + start as f64 * dx;
                    let x1 = b.min_x + col as f64 * dx;
                    strips.push(Path::closed(vec![
                        Point2::new(x0, y0),
                        Point2::new(x1, y0),
                        Point2::new(x1, y0 + dy),
                        Point2::new(x0, y0 + dy),
                    ]));
                    run = None;
                }
                _ => {}
            }
        }
    }
    strips
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wall::{DropReason, WallDrop};
    use approx::assert_relative_eq;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Path {
        Path::closed(vec![
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x1, y1),
            Point2::new(x0, y1),
        ])
    }

    #[test]
    fn test_state_machine() {
        let s = RingState::NoWall.advance(RingEvent::OuterWall);
        assert_eq!(s, RingState::OuterWallsOk);

        let ok = s.advance(RingEvent::InnerWalls { complete: true });
        assert_eq!(ok, RingState::InnerWallsOk);
        assert_eq!(
            ok.advance(RingEvent::Skin { emitted: true }),
            RingState::SkinEmitted
        );
        assert_eq!(
            ok.advance(RingEvent::Skin { emitted: false }),
            RingState::SkinSkipped
        );

        let suppressed = s.advance(RingEvent::InnerWalls { complete: false });
        assert_eq!(suppressed, RingState::InnerSuppressed);
        assert!(suppressed.is_suppressed());
        assert_eq!(
            suppressed.advance(RingEvent::Skin { emitted: true }),
            RingState::SkinSkipped
        );

        // Out-of-order events are ignored.
        assert_eq!(
            RingState::NoWall.advance(RingEvent::Skin { emitted: true }),
            RingState::NoWall
        );
    }

    #[test]
    fn test_state_after_walls() {
        let mut walls = WallSet {
            walls_emitted: 3,
            ..Default::default()
        };
        assert_eq!(RingState::after_walls(&walls, 3), RingState::InnerWallsOk);

        walls.walls_emitted = 1;
        walls.dropped = Some(WallDrop {
            index: 1,
            reason: DropReason::Clearance,
        });
        assert_eq!(RingState::after_walls(&walls, 3), RingState::InnerSuppressed);

        walls.walls_emitted = 0;
        assert_eq!(RingState::after_walls(&walls, 3), RingState::NoWall);
    }

    #[test]
    fn test_decision_shell_and_interior() {
        let bottom = ExposureWindow::new(1, 4, 50);
        assert_eq!(SkinDecision::for_ring(&bottom, None), SkinDecision::Shell);
        let top = ExposureWindow::new(46, 4, 50);
        assert_eq!(SkinDecision::for_ring(&top, None), SkinDecision::Shell);

        let interior = ExposureWindow::new(20, 4, 50);
        assert_eq!(SkinDecision::for_ring(&interior, None), SkinDecision::Skip);

        let covered = ExposureResult::default();
        assert_eq!(
            SkinDecision::for_ring(&interior, Some(&covered)),
            SkinDecision::Skip
        );

        let exposed = ExposureResult {
            exposed_areas: vec![rect(0.0, 0.0, 1.0, 1.0)],
            fully_covered_regions: vec![rect(2.0, 0.0, 3.0, 1.0)],
            ..Default::default()
        };
        match SkinDecision::for_ring(&interior, Some(&exposed)) {
            SkinDecision::Regions(r) => assert_eq!(r.len(), 2),
            other => panic!("expected regions, got {other:?}"),
        }
    }

    #[test]
    fn test_shell_fill_is_skin_loop() {
        let skin = rect(1.0, 1.0, 9.0, 9.0);
        let region = resolve_skin(4, Some(&skin), &SkinDecision::Shell, false, 0.5);
        assert_eq!(region.ring_id, 4);
        assert_eq!(region.boundary.as_ref(), Some(&skin));
        assert_eq!(region.fill, vec![skin]);
    }

    #[test]
    fn test_region_fill_clipped_to_skin_loop() {
        let skin = rect(2.0, 0.0, 8.0, 10.0);
        let decision = SkinDecision::Regions(vec![rect(0.0, 0.0, 10.0, 1.0)]);
        let region = resolve_skin(0, Some(&skin), &decision, false, 0.5);

        let area: f64 = region.fill.iter().map(Path::area).sum();
        assert_relative_eq!(area, 6.0, epsilon = 1e-9);
        assert_eq!(region.fill.len(), 2);
    }

    #[test]
    fn test_hole_gets_boundary_only() {
        let skin = rect(3.0, 3.0, 5.0, 5.0);
        let region = resolve_skin(1, Some(&skin), &SkinDecision::Shell, true, 0.5);
        assert!(region.boundary.is_some());
        assert!(region.fill.is_empty());
    }

    #[test]
    fn test_no_skin_without_loop_or_decision() {
        assert!(resolve_skin(0, None, &SkinDecision::Shell, false, 0.5).is_empty());
        let skin = rect(0.0, 0.0, 1.0, 1.0);
        assert!(resolve_skin(0, Some(&skin), &SkinDecision::Skip, false, 0.5).is_empty());
    }
}
