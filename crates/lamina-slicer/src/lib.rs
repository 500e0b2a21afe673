#![warn(missing_docs)]

//! Layer geometry core for FDM slicing.
//!
//! Turns per-layer cross-section segments into nested closed rings,
//! offsets them into perimeter walls that keep nozzle clearance, and
//! decides which regions need solid skin by looking at the layers above
//! and below instead of a fixed top/bottom count.
//!
//! # Example
//!
//! ```ignore
//! use lamina_slicer::{slice_layers, LogTrace, SlicerConfig, WallKind};
//!
//! let segments: Vec<Vec<Segment3>> = // ... cross-sections per layer
//! let config = SlicerConfig::from_toml_str("wall_count = 2")?;
//! let layers = slice_layers(&segments, &config, &LogTrace)?;
//!
//! for layer in &layers {
//!     println!("layer {}: {} skin loops", layer.index, layer.count(WallKind::Skin));
//! }
//! ```

pub mod config;
pub mod error;
pub mod exposure;
pub mod nesting;
pub mod path;
pub mod pipeline;
pub mod skin;
pub mod stitch;
pub mod trace;
pub mod wall;

pub use config::SlicerConfig;
pub use lamina_math::{Point2, Point3};
pub use error::{Result, SlicerError};
pub use exposure::{
    compute_exposure, resolve_fully_covered_regions, CoveringRegion, ExposureResult,
    ExposureWindow,
};
pub use nesting::{classify_layer, classify_nesting, ClassifiedLayer, NestingInfo};
pub use path::{path_bounds, point_in_polygon, Bounds, Path, Segment, Segment3};
pub use pipeline::{generate_toolpaths, slice_layers, LayerToolpaths, RingReport, TypedPolyline};
pub use skin::{resolve_skin, RingEvent, RingState, SkinDecision, SkinRegion};
pub use stitch::{project_segments, stitch_segments_to_paths};
pub use trace::{LayerTrace, LogTrace, NoTrace, RecordingTrace, TraceEvent, TraceKind, TraceSink};
pub use wall::{generate_walls, offset_path, DropReason, WallKind, WallLoop, WallRequest, WallSet};
