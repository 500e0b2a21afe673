//! Error types for the slicer core.
//!
//! Geometric degeneracies (open loops, collapsed walls, ambiguous
//! containment) are not errors; they are recorded on the ring reports.
//! Only bad settings and broken invariants surface here.

use thiserror::Error;

/// Errors that can occur while slicing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SlicerError {
    /// Invalid slicer settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Settings text could not be parsed.
    #[error("config parse failed: {0}")]
    Config(String),

    /// A value reached a stage that must never see it.
    #[error("invariant violated on layer {layer}, ring {ring}: {reason}")]
    InvariantViolation {
        /// Layer index.
        layer: usize,
        /// Ring index within the layer.
        ring: usize,
        /// What was wrong.
        reason: String,
    },
}

/// Result type for slicer operations.
pub type Result<T> = std::result::Result<T, SlicerError>;
