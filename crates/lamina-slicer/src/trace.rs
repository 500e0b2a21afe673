//! Instrumentation hooks.
//!
//! Every stage takes a `&dyn TraceSink` and reports the things it
//! tolerated instead of failing on: open chains, dropped walls,
//! ambiguous containment, skipped skin. Callers pick a sink; nothing is
//! global.

use std::sync::Mutex;

use tracing::debug;

use crate::wall::DropReason;

/// What happened.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceKind {
    /// Zero-length segments filtered before stitching.
    DegenerateSegments {
        /// Number of segments dropped.
        count: usize,
    },
    /// A chain could not be closed and was kept open.
    OpenChain {
        /// Points in the open chain.
        points: usize,
    },
    /// A representative vertex sat on another ring's boundary.
    AmbiguousContainment {
        /// Ring being classified.
        ring: usize,
        /// Ring whose boundary was touched.
        against: usize,
        /// Whether the nudge moved the point off the boundary.
        resolved: bool,
    },
    /// A wall (and every deeper wall) was dropped.
    WallDropped {
        /// Ring the wall belongs to.
        ring: usize,
        /// Zero-based wall index (`wall_count` for the skin loop).
        wall_index: usize,
        /// Why the wall was rejected.
        reason: DropReason,
    },
    /// Exposure analysis finished for a ring.
    Exposure {
        /// Ring analyzed.
        ring: usize,
        /// Fraction of the ring covered from above.
        coverage_above: f64,
        /// Fraction of the ring covered from below.
        coverage_below: f64,
        /// Exposed region count.
        exposed: usize,
        /// Fully covered (closure) region count.
        fully_covered: usize,
    },
    /// A ring wanted skin but did not get it.
    SkinSkipped {
        /// Ring affected.
        ring: usize,
    },
    /// A ring hit an invariant violation and was abandoned.
    RingFault {
        /// Ring affected.
        ring: usize,
        /// Error text.
        message: String,
    },
}

/// A trace record, tagged with the layer when known.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEvent {
    /// Layer index, if the emitting stage knows it.
    pub layer: Option<usize>,
    /// Event payload.
    pub kind: TraceKind,
}

impl TraceEvent {
    /// Event without layer context.
    pub fn new(kind: TraceKind) -> Self {
        Self { layer: None, kind }
    }
}

/// Receiver for trace events.
pub trait TraceSink: Send + Sync {
    /// Record one event.
    fn record(&self, event: &TraceEvent);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTrace;

impl TraceSink for NoTrace {
    fn record(&self, _event: &TraceEvent) {}
}

/// Forwards events to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTrace;

impl TraceSink for LogTrace {
    fn record(&self, event: &TraceEvent) {
        debug!(layer = ?event.layer, kind = ?event.kind, "slicer trace");
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct RecordingTrace {
    events: Mutex<Vec<TraceEvent>>,
}

impl RecordingTrace {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<TraceEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Count events matching a predicate.
    pub fn count(&self, pred: impl Fn(&TraceKind) -> bool) -> usize {
        self.events().iter().filter(|e| pred(&e.kind)).count()
    }
}

impl TraceSink for RecordingTrace {
    fn record(&self, event: &TraceEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

/// Stamps a layer index onto events from layer-agnostic stages.
pub struct LayerTrace<'a> {
    layer: usize,
    inner: &'a dyn TraceSink,
}

impl<'a> LayerTrace<'a> {
    /// Wrap `inner` for `layer`.
    pub fn new(layer: usize, inner: &'a dyn TraceSink) -> Self {
        Self { layer, inner }
    }
}

impl TraceSink for LayerTrace<'_> {
    fn record(&self, event: &TraceEvent) {
        let mut event = event.clone();
        event.layer.get_or_insert(self.layer);
        self.inner.record(&event);
    }
}

pub(crate) fn emit(trace: &dyn TraceSink, kind: TraceKind) {
    trace.record(&TraceEvent::new(kind));
}
