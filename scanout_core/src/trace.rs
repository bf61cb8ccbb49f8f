// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for discovery, buffers, commits and flips.
//!
//! [`TraceSink`] has one method per event, all defaulting to no-ops, so a sink
//! only overrides what it cares about.
//!
//! [`Tracer`] is a cheap, cloneable handle to an optional shared sink. The
//! flip thread holds its own clone, which is why the sink lives behind
//! `Arc<Mutex<_>>` rather than a borrowed `&mut`. When the `trace` feature is
//! **off**, every `Tracer` method compiles to nothing.
//!
//! # Crate features
//!
//! - `trace` enables the `Tracer` method bodies (one branch plus a lock per
//!   call).

#[cfg(feature = "trace")]
use std::sync::{Arc, Mutex, PoisonError};

use crate::atomic::CommitFlags;
use crate::object::{BlobId, FramebufferId, ObjectId};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// What a commit was for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommitKind {
    /// Mode activation on one pipe.
    Modeset,
    /// Page flip to a new framebuffer.
    Flip,
    /// Gamma LUT replacement.
    Palette,
}

impl CommitKind {
    /// Returns a short label for diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Modeset => "modeset",
            Self::Flip => "flip",
            Self::Palette => "palette",
        }
    }
}

/// Result of a commit as seen by tracing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommitOutcome {
    /// The kernel accepted the request.
    Committed,
    /// A previous non-blocking commit is still pending.
    Busy,
    /// The kernel rejected the request.
    Failed,
}

impl CommitOutcome {
    /// Returns a short label for diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Committed => "committed",
            Self::Busy => "busy",
            Self::Failed => "failed",
        }
    }
}

/// What happened to a buffer slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferAction {
    /// Allocated, registered as a framebuffer and mapped.
    Created,
    /// Unmapped and released.
    Destroyed,
    /// Creation failed and completed steps were rolled back.
    RolledBack,
}

impl BufferAction {
    /// Returns a short label for diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Destroyed => "destroyed",
            Self::RolledBack => "rolled back",
        }
    }
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted for every pipe recorded during discovery.
#[derive(Clone, Copy, Debug)]
pub struct PipeEvent {
    /// Position in discovery order.
    pub index: usize,
    /// Plane id.
    pub plane: ObjectId,
    /// Crtc id.
    pub crtc: ObjectId,
    /// Encoder id.
    pub encoder: ObjectId,
    /// Connector id.
    pub connector: ObjectId,
    /// Number of modes the connector exposes.
    pub modes: usize,
    /// Horizontal pixel-aspect factor.
    pub factor_w: u32,
    /// Vertical pixel-aspect factor.
    pub factor_h: u32,
}

/// Emitted when a buffer slot changes state.
#[derive(Clone, Copy, Debug)]
pub struct BufferEvent {
    /// Slot index.
    pub slot: usize,
    /// What happened.
    pub action: BufferAction,
    /// Width in pixels.
    pub width: u32,
    /// Allocated height in rows (includes the planar height factor).
    pub height: u32,
    /// Row pitch in bytes, `0` if allocation never succeeded.
    pub pitch: u32,
    /// Framebuffer object, if one was registered.
    pub framebuffer: Option<FramebufferId>,
}

/// Emitted after every atomic commit.
#[derive(Clone, Copy, Debug)]
pub struct CommitEvent {
    /// What the commit was for.
    pub kind: CommitKind,
    /// Pipe index for mode-sets, `None` otherwise.
    pub pipe: Option<usize>,
    /// Number of property assignments in the request.
    pub properties: usize,
    /// Flags the request was committed with.
    pub flags: CommitFlags,
    /// Outcome.
    pub outcome: CommitOutcome,
}

/// Emitted when a flip is accepted by the kernel.
#[derive(Clone, Copy, Debug)]
pub struct FlipEvent {
    /// Monotonic count of accepted flips since the mode-set.
    pub flip_index: u64,
    /// Slot now being scanned out.
    pub front: usize,
    /// Framebuffer now being scanned out.
    pub framebuffer: FramebufferId,
    /// Busy retries before the kernel accepted it.
    pub retries: u32,
}

/// Emitted when a palette LUT is installed.
#[derive(Clone, Copy, Debug)]
pub struct PaletteEvent {
    /// First palette index updated.
    pub first: usize,
    /// Number of entries updated.
    pub count: usize,
    /// New LUT blob.
    pub blob: BlobId,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the display pipeline.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink: Send {
    /// Called for every pipe recorded during discovery.
    fn on_pipe(&mut self, e: &PipeEvent) {
        _ = e;
    }

    /// Called when discovery skips an overlay plane.
    fn on_plane_skipped(&mut self, plane: ObjectId) {
        _ = plane;
    }

    /// Called when a buffer slot changes state.
    fn on_buffer(&mut self, e: &BufferEvent) {
        _ = e;
    }

    /// Called after every atomic commit.
    fn on_commit(&mut self, e: &CommitEvent) {
        _ = e;
    }

    /// Called when a flip is accepted.
    fn on_flip(&mut self, e: &FlipEvent) {
        _ = e;
    }

    /// Called when a palette LUT is installed.
    fn on_palette(&mut self, e: &PaletteEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Cloneable handle to an optional shared [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
#[derive(Clone, Default)]
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<Arc<Mutex<dyn TraceSink>>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

/// Runs `f` against the sink, if any.
#[cfg(feature = "trace")]
macro_rules! dispatch {
    ($self:ident, |$s:ident| $body:expr) => {
        if let Some(sink) = &$self.sink {
            let mut $s = sink.lock().unwrap_or_else(PoisonError::into_inner);
            $body;
        }
    };
}

impl Tracer {
    /// Creates a tracer that dispatches to the given shared sink.
    ///
    /// The caller keeps its own `Arc` to read the sink back afterwards.
    #[cfg(feature = "trace")]
    #[must_use]
    pub fn new<S: TraceSink + 'static>(sink: Arc<Mutex<S>>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Emits a [`PipeEvent`].
    #[inline]
    pub fn pipe(&self, e: &PipeEvent) {
        #[cfg(feature = "trace")]
        dispatch!(self, |s| s.on_pipe(e));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Reports a skipped overlay plane.
    #[inline]
    pub fn plane_skipped(&self, plane: ObjectId) {
        #[cfg(feature = "trace")]
        dispatch!(self, |s| s.on_plane_skipped(plane));
        #[cfg(not(feature = "trace"))]
        {
            _ = plane;
        }
    }

    /// Emits a [`BufferEvent`].
    #[inline]
    pub fn buffer(&self, e: &BufferEvent) {
        #[cfg(feature = "trace")]
        dispatch!(self, |s| s.on_buffer(e));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CommitEvent`].
    #[inline]
    pub fn commit(&self, e: &CommitEvent) {
        #[cfg(feature = "trace")]
        dispatch!(self, |s| s.on_commit(e));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FlipEvent`].
    #[inline]
    pub fn flip(&self, e: &FlipEvent) {
        #[cfg(feature = "trace")]
        dispatch!(self, |s| s.on_flip(e));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PaletteEvent`].
    #[inline]
    pub fn palette(&self, e: &PaletteEvent) {
        #[cfg(feature = "trace")]
        dispatch!(self, |s| s.on_palette(e));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
