// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON Lines trace output.
//!
//! [`JsonLinesSink`] writes every event as one JSON object on its own line,
//! tagged with an `"event"` field, so a log can be filtered with line tools
//! and loaded one record at a time.

use std::io::Write;

use serde_json::{Value, json};

use scanout_core::object::ObjectId;
use scanout_core::trace::{
    BufferEvent, CommitEvent, FlipEvent, PaletteEvent, PipeEvent, TraceSink,
};

/// Writes one JSON object per event to a [`Write`](std::io::Write) destination.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: u64,
}

impl<W: Write> std::fmt::Debug for JsonLinesSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesSink")
            .field("written", &self.written)
            .finish_non_exhaustive()
    }
}

impl<W: Write> JsonLinesSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of records written so far.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Consumes the sink and returns its writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, record: &Value) {
        if serde_json::to_writer(&mut self.writer, record).is_ok()
            && self.writer.write_all(b"\n").is_ok()
        {
            self.written += 1;
        }
    }
}

impl<W: Write + Send> TraceSink for JsonLinesSink<W> {
    fn on_pipe(&mut self, e: &PipeEvent) {
        self.emit(&json!({
            "event": "pipe",
            "index": e.index,
            "plane": e.plane.0,
            "crtc": e.crtc.0,
            "encoder": e.encoder.0,
            "connector": e.connector.0,
            "modes": e.modes,
            "factor": [e.factor_w, e.factor_h],
        }));
    }

    fn on_plane_skipped(&mut self, plane: ObjectId) {
        self.emit(&json!({
            "event": "plane_skipped",
            "plane": plane.0,
        }));
    }

    fn on_buffer(&mut self, e: &BufferEvent) {
        self.emit(&json!({
            "event": "buffer",
            "slot": e.slot,
            "action": e.action.as_str(),
            "width": e.width,
            "height": e.height,
            "pitch": e.pitch,
            "framebuffer": e.framebuffer.map(|fb| fb.0),
        }));
    }

    fn on_commit(&mut self, e: &CommitEvent) {
        self.emit(&json!({
            "event": "commit",
            "kind": e.kind.as_str(),
            "pipe": e.pipe,
            "properties": e.properties,
            "allow_modeset": e.flags.allow_modeset,
            "nonblocking": e.flags.nonblocking,
            "outcome": e.outcome.as_str(),
        }));
    }

    fn on_flip(&mut self, e: &FlipEvent) {
        self.emit(&json!({
            "event": "flip",
            "flip_index": e.flip_index,
            "front": e.front,
            "framebuffer": e.framebuffer.0,
            "retries": e.retries,
        }));
    }

    fn on_palette(&mut self, e: &PaletteEvent) {
        self.emit(&json!({
            "event": "palette",
            "first": e.first,
            "count": e.count,
            "blob": e.blob.0,
        }));
    }
}
