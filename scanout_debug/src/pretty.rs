// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use scanout_core::atomic::CommitFlags;
use scanout_core::object::ObjectId;
use scanout_core::trace::{
    BufferEvent, CommitEvent, FlipEvent, PaletteEvent, PipeEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write + Send>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn flags_label(flags: CommitFlags) -> &'static str {
    match (flags.allow_modeset, flags.nonblocking) {
        (true, true) => "modeset|nonblock",
        (true, false) => "modeset",
        (false, true) => "nonblock",
        (false, false) => "blocking",
    }
}

impl<W: Write + Send> TraceSink for PrettyPrintSink<W> {
    fn on_pipe(&mut self, e: &PipeEvent) {
        let _ = writeln!(
            self.writer,
            "[pipe] #{} plane={} crtc={} encoder={} connector={} modes={} aspect={}:{}",
            e.index,
            e.plane.0,
            e.crtc.0,
            e.encoder.0,
            e.connector.0,
            e.modes,
            e.factor_w,
            e.factor_h,
        );
    }

    fn on_plane_skipped(&mut self, plane: ObjectId) {
        let _ = writeln!(self.writer, "[pipe] plane={} skipped (overlay)", plane.0);
    }

    fn on_buffer(&mut self, e: &BufferEvent) {
        let fb = e.framebuffer.map_or_else(|| "-".to_owned(), |fb| fb.0.to_string());
        let _ = writeln!(
            self.writer,
            "[buffer] slot={} {} {}x{} pitch={} fb={fb}",
            e.slot,
            e.action.as_str(),
            e.width,
            e.height,
            e.pitch,
        );
    }

    fn on_commit(&mut self, e: &CommitEvent) {
        let pipe = e.pipe.map_or_else(String::new, |p| format!(" pipe=#{p}"));
        let _ = writeln!(
            self.writer,
            "[commit] {}{pipe} props={} flags={} -> {}",
            e.kind.as_str(),
            e.properties,
            flags_label(e.flags),
            e.outcome.as_str(),
        );
    }

    fn on_flip(&mut self, e: &FlipEvent) {
        let _ = writeln!(
            self.writer,
            "[flip] #{} front={} fb={} retries={}",
            e.flip_index, e.front, e.framebuffer.0, e.retries,
        );
    }

    fn on_palette(&mut self, e: &PaletteEvent) {
        let _ = writeln!(
            self.writer,
            "[palette] first={} count={} blob={}",
            e.first, e.count, e.blob.0,
        );
    }
}
