// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display-pipeline management for atomic kernel mode setting.
//!
//! `scanout_core` drives a direct KMS video output through CPU-mapped dumb
//! buffers. It never talks to the kernel itself: every device interaction goes
//! through the [`KmsDevice`](device::KmsDevice) trait, which platform backends
//! (e.g. `scanout_backend_drm`) implement.
//!
//! # Architecture
//!
//! ```text
//!   KmsDevice ──► PropertyCache ──► discover() ──► PipeRegistry
//!                                                      │
//!   ModeRequest ──► format::lookup() ──► BufferManager │
//!                                            │         ▼
//!                                            └──► CommitEngine::activate()
//!                                                      │
//!                                                      ▼
//!                              PresentationLoop (sync flip / flip thread)
//! ```
//!
//! **[`format`]** — Pure mapping from requested depth and flags to a
//! [`ColorFormat`](format::ColorFormat), plus per-plane framebuffer layout.
//!
//! **[`property`]** — Per-object property metadata, looked up by name when
//! building atomic requests.
//!
//! **[`pipe`]** — Compatibility search over plane/crtc/encoder/connector
//! bitmasks producing the ordered [`PipeRegistry`](pipe::PipeRegistry) and the
//! deduplicated mode list.
//!
//! **[`buffer`]** — Dumb-buffer slots with per-step rollback.
//!
//! **[`atomic`]** and **[`commit`]** — Transaction builder and the mode-set,
//! page-flip and palette transactions built from it. **[`scaling`]** computes
//! the plane destination rectangle.
//!
//! **[`present`]** — Front/back/queued indices and the triple-buffering flip
//! thread.
//!
//! **[`display`]** — The [`KmsDisplay`](display::KmsDisplay) facade tying the
//! pieces together; **[`driver`]** is the host-facing dispatch trait.
//! [`DisplayConfig`](config::DisplayConfig) holds the settings read at init.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) events for discovery,
//! buffers, commits and flips.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies.

pub mod atomic;
pub mod buffer;
pub mod commit;
pub mod config;
pub mod device;
pub mod display;
pub mod driver;
pub mod error;
pub mod format;
pub mod mode;
pub mod object;
pub mod pipe;
pub mod present;
pub mod property;
pub mod scaling;
pub mod trace;

#[cfg(test)]
mod testing;
