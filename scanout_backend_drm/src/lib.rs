// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Linux DRM backend for scanout.
//!
//! This crate implements [`KmsDevice`] over a `/dev/dri/card*` node:
//!
//! - [`Card`]: an open DRM card with universal planes and atomic commits
//!   enabled, probed like [`Card::probe`] describes
//! - [`DumbMapping`]: a CPU mapping of a dumb buffer, unmapped on drop
//!
//! Enumeration goes through the `drm` crate's control API. Dumb buffers,
//! framebuffers and property blobs use `drm-ffi` directly so the core can
//! refer to them by raw id. `rustix` provides `mmap` and errno handling.

#![expect(
    unsafe_code,
    reason = "dumb buffers are mapped into the process with mmap"
)]

mod card;
mod mapping;

pub use card::{CARD_PREFIX, Card, MAX_CARDS};
pub use mapping::DumbMapping;
pub use scanout_core::device::KmsDevice;
