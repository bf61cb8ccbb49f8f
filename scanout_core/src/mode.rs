// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display timings and the global resolution list.
//!
//! [`ModeInfo`] mirrors the kernel's `drm_mode_modeinfo` byte for byte, so a
//! mode blob is simply [`ModeInfo::as_bytes`]. [`ModeList`] is the
//! deduplicated set of resolutions offered to callers.

use core::fmt;

use bytemuck::{Pod, Zeroable};

/// Length of the fixed-size mode name field.
pub const MODE_NAME_LEN: usize = 32;

/// Kernel display timings (`drm_mode_modeinfo` layout).
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct ModeInfo {
    /// Pixel clock in kHz.
    pub clock: u32,
    /// Visible width.
    pub hdisplay: u16,
    /// Horizontal sync start.
    pub hsync_start: u16,
    /// Horizontal sync end.
    pub hsync_end: u16,
    /// Total line length including blanking.
    pub htotal: u16,
    /// Horizontal skew.
    pub hskew: u16,
    /// Visible height.
    pub vdisplay: u16,
    /// Vertical sync start.
    pub vsync_start: u16,
    /// Vertical sync end.
    pub vsync_end: u16,
    /// Total frame height including blanking.
    pub vtotal: u16,
    /// Vertical scan multiplier.
    pub vscan: u16,
    /// Nominal refresh rate in Hz as reported by the kernel.
    pub vrefresh: u32,
    /// `DRM_MODE_FLAG_*` bits.
    pub flags: u32,
    /// `DRM_MODE_TYPE_*` bits.
    pub mode_type: u32,
    /// NUL-padded mode name.
    pub name: [u8; MODE_NAME_LEN],
}

impl ModeInfo {
    /// `DRM_MODE_TYPE_PREFERRED`.
    pub const TYPE_PREFERRED: u32 = 1 << 3;

    /// Builds a mode from `(display, sync_start, sync_end, total)` tuples.
    ///
    /// The name is set to `"{hdisplay}x{vdisplay}"` and `vrefresh` is derived
    /// from the clock.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "refresh is clamped to a small positive range before the cast"
    )]
    pub fn from_timings(clock: u32, h: (u16, u16, u16, u16), v: (u16, u16, u16, u16)) -> Self {
        let mut mode = Self {
            clock,
            hdisplay: h.0,
            hsync_start: h.1,
            hsync_end: h.2,
            htotal: h.3,
            vdisplay: v.0,
            vsync_start: v.1,
            vsync_end: v.2,
            vtotal: v.3,
            ..Self::zeroed()
        };
        mode.vrefresh = mode.refresh_hz().round().clamp(0.0, 1000.0) as u32;
        mode.set_name(&format!("{}x{}", h.0, v.0));
        mode
    }

    /// Visible size in pixels.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (u32::from(self.hdisplay), u32::from(self.vdisplay))
    }

    /// Refresh rate computed from the timings (`clock * 1000 / (htotal * vtotal)`).
    ///
    /// Returns `0.0` for degenerate timings.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "refresh rates are far inside f32 range"
    )]
    pub fn refresh_hz(&self) -> f32 {
        let total = u32::from(self.htotal) * u32::from(self.vtotal);
        if total == 0 {
            return 0.0;
        }
        (f64::from(self.clock) * 1000.0 / f64::from(total)) as f32
    }

    /// Returns the mode name up to the first NUL.
    #[must_use]
    pub fn name(&self) -> &str {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MODE_NAME_LEN);
        core::str::from_utf8(&self.name[..end]).unwrap_or("")
    }

    /// Sets the mode name, truncating to 31 bytes.
    pub fn set_name(&mut self, name: &str) {
        self.name = [0; MODE_NAME_LEN];
        let len = name.len().min(MODE_NAME_LEN - 1);
        self.name[..len].copy_from_slice(&name.as_bytes()[..len]);
    }

    /// Raw bytes as expected by the kernel for a `MODE_ID` blob.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl fmt::Debug for ModeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.2} {} {} {} {} {} {} {} {} {}",
            self.name(),
            self.refresh_hz(),
            self.hdisplay,
            self.hsync_start,
            self.hsync_end,
            self.htotal,
            self.vdisplay,
            self.vsync_start,
            self.vsync_end,
            self.vtotal,
            self.clock
        )
    }
}

/// A width × height pair offered to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Resolutions in first-registration order, deduplicated by exact size.
#[derive(Clone, Debug, Default)]
pub struct ModeList {
    entries: Vec<Resolution>,
}

impl ModeList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `width × height` unless already present. Returns `true` if added.
    pub fn register(&mut self, width: u32, height: u32) -> bool {
        if self.lookup(width, height).is_some() {
            return false;
        }
        self.entries.push(Resolution { width, height });
        true
    }

    /// Returns the index of `width × height`, if registered.
    #[must_use]
    pub fn lookup(&self, width: u32, height: u32) -> Option<usize> {
        self.entries
            .iter()
            .position(|r| r.width == width && r.height == height)
    }

    /// All registered resolutions.
    #[must_use]
    pub fn as_slice(&self) -> &[Resolution] {
        &self.entries
    }

    /// Number of registered resolutions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
