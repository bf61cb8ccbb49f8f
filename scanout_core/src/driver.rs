// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host-facing video driver entry points.
//!
//! A host that dispatches through a table of video hooks binds them to a
//! [`VideoDriver`]. [`KmsDisplay`] is the only implementation in this crate.

use crate::commit::{Color, FlipStatus};
use crate::device::KmsDevice;
use crate::display::{KmsDisplay, ModeRequest, SurfaceInfo};
use crate::error::DisplayError;
use crate::mode::Resolution;

/// The hooks a host calls on its video driver.
pub trait VideoDriver {
    /// Resolutions the driver can set, in preference order.
    fn list_modes(&self) -> Vec<Resolution>;

    /// Sets a video mode and returns the new drawing surface.
    fn set_video_mode(&mut self, request: ModeRequest) -> Result<SurfaceInfo, DisplayError>;

    /// Pixel memory to draw the next frame into.
    fn frame_buffer(&mut self) -> Result<&mut [u8], DisplayError>;

    /// Presents the frame drawn since the last flip.
    fn flip(&mut self) -> Result<FlipStatus, DisplayError>;

    /// Updates palette entries from `first` on.
    fn set_colors(&mut self, first: usize, colors: &[Color]) -> Result<(), DisplayError>;

    /// Offers a raw key code; returns `true` if the driver consumed it.
    fn key_pressed(&mut self, key: u32) -> Result<bool, DisplayError> {
        _ = key;
        Ok(false)
    }

    /// Releases everything; later calls fail or do nothing.
    fn video_quit(&mut self);
}

impl<D: KmsDevice + Send + Sync + 'static> VideoDriver for KmsDisplay<D> {
    fn list_modes(&self) -> Vec<Resolution> {
        self.modes().to_vec()
    }

    fn set_video_mode(&mut self, request: ModeRequest) -> Result<SurfaceInfo, DisplayError> {
        Self::set_video_mode(self, request)
    }

    fn frame_buffer(&mut self) -> Result<&mut [u8], DisplayError> {
        self.pixels_mut()
    }

    fn flip(&mut self) -> Result<FlipStatus, DisplayError> {
        Self::flip(self)
    }

    fn set_colors(&mut self, first: usize, colors: &[Color]) -> Result<(), DisplayError> {
        self.set_palette(first, colors)
    }

    fn key_pressed(&mut self, key: u32) -> Result<bool, DisplayError> {
        self.handle_key(key)
    }

    fn video_quit(&mut self) {
        self.shutdown();
    }
}
