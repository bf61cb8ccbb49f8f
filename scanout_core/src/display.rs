// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The display facade.
//!
//! [`KmsDisplay`] owns everything built on top of a [`KmsDevice`]: the
//! property cache and pipe registry from discovery, the buffer slots of the
//! current mode, the presentation loop and the palette. Its lifecycle is
//! init → any number of mode-sets → shutdown; shutdown also runs on drop.

use std::sync::Arc;

use crate::buffer::BufferManager;
use crate::commit::{Color, CommitEngine, FlipStatus, ModesetParams, Palette};
use crate::config::DisplayConfig;
use crate::device::KmsDevice;
use crate::error::DisplayError;
use crate::format::{ColorFormat, DEFAULT_DEPTH, FormatFlags, FormatTable};
use crate::mode::{ModeInfo, Resolution};
use crate::object::{BlobId, ObjectId};
use crate::pipe::{PipeId, PipeRegistry, discover};
use crate::present::{BufferingMode, PresentationLoop};
use crate::property::PropertyCache;
use crate::scaling::{PlaneRect, ScalingMode};
use crate::trace::Tracer;

/// A mode-set request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModeRequest {
    /// Source width in pixels.
    pub width: u32,
    /// Source height in pixels.
    pub height: u32,
    /// Bits per pixel; `0` selects [`DEFAULT_DEPTH`].
    pub depth: u32,
    /// Channel order and planar selection.
    pub flags: FormatFlags,
    /// Number of buffers.
    pub buffering: BufferingMode,
}

impl ModeRequest {
    /// A native-order, double-buffered request.
    #[must_use]
    pub const fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
            flags: FormatFlags::NONE,
            buffering: BufferingMode::Double,
        }
    }

    /// Sets the buffering mode.
    #[must_use]
    pub const fn with_buffering(mut self, buffering: BufferingMode) -> Self {
        self.buffering = buffering;
        self
    }

    /// Sets the format flags.
    #[must_use]
    pub const fn with_flags(mut self, flags: FormatFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// The surface produced by a successful mode-set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceInfo {
    /// Source width in pixels.
    pub width: u32,
    /// Source height in pixels.
    pub height: u32,
    /// Bytes per row.
    pub pitch: u32,
    /// Pixel format of every buffer.
    pub format: &'static ColorFormat,
    /// Buffers in rotation.
    pub buffering: BufferingMode,
    /// Pipe driving the display.
    pub pipe: PipeId,
    /// Mode programmed on the crtc.
    pub mode: ModeInfo,
}

#[derive(Debug)]
struct ActiveMode {
    surface: SurfaceInfo,
    crtc: ObjectId,
    mode_blob: BlobId,
}

/// A KMS display: discovery, mode-setting, presentation and palette.
#[derive(Debug)]
pub struct KmsDisplay<D: KmsDevice + Send + Sync + 'static> {
    device: Arc<D>,
    config: DisplayConfig,
    formats: FormatTable,
    tracer: Tracer,
    cache: PropertyCache,
    registry: PipeRegistry,
    buffers: BufferManager,
    presentation: Option<PresentationLoop<D>>,
    active: Option<ActiveMode>,
    // Pipe last lit by a mode-set, kept across failed mode-sets so the next
    // attempt can release it.
    lit: Option<PipeId>,
    palette: Palette,
    lut_blob: Option<BlobId>,
    scaling: ScalingMode,
    closed: bool,
}

impl<D: KmsDevice + Send + Sync + 'static> KmsDisplay<D> {
    /// Discovers the display pipes of `device`.
    ///
    /// Fails with [`DisplayError::NoPipes`] if nothing can be driven.
    pub fn init(
        device: Arc<D>,
        config: DisplayConfig,
        tracer: Tracer,
    ) -> Result<Self, DisplayError> {
        let mut cache = PropertyCache::new();
        let registry = discover(&*device, &mut cache, &tracer)?;
        Ok(Self {
            device,
            formats: FormatTable::new(config.indexed_swizzle),
            scaling: config.scaling,
            config,
            tracer,
            cache,
            registry,
            buffers: BufferManager::new(),
            presentation: None,
            active: None,
            lit: None,
            palette: Palette::default(),
            lut_blob: None,
            closed: false,
        })
    }

    /// Resolutions any discovered pipe can show, including aspect-corrected
    /// aliases.
    #[must_use]
    pub fn modes(&self) -> &[Resolution] {
        self.registry.modes().as_slice()
    }

    /// Discovered pipes.
    #[must_use]
    pub fn pipes(&self) -> &PipeRegistry {
        &self.registry
    }

    /// The current surface, if a mode is set.
    #[must_use]
    pub fn surface(&self) -> Option<&SurfaceInfo> {
        self.active.as_ref().map(|a| &a.surface)
    }

    /// Current scaling policy.
    #[must_use]
    pub fn scaling(&self) -> ScalingMode {
        self.scaling
    }

    /// Destination rectangle on the crtc, if a mode is set.
    #[must_use]
    pub fn placement(&self) -> Option<PlaneRect> {
        self.presentation.as_ref().map(PresentationLoop::placement)
    }

    /// Number of flips accepted since the last mode-set.
    #[must_use]
    pub fn flips(&self) -> u64 {
        self.presentation.as_ref().map_or(0, PresentationLoop::flips)
    }

    /// Sets a video mode, replacing the current one.
    ///
    /// The previous buffers are released first. If no pipe accepts the mode
    /// the new buffers are released too and no mode is active afterwards.
    pub fn set_video_mode(&mut self, request: ModeRequest) -> Result<SurfaceInfo, DisplayError> {
        if self.closed {
            return Err(DisplayError::NotActive);
        }
        self.teardown_mode();

        let depth = if request.depth == 0 {
            DEFAULT_DEPTH
        } else {
            request.depth
        };
        let format = self
            .formats
            .lookup(depth, request.flags)
            .ok_or(DisplayError::UnsupportedFormat { depth })?;

        let count = request.buffering.slot_count();
        for slot in 0..count {
            if let Err(err) = self.buffers.create(
                &*self.device,
                slot,
                request.width,
                request.height,
                format,
                &self.tracer,
            ) {
                self.buffers.destroy_all(&*self.device, &self.tracer);
                return Err(err);
            }
        }
        let (Some(framebuffers), Some(pitch)) =
            (self.buffers.framebuffers(count), self.buffers.pitch())
        else {
            self.buffers.destroy_all(&*self.device, &self.tracer);
            return Err(DisplayError::InvalidSlot(0));
        };

        let lut = if format.is_indexed() {
            match self.device.create_blob(self.palette.as_bytes()) {
                Ok(blob) => Some(blob),
                Err(err) => {
                    self.buffers.destroy_all(&*self.device, &self.tracer);
                    return Err(err.into());
                }
            }
        } else {
            None
        };

        let params = ModesetParams {
            framebuffer: framebuffers[0],
            source: (request.width, request.height),
            scaling: self.scaling,
            refresh: self.config.refresh_rate,
            gamma_lut: lut,
            previous: self.lit,
        };
        let engine = CommitEngine::new(&*self.device, &self.cache, &self.tracer);
        let activation = match engine.activate(&self.registry, &params) {
            Ok(activation) => activation,
            Err(err) => {
                if let Some(blob) = lut {
                    _ = self.device.destroy_blob(blob);
                }
                self.buffers.destroy_all(&*self.device, &self.tracer);
                return Err(err);
            }
        };

        self.lit = Some(activation.pipe);
        // The mode-set replaced whatever LUT the crtc had before.
        let installed = lut.filter(|_| engine.supports_palette(activation.crtc));
        if let (Some(blob), None) = (lut, installed) {
            _ = self.device.destroy_blob(blob);
        }
        if let Some(old) = self.lut_blob.take() {
            _ = self.device.destroy_blob(old);
        }
        self.lut_blob = installed;

        let presentation = match PresentationLoop::start(
            Arc::clone(&self.device),
            request.buffering,
            activation.target,
            framebuffers,
            self.tracer.clone(),
            self.config.flip_retry,
        ) {
            Ok(presentation) => presentation,
            Err(err) => {
                _ = self.device.destroy_blob(activation.mode_blob);
                self.buffers.destroy_all(&*self.device, &self.tracer);
                return Err(err);
            }
        };

        let surface = SurfaceInfo {
            width: request.width,
            height: request.height,
            pitch,
            format,
            buffering: request.buffering,
            pipe: activation.pipe,
            mode: activation.mode,
        };
        self.active = Some(ActiveMode {
            surface,
            crtc: activation.crtc,
            mode_blob: activation.mode_blob,
        });
        self.presentation = Some(presentation);
        Ok(surface)
    }

    /// Pixel memory of the buffer the next frame should be drawn into.
    pub fn pixels_mut(&mut self) -> Result<&mut [u8], DisplayError> {
        let slot = self
            .presentation
            .as_ref()
            .ok_or(DisplayError::NotActive)?
            .draw_slot();
        self.buffers
            .pixels_mut(slot)
            .ok_or(DisplayError::NotActive)
    }

    /// Presents the frame drawn since the last call.
    pub fn flip(&mut self) -> Result<FlipStatus, DisplayError> {
        self.presentation
            .as_mut()
            .ok_or(DisplayError::NotActive)?
            .present()
    }

    /// Updates palette entries from `first` on.
    ///
    /// The palette is kept across mode-sets. It is pushed to the hardware
    /// only while an indexed mode is active on a crtc with `GAMMA_LUT`; the
    /// new LUT replaces the old one only if the commit succeeds.
    pub fn set_palette(&mut self, first: usize, colors: &[Color]) -> Result<(), DisplayError> {
        let changed = self.palette.set_colors(first, colors);
        let Some(active) = &self.active else {
            return Ok(());
        };
        if !active.surface.format.is_indexed() || changed.1 == 0 {
            return Ok(());
        }
        let Some(presentation) = &self.presentation else {
            return Err(DisplayError::NotActive);
        };

        let engine = CommitEngine::new(&*self.device, &self.cache, &self.tracer);
        if !engine.supports_palette(active.crtc) {
            return Ok(());
        }
        let blob = presentation.exclusive(|| {
            engine.install_palette(active.crtc, &self.palette, self.lut_blob, changed)
        })?;
        self.lut_blob = Some(blob);
        Ok(())
    }

    /// Current palette.
    #[must_use]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Switches the scaling policy; applied to the next flip.
    ///
    /// A single-buffered display re-flips at once and reports
    /// [`FlipStatus::Pending`] if the kernel was busy; the next
    /// [`flip`](Self::flip) then retries.
    pub fn set_scaling(&mut self, scaling: ScalingMode) -> Result<FlipStatus, DisplayError> {
        self.scaling = scaling;
        match &mut self.presentation {
            Some(presentation) => presentation.set_scaling(scaling),
            None => Ok(FlipStatus::Submitted),
        }
    }

    /// Advances to the next scaling policy and returns it with the status of
    /// [`set_scaling`](Self::set_scaling).
    pub fn cycle_scaling(&mut self) -> Result<(ScalingMode, FlipStatus), DisplayError> {
        let next = self.scaling.next();
        let status = self.set_scaling(next)?;
        Ok((next, status))
    }

    /// Offers a key press to the display. Returns `true` if it was the
    /// configured scaling hot-key.
    pub fn handle_key(&mut self, key: u32) -> Result<bool, DisplayError> {
        if self.config.scaling_hotkey != Some(key) {
            return Ok(false);
        }
        self.cycle_scaling()?;
        Ok(true)
    }

    fn teardown_mode(&mut self) {
        if let Some(mut presentation) = self.presentation.take() {
            presentation.stop();
        }
        self.buffers.destroy_all(&*self.device, &self.tracer);
        if let Some(active) = self.active.take() {
            _ = self.device.destroy_blob(active.mode_blob);
        }
    }

    /// Stops presentation and releases every kernel object this display
    /// created. Calling it again does nothing.
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.teardown_mode();
        if let Some(blob) = self.lut_blob.take() {
            _ = self.device.destroy_blob(blob);
        }
        self.lit = None;
        self.cache.release_all();
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has run.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.closed
    }
}

impl<D: KmsDevice + Send + Sync + 'static> Drop for KmsDisplay<D> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
