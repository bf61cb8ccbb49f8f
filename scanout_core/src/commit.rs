// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mode-set, page-flip and palette transactions.
//!
//! [`CommitEngine::activate`] walks the pipe registry in discovery order and
//! commits one mode-set transaction per candidate until the kernel accepts
//! one. The resulting [`FlipTarget`] holds the resolved property ids needed by
//! the much lighter flip transaction, so flips never touch the property
//! cache and can be issued from the presentation thread.

use bytemuck::{Pod, Zeroable};

use crate::atomic::{AtomicRequest, CommitFlags};
use crate::device::KmsDevice;
use crate::error::{DeviceError, DisplayError};
use crate::mode::ModeInfo;
use crate::object::{BlobId, DisplayObject, FramebufferId, ObjectId, PropertyId};
use crate::pipe::{Pipe, PipeId, PipeRegistry};
use crate::property::{PropertyCache, Requirement};
use crate::scaling::{PlaneRect, ScalingMode, compute_placement};
use crate::trace::{CommitEvent, CommitKind, CommitOutcome, PaletteEvent, Tracer};

use Requirement::{Optional, Required};

/// Number of entries in the hardware palette.
pub const PALETTE_SIZE: usize = 256;

/// Result of a non-blocking flip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlipStatus {
    /// The kernel accepted the flip.
    Submitted,
    /// A previous flip has not retired yet; retry later.
    Pending,
}

/// Inputs to a mode-set.
#[derive(Clone, Copy, Debug)]
pub struct ModesetParams {
    /// Framebuffer to scan out first.
    pub framebuffer: FramebufferId,
    /// Size of the caller's image.
    pub source: (u32, u32),
    /// Placement policy.
    pub scaling: ScalingMode,
    /// Desired refresh rate in Hz.
    pub refresh: f32,
    /// Palette blob for indexed formats; `None` clears `GAMMA_LUT`.
    pub gamma_lut: Option<BlobId>,
    /// Pipe that is currently lit, if any.
    pub previous: Option<PipeId>,
}

/// A successful mode-set.
#[derive(Clone, Copy, Debug)]
pub struct Activation {
    /// Pipe now driving the display.
    pub pipe: PipeId,
    /// Crtc of that pipe.
    pub crtc: ObjectId,
    /// Mode programmed on the crtc.
    pub mode: ModeInfo,
    /// Blob holding `mode`; owned by the caller from here on.
    pub mode_blob: BlobId,
    /// Flip parameters for this pipe.
    pub target: FlipTarget,
}

/// Everything a page flip needs, with property ids already resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlipTarget {
    plane: ObjectId,
    fb_id: PropertyId,
    crtc_rect: [PropertyId; 4],
    source: (u32, u32),
    pixel_aspect: (u32, u32),
    mode_size: (u32, u32),
    placement: PlaneRect,
}

impl FlipTarget {
    fn resolve(
        cache: &PropertyCache,
        pipe: &Pipe,
        mode: &ModeInfo,
        source: (u32, u32),
        placement: PlaneRect,
    ) -> Result<Self, DisplayError> {
        let plane = pipe.plane_object();
        Ok(Self {
            plane: pipe.plane,
            fb_id: cache.require(plane, "FB_ID")?,
            crtc_rect: [
                cache.require(plane, "CRTC_X")?,
                cache.require(plane, "CRTC_Y")?,
                cache.require(plane, "CRTC_W")?,
                cache.require(plane, "CRTC_H")?,
            ],
            source,
            pixel_aspect: pipe.pixel_aspect(),
            mode_size: mode.size(),
            placement,
        })
    }

    /// Current destination rectangle.
    #[must_use]
    pub const fn placement(&self) -> PlaneRect {
        self.placement
    }

    /// Recomputes the destination rectangle for `scaling`.
    pub fn set_scaling(&mut self, scaling: ScalingMode) {
        self.placement = compute_placement(scaling, self.source, self.pixel_aspect, self.mode_size);
    }

    /// Builds the flip request: `FB_ID` plus the destination rectangle.
    #[must_use]
    pub fn request(&self, framebuffer: FramebufferId) -> AtomicRequest {
        let mut req = AtomicRequest::new();
        req.push(self.plane, self.fb_id, u64::from(framebuffer.0));
        let rect = rect_values(self.placement);
        for (property, value) in self.crtc_rect.into_iter().zip(rect) {
            req.push(self.plane, property, value);
        }
        req
    }
}

/// `CRTC_X/Y/W/H` values. X and Y are signed properties.
fn rect_values(rect: PlaneRect) -> [u64; 4] {
    [
        i64::from(rect.x) as u64,
        i64::from(rect.y) as u64,
        u64::from(rect.width),
        u64::from(rect.height),
    ]
}

/// Issues one non-blocking flip to `framebuffer`.
///
/// A busy device is reported as [`FlipStatus::Pending`], not as an error.
pub fn flip<D: KmsDevice + ?Sized>(
    device: &D,
    target: &FlipTarget,
    framebuffer: FramebufferId,
    tracer: &Tracer,
) -> Result<FlipStatus, DisplayError> {
    let req = target.request(framebuffer);
    let result = device.commit(&req, CommitFlags::FLIP);
    tracer.commit(&CommitEvent {
        kind: CommitKind::Flip,
        pipe: None,
        properties: req.len(),
        flags: CommitFlags::FLIP,
        outcome: outcome(&result),
    });
    match result {
        Ok(()) => Ok(FlipStatus::Submitted),
        Err(DeviceError::Busy) => Ok(FlipStatus::Pending),
        Err(err) => Err(err.into()),
    }
}

fn outcome(result: &Result<(), DeviceError>) -> CommitOutcome {
    match result {
        Ok(()) => CommitOutcome::Committed,
        Err(DeviceError::Busy) => CommitOutcome::Busy,
        Err(_) => CommitOutcome::Failed,
    }
}

/// Builds and commits mode-set and palette transactions.
#[derive(Debug)]
pub struct CommitEngine<'a, D: ?Sized> {
    device: &'a D,
    cache: &'a PropertyCache,
    tracer: &'a Tracer,
}

impl<'a, D: KmsDevice + ?Sized> CommitEngine<'a, D> {
    /// Creates an engine over `device` using ids from `cache`.
    pub fn new(device: &'a D, cache: &'a PropertyCache, tracer: &'a Tracer) -> Self {
        Self {
            device,
            cache,
            tracer,
        }
    }

    /// Activates the first pipe, in discovery order, that accepts the mode.
    ///
    /// A rejected commit destroys that attempt's mode blob and moves on to
    /// the next pipe. A missing required property aborts immediately.
    pub fn activate(
        &self,
        registry: &PipeRegistry,
        params: &ModesetParams,
    ) -> Result<Activation, DisplayError> {
        let mut attempts = 0;
        for (id, pipe) in registry.iter() {
            let mode = *pipe.select_mode(params.refresh);
            let mode_blob = self.device.create_blob(mode.as_bytes())?;
            let placement =
                compute_placement(params.scaling, params.source, pipe.pixel_aspect(), mode.size());

            let built = self
                .modeset_request(registry, id, pipe, mode_blob, params, placement)
                .and_then(|req| {
                    let target =
                        FlipTarget::resolve(self.cache, pipe, &mode, params.source, placement)?;
                    Ok((req, target))
                });
            let (req, target) = match built {
                Ok(built) => built,
                Err(err) => {
                    _ = self.device.destroy_blob(mode_blob);
                    return Err(err);
                }
            };

            attempts += 1;
            let result = self.device.commit(&req, CommitFlags::MODESET);
            self.tracer.commit(&CommitEvent {
                kind: CommitKind::Modeset,
                pipe: Some(id.0),
                properties: req.len(),
                flags: CommitFlags::MODESET,
                outcome: outcome(&result),
            });
            if result.is_err() {
                _ = self.device.destroy_blob(mode_blob);
                continue;
            }

            return Ok(Activation {
                pipe: id,
                crtc: pipe.crtc,
                mode,
                mode_blob,
                target,
            });
        }
        Err(DisplayError::ModesetFailed { attempts })
    }

    fn modeset_request(
        &self,
        registry: &PipeRegistry,
        id: PipeId,
        pipe: &Pipe,
        mode_blob: BlobId,
        params: &ModesetParams,
        placement: PlaneRect,
    ) -> Result<AtomicRequest, DisplayError> {
        let cache = self.cache;
        let mut req = AtomicRequest::new();

        // Other planes on this crtc must let go of it.
        let mut released: Vec<ObjectId> = Vec::new();
        for (_, other) in registry.sharing_crtc(pipe.crtc) {
            if other.plane == pipe.plane || released.contains(&other.plane) {
                continue;
            }
            released.push(other.plane);
            cache.set(&mut req, other.plane_object(), "FB_ID", 0, Required)?;
            cache.set(&mut req, other.plane_object(), "CRTC_ID", 0, Required)?;
        }

        if let Some(prev) = params.previous.filter(|&p| p != id).and_then(|p| registry.get(p)) {
            self.release_previous(&mut req, prev, pipe, &released)?;
        }

        let connector = pipe.connector_object();
        let crtc = pipe.crtc_object();
        let plane = pipe.plane_object();
        cache.set(&mut req, connector, "CRTC_ID", u64::from(pipe.crtc.0), Required)?;
        cache.set(&mut req, crtc, "MODE_ID", u64::from(mode_blob.0), Required)?;
        cache.set(&mut req, crtc, "ACTIVE", 1, Required)?;
        // Without a palette the crtc goes back to a linear ramp.
        let lut = params.gamma_lut.map_or(0, |lut| u64::from(lut.0));
        cache.set(&mut req, crtc, "GAMMA_LUT", lut, Optional)?;

        cache.set(&mut req, plane, "FB_ID", u64::from(params.framebuffer.0), Required)?;
        cache.set(&mut req, plane, "CRTC_ID", u64::from(pipe.crtc.0), Required)?;
        let (src_w, src_h) = params.source;
        cache.set(&mut req, plane, "SRC_X", 0, Required)?;
        cache.set(&mut req, plane, "SRC_Y", 0, Required)?;
        cache.set(&mut req, plane, "SRC_W", u64::from(src_w) << 16, Required)?;
        cache.set(&mut req, plane, "SRC_H", u64::from(src_h) << 16, Required)?;
        let [x, y, w, h] = rect_values(placement);
        cache.set(&mut req, plane, "CRTC_X", x, Required)?;
        cache.set(&mut req, plane, "CRTC_Y", y, Required)?;
        cache.set(&mut req, plane, "CRTC_W", w, Required)?;
        cache.set(&mut req, plane, "CRTC_H", h, Required)?;
        Ok(req)
    }

    /// Switches off the parts of the previously lit pipe that the new pipe
    /// does not reuse.
    fn release_previous(
        &self,
        req: &mut AtomicRequest,
        prev: &Pipe,
        next: &Pipe,
        released: &[ObjectId],
    ) -> Result<(), DisplayError> {
        let cache = self.cache;
        if prev.plane != next.plane && !released.contains(&prev.plane) {
            cache.set(req, prev.plane_object(), "FB_ID", 0, Required)?;
            cache.set(req, prev.plane_object(), "CRTC_ID", 0, Required)?;
        }
        if prev.connector != next.connector {
            cache.set(req, prev.connector_object(), "CRTC_ID", 0, Required)?;
        }
        if prev.crtc != next.crtc {
            cache.set(req, prev.crtc_object(), "MODE_ID", 0, Required)?;
            cache.set(req, prev.crtc_object(), "ACTIVE", 0, Required)?;
        }
        Ok(())
    }

    /// Returns `true` if `crtc` exposes `GAMMA_LUT`, so a palette can be
    /// installed on it.
    pub fn supports_palette(&self, crtc: ObjectId) -> bool {
        self.cache.find(crtc, "GAMMA_LUT").is_some()
    }

    /// Installs `palette` as the crtc's gamma LUT.
    ///
    /// The new blob replaces `current` only once the commit succeeds; the
    /// old blob is then destroyed. On failure the new blob is destroyed and
    /// `current` stays installed.
    pub fn install_palette(
        &self,
        crtc: ObjectId,
        palette: &Palette,
        current: Option<BlobId>,
        changed: (usize, usize),
    ) -> Result<BlobId, DisplayError> {
        let blob = self.device.create_blob(palette.as_bytes())?;
        let mut req = AtomicRequest::new();
        let set = self.cache.set(
            &mut req,
            DisplayObject::crtc(crtc),
            "GAMMA_LUT",
            u64::from(blob.0),
            Required,
        );
        let result = match set {
            Ok(_) => self.device.commit(&req, CommitFlags::BLOCKING).map_err(Into::into),
            Err(err) => Err(err),
        };
        self.tracer.commit(&CommitEvent {
            kind: CommitKind::Palette,
            pipe: None,
            properties: req.len(),
            flags: CommitFlags::BLOCKING,
            outcome: match &result {
                Ok(()) => CommitOutcome::Committed,
                Err(DisplayError::Device(DeviceError::Busy)) => CommitOutcome::Busy,
                Err(_) => CommitOutcome::Failed,
            },
        });
        match result {
            Ok(()) => {
                if let Some(old) = current {
                    _ = self.device.destroy_blob(old);
                }
                self.tracer.palette(&PaletteEvent {
                    first: changed.0,
                    count: changed.1,
                    blob,
                });
                Ok(blob)
            }
            Err(err) => {
                _ = self.device.destroy_blob(blob);
                Err(err)
            }
        }
    }
}

/// One `drm_color_lut` entry.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct LutEntry {
    /// Red, 16-bit.
    pub red: u16,
    /// Green, 16-bit.
    pub green: u16,
    /// Blue, 16-bit.
    pub blue: u16,
    /// Padding.
    pub reserved: u16,
}

/// An 8-bit-per-channel palette colour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
}

impl From<Color> for LutEntry {
    fn from(c: Color) -> Self {
        // 0xAB -> 0xABAB spans the full 16-bit range.
        Self {
            red: u16::from(c.r) * 257,
            green: u16::from(c.g) * 257,
            blue: u16::from(c.b) * 257,
            reserved: 0,
        }
    }
}

/// The 256-entry hardware palette for indexed formats.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    entries: [LutEntry; PALETTE_SIZE],
}

impl Default for Palette {
    /// A linear grey ramp.
    fn default() -> Self {
        let mut entries = [LutEntry::default(); PALETTE_SIZE];
        for (value, entry) in (0..=u8::MAX).zip(entries.iter_mut()) {
            *entry = Color {
                r: value,
                g: value,
                b: value,
            }
            .into();
        }
        Self { entries }
    }
}

impl Palette {
    /// Overwrites entries starting at `first`. Colours past the end are
    /// ignored. Returns the `(first, count)` range actually written.
    pub fn set_colors(&mut self, first: usize, colors: &[Color]) -> (usize, usize) {
        let Some(tail) = self.entries.get_mut(first..) else {
            return (first, 0);
        };
        let count = colors.len().min(tail.len());
        for (entry, &color) in tail.iter_mut().zip(&colors[..count]) {
            *entry = color.into();
        }
        (first, count)
    }

    /// Entry at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<LutEntry> {
        self.entries.get(index).copied()
    }

    /// The LUT as blob bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipe::discover;
    use crate::testing::FakeDevice;

    struct Fixture {
        device: FakeDevice,
        cache: PropertyCache,
        registry: PipeRegistry,
        tracer: Tracer,
    }

    fn fixture(device: FakeDevice) -> Fixture {
        let mut cache = PropertyCache::new();
        let tracer = Tracer::none();
        let registry = discover(&device, &mut cache, &tracer).expect("discover");
        Fixture {
            device,
            cache,
            registry,
            tracer,
        }
    }

    fn params(framebuffer: FramebufferId) -> ModesetParams {
        ModesetParams {
            framebuffer,
            source: (640, 480),
            scaling: ScalingMode::AspectRatio,
            refresh: 60.0,
            gamma_lut: None,
            previous: None,
        }
    }

    #[test]
    fn activation_programs_the_whole_pipe() {
        let f = fixture(FakeDevice::new());
        let engine = CommitEngine::new(&f.device, &f.cache, &f.tracer);
        let activation = engine
            .activate(&f.registry, &params(FramebufferId(77)))
            .expect("activate");

        let plane = FakeDevice::PRIMARY_PLANE;
        let crtc = FakeDevice::CRTC;
        let value = |object, name| f.device.committed_value(object, name);
        assert_eq!(value(FakeDevice::CONNECTOR, "CRTC_ID"), Some(u64::from(crtc.0)));
        assert_eq!(value(crtc, "MODE_ID"), Some(u64::from(activation.mode_blob.0)));
        assert_eq!(value(crtc, "ACTIVE"), Some(1));
        assert_eq!(value(plane, "FB_ID"), Some(77));
        assert_eq!(value(plane, "SRC_W"), Some(640 << 16));
        assert_eq!(value(plane, "SRC_H"), Some(480 << 16));
        assert_eq!(value(plane, "CRTC_X"), Some(240));
        assert_eq!(value(plane, "CRTC_W"), Some(1440));
        assert_eq!(activation.mode.vrefresh, 60);

        let (_, flags) = f.device.commits().pop().expect("one commit");
        assert_eq!(flags, CommitFlags::MODESET);
        assert_eq!(
            f.device.blob(activation.mode_blob),
            Some(activation.mode.as_bytes().to_vec())
        );
    }

    #[test]
    fn failed_pipe_falls_through_to_next() {
        let device = FakeDevice::new();
        device.add_second_crtc();
        let f = fixture(device);
        f.device.fail_modesets(1);
        let engine = CommitEngine::new(&f.device, &f.cache, &f.tracer);
        let activation = engine
            .activate(&f.registry, &params(FramebufferId(77)))
            .expect("second pipe");

        assert_eq!(activation.pipe, PipeId(1));
        assert_eq!(f.device.commit_attempts(), 2);
        // Only the winning attempt's blob survives.
        assert_eq!(f.device.live_blobs(), 1);
    }

    #[test]
    fn exhausting_pipes_is_an_error() {
        let f = fixture(FakeDevice::new());
        f.device.fail_modesets(5);
        let engine = CommitEngine::new(&f.device, &f.cache, &f.tracer);
        let err = engine
            .activate(&f.registry, &params(FramebufferId(77)))
            .unwrap_err();
        assert_eq!(err, DisplayError::ModesetFailed { attempts: 1 });
        assert_eq!(f.device.live_blobs(), 0);
    }

    #[test]
    fn missing_required_property_aborts_without_commit() {
        let f = fixture(FakeDevice::new());
        // Drop SRC_W from the cache by re-acquiring after removal.
        f.device.remove_property(FakeDevice::PRIMARY_PLANE, "SRC_W");
        let mut cache = PropertyCache::new();
        let registry = discover(&f.device, &mut cache, &f.tracer).expect("discover");
        let engine = CommitEngine::new(&f.device, &cache, &f.tracer);
        let err = engine
            .activate(&registry, &params(FramebufferId(77)))
            .unwrap_err();

        assert_eq!(
            err,
            DisplayError::MissingProperty {
                object: DisplayObject::plane(FakeDevice::PRIMARY_PLANE),
                name: "SRC_W"
            }
        );
        assert_eq!(f.device.commit_attempts(), 0);
        assert_eq!(f.device.live_blobs(), 0);
    }

    #[test]
    fn modeset_without_palette_clears_gamma_lut() {
        let f = fixture(FakeDevice::new());
        let engine = CommitEngine::new(&f.device, &f.cache, &f.tracer);
        let mut p = params(FramebufferId(77));
        p.gamma_lut = Some(BlobId(900));
        engine.activate(&f.registry, &p).expect("indexed");
        assert_eq!(f.device.committed_value(FakeDevice::CRTC, "GAMMA_LUT"), Some(900));

        engine
            .activate(&f.registry, &params(FramebufferId(78)))
            .expect("rgb");
        assert_eq!(f.device.committed_value(FakeDevice::CRTC, "GAMMA_LUT"), Some(0));
    }

    #[test]
    fn palette_support_follows_gamma_lut_property() {
        let f = fixture(FakeDevice::new());
        let engine = CommitEngine::new(&f.device, &f.cache, &f.tracer);
        assert!(engine.supports_palette(FakeDevice::CRTC), "fake crtc has GAMMA_LUT");

        f.device.remove_property(FakeDevice::CRTC, "GAMMA_LUT");
        let mut cache = PropertyCache::new();
        discover(&f.device, &mut cache, &f.tracer).expect("discover");
        let engine = CommitEngine::new(&f.device, &cache, &f.tracer);
        assert!(!engine.supports_palette(FakeDevice::CRTC), "property removed");
    }

    #[test]
    fn switching_crtc_releases_previous_pipe() {
        let device = FakeDevice::new();
        device.add_second_crtc();
        let f = fixture(device);
        let engine = CommitEngine::new(&f.device, &f.cache, &f.tracer);
        let mut p = params(FramebufferId(77));
        p.previous = Some(PipeId(1));
        engine.activate(&f.registry, &p).expect("activate");

        let (req, _) = f.device.commits().pop().expect("commit");
        let mode_id = f.device.property_id(FakeDevice::SECOND_CRTC, "MODE_ID");
        let active = f.device.property_id(FakeDevice::SECOND_CRTC, "ACTIVE");
        assert_eq!(req.value_of(FakeDevice::SECOND_CRTC, mode_id), Some(0));
        assert_eq!(req.value_of(FakeDevice::SECOND_CRTC, active), Some(0));
    }

    #[test]
    fn busy_flip_is_pending() {
        let f = fixture(FakeDevice::new());
        let engine = CommitEngine::new(&f.device, &f.cache, &f.tracer);
        let activation = engine
            .activate(&f.registry, &params(FramebufferId(77)))
            .expect("activate");

        f.device.busy_flips(1);
        let target = activation.target;
        assert_eq!(
            flip(&f.device, &target, FramebufferId(78), &f.tracer),
            Ok(FlipStatus::Pending)
        );
        assert_eq!(
            flip(&f.device, &target, FramebufferId(78), &f.tracer),
            Ok(FlipStatus::Submitted)
        );
        let (req, flags) = f.device.commits().pop().expect("flip");
        assert_eq!(flags, CommitFlags::FLIP);
        assert_eq!(req.len(), 5);
        assert_eq!(
            f.device.committed_value(FakeDevice::PRIMARY_PLANE, "FB_ID"),
            Some(78)
        );
    }

    #[test]
    fn rescaling_changes_flip_rectangle() {
        let f = fixture(FakeDevice::new());
        let engine = CommitEngine::new(&f.device, &f.cache, &f.tracer);
        let mut target = engine
            .activate(&f.registry, &params(FramebufferId(77)))
            .expect("activate")
            .target;
        target.set_scaling(ScalingMode::Fullscreen);
        assert_eq!(target.placement(), PlaneRect::full(1920, 1080));
        target.set_scaling(ScalingMode::IntegerScaled);
        assert_eq!(target.placement().width, 1280);
    }

    #[test]
    fn palette_swap_keeps_old_blob_on_failure() {
        let f = fixture(FakeDevice::new());
        let engine = CommitEngine::new(&f.device, &f.cache, &f.tracer);
        let mut palette = Palette::default();
        let first = engine
            .install_palette(FakeDevice::CRTC, &palette, None, (0, PALETTE_SIZE))
            .expect("first LUT");

        palette.set_colors(1, &[Color { r: 255, g: 0, b: 0 }]);
        f.device.fail_next(crate::error::DeviceOp::Commit);
        engine
            .install_palette(FakeDevice::CRTC, &palette, Some(first), (1, 1))
            .unwrap_err();
        assert_eq!(f.device.live_blobs(), 1, "old LUT survives a failed swap");

        let second = engine
            .install_palette(FakeDevice::CRTC, &palette, Some(first), (1, 1))
            .expect("second LUT");
        assert_eq!(f.device.live_blobs(), 1);
        assert_eq!(f.device.blob(first), None);
        let bytes = f.device.blob(second).expect("installed");
        assert_eq!(bytes.len(), PALETTE_SIZE * 8);
        assert_eq!(&bytes[8..14], &[0xFF, 0xFF, 0, 0, 0, 0]);
    }

    #[test]
    fn palette_clamps_to_table() {
        let mut palette = Palette::default();
        let colors = [Color::default(); 4];
        assert_eq!(palette.set_colors(254, &colors), (254, 2));
        assert_eq!(palette.set_colors(300, &colors), (300, 0));
        assert_eq!(palette.get(255), Some(LutEntry::default()));
        assert_eq!(
            Palette::default().get(128).map(|e| e.red),
            Some(128 * 257)
        );
    }
}
