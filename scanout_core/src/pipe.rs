// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resource discovery and the pipe registry.
//!
//! A [`Pipe`] is one complete scanout path: a plane feeding a crtc, driven
//! through an encoder to a connected connector. [`discover`] searches every
//! plane/crtc/encoder/connector combination once at init and keeps the valid
//! ones in discovery order, which is also the order mode-sets try them in.

use crate::device::{ConnectorInfo, ConnectorState, EncoderInfo, KmsDevice, PlaneInfo};
use crate::error::DisplayError;
use crate::format::Fourcc;
use crate::mode::{ModeInfo, ModeList};
use crate::object::{DisplayObject, ObjectId};
use crate::property::PropertyCache;
use crate::trace::{PipeEvent, Tracer};

/// Value of a plane's `type` property for overlay planes.
pub const PLANE_TYPE_OVERLAY: u64 = 0;
/// Value of a plane's `type` property for primary planes.
pub const PLANE_TYPE_PRIMARY: u64 = 1;
/// Value of a plane's `type` property for cursor planes.
pub const PLANE_TYPE_CURSOR: u64 = 2;

/// Index of a pipe in discovery order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PipeId(pub usize);

/// One valid plane → crtc → encoder → connector path.
#[derive(Clone, Debug)]
pub struct Pipe {
    /// Plane id.
    pub plane: ObjectId,
    /// Crtc id.
    pub crtc: ObjectId,
    /// Position of the crtc in the device's crtc list.
    pub crtc_index: usize,
    /// Encoder id.
    pub encoder: ObjectId,
    /// Connector id.
    pub connector: ObjectId,
    /// Formats the plane can scan out.
    pub formats: Vec<Fourcc>,
    /// Horizontal pixel-aspect factor (≥ 1).
    pub factor_w: u32,
    /// Vertical pixel-aspect factor (≥ 1).
    pub factor_h: u32,
    modes: Vec<ModeInfo>,
}

impl Pipe {
    /// Connector modes in kernel order. Never empty.
    #[must_use]
    pub fn modes(&self) -> &[ModeInfo] {
        &self.modes
    }

    /// The connector's preferred mode, or its first mode.
    #[must_use]
    pub fn preferred_mode(&self) -> &ModeInfo {
        self.modes
            .iter()
            .find(|m| m.mode_type & ModeInfo::TYPE_PREFERRED != 0)
            .unwrap_or(&self.modes[0])
    }

    /// Picks the mode with the preferred resolution whose refresh rate is
    /// closest to `refresh`. Ties keep the earlier mode.
    #[must_use]
    pub fn select_mode(&self, refresh: f32) -> &ModeInfo {
        let preferred = self.preferred_mode();
        let size = preferred.size();
        let mut best = preferred;
        for mode in self.modes.iter().filter(|m| m.size() == size) {
            if (mode.refresh_hz() - refresh).abs() < (best.refresh_hz() - refresh).abs() {
                best = mode;
            }
        }
        best
    }

    /// `(factor_w, factor_h)`.
    #[must_use]
    pub const fn pixel_aspect(&self) -> (u32, u32) {
        (self.factor_w, self.factor_h)
    }

    /// The pipe's plane as a [`DisplayObject`].
    #[must_use]
    pub const fn plane_object(&self) -> DisplayObject {
        DisplayObject::plane(self.plane)
    }

    /// The pipe's crtc as a [`DisplayObject`].
    #[must_use]
    pub const fn crtc_object(&self) -> DisplayObject {
        DisplayObject::crtc(self.crtc)
    }

    /// The pipe's connector as a [`DisplayObject`].
    #[must_use]
    pub const fn connector_object(&self) -> DisplayObject {
        DisplayObject::connector(self.connector)
    }
}

/// Valid pipes in discovery order plus the global mode list.
#[derive(Clone, Debug, Default)]
pub struct PipeRegistry {
    pipes: Vec<Pipe>,
    modes: ModeList,
}

impl PipeRegistry {
    /// Pipe by id.
    #[must_use]
    pub fn get(&self, id: PipeId) -> Option<&Pipe> {
        self.pipes.get(id.0)
    }

    /// Pipes with their ids, in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (PipeId, &Pipe)> + '_ {
        self.pipes.iter().enumerate().map(|(i, p)| (PipeId(i), p))
    }

    /// Pipes driving `crtc`.
    pub fn sharing_crtc(&self, crtc: ObjectId) -> impl Iterator<Item = (PipeId, &Pipe)> + '_ {
        self.iter().filter(move |(_, p)| p.crtc == crtc)
    }

    /// Deduplicated resolutions across all pipes.
    #[must_use]
    pub fn modes(&self) -> &ModeList {
        &self.modes
    }

    /// Number of pipes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pipes.len()
    }

    /// Returns `true` if no pipe was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pipes.is_empty()
    }

    fn record(&mut self, pipe: Pipe) -> PipeId {
        for mode in &pipe.modes {
            let (w, h) = mode.size();
            self.modes.register(w, h);
            if pipe.factor_w != 1 || pipe.factor_h != 1 {
                self.modes.register(w / pipe.factor_w, h / pipe.factor_h);
            }
        }
        self.pipes.push(pipe);
        PipeId(self.pipes.len() - 1)
    }
}

/// Whether the four objects form a usable path through crtc `crtc_index`.
#[must_use]
pub fn is_compatible(
    plane: &PlaneInfo,
    crtc_index: usize,
    encoder: &EncoderInfo,
    connector: &ConnectorInfo,
) -> bool {
    let Some(bit) = u32::try_from(crtc_index)
        .ok()
        .and_then(|i| 1_u32.checked_shl(i))
    else {
        return false;
    };
    plane.possible_crtcs & bit != 0
        && encoder.possible_crtcs & bit != 0
        && connector.encoder == Some(encoder.id)
        && connector.state == ConnectorState::Connected
        && !connector.modes.is_empty()
}

/// Integer pixel-aspect factors from a mode and the panel's physical size.
///
/// Returns `(1, 1)` for square pixels or when the physical size is unknown
/// or zero.
#[must_use]
pub fn pixel_aspect(mode: &ModeInfo, physical_mm: Option<(u32, u32)>) -> (u32, u32) {
    let Some((mm_w, mm_h)) = physical_mm else {
        return (1, 1);
    };
    if mm_w == 0 || mm_h == 0 {
        return (1, 1);
    }
    // 16.16 pixels per millimetre.
    let ppmm_w = (u64::from(mode.hdisplay) << 16) / u64::from(mm_w);
    let ppmm_h = (u64::from(mode.vdisplay) << 16) / u64::from(mm_h);
    if ppmm_w == 0 || ppmm_h == 0 {
        return (1, 1);
    }
    let round_ratio = |a: u64, b: u64| u32::try_from((a + b / 2) / b).unwrap_or(u32::MAX);
    let wide = round_ratio(ppmm_w, ppmm_h);
    if wide > 1 {
        return (wide, 1);
    }
    let tall = round_ratio(ppmm_h, ppmm_w);
    if tall > 1 {
        return (1, tall);
    }
    (1, 1)
}

/// Enumerates the device, fills `cache`, and returns every valid pipe.
///
/// Property acquisition failures are tolerated, but a plane whose `type`
/// cannot be read fails discovery. Objects that cannot be queried are
/// skipped. Cursor planes are kept; only overlays are excluded.
pub fn discover<D: KmsDevice + ?Sized>(
    device: &D,
    cache: &mut PropertyCache,
    tracer: &Tracer,
) -> Result<PipeRegistry, DisplayError> {
    let res = device.resources()?;

    let objects = (res.planes.iter().map(|&id| DisplayObject::plane(id)))
        .chain(res.crtcs.iter().map(|&id| DisplayObject::crtc(id)))
        .chain(res.connectors.iter().map(|&id| DisplayObject::connector(id)))
        .chain(res.encoders.iter().map(|&id| DisplayObject::encoder(id)));
    for object in objects {
        // An object the cache cannot describe simply never matches later.
        _ = cache.acquire(device, object);
    }

    let encoders: Vec<EncoderInfo> = res
        .encoders
        .iter()
        .filter_map(|&id| device.encoder(id).ok())
        .collect();
    let connectors: Vec<ConnectorInfo> = res
        .connectors
        .iter()
        .filter_map(|&id| device.connector(id).ok())
        .collect();

    let mut registry = PipeRegistry::default();
    for &plane_id in &res.planes {
        let Ok(plane) = device.plane(plane_id) else {
            continue;
        };
        let plane_type = cache
            .get(plane_id, "type")
            .ok_or(DisplayError::MissingProperty {
                object: DisplayObject::plane(plane_id),
                name: "type",
            })?;
        if plane_type == PLANE_TYPE_OVERLAY {
            tracer.plane_skipped(plane_id);
            continue;
        }

        for (crtc_index, &crtc) in res.crtcs.iter().enumerate() {
            for encoder in &encoders {
                for connector in &connectors {
                    if !is_compatible(&plane, crtc_index, encoder, connector) {
                        continue;
                    }
                    let (factor_w, factor_h) =
                        pixel_aspect(&connector.modes[0], connector.physical_size);
                    let pipe = Pipe {
                        plane: plane_id,
                        crtc,
                        crtc_index,
                        encoder: encoder.id,
                        connector: connector.id,
                        formats: plane.formats.clone(),
                        factor_w,
                        factor_h,
                        modes: connector.modes.clone(),
                    };
                    let modes = pipe.modes.len();
                    let id = registry.record(pipe);
                    tracer.pipe(&PipeEvent {
                        index: id.0,
                        plane: plane_id,
                        crtc,
                        encoder: encoder.id,
                        connector: connector.id,
                        modes,
                        factor_w,
                        factor_h,
                    });
                }
            }
        }
    }

    if registry.is_empty() {
        return Err(DisplayError::NoPipes);
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::{discover, is_compatible, pixel_aspect};
    use crate::device::{ConnectorState, KmsDevice};
    use crate::error::DisplayError;
    use crate::mode::ModeInfo;
    use crate::object::{DisplayObject, ObjectId};
    use crate::property::PropertyCache;
    use crate::testing::FakeDevice;
    use crate::trace::Tracer;

    #[test]
    fn discovers_primary_pipe_and_skips_overlay() {
        let device = FakeDevice::new();
        let mut cache = PropertyCache::new();
        let registry = discover(&device, &mut cache, &Tracer::none()).expect("discover");

        assert_eq!(registry.len(), 1);
        let (_, pipe) = registry.iter().next().expect("one pipe");
        assert_eq!(pipe.plane, FakeDevice::PRIMARY_PLANE);
        assert_eq!(pipe.crtc, FakeDevice::CRTC);
        assert_eq!(pipe.encoder, FakeDevice::ENCODER);
        assert_eq!(pipe.connector, FakeDevice::CONNECTOR);
        assert_eq!(pipe.pixel_aspect(), (1, 1));
        assert!(
            registry.iter().all(|(_, p)| p.plane != FakeDevice::OVERLAY_PLANE),
            "overlay planes never form pipes"
        );
    }

    #[test]
    fn every_pipe_satisfies_compatibility() {
        let device = FakeDevice::new();
        device.add_second_crtc();
        let mut cache = PropertyCache::new();
        let registry = discover(&device, &mut cache, &Tracer::none()).expect("discover");
        assert_eq!(registry.len(), 2);

        for (_, pipe) in registry.iter() {
            let plane = device.plane(pipe.plane).expect("plane");
            let encoder = device.encoder(pipe.encoder).expect("encoder");
            let connector = device.connector(pipe.connector).expect("connector");
            assert!(
                is_compatible(&plane, pipe.crtc_index, &encoder, &connector),
                "pipe {pipe:?} must satisfy the bitmask rules"
            );
            assert_eq!(connector.state, ConnectorState::Connected);
            assert!(!pipe.modes().is_empty(), "pipes always carry modes");
        }
        assert_eq!(registry.sharing_crtc(FakeDevice::CRTC).count(), 1);
    }

    #[test]
    fn disconnected_connector_yields_no_pipes() {
        let device = FakeDevice::new();
        device.set_connector_state(ConnectorState::Disconnected);
        let mut cache = PropertyCache::new();
        let err = discover(&device, &mut cache, &Tracer::none()).unwrap_err();
        assert_eq!(err, DisplayError::NoPipes);
    }

    #[test]
    fn unreadable_plane_type_fails_discovery() {
        let device = FakeDevice::new();
        device.clear_properties(FakeDevice::PRIMARY_PLANE);
        let mut cache = PropertyCache::new();
        let err = discover(&device, &mut cache, &Tracer::none()).unwrap_err();
        assert_eq!(
            err,
            DisplayError::MissingProperty {
                object: DisplayObject::plane(FakeDevice::PRIMARY_PLANE),
                name: "type"
            }
        );
    }

    #[test]
    fn mode_list_is_deduplicated() {
        let device = FakeDevice::new();
        let mut cache = PropertyCache::new();
        let registry = discover(&device, &mut cache, &Tracer::none()).expect("discover");
        // 1080p60, 1080p50 and 720p collapse to two resolutions.
        assert_eq!(registry.modes().len(), 2);
        assert_eq!(registry.modes().lookup(1920, 1080), Some(0));
        assert_eq!(registry.modes().lookup(1280, 720), Some(1));
    }

    #[test]
    fn non_square_pixels_register_alias() {
        let device = FakeDevice::new();
        // 1920 px over 260 mm horizontally, 1080 px over 290 mm vertically.
        device.set_physical_size(Some((260, 290)));
        let mut cache = PropertyCache::new();
        let registry = discover(&device, &mut cache, &Tracer::none()).expect("discover");
        let (_, pipe) = registry.iter().next().expect("pipe");
        assert_eq!(pipe.pixel_aspect(), (2, 1));
        assert!(
            registry.modes().lookup(960, 1080).is_some(),
            "aspect-corrected alias is registered"
        );
    }

    #[test]
    fn zero_physical_size_means_square_pixels() {
        let mode = FakeDevice::mode_1080p(60);
        assert_eq!(pixel_aspect(&mode, Some((0, 290))), (1, 1));
        assert_eq!(pixel_aspect(&mode, None), (1, 1));
        assert_eq!(pixel_aspect(&mode, Some((520, 145))), (1, 2));
    }

    #[test]
    fn select_mode_prefers_closest_refresh_at_native_size() {
        let device = FakeDevice::new();
        let mut cache = PropertyCache::new();
        let registry = discover(&device, &mut cache, &Tracer::none()).expect("discover");
        let (_, pipe) = registry.iter().next().expect("pipe");
        assert_eq!(pipe.select_mode(60.0).vrefresh, 60);
        assert_eq!(pipe.select_mode(48.0).vrefresh, 50);
        // 720p never wins: it is not the preferred resolution.
        assert_eq!(pipe.select_mode(30.0).size(), (1920, 1080));
    }

    #[test]
    fn crtc_index_beyond_mask_width_is_incompatible() {
        let device = FakeDevice::new();
        let plane = device.plane(FakeDevice::PRIMARY_PLANE).expect("plane");
        let encoder = device.encoder(FakeDevice::ENCODER).expect("encoder");
        let connector = device.connector(FakeDevice::CONNECTOR).expect("connector");
        assert!(
            !is_compatible(&plane, 40, &encoder, &connector),
            "crtc index outside the 32-bit mask"
        );
        let mut other = connector.clone();
        other.encoder = Some(ObjectId(999));
        assert!(
            !is_compatible(&plane, 0, &encoder, &other),
            "connector bound to another encoder"
        );
        other = connector;
        other.modes = Vec::<ModeInfo>::new();
        assert!(
            !is_compatible(&plane, 0, &encoder, &other),
            "connector without modes"
        );
    }
}
