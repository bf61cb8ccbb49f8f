// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! DRM card node implementing [`KmsDevice`].

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsFd, BorrowedFd};
use std::path::{Path, PathBuf};

use drm::control::{
    self, AtomicCommitFlags, Device as ControlDevice, Mode, RawResourceHandle, ResourceHandle,
    ResourceHandles, atomic::AtomicModeReq, connector, crtc, encoder, plane, property,
};
use drm::{ClientCapability, Device, DriverCapability};
use rustix::io::Errno;
use scanout_core::atomic::{AtomicRequest, CommitFlags};
use scanout_core::device::{
    ConnectorInfo, ConnectorState, DumbAllocation, EncoderInfo, KmsDevice, Mapping, PlaneInfo,
    PropertyDescriptor, Resources,
};
use scanout_core::error::{DeviceError, DeviceOp, DisplayError};
use scanout_core::format::{Fourcc, FramebufferPlanes, MAX_PLANES};
use scanout_core::mode::ModeInfo;
use scanout_core::object::{
    BlobId, DisplayObject, DumbHandle, FramebufferId, ObjectId, ObjectKind, PropertyId,
};

use crate::mapping::DumbMapping;

/// Path prefix of primary DRM nodes.
pub const CARD_PREFIX: &str = "/dev/dri/card";

/// Number of `card*` nodes tried by [`Card::probe`].
pub const MAX_CARDS: u32 = 128;

pub(crate) fn os_error(op: DeviceOp, errno: Errno) -> DeviceError {
    if op == DeviceOp::Commit && errno == Errno::BUSY {
        DeviceError::Busy
    } else {
        DeviceError::Os {
            op,
            errno: errno.raw_os_error(),
        }
    }
}

fn io_error(op: DeviceOp) -> impl FnOnce(io::Error) -> DeviceError {
    move |err| match Errno::from_io_error(&err) {
        Some(errno) => os_error(op, errno),
        None => DeviceError::Os { op, errno: 0 },
    }
}

fn typed_handle<T: From<RawResourceHandle>>(object: DisplayObject) -> Result<T, DeviceError> {
    control::from_u32(object.id.0).ok_or(DeviceError::InvalidObject(object))
}

fn object_id<H: Into<u32>>(handle: H) -> ObjectId {
    ObjectId(handle.into())
}

/// Bitmask over crtc indices from a kernel crtc filter.
fn crtc_mask(resources: &ResourceHandles, filter: control::CrtcListFilter) -> u32 {
    let allowed = resources.filter_crtcs(filter);
    resources
        .crtcs()
        .iter()
        .take(32)
        .enumerate()
        .filter(|(_, crtc)| allowed.contains(crtc))
        .fold(0, |mask, (index, _)| mask | (1_u32 << index))
}

fn mode_info(mode: &Mode) -> ModeInfo {
    let (hdisplay, vdisplay) = mode.size();
    let (hsync_start, hsync_end, htotal) = mode.hsync();
    let (vsync_start, vsync_end, vtotal) = mode.vsync();
    let mut info = ModeInfo {
        clock: mode.clock(),
        hdisplay,
        hsync_start,
        hsync_end,
        htotal,
        hskew: mode.hskew(),
        vdisplay,
        vsync_start,
        vsync_end,
        vtotal,
        vscan: mode.vscan(),
        vrefresh: mode.vrefresh(),
        flags: mode.flags().bits(),
        mode_type: mode.mode_type().bits(),
        name: [0; scanout_core::mode::MODE_NAME_LEN],
    };
    info.set_name(&mode.name().to_string_lossy());
    info
}

/// An open DRM card node.
#[derive(Debug)]
pub struct Card {
    file: File,
    path: PathBuf,
}

impl AsFd for Card {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl Device for Card {}
impl ControlDevice for Card {}

impl Card {
    /// Opens `path` read-write and enables universal planes and atomic
    /// commits.
    ///
    /// Fails with [`DeviceError::Unsupported`] if the driver cannot allocate
    /// dumb buffers or refuses either client capability.
    pub fn open(path: &Path) -> Result<Self, DeviceError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(io_error(DeviceOp::Open))?;
        let card = Self {
            file,
            path: path.to_owned(),
        };
        let dumb = card
            .get_driver_capability(DriverCapability::DumbBuffer)
            .map_err(io_error(DeviceOp::Capability))?;
        if dumb == 0 {
            return Err(DeviceError::Unsupported(DeviceOp::CreateDumb));
        }
        for cap in [ClientCapability::UniversalPlanes, ClientCapability::Atomic] {
            card.set_client_capability(cap, true)
                .map_err(|_| DeviceError::Unsupported(DeviceOp::Capability))?;
        }
        Ok(card)
    }

    /// Opens `preferred` if given; otherwise tries `/dev/dri/card0` upwards
    /// and returns the first capable node.
    ///
    /// Probing stops at the first node that does not exist. Nodes that fail
    /// to open or lack a capability are skipped.
    pub fn probe(preferred: Option<&Path>) -> Result<Self, DisplayError> {
        if let Some(path) = preferred {
            return Self::open(path).map_err(|_| DisplayError::NoDevice);
        }
        for index in 0..MAX_CARDS {
            let path = PathBuf::from(format!("{CARD_PREFIX}{index}"));
            match Self::open(&path) {
                Ok(card) => return Ok(card),
                Err(DeviceError::Os {
                    op: DeviceOp::Open,
                    errno,
                }) if errno == Errno::NOENT.raw_os_error() => break,
                Err(_) => {}
            }
        }
        Err(DisplayError::NoDevice)
    }

    /// Node this card was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn resource_handles_or_err(&self) -> Result<ResourceHandles, DeviceError> {
        self.resource_handles()
            .map_err(io_error(DeviceOp::Resources))
    }

    fn properties_of<H: ResourceHandle>(
        &self,
        handle: H,
    ) -> Result<Vec<PropertyDescriptor>, DeviceError> {
        let set = self
            .get_properties(handle)
            .map_err(io_error(DeviceOp::Properties))?;
        let (ids, values) = set.as_props_and_values();
        ids.iter()
            .zip(values)
            .map(|(&id, &value)| {
                let info = self
                    .get_property(id)
                    .map_err(io_error(DeviceOp::Properties))?;
                Ok(PropertyDescriptor {
                    id: PropertyId(id.into()),
                    name: info.name().to_string_lossy().into_owned(),
                    value,
                })
            })
            .collect()
    }
}

impl KmsDevice for Card {
    fn resources(&self) -> Result<Resources, DeviceError> {
        let res = self.resource_handles_or_err()?;
        let planes = self
            .plane_handles()
            .map_err(io_error(DeviceOp::Resources))?;
        Ok(Resources {
            planes: planes.into_iter().map(object_id).collect(),
            crtcs: res.crtcs().iter().copied().map(object_id).collect(),
            encoders: res.encoders().iter().copied().map(object_id).collect(),
            connectors: res.connectors().iter().copied().map(object_id).collect(),
        })
    }

    fn plane(&self, id: ObjectId) -> Result<PlaneInfo, DeviceError> {
        let res = self.resource_handles_or_err()?;
        let handle: plane::Handle = typed_handle(DisplayObject::plane(id))?;
        let info = self
            .get_plane(handle)
            .map_err(io_error(DeviceOp::Object))?;
        Ok(PlaneInfo {
            id,
            possible_crtcs: crtc_mask(&res, info.possible_crtcs()),
            formats: info.formats().iter().copied().map(Fourcc).collect(),
        })
    }

    fn encoder(&self, id: ObjectId) -> Result<EncoderInfo, DeviceError> {
        let res = self.resource_handles_or_err()?;
        let handle: encoder::Handle = typed_handle(DisplayObject::encoder(id))?;
        let info = self
            .get_encoder(handle)
            .map_err(io_error(DeviceOp::Object))?;
        Ok(EncoderInfo {
            id,
            possible_crtcs: crtc_mask(&res, info.possible_crtcs()),
        })
    }

    fn connector(&self, id: ObjectId) -> Result<ConnectorInfo, DeviceError> {
        let handle: connector::Handle = typed_handle(DisplayObject::connector(id))?;
        let info = self
            .get_connector(handle, true)
            .map_err(io_error(DeviceOp::Object))?;
        Ok(ConnectorInfo {
            id,
            state: match info.state() {
                connector::State::Connected => ConnectorState::Connected,
                connector::State::Disconnected => ConnectorState::Disconnected,
                connector::State::Unknown => ConnectorState::Unknown,
            },
            encoder: info.current_encoder().map(object_id),
            modes: info.modes().iter().map(mode_info).collect(),
            physical_size: info.size(),
        })
    }

    fn properties(&self, object: DisplayObject) -> Result<Vec<PropertyDescriptor>, DeviceError> {
        match object.kind {
            ObjectKind::Plane => self.properties_of(typed_handle::<plane::Handle>(object)?),
            ObjectKind::Crtc => self.properties_of(typed_handle::<crtc::Handle>(object)?),
            ObjectKind::Encoder => self.properties_of(typed_handle::<encoder::Handle>(object)?),
            ObjectKind::Connector => self.properties_of(typed_handle::<connector::Handle>(object)?),
        }
    }

    fn create_dumb(
        &self,
        width: u32,
        height: u32,
        bpp: u32,
    ) -> Result<DumbAllocation, DeviceError> {
        let dumb = drm_ffi::mode::dumbbuffer::create(self.as_fd(), width, height, bpp, 0)
            .map_err(io_error(DeviceOp::CreateDumb))?;
        Ok(DumbAllocation {
            handle: DumbHandle(dumb.handle),
            pitch: dumb.pitch,
            size: dumb.size,
        })
    }

    fn map_dumb(&self, allocation: &DumbAllocation) -> Result<Box<dyn Mapping>, DeviceError> {
        let map = drm_ffi::mode::dumbbuffer::map(self.as_fd(), allocation.handle.0, 0, 0)
            .map_err(io_error(DeviceOp::MapDumb))?;
        let len = usize::try_from(allocation.size).map_err(|_| DeviceError::Os {
            op: DeviceOp::MapDumb,
            errno: Errno::OVERFLOW.raw_os_error(),
        })?;
        Ok(Box::new(DumbMapping::new(self.as_fd(), map.offset, len)?))
    }

    fn destroy_dumb(&self, handle: DumbHandle) -> Result<(), DeviceError> {
        drm_ffi::mode::dumbbuffer::destroy(self.as_fd(), handle.0)
            .map(drop)
            .map_err(io_error(DeviceOp::DestroyDumb))
    }

    fn add_framebuffer(
        &self,
        width: u32,
        height: u32,
        format: Fourcc,
        planes: &FramebufferPlanes,
    ) -> Result<FramebufferId, DeviceError> {
        let mut handles = [0_u32; MAX_PLANES];
        let mut pitches = [0_u32; MAX_PLANES];
        let mut offsets = [0_u32; MAX_PLANES];
        let slots = handles.iter_mut().zip(&mut pitches).zip(&mut offsets);
        for (((h, p), o), (handle, pitch, offset)) in slots.zip(planes.iter()) {
            (*h, *p, *o) = (handle, pitch, offset);
        }
        let fb = drm_ffi::mode::add_fb2(
            self.as_fd(),
            width,
            height,
            format.0,
            &handles,
            &pitches,
            &offsets,
            &[0; MAX_PLANES],
            0,
        )
        .map_err(io_error(DeviceOp::AddFramebuffer))?;
        Ok(FramebufferId(fb.fb_id))
    }

    fn remove_framebuffer(&self, fb: FramebufferId) -> Result<(), DeviceError> {
        drm_ffi::mode::rm_fb(self.as_fd(), fb.0).map_err(io_error(DeviceOp::RemoveFramebuffer))
    }

    fn create_blob(&self, data: &[u8]) -> Result<BlobId, DeviceError> {
        let mut bytes = data.to_vec();
        let blob = drm_ffi::mode::create_property_blob(self.as_fd(), &mut bytes)
            .map_err(io_error(DeviceOp::CreateBlob))?;
        Ok(BlobId(blob.blob_id))
    }

    fn destroy_blob(&self, blob: BlobId) -> Result<(), DeviceError> {
        drm_ffi::mode::destroy_property_blob(self.as_fd(), blob.0)
            .map(drop)
            .map_err(io_error(DeviceOp::DestroyBlob))
    }

    fn commit(&self, request: &AtomicRequest, flags: CommitFlags) -> Result<(), DeviceError> {
        // Id 0 never names a kernel object.
        let invalid = DeviceError::Os {
            op: DeviceOp::Commit,
            errno: Errno::INVAL.raw_os_error(),
        };
        let mut req = AtomicModeReq::new();
        for entry in request.entries() {
            let object: RawResourceHandle = control::from_u32(entry.object.0).ok_or(invalid)?;
            let property: property::Handle = control::from_u32(entry.property.0).ok_or(invalid)?;
            req.add_raw_property(object, property, entry.value);
        }
        let mut kernel_flags = AtomicCommitFlags::empty();
        if flags.allow_modeset {
            kernel_flags |= AtomicCommitFlags::ALLOW_MODESET;
        }
        if flags.nonblocking {
            kernel_flags |= AtomicCommitFlags::NONBLOCK;
        }
        self.atomic_commit(kernel_flags, req)
            .map_err(io_error(DeviceOp::Commit))
    }
}
