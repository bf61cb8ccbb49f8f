// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The device seam between the core and a platform backend.
//!
//! The core never issues ioctls. Everything it needs from the kernel goes
//! through [`KmsDevice`], which `scanout_backend_drm` implements over a DRM
//! card node and tests implement with an in-memory fake.

use core::fmt;

use crate::atomic::{AtomicRequest, CommitFlags};
use crate::error::DeviceError;
use crate::format::{Fourcc, FramebufferPlanes};
use crate::mode::ModeInfo;
use crate::object::{BlobId, DisplayObject, DumbHandle, FramebufferId, ObjectId, PropertyId};

/// Mode-object ids enumerated from the device.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Resources {
    /// Planes, including overlay and cursor planes.
    pub planes: Vec<ObjectId>,
    /// Crtcs in kernel index order. A crtc's position is its bit in every
    /// `possible_crtcs` mask.
    pub crtcs: Vec<ObjectId>,
    /// Encoders.
    pub encoders: Vec<ObjectId>,
    /// Connectors.
    pub connectors: Vec<ObjectId>,
}

/// Plane details.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaneInfo {
    /// Plane id.
    pub id: ObjectId,
    /// Bitmask over crtc indices this plane can feed.
    pub possible_crtcs: u32,
    /// Supported pixel formats.
    pub formats: Vec<Fourcc>,
}

/// Encoder details.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncoderInfo {
    /// Encoder id.
    pub id: ObjectId,
    /// Bitmask over crtc indices this encoder can be driven by.
    pub possible_crtcs: u32,
}

/// Connection status of a connector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectorState {
    /// A sink is attached.
    Connected,
    /// Nothing is attached.
    Disconnected,
    /// The driver cannot tell.
    Unknown,
}

/// Connector details.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectorInfo {
    /// Connector id.
    pub id: ObjectId,
    /// Connection status.
    pub state: ConnectorState,
    /// Currently bound encoder.
    pub encoder: Option<ObjectId>,
    /// Modes in kernel order; the preferred mode is usually first.
    pub modes: Vec<ModeInfo>,
    /// Physical size in millimetres, if reported.
    pub physical_size: Option<(u32, u32)>,
}

/// Metadata for one property of a mode object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyDescriptor {
    /// Property id.
    pub id: PropertyId,
    /// Property name (`FB_ID`, `CRTC_ID`, ...).
    pub name: String,
    /// Value at the time the object was queried.
    pub value: u64,
}

/// A kernel dumb-buffer allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DumbAllocation {
    /// GEM handle.
    pub handle: DumbHandle,
    /// Row pitch in bytes.
    pub pitch: u32,
    /// Total size in bytes.
    pub size: u64,
}

/// A CPU mapping of a dumb buffer. Dropping it unmaps the region.
pub trait Mapping: Send + fmt::Debug {
    /// The mapped bytes.
    fn as_slice(&self) -> &[u8];
    /// The mapped bytes, writable.
    fn as_mut_slice(&mut self) -> &mut [u8];
}

/// Kernel mode-setting operations needed by the core.
///
/// All methods take `&self`: the presentation thread and the owner share the
/// device through an `Arc` and the kernel serialises access to the card.
pub trait KmsDevice {
    /// Enumerates planes, crtcs, encoders and connectors.
    fn resources(&self) -> Result<Resources, DeviceError>;

    /// Reads one plane.
    fn plane(&self, id: ObjectId) -> Result<PlaneInfo, DeviceError>;

    /// Reads one encoder.
    fn encoder(&self, id: ObjectId) -> Result<EncoderInfo, DeviceError>;

    /// Reads one connector, including its modes.
    fn connector(&self, id: ObjectId) -> Result<ConnectorInfo, DeviceError>;

    /// Reads all properties of an object. An empty list is not an error.
    fn properties(&self, object: DisplayObject) -> Result<Vec<PropertyDescriptor>, DeviceError>;

    /// Allocates a dumb buffer of `width × height` at `bpp` bits per pixel.
    fn create_dumb(&self, width: u32, height: u32, bpp: u32)
    -> Result<DumbAllocation, DeviceError>;

    /// Maps a dumb buffer for CPU access.
    fn map_dumb(&self, allocation: &DumbAllocation) -> Result<Box<dyn Mapping>, DeviceError>;

    /// Releases a dumb buffer.
    fn destroy_dumb(&self, handle: DumbHandle) -> Result<(), DeviceError>;

    /// Registers a framebuffer object over the given planes.
    fn add_framebuffer(
        &self,
        width: u32,
        height: u32,
        format: Fourcc,
        planes: &FramebufferPlanes,
    ) -> Result<FramebufferId, DeviceError>;

    /// Removes a framebuffer object.
    fn remove_framebuffer(&self, fb: FramebufferId) -> Result<(), DeviceError>;

    /// Creates a property blob holding `data`.
    fn create_blob(&self, data: &[u8]) -> Result<BlobId, DeviceError>;

    /// Destroys a property blob.
    fn destroy_blob(&self, blob: BlobId) -> Result<(), DeviceError>;

    /// Commits an atomic request.
    ///
    /// A non-blocking commit issued while a previous one is outstanding must
    /// fail with [`DeviceError::Busy`].
    fn commit(&self, request: &AtomicRequest, flags: CommitFlags) -> Result<(), DeviceError>;
}

impl<D: KmsDevice + ?Sized> KmsDevice for std::sync::Arc<D> {
    fn resources(&self) -> Result<Resources, DeviceError> {
        (**self).resources()
    }

    fn plane(&self, id: ObjectId) -> Result<PlaneInfo, DeviceError> {
        (**self).plane(id)
    }

    fn encoder(&self, id: ObjectId) -> Result<EncoderInfo, DeviceError> {
        (**self).encoder(id)
    }

    fn connector(&self, id: ObjectId) -> Result<ConnectorInfo, DeviceError> {
        (**self).connector(id)
    }

    fn properties(&self, object: DisplayObject) -> Result<Vec<PropertyDescriptor>, DeviceError> {
        (**self).properties(object)
    }

    fn create_dumb(
        &self,
        width: u32,
        height: u32,
        bpp: u32,
    ) -> Result<DumbAllocation, DeviceError> {
        (**self).create_dumb(width, height, bpp)
    }

    fn map_dumb(&self, allocation: &DumbAllocation) -> Result<Box<dyn Mapping>, DeviceError> {
        (**self).map_dumb(allocation)
    }

    fn destroy_dumb(&self, handle: DumbHandle) -> Result<(), DeviceError> {
        (**self).destroy_dumb(handle)
    }

    fn add_framebuffer(
        &self,
        width: u32,
        height: u32,
        format: Fourcc,
        planes: &FramebufferPlanes,
    ) -> Result<FramebufferId, DeviceError> {
        (**self).add_framebuffer(width, height, format, planes)
    }

    fn remove_framebuffer(&self, fb: FramebufferId) -> Result<(), DeviceError> {
        (**self).remove_framebuffer(fb)
    }

    fn create_blob(&self, data: &[u8]) -> Result<BlobId, DeviceError> {
        (**self).create_blob(data)
    }

    fn destroy_blob(&self, blob: BlobId) -> Result<(), DeviceError> {
        (**self).destroy_blob(blob)
    }

    fn commit(&self, request: &AtomicRequest, flags: CommitFlags) -> Result<(), DeviceError> {
        (**self).commit(request, flags)
    }
}
