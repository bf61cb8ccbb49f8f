// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory [`KmsDevice`] for unit tests.
//!
//! The default topology is one connected 1080p panel behind a single
//! crtc/encoder pair, with a primary and an overlay plane. Failures are
//! scripted per operation and every accepted commit is logged.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hashbrown::{HashMap, HashSet};

use crate::atomic::{AtomicRequest, CommitFlags};
use crate::device::{
    ConnectorInfo, ConnectorState, DumbAllocation, EncoderInfo, KmsDevice, Mapping, PlaneInfo,
    PropertyDescriptor, Resources,
};
use crate::error::{DeviceError, DeviceOp};
use crate::format::{Fourcc, FramebufferPlanes};
use crate::mode::ModeInfo;
use crate::object::{
    BlobId, DisplayObject, DumbHandle, FramebufferId, ObjectId, ObjectKind, PropertyId,
};
use crate::pipe::{PLANE_TYPE_OVERLAY, PLANE_TYPE_PRIMARY};

const PLANE_PROPS: &[&str] = &[
    "type", "FB_ID", "CRTC_ID", "SRC_X", "SRC_Y", "SRC_W", "SRC_H", "CRTC_X", "CRTC_Y", "CRTC_W",
    "CRTC_H",
];
const CRTC_PROPS: &[&str] = &["MODE_ID", "ACTIVE", "GAMMA_LUT", "GAMMA_LUT_SIZE"];
const CONNECTOR_PROPS: &[&str] = &["CRTC_ID", "DPMS"];

const EINVAL: i32 = 22;
const ENOENT: i32 = 2;
const EIO: i32 = 5;

#[derive(Debug)]
struct FakeMapping {
    bytes: Vec<u8>,
    unmaps: Arc<AtomicUsize>,
}

impl Mapping for FakeMapping {
    fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl Drop for FakeMapping {
    fn drop(&mut self) {
        self.unmaps.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct State {
    planes: Vec<PlaneInfo>,
    crtcs: Vec<ObjectId>,
    encoders: Vec<EncoderInfo>,
    connectors: Vec<ConnectorInfo>,
    properties: HashMap<ObjectId, Vec<PropertyDescriptor>>,
    next_id: u32,
    dumbs: HashMap<DumbHandle, DumbAllocation>,
    framebuffers: HashSet<FramebufferId>,
    blobs: HashMap<BlobId, Vec<u8>>,
    // (operation, calls to let through before failing)
    scripted: Vec<(DeviceOp, u32)>,
    busy_flips: u32,
    failing_modesets: u32,
    commits: Vec<(AtomicRequest, CommitFlags)>,
    attempts: usize,
}

impl State {
    fn alloc_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn take_scripted(&mut self, op: DeviceOp) -> Result<(), DeviceError> {
        let Some(i) = self.scripted.iter().position(|&(o, _)| o == op) else {
            return Ok(());
        };
        if self.scripted[i].1 > 0 {
            self.scripted[i].1 -= 1;
            return Ok(());
        }
        self.scripted.remove(i);
        Err(DeviceError::Os { op, errno: EIO })
    }

    fn install_properties(&mut self, id: ObjectId, names: &[&str], type_value: u64) {
        let props = names
            .iter()
            .map(|&name| PropertyDescriptor {
                id: PropertyId(self.alloc_id()),
                name: name.to_owned(),
                value: match name {
                    "type" => type_value,
                    "GAMMA_LUT_SIZE" => 256,
                    _ => 0,
                },
            })
            .collect();
        self.properties.insert(id, props);
    }
}

/// Scriptable in-memory device.
#[derive(Debug)]
pub(crate) struct FakeDevice {
    state: Mutex<State>,
    unmaps: Arc<AtomicUsize>,
}

impl FakeDevice {
    pub(crate) const PRIMARY_PLANE: ObjectId = ObjectId(31);
    pub(crate) const OVERLAY_PLANE: ObjectId = ObjectId(32);
    pub(crate) const CRTC: ObjectId = ObjectId(41);
    pub(crate) const SECOND_CRTC: ObjectId = ObjectId(42);
    pub(crate) const ENCODER: ObjectId = ObjectId(51);
    pub(crate) const CONNECTOR: ObjectId = ObjectId(61);

    /// 1920×1080 at 60 or 50 Hz (CEA timings with a stretched line).
    pub(crate) fn mode_1080p(refresh: u32) -> ModeInfo {
        let htotal = u16::try_from(148_500_000 / (refresh * 1125)).expect("htotal fits");
        let mut mode =
            ModeInfo::from_timings(148_500, (1920, 2008, 2052, htotal), (1080, 1084, 1089, 1125));
        if refresh == 60 {
            mode.mode_type |= ModeInfo::TYPE_PREFERRED;
        }
        mode
    }

    pub(crate) fn mode_720p() -> ModeInfo {
        ModeInfo::from_timings(74_250, (1280, 1390, 1430, 1650), (720, 725, 730, 750))
    }

    pub(crate) fn new() -> Self {
        let mut state = State {
            next_id: 100,
            planes: vec![
                PlaneInfo {
                    id: Self::PRIMARY_PLANE,
                    possible_crtcs: 0b1,
                    formats: vec![Fourcc::XRGB8888, Fourcc::RGB565, Fourcc::C8],
                },
                PlaneInfo {
                    id: Self::OVERLAY_PLANE,
                    possible_crtcs: 0b1,
                    formats: vec![Fourcc::XRGB8888],
                },
            ],
            crtcs: vec![Self::CRTC],
            encoders: vec![EncoderInfo {
                id: Self::ENCODER,
                possible_crtcs: 0b1,
            }],
            connectors: vec![ConnectorInfo {
                id: Self::CONNECTOR,
                state: ConnectorState::Connected,
                encoder: Some(Self::ENCODER),
                modes: vec![
                    Self::mode_1080p(60),
                    Self::mode_1080p(50),
                    Self::mode_720p(),
                ],
                physical_size: Some((520, 290)),
            }],
            ..State::default()
        };
        state.install_properties(Self::PRIMARY_PLANE, PLANE_PROPS, PLANE_TYPE_PRIMARY);
        state.install_properties(Self::OVERLAY_PLANE, PLANE_PROPS, PLANE_TYPE_OVERLAY);
        state.install_properties(Self::CRTC, CRTC_PROPS, 0);
        state.install_properties(Self::CONNECTOR, CONNECTOR_PROPS, 0);
        Self {
            state: Mutex::new(state),
            unmaps: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every object, planes first, in the order discovery acquires them.
    pub(crate) fn all_objects(&self) -> Vec<DisplayObject> {
        let state = self.lock();
        let planes = state.planes.iter().map(|p| DisplayObject::plane(p.id));
        let crtcs = state.crtcs.iter().map(|&c| DisplayObject::crtc(c));
        let connectors = state.connectors.iter().map(|c| DisplayObject::connector(c.id));
        let encoders = state.encoders.iter().map(|e| DisplayObject::encoder(e.id));
        planes.chain(crtcs).chain(connectors).chain(encoders).collect()
    }

    /// Adds a second crtc reachable from the primary plane and encoder.
    pub(crate) fn add_second_crtc(&self) {
        let mut state = self.lock();
        state.crtcs.push(Self::SECOND_CRTC);
        state.planes[0].possible_crtcs = 0b11;
        state.encoders[0].possible_crtcs = 0b11;
        state.install_properties(Self::SECOND_CRTC, CRTC_PROPS, 0);
    }

    pub(crate) fn set_connector_state(&self, connection: ConnectorState) {
        self.lock().connectors[0].state = connection;
    }

    pub(crate) fn set_physical_size(&self, size: Option<(u32, u32)>) {
        self.lock().connectors[0].physical_size = size;
    }

    pub(crate) fn clear_properties(&self, object: ObjectId) {
        self.lock().properties.remove(&object);
    }

    pub(crate) fn remove_property(&self, object: ObjectId, name: &str) {
        if let Some(props) = self.lock().properties.get_mut(&object) {
            props.retain(|p| p.name != name);
        }
    }

    /// Makes the next call of `op` fail with `EIO`.
    pub(crate) fn fail_next(&self, op: DeviceOp) {
        self.lock().scripted.push((op, 0));
    }

    /// Lets `skip` calls of `op` succeed, then fails the next one with `EIO`.
    pub(crate) fn fail_after(&self, op: DeviceOp, skip: u32) {
        self.lock().scripted.push((op, skip));
    }

    /// Makes the next `count` non-blocking commits report busy.
    pub(crate) fn busy_flips(&self, count: u32) {
        self.lock().busy_flips = count;
    }

    /// Makes the next `count` mode-set commits fail.
    pub(crate) fn fail_modesets(&self, count: u32) {
        self.lock().failing_modesets = count;
    }

    pub(crate) fn property_id(&self, object: ObjectId, name: &str) -> PropertyId {
        self.lock().properties[&object]
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.id)
            .expect("property exists")
    }

    /// Accepted commits in order.
    pub(crate) fn commits(&self) -> Vec<(AtomicRequest, CommitFlags)> {
        self.lock().commits.clone()
    }

    /// Commit attempts, including rejected ones.
    pub(crate) fn commit_attempts(&self) -> usize {
        self.lock().attempts
    }

    /// Value assigned to `name` on `object` by the last accepted commit that
    /// touched it.
    pub(crate) fn committed_value(&self, object: ObjectId, name: &str) -> Option<u64> {
        let property = self.property_id(object, name);
        self.lock()
            .commits
            .iter()
            .rev()
            .find_map(|(req, _)| req.value_of(object, property))
    }

    pub(crate) fn live_dumbs(&self) -> usize {
        self.lock().dumbs.len()
    }

    pub(crate) fn live_framebuffers(&self) -> usize {
        self.lock().framebuffers.len()
    }

    pub(crate) fn live_blobs(&self) -> usize {
        self.lock().blobs.len()
    }

    pub(crate) fn blob(&self, blob: BlobId) -> Option<Vec<u8>> {
        self.lock().blobs.get(&blob).cloned()
    }

    pub(crate) fn unmaps(&self) -> usize {
        self.unmaps.load(Ordering::SeqCst)
    }
}

impl KmsDevice for FakeDevice {
    fn resources(&self) -> Result<Resources, DeviceError> {
        let mut state = self.lock();
        state.take_scripted(DeviceOp::Resources)?;
        Ok(Resources {
            planes: state.planes.iter().map(|p| p.id).collect(),
            crtcs: state.crtcs.clone(),
            encoders: state.encoders.iter().map(|e| e.id).collect(),
            connectors: state.connectors.iter().map(|c| c.id).collect(),
        })
    }

    fn plane(&self, id: ObjectId) -> Result<PlaneInfo, DeviceError> {
        let state = self.lock();
        state
            .planes
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(DeviceError::InvalidObject(DisplayObject::plane(id)))
    }

    fn encoder(&self, id: ObjectId) -> Result<EncoderInfo, DeviceError> {
        let state = self.lock();
        state
            .encoders
            .iter()
            .find(|e| e.id == id)
            .copied()
            .ok_or(DeviceError::InvalidObject(DisplayObject::encoder(id)))
    }

    fn connector(&self, id: ObjectId) -> Result<ConnectorInfo, DeviceError> {
        let state = self.lock();
        state
            .connectors
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(DeviceError::InvalidObject(DisplayObject::connector(id)))
    }

    fn properties(&self, object: DisplayObject) -> Result<Vec<PropertyDescriptor>, DeviceError> {
        let mut state = self.lock();
        state.take_scripted(DeviceOp::Properties)?;
        if object.kind == ObjectKind::Encoder {
            return Ok(Vec::new());
        }
        Ok(state.properties.get(&object.id).cloned().unwrap_or_default())
    }

    fn create_dumb(
        &self,
        width: u32,
        height: u32,
        bpp: u32,
    ) -> Result<DumbAllocation, DeviceError> {
        let mut state = self.lock();
        state.take_scripted(DeviceOp::CreateDumb)?;
        let pitch = width * bpp.div_ceil(8);
        let allocation = DumbAllocation {
            handle: DumbHandle(state.alloc_id()),
            pitch,
            size: u64::from(pitch) * u64::from(height),
        };
        state.dumbs.insert(allocation.handle, allocation);
        Ok(allocation)
    }

    fn map_dumb(&self, allocation: &DumbAllocation) -> Result<Box<dyn Mapping>, DeviceError> {
        let mut state = self.lock();
        state.take_scripted(DeviceOp::MapDumb)?;
        if !state.dumbs.contains_key(&allocation.handle) {
            return Err(DeviceError::Os {
                op: DeviceOp::MapDumb,
                errno: ENOENT,
            });
        }
        let len = usize::try_from(allocation.size).map_err(|_| DeviceError::Os {
            op: DeviceOp::MapDumb,
            errno: EINVAL,
        })?;
        Ok(Box::new(FakeMapping {
            bytes: vec![0; len],
            unmaps: self.unmaps.clone(),
        }))
    }

    fn destroy_dumb(&self, handle: DumbHandle) -> Result<(), DeviceError> {
        let mut state = self.lock();
        state.take_scripted(DeviceOp::DestroyDumb)?;
        state.dumbs.remove(&handle).map(drop).ok_or(DeviceError::Os {
            op: DeviceOp::DestroyDumb,
            errno: ENOENT,
        })
    }

    fn add_framebuffer(
        &self,
        _width: u32,
        _height: u32,
        _format: Fourcc,
        planes: &FramebufferPlanes,
    ) -> Result<FramebufferId, DeviceError> {
        let mut state = self.lock();
        state.take_scripted(DeviceOp::AddFramebuffer)?;
        let known = planes
            .iter()
            .all(|(handle, _, _)| state.dumbs.contains_key(&DumbHandle(handle)));
        if planes.is_empty() || !known {
            return Err(DeviceError::Os {
                op: DeviceOp::AddFramebuffer,
                errno: EINVAL,
            });
        }
        let fb = FramebufferId(state.alloc_id());
        state.framebuffers.insert(fb);
        Ok(fb)
    }

    fn remove_framebuffer(&self, fb: FramebufferId) -> Result<(), DeviceError> {
        let mut state = self.lock();
        state.take_scripted(DeviceOp::RemoveFramebuffer)?;
        if state.framebuffers.remove(&fb) {
            Ok(())
        } else {
            Err(DeviceError::Os {
                op: DeviceOp::RemoveFramebuffer,
                errno: ENOENT,
            })
        }
    }

    fn create_blob(&self, data: &[u8]) -> Result<BlobId, DeviceError> {
        let mut state = self.lock();
        state.take_scripted(DeviceOp::CreateBlob)?;
        let blob = BlobId(state.alloc_id());
        state.blobs.insert(blob, data.to_vec());
        Ok(blob)
    }

    fn destroy_blob(&self, blob: BlobId) -> Result<(), DeviceError> {
        let mut state = self.lock();
        state.take_scripted(DeviceOp::DestroyBlob)?;
        state.blobs.remove(&blob).map(drop).ok_or(DeviceError::Os {
            op: DeviceOp::DestroyBlob,
            errno: ENOENT,
        })
    }

    fn commit(&self, request: &AtomicRequest, flags: CommitFlags) -> Result<(), DeviceError> {
        let mut state = self.lock();
        state.attempts += 1;
        state.take_scripted(DeviceOp::Commit)?;
        if flags.nonblocking && state.busy_flips > 0 {
            state.busy_flips -= 1;
            return Err(DeviceError::Busy);
        }
        if flags.allow_modeset && state.failing_modesets > 0 {
            state.failing_modesets -= 1;
            return Err(DeviceError::Os {
                op: DeviceOp::Commit,
                errno: EINVAL,
            });
        }
        state.commits.push((request.clone(), flags));
        Ok(())
    }
}
