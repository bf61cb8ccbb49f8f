// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dumb-buffer slots.
//!
//! Each slot holds at most one [`DumbBuffer`]: a kernel allocation, the
//! framebuffer object registered over it and a CPU mapping. Creation is three
//! device calls; if a later one fails, the earlier ones are undone in reverse
//! order before the error is returned, so a failed slot never leaks a handle.
//! An empty slot is the destroyed state, which makes
//! [`BufferManager::destroy_all`] idempotent.

use crate::device::{DumbAllocation, KmsDevice, Mapping};
use crate::error::{DeviceError, DisplayError};
use crate::format::{ColorFormat, framebuffer_planes};
use crate::object::{DumbHandle, FramebufferId};
use crate::trace::{BufferAction, BufferEvent, Tracer};

/// Number of buffer slots (enough for triple buffering).
pub const MAX_BUFFERS: usize = 3;

/// A live, mapped scanout buffer.
#[derive(Debug)]
pub struct DumbBuffer {
    allocation: DumbAllocation,
    framebuffer: FramebufferId,
    mapping: Box<dyn Mapping>,
    width: u32,
    height: u32,
}

impl DumbBuffer {
    /// Kernel allocation.
    #[must_use]
    pub fn allocation(&self) -> &DumbAllocation {
        &self.allocation
    }

    /// Framebuffer object scanning out this buffer.
    #[must_use]
    pub fn framebuffer(&self) -> FramebufferId {
        self.framebuffer
    }

    /// Visible size in pixels.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Mapped pixel memory, including every plane of planar formats.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        self.mapping.as_slice()
    }

    /// Mapped pixel memory, writable.
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        self.mapping.as_mut_slice()
    }
}

/// Undoes the completed creation steps of one buffer unless disarmed.
struct Unwind<'a, D: KmsDevice + ?Sized> {
    device: &'a D,
    handle: Option<DumbHandle>,
    framebuffer: Option<FramebufferId>,
}

impl<D: KmsDevice + ?Sized> Unwind<'_, D> {
    fn disarm(mut self) {
        self.handle = None;
        self.framebuffer = None;
    }
}

impl<D: KmsDevice + ?Sized> Drop for Unwind<'_, D> {
    fn drop(&mut self) {
        if let Some(fb) = self.framebuffer.take() {
            _ = self.device.remove_framebuffer(fb);
        }
        if let Some(handle) = self.handle.take() {
            _ = self.device.destroy_dumb(handle);
        }
    }
}

fn build<D: KmsDevice + ?Sized>(
    device: &D,
    width: u32,
    height: u32,
    format: &ColorFormat,
) -> Result<DumbBuffer, DeviceError> {
    let rows = height.saturating_mul(format.height_factor.max(1));
    let allocation = device.create_dumb(width, rows, format.bpp)?;
    let mut unwind = Unwind {
        device,
        handle: Some(allocation.handle),
        framebuffer: None,
    };

    let planes = framebuffer_planes(format, allocation.handle, allocation.pitch, height);
    let framebuffer = device.add_framebuffer(width, height, format.fourcc, &planes)?;
    unwind.framebuffer = Some(framebuffer);

    let mapping = device.map_dumb(&allocation)?;
    unwind.disarm();

    Ok(DumbBuffer {
        allocation,
        framebuffer,
        mapping,
        width,
        height,
    })
}

/// Tears down one buffer: unmap, remove framebuffer, free the allocation.
fn release<D: KmsDevice + ?Sized>(device: &D, buffer: DumbBuffer) {
    let DumbBuffer {
        allocation,
        framebuffer,
        mapping,
        ..
    } = buffer;
    drop(mapping);
    _ = device.remove_framebuffer(framebuffer);
    _ = device.destroy_dumb(allocation.handle);
}

/// Fixed set of buffer slots.
#[derive(Debug, Default)]
pub struct BufferManager {
    slots: [Option<DumbBuffer>; MAX_BUFFERS],
}

impl BufferManager {
    /// Creates a manager with every slot empty.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates, registers and maps a buffer in `slot`.
    ///
    /// The allocation is `width × (height × height_factor)` at the format's
    /// bits per pixel. A live buffer already in the slot is released first.
    /// On failure the slot is left empty and no kernel object created by
    /// this call survives; other slots are untouched.
    pub fn create<D: KmsDevice + ?Sized>(
        &mut self,
        device: &D,
        slot: usize,
        width: u32,
        height: u32,
        format: &ColorFormat,
        tracer: &Tracer,
    ) -> Result<(), DisplayError> {
        let cell = self
            .slots
            .get_mut(slot)
            .ok_or(DisplayError::InvalidSlot(slot))?;
        if let Some(old) = cell.take() {
            release(device, old);
        }

        let rows = height.saturating_mul(format.height_factor.max(1));
        match build(device, width, height, format) {
            Ok(buffer) => {
                tracer.buffer(&BufferEvent {
                    slot,
                    action: BufferAction::Created,
                    width,
                    height: rows,
                    pitch: buffer.allocation.pitch,
                    framebuffer: Some(buffer.framebuffer),
                });
                *cell = Some(buffer);
                Ok(())
            }
            Err(err) => {
                tracer.buffer(&BufferEvent {
                    slot,
                    action: BufferAction::RolledBack,
                    width,
                    height: rows,
                    pitch: 0,
                    framebuffer: None,
                });
                Err(err.into())
            }
        }
    }

    /// Releases every live buffer. Returns how many were released; a second
    /// call returns `0`.
    pub fn destroy_all<D: KmsDevice + ?Sized>(&mut self, device: &D, tracer: &Tracer) -> usize {
        let mut released = 0;
        for (slot, cell) in self.slots.iter_mut().enumerate() {
            let Some(buffer) = cell.take() else {
                continue;
            };
            let (width, height) = buffer.size();
            let event = BufferEvent {
                slot,
                action: BufferAction::Destroyed,
                width,
                height,
                pitch: buffer.allocation.pitch,
                framebuffer: Some(buffer.framebuffer),
            };
            release(device, buffer);
            tracer.buffer(&event);
            released += 1;
        }
        released
    }

    /// Buffer in `slot`, if live.
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&DumbBuffer> {
        self.slots.get(slot)?.as_ref()
    }

    /// Buffer in `slot`, if live, writable.
    pub fn get_mut(&mut self, slot: usize) -> Option<&mut DumbBuffer> {
        self.slots.get_mut(slot)?.as_mut()
    }

    /// Mapped memory of `slot`, if live.
    pub fn pixels_mut(&mut self, slot: usize) -> Option<&mut [u8]> {
        self.get_mut(slot).map(DumbBuffer::pixels_mut)
    }

    /// Framebuffer of `slot`, if live.
    #[must_use]
    pub fn framebuffer(&self, slot: usize) -> Option<FramebufferId> {
        self.get(slot).map(DumbBuffer::framebuffer)
    }

    /// Framebuffer ids of the first `count` slots; `None` if any is empty.
    #[must_use]
    pub fn framebuffers(&self, count: usize) -> Option<Vec<FramebufferId>> {
        (0..count).map(|slot| self.framebuffer(slot)).collect()
    }

    /// Row pitch shared by every buffer of the current mode.
    #[must_use]
    pub fn pitch(&self) -> Option<u32> {
        self.slots
            .iter()
            .flatten()
            .next()
            .map(|b| b.allocation.pitch)
    }

    /// Returns `true` if `slot` holds a live buffer.
    #[must_use]
    pub fn is_live(&self, slot: usize) -> bool {
        self.get(slot).is_some()
    }

    /// Number of live buffers.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }
}
