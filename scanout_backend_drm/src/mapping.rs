// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `mmap`-backed dumb-buffer mappings.

use core::ffi::c_void;
use core::ptr::{self, NonNull};
use std::os::fd::BorrowedFd;

use rustix::mm::{MapFlags, ProtFlags, mmap, munmap};
use scanout_core::device::Mapping;
use scanout_core::error::{DeviceError, DeviceOp};

use crate::card::os_error;

/// A shared, writable mapping of a dumb buffer.
#[derive(Debug)]
pub struct DumbMapping {
    ptr: NonNull<u8>,
    len: usize,
}

// SAFETY: the mapping is plain shared memory owned by this value; nothing
// else aliases it within the process.
unsafe impl Send for DumbMapping {}

impl DumbMapping {
    /// Maps `len` bytes of `fd` at the fake offset returned by the
    /// map-dumb ioctl.
    pub(crate) fn new(fd: BorrowedFd<'_>, offset: u64, len: usize) -> Result<Self, DeviceError> {
        // SAFETY: a fresh mapping at a kernel-chosen address cannot overlap
        // any existing Rust allocation.
        let raw = unsafe {
            mmap(
                ptr::null_mut(),
                len,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                fd,
                offset,
            )
        }
        .map_err(|errno| os_error(DeviceOp::MapDumb, errno))?;
        let ptr = NonNull::new(raw.cast::<u8>()).ok_or(DeviceError::Os {
            op: DeviceOp::MapDumb,
            errno: 0,
        })?;
        Ok(Self { ptr, len })
    }

    /// Mapped length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` for an empty mapping.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Mapping for DumbMapping {
    fn as_slice(&self) -> &[u8] {
        // SAFETY: `ptr` is valid for `len` bytes until drop.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and `&mut self` makes the borrow unique.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for DumbMapping {
    fn drop(&mut self) {
        // SAFETY: the region was mapped by `new` and no slice borrowed from
        // it can outlive `self`.
        _ = unsafe { munmap(self.ptr.as_ptr().cast::<c_void>(), self.len) };
    }
}
