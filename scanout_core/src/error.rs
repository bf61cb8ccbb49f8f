// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.

use core::fmt;

use crate::object::DisplayObject;

/// The device operation that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceOp {
    /// Opening or probing a device node.
    Open,
    /// Querying or setting a capability.
    Capability,
    /// Enumerating resources.
    Resources,
    /// Querying one mode object.
    Object,
    /// Reading object properties.
    Properties,
    /// Creating a dumb buffer.
    CreateDumb,
    /// Mapping a dumb buffer.
    MapDumb,
    /// Destroying a dumb buffer.
    DestroyDumb,
    /// Creating a framebuffer object.
    AddFramebuffer,
    /// Removing a framebuffer object.
    RemoveFramebuffer,
    /// Creating a property blob.
    CreateBlob,
    /// Destroying a property blob.
    DestroyBlob,
    /// Committing an atomic request.
    Commit,
}

impl DeviceOp {
    /// Returns a short label for diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Capability => "capability",
            Self::Resources => "get resources",
            Self::Object => "get object",
            Self::Properties => "get properties",
            Self::CreateDumb => "create dumb buffer",
            Self::MapDumb => "map dumb buffer",
            Self::DestroyDumb => "destroy dumb buffer",
            Self::AddFramebuffer => "add framebuffer",
            Self::RemoveFramebuffer => "remove framebuffer",
            Self::CreateBlob => "create blob",
            Self::DestroyBlob => "destroy blob",
            Self::Commit => "atomic commit",
        }
    }
}

/// Errors reported by a [`KmsDevice`](crate::device::KmsDevice).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceError {
    /// The device is busy (`EBUSY`): a previous non-blocking commit has not
    /// been retired yet.
    Busy,
    /// An operating-system error.
    Os {
        /// Which operation failed.
        op: DeviceOp,
        /// Raw `errno` value.
        errno: i32,
    },
    /// The id does not name an object of the expected kind.
    InvalidObject(DisplayObject),
    /// The device lacks a required capability.
    Unsupported(DeviceOp),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "device busy"),
            Self::Os { op, errno } => write!(f, "{} failed (errno {errno})", op.as_str()),
            Self::InvalidObject(object) => write!(f, "invalid object: {object}"),
            Self::Unsupported(op) => write!(f, "{} not supported by device", op.as_str()),
        }
    }
}

impl std::error::Error for DeviceError {}

/// Errors from display-pipeline operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayError {
    /// No capable device was found.
    NoDevice,
    /// Discovery found no valid plane→crtc→encoder→connector path.
    NoPipes,
    /// No color format matches the requested depth and flags.
    UnsupportedFormat {
        /// Requested depth in bits.
        depth: u32,
    },
    /// A required property is missing on an object; the request being built
    /// was abandoned.
    MissingProperty {
        /// Object the property was looked up on.
        object: DisplayObject,
        /// Property name.
        name: &'static str,
    },
    /// Every candidate pipe rejected the mode-set commit.
    ModesetFailed {
        /// Number of pipes tried.
        attempts: usize,
    },
    /// The buffer slot index is out of range.
    InvalidSlot(usize),
    /// No mode is active.
    NotActive,
    /// The flip thread could not be started.
    FlipThread,
    /// A device call failed.
    Device(DeviceError),
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDevice => write!(f, "could not find any capable DRM device"),
            Self::NoPipes => write!(f, "unable to initialize device, no suitable pipes"),
            Self::UnsupportedFormat { depth } => write!(f, "bad pixel format ({depth}bpp)"),
            Self::MissingProperty { object, name } => write!(f, "{object} has no property {name}"),
            Self::ModesetFailed { attempts } => {
                write!(f, "unable to set video mode ({attempts} pipes tried)")
            }
            Self::InvalidSlot(slot) => write!(f, "buffer slot {slot} out of range"),
            Self::NotActive => write!(f, "no video mode is active"),
            Self::FlipThread => write!(f, "failed to start flip thread"),
            Self::Device(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for DisplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Device(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DeviceError> for DisplayError {
    fn from(err: DeviceError) -> Self {
        Self::Device(err)
    }
}
