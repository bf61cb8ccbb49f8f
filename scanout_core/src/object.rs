// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Kernel object identifiers.
//!
//! Every id here is the raw 32-bit value the kernel hands out. Backends
//! assign them; core code only compares and passes them through.

use core::fmt;

/// Identifies a mode object (plane, crtc, encoder or connector).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ObjectId(pub u32);

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

/// Kind of a display-pipeline object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Scanout plane: reads pixels from a framebuffer.
    Plane,
    /// CRTC: generates timings for one mode.
    Crtc,
    /// Encoder: converts the crtc stream for a connector.
    Encoder,
    /// Connector: the physical output.
    Connector,
}

impl ObjectKind {
    /// Returns a short label for diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plane => "Plane",
            Self::Crtc => "CRTC",
            Self::Encoder => "Encoder",
            Self::Connector => "Connector",
        }
    }
}

/// A typed reference to a mode object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DisplayObject {
    /// Kernel object id.
    pub id: ObjectId,
    /// Object kind.
    pub kind: ObjectKind,
}

impl DisplayObject {
    /// A plane object.
    #[must_use]
    pub const fn plane(id: ObjectId) -> Self {
        Self {
            id,
            kind: ObjectKind::Plane,
        }
    }

    /// A crtc object.
    #[must_use]
    pub const fn crtc(id: ObjectId) -> Self {
        Self {
            id,
            kind: ObjectKind::Crtc,
        }
    }

    /// An encoder object.
    #[must_use]
    pub const fn encoder(id: ObjectId) -> Self {
        Self {
            id,
            kind: ObjectKind::Encoder,
        }
    }

    /// A connector object.
    #[must_use]
    pub const fn connector(id: ObjectId) -> Self {
        Self {
            id,
            kind: ObjectKind::Connector,
        }
    }
}

impl fmt::Display for DisplayObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.as_str(), self.id.0)
    }
}

/// Identifies a property of a mode object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyId(pub u32);

/// Identifies a framebuffer object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FramebufferId(pub u32);

/// Identifies a property blob (mode blob, LUT blob).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlobId(pub u32);

/// Kernel handle of a dumb-buffer allocation (GEM handle).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DumbHandle(pub u32);

#[cfg(test)]
mod tests {
    use super::{DisplayObject, ObjectId};

    #[test]
    fn display_object_formats_kind_and_id() {
        assert_eq!(DisplayObject::crtc(ObjectId(41)).to_string(), "CRTC 41");
        assert_eq!(DisplayObject::plane(ObjectId(7)).to_string(), "Plane 7");
    }

    #[test]
    fn object_id_debug_is_compact() {
        assert_eq!(format!("{:?}", ObjectId(3)), "ObjectId(3)");
    }
}
