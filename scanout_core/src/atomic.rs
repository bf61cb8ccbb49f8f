// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Atomic request builder.
//!
//! An [`AtomicRequest`] is an ordered list of `(object, property, value)`
//! assignments. It is built per operation, handed to
//! [`KmsDevice::commit`](crate::device::KmsDevice::commit) together with
//! [`CommitFlags`], then dropped. Entries are normally appended through
//! [`PropertyCache::set`](crate::property::PropertyCache::set), which resolves
//! property names.

use crate::object::{ObjectId, PropertyId};

/// Flags for an atomic commit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CommitFlags {
    /// Allow a full mode-set (may block for link training).
    pub allow_modeset: bool,
    /// Return immediately; a second commit before the first retires fails
    /// with `EBUSY`.
    pub nonblocking: bool,
}

impl CommitFlags {
    /// Blocking commit that may change the mode.
    pub const MODESET: Self = Self {
        allow_modeset: true,
        nonblocking: false,
    };
    /// Non-blocking commit without a mode change.
    pub const FLIP: Self = Self {
        allow_modeset: false,
        nonblocking: true,
    };
    /// Blocking commit without a mode change.
    pub const BLOCKING: Self = Self {
        allow_modeset: false,
        nonblocking: false,
    };
}

/// One property assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PropertyAssignment {
    /// Target object.
    pub object: ObjectId,
    /// Property on that object.
    pub property: PropertyId,
    /// New value.
    pub value: u64,
}

/// An ordered set of property assignments committed as one transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AtomicRequest {
    entries: Vec<PropertyAssignment>,
}

impl AtomicRequest {
    /// Creates an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an assignment.
    pub fn push(&mut self, object: ObjectId, property: PropertyId, value: u64) {
        self.entries.push(PropertyAssignment {
            object,
            property,
            value,
        });
    }

    /// Assignments in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[PropertyAssignment] {
        &self.entries
    }

    /// Number of assignments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Last value assigned to `property` on `object`.
    #[must_use]
    pub fn value_of(&self, object: ObjectId, property: PropertyId) -> Option<u64> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.object == object && e.property == property)
            .map(|e| e.value)
    }
}
