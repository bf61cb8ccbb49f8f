// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-object property metadata.
//!
//! Atomic requests address properties by id, but ids differ between drivers
//! and objects, so every assignment starts as a name lookup. The cache fetches
//! each object's property list once at init and answers lookups from a map.
//!
//! Cached values are a snapshot from acquisition time. They are not refreshed
//! after commits.

use hashbrown::HashMap;

use crate::atomic::AtomicRequest;
use crate::device::KmsDevice;
use crate::error::{DeviceError, DisplayError};
use crate::object::{DisplayObject, ObjectId, ObjectKind, PropertyId};

/// Whether a missing property aborts the request being built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Requirement {
    /// Missing is an error; the caller must abandon the request.
    Required,
    /// Missing is silently skipped.
    Optional,
}

#[derive(Debug)]
struct Entry {
    kind: ObjectKind,
    by_name: HashMap<String, (PropertyId, u64)>,
}

/// Property metadata for every acquired object.
#[derive(Debug, Default)]
pub struct PropertyCache {
    entries: HashMap<ObjectId, Entry>,
    order: Vec<ObjectId>,
}

impl PropertyCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches and stores every property of `object`.
    ///
    /// Returns `Ok(false)` when the object exposes no properties; nothing is
    /// stored in that case. Acquiring an object twice replaces its entry.
    pub fn acquire<D: KmsDevice + ?Sized>(
        &mut self,
        device: &D,
        object: DisplayObject,
    ) -> Result<bool, DeviceError> {
        let props = device.properties(object)?;
        if props.is_empty() {
            return Ok(false);
        }
        let by_name = props
            .into_iter()
            .map(|p| (p.name, (p.id, p.value)))
            .collect();
        let entry = Entry {
            kind: object.kind,
            by_name,
        };
        if self.entries.insert(object.id, entry).is_none() {
            self.order.push(object.id);
        }
        Ok(true)
    }

    /// Looks up a property id by name.
    #[must_use]
    pub fn find(&self, object: ObjectId, name: &str) -> Option<PropertyId> {
        self.entries
            .get(&object)
            .and_then(|e| e.by_name.get(name))
            .map(|&(id, _)| id)
    }

    /// Value of a property when the object was acquired.
    #[must_use]
    pub fn get(&self, object: ObjectId, name: &str) -> Option<u64> {
        self.entries
            .get(&object)
            .and_then(|e| e.by_name.get(name))
            .map(|&(_, value)| value)
    }

    /// Kind an object was acquired as.
    #[must_use]
    pub fn kind_of(&self, object: ObjectId) -> Option<ObjectKind> {
        self.entries.get(&object).map(|e| e.kind)
    }

    /// Appends `name = value` on `object` to `req`.
    ///
    /// Returns `Ok(true)` if appended and `Ok(false)` if an optional property
    /// is missing. A missing required property returns
    /// [`DisplayError::MissingProperty`] and leaves `req` untouched; the
    /// caller is expected to drop the request.
    pub fn set(
        &self,
        req: &mut AtomicRequest,
        object: DisplayObject,
        name: &'static str,
        value: u64,
        requirement: Requirement,
    ) -> Result<bool, DisplayError> {
        match (self.find(object.id, name), requirement) {
            (Some(property), _) => {
                req.push(object.id, property, value);
                Ok(true)
            }
            (None, Requirement::Optional) => Ok(false),
            (None, Requirement::Required) => Err(DisplayError::MissingProperty { object, name }),
        }
    }

    /// Resolves a required property id, for callers that cache ids across
    /// requests.
    pub fn require(
        &self,
        object: DisplayObject,
        name: &'static str,
    ) -> Result<PropertyId, DisplayError> {
        self.find(object.id, name)
            .ok_or(DisplayError::MissingProperty { object, name })
    }

    /// Number of cached objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drops every entry, most recently acquired first. Returns how many were
    /// released.
    pub fn release_all(&mut self) -> usize {
        let mut released = 0;
        while let Some(id) = self.order.pop() {
            if self.entries.remove(&id).is_some() {
                released += 1;
            }
        }
        released
    }

    /// Ids in acquisition order.
    pub fn objects(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.order.iter().copied()
    }
}
