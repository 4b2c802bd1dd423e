// Copyright (C) Microsoft Corporation. All rights reserved.

//! Opaque handles over the closed set of engine objects.
//!
//! Every live handle maps to exactly one [`Object`] variant. Accessors name
//! the variant they expect and fail with [`BcryptError::InvalidHandle`] on a
//! mismatch, so a hash handle can never be used as a key.
//!
//! Each entry sits behind its own lock. Operations on different handles do
//! not contend beyond the short table lookup.

use std::collections::HashMap;
use std::ops::AddAssign;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::Mutex;
use parking_lot::RwLock;

use crate::algorithm::Algorithm;
use crate::cipher::KeyObject;
use crate::error::*;
use crate::hash::HashObject;

/// Opaque handle to an algorithm, hash or key object.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BcryptHandle(u32);

impl Deref for BcryptHandle {
    type Target = u32;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AddAssign<u32> for BcryptHandle {
    fn add_assign(&mut self, other: u32) {
        self.0 = self.0.wrapping_add(other);
    }
}

impl From<u32> for BcryptHandle {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum HandleType {
    Algorithm,
    Hash,
    Key,
}

pub(crate) enum Object {
    Algorithm(Algorithm),
    Hash(Box<HashObject>),
    Key(Box<KeyObject>),
}

impl Object {
    pub(crate) fn handle_type(&self) -> HandleType {
        match self {
            Object::Algorithm(_) => HandleType::Algorithm,
            Object::Hash(_) => HandleType::Hash,
            Object::Key(_) => HandleType::Key,
        }
    }
}

#[derive(Clone)]
struct Entry {
    handle_type: HandleType,
    obj: Arc<Mutex<Object>>,
}

/// Handle table
#[derive(Default)]
pub(crate) struct HandleTable {
    table: RwLock<HandleTableInner>,
}

impl HandleTable {
    pub(crate) fn alloc_handle(&self, obj: Object) -> BcryptHandle {
        let handle_type = obj.handle_type();
        let handle = self.table.write().alloc_handle(obj);
        tracing::debug!(handle = *handle, ?handle_type, "Allocated handle");
        handle
    }

    fn entry(&self, handle: BcryptHandle) -> BcryptResult<Entry> {
        self.table
            .read()
            .table
            .get(&handle)
            .cloned()
            .ok_or_else(|| {
                tracing::error!(handle = *handle, "Unknown handle");
                BcryptError::InvalidHandle
            })
    }

    /// Runs `f` on the object behind `handle`, whatever its variant.
    pub(crate) fn with_object<R>(
        &self,
        handle: BcryptHandle,
        f: impl FnOnce(&mut Object) -> BcryptResult<R>,
    ) -> BcryptResult<R> {
        let entry = self.entry(handle)?;
        let mut obj = entry.obj.lock();
        f(&mut *obj)
    }

    pub(crate) fn with_algorithm<R>(
        &self,
        handle: BcryptHandle,
        f: impl FnOnce(&mut Algorithm) -> BcryptResult<R>,
    ) -> BcryptResult<R> {
        self.with_object(handle, |obj| match obj {
            Object::Algorithm(alg) => f(alg),
            other => Err(wrong_type(handle, other, HandleType::Algorithm)),
        })
    }

    /// Copies the algorithm configuration behind `handle`.
    pub(crate) fn algorithm(&self, handle: BcryptHandle) -> BcryptResult<Algorithm> {
        self.with_algorithm(handle, |alg| Ok(*alg))
    }

    pub(crate) fn with_hash<R>(
        &self,
        handle: BcryptHandle,
        f: impl FnOnce(&mut HashObject) -> BcryptResult<R>,
    ) -> BcryptResult<R> {
        self.with_object(handle, |obj| match obj {
            Object::Hash(hash) => f(&mut **hash),
            other => Err(wrong_type(handle, other, HandleType::Hash)),
        })
    }

    pub(crate) fn with_key<R>(
        &self,
        handle: BcryptHandle,
        f: impl FnOnce(&mut KeyObject) -> BcryptResult<R>,
    ) -> BcryptResult<R> {
        self.with_object(handle, |obj| match obj {
            Object::Key(key) => f(&mut **key),
            other => Err(wrong_type(handle, other, HandleType::Key)),
        })
    }

    /// Removes `handle` if it refers to a `handle_type` object.
    ///
    /// A handle of another variant stays in the table.
    pub(crate) fn free_handle(
        &self,
        handle: BcryptHandle,
        handle_type: HandleType,
    ) -> BcryptResult<()> {
        let entry = self.table.write().free_handle(handle, handle_type)?;
        drop(entry);
        tracing::debug!(handle = *handle, ?handle_type, "Freed handle");
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.table.read().table.len()
    }
}

fn wrong_type(handle: BcryptHandle, obj: &Object, expected: HandleType) -> BcryptError {
    tracing::error!(
        handle = *handle,
        actual = ?obj.handle_type(),
        ?expected,
        "Handle has the wrong type"
    );
    BcryptError::InvalidHandle
}

#[derive(Default)]
struct HandleTableInner {
    table: HashMap<BcryptHandle, Entry>,
    id_counter: BcryptHandle,
}

impl HandleTableInner {
    fn alloc_handle(&mut self, obj: Object) -> BcryptHandle {
        while *self.id_counter == 0 || self.table.contains_key(&self.id_counter) {
            self.id_counter += 1;
        }
        let id = self.id_counter;
        let entry = Entry {
            handle_type: obj.handle_type(),
            obj: Arc::new(Mutex::new(obj)),
        };
        self.table.insert(id, entry);
        id
    }

    fn free_handle(&mut self, handle: BcryptHandle, handle_type: HandleType) -> BcryptResult<Entry> {
        match self.table.get(&handle) {
            Some(entry) if entry.handle_type == handle_type => {}
            _ => {
                tracing::error!(handle = *handle, ?handle_type, "Cannot free handle");
                Err(BcryptError::InvalidHandle)?
            }
        }
        self.table.remove(&handle).ok_or(BcryptError::InvalidHandle)
    }
}
