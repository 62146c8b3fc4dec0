//! Type-keyed storage owned by an [`Application`](crate::Application).
//!
//! Every value is addressed by a [`StorageKey`] type rather than a string, so
//! the value type is fixed at compile time. Values may carry a shutdown hook
//! which runs when the owning application is torn down.

use crate::error::{Error, Result};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub trait StorageKey: 'static {
    type Value: Clone + Send + Sync + 'static;
}

type AnyValue = Box<dyn Any + Send + Sync>;
type ShutdownHook = Box<dyn FnOnce(AnyValue) + Send + Sync>;

struct Entry {
    seq: u64,
    value: AnyValue,
    on_shutdown: Option<ShutdownHook>,
}

impl Entry {
    fn close(self) {
        if let Some(hook) = self.on_shutdown {
            hook(self.value);
        }
    }
}

#[derive(Default)]
struct Inner {
    entries: HashMap<TypeId, Entry>,
    next_seq: u64,
    closed: bool,
}

#[derive(Default)]
pub struct Storage {
    inner: RwLock<Inner>,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<K: StorageKey>(&self) -> Option<K::Value> {
        self.read()
            .entries
            .get(&TypeId::of::<K>())
            .and_then(|entry| entry.value.downcast_ref::<K::Value>())
            .cloned()
    }

    pub fn contains<K: StorageKey>(&self) -> bool {
        self.read().entries.contains_key(&TypeId::of::<K>())
    }

    /// Stores `value`, replacing any existing one. The replaced value's
    /// shutdown hook runs before this returns.
    pub fn set<K: StorageKey>(&self, value: K::Value) -> Result<()> {
        self.store::<K>(value, None)
    }

    pub fn set_with_shutdown<K, F>(&self, value: K::Value, on_shutdown: F) -> Result<()>
    where
        K: StorageKey,
        F: FnOnce(K::Value) + Send + Sync + 'static,
    {
        let hook: ShutdownHook = Box::new(move |value: AnyValue| {
            if let Ok(value) = value.downcast::<K::Value>() {
                on_shutdown(*value);
            }
        });
        self.store::<K>(value, Some(hook))
    }

    /// Stores `value` only if nothing is stored under `K` yet. The check and
    /// the write happen under one write lock.
    pub fn insert_if_absent<K: StorageKey>(&self, value: K::Value) -> Result<bool> {
        let mut inner = self.write();
        if inner.closed {
            return Err(Error::ShutDown);
        }
        let key = TypeId::of::<K>();
        if inner.entries.contains_key(&key) {
            return Ok(false);
        }
        let seq = inner.bump();
        inner.entries.insert(
            key,
            Entry {
                seq,
                value: Box::new(value),
                on_shutdown: None,
            },
        );
        Ok(true)
    }

    pub fn is_closed(&self) -> bool {
        self.read().closed
    }

    /// Closes the storage and runs every shutdown hook, most recently stored
    /// first. Hooks run after the lock is released. Calling it again is a no-op.
    pub fn shutdown(&self) {
        let mut entries: Vec<Entry> = {
            let mut inner = self.write();
            if inner.closed {
                return;
            }
            inner.closed = true;
            let drained = inner.entries.drain().map(|(_, entry)| entry).collect();
            drained
        };
        entries.sort_by(|a, b| b.seq.cmp(&a.seq));
        tracing::debug!(entries = entries.len(), "shutting down application storage");
        for entry in entries {
            entry.close();
        }
    }

    fn store<K: StorageKey>(&self, value: K::Value, on_shutdown: Option<ShutdownHook>) -> Result<()> {
        let replaced = {
            let mut inner = self.write();
            if inner.closed {
                return Err(Error::ShutDown);
            }
            let seq = inner.bump();
            inner.entries.insert(
                TypeId::of::<K>(),
                Entry {
                    seq,
                    value: Box::new(value),
                    on_shutdown,
                },
            )
        };
        if let Some(entry) = replaced {
            entry.close();
        }
        Ok(())
    }

    // A panic inside a hook never happens under the lock, so a poisoned lock
    // still guards consistent data.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Inner {
    fn bump(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let inner = self.read();
        f.debug_struct("Storage")
            .field("entries", &inner.entries.len())
            .field("closed", &inner.closed)
            .finish()
    }
}

/// One mutex per [`StorageKey`], used to serialize the creation of a value.
#[derive(Debug, Default)]
pub struct Locks {
    locks: Mutex<HashMap<TypeId, Arc<Mutex<()>>>>,
}

impl Locks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for<K: StorageKey>(&self) -> Arc<Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let lock = locks
            .entry(TypeId::of::<K>())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock
    }
}
