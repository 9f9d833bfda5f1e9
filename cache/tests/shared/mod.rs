#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use cache::{Options, Store, TaggedStore, decode_version, encode_version};

#[derive(thiserror::Error, Debug)]
#[error("store unavailable")]
pub struct Unavailable;

/// A `Mutex<HashMap>` store that records how often each primitive was called.
#[derive(Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    failing: AtomicBool,
    /// When set, `fetch` serves these bytes without ever calling `compute`.
    pinned: Mutex<Option<Vec<u8>>>,
}

impl MemoryStore {
    pub fn calls(&self, op: &'static str) -> usize {
        self.calls.lock().unwrap().get(op).copied().unwrap_or(0)
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn pin_fetch(&self, bytes: Vec<u8>) {
        *self.pinned.lock().unwrap() = Some(bytes);
    }

    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.slots.lock().unwrap().get(key).cloned()
    }

    pub fn put_raw(&self, key: &str, bytes: &[u8]) {
        self.slots
            .lock()
            .unwrap()
            .insert(key.to_owned(), bytes.to_vec());
    }

    fn record(&self, op: &'static str) -> Result<(), Unavailable> {
        *self.calls.lock().unwrap().entry(op).or_default() += 1;
        if self.failing.load(Ordering::SeqCst) {
            return Err(Unavailable);
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    type Error = Unavailable;

    fn get(&self, key: &str, _options: &Options) -> Result<Option<Vec<u8>>, Self::Error> {
        self.record("get")?;
        Ok(self.raw(key))
    }

    fn get_multi(&self, keys: &[&str]) -> Result<HashMap<String, Vec<u8>>, Self::Error> {
        self.record("get_multi")?;
        let slots = self.slots.lock().unwrap();
        Ok(keys
            .iter()
            .filter_map(|key| slots.get(*key).map(|v| ((*key).to_owned(), v.clone())))
            .collect())
    }

    fn set(&self, key: &str, value: Vec<u8>, _options: &Options) -> Result<(), Self::Error> {
        self.record("set")?;
        self.slots.lock().unwrap().insert(key.to_owned(), value);
        Ok(())
    }

    fn delete(&self, key: &str, _options: &Options) -> Result<bool, Self::Error> {
        self.record("delete")?;
        Ok(self.slots.lock().unwrap().remove(key).is_some())
    }

    fn exists(&self, key: &str) -> Result<bool, Self::Error> {
        self.record("exists")?;
        Ok(self.slots.lock().unwrap().contains_key(key))
    }

    fn increment(&self, key: &str) -> Result<u64, Self::Error> {
        self.record("increment")?;
        let mut slots = self.slots.lock().unwrap();
        let next = slots
            .get(key)
            .and_then(|bytes| decode_version(bytes))
            .unwrap_or(0)
            + 1;
        slots.insert(key.to_owned(), encode_version(next));
        Ok(next)
    }

    fn fetch<F, E>(&self, key: &str, options: &Options, compute: F) -> Result<Vec<u8>, E>
    where
        F: FnOnce() -> Result<Vec<u8>, E>,
        E: From<Self::Error>,
    {
        self.record("fetch")?;
        if let Some(bytes) = self.pinned.lock().unwrap().clone() {
            return Ok(bytes);
        }

        if let Some(value) = self.raw(key) {
            return Ok(value);
        }
        let value = compute()?;
        self.set(key, value.clone(), options)?;
        Ok(value)
    }
}

pub fn tagged() -> TaggedStore<MemoryStore> {
    TaggedStore::new(MemoryStore::default())
}

pub fn tags(names: &[&str]) -> Options {
    Options::new().tags(names.iter().copied())
}
