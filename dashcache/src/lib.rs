use std::{
    collections::HashMap,
    convert::Infallible,
    time::{Duration, Instant},
};

use cache::{Options, Store, decode_version, encode_version};
use dashmap::DashMap;

struct Slot {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Slot {
    fn new(value: Vec<u8>, ttl: Option<Duration>, now: Instant) -> Self {
        Self {
            value,
            // a ttl too large to represent never expires
            expires_at: ttl.and_then(|ttl| now.checked_add(ttl)),
        }
    }

    #[inline]
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// A concurrent in-memory [`Store`].
///
/// Expired slots are dropped lazily, the first time a read runs into them.
pub struct DashStore {
    slots: DashMap<String, Slot>,
}

impl DashStore {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Live keys, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        self.slots
            .iter()
            .filter(|slot| !slot.value().is_expired(now))
            .map(|slot| slot.key().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.slots.clear();
    }

    fn read<T>(&self, key: &str, f: impl FnOnce(&Slot) -> T) -> Option<T> {
        let now = Instant::now();
        match self.slots.get(key) {
            Some(slot) if !slot.is_expired(now) => Some(f(slot.value())),
            Some(slot) => {
                drop(slot);
                self.slots.remove_if(key, |_, slot| slot.is_expired(now));

                #[cfg(feature = "tracing")]
                tracing::debug!("dropped expired slot '{}'", key);

                None
            }
            None => None,
        }
    }
}

impl Default for DashStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for DashStore {
    type Error = Infallible;

    fn get(&self, key: &str, _options: &Options) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.read(key, |slot| slot.value.clone()))
    }

    fn get_multi(&self, keys: &[&str]) -> Result<HashMap<String, Vec<u8>>, Self::Error> {
        Ok(keys
            .iter()
            .filter_map(|key| {
                self.read(key, |slot| slot.value.clone())
                    .map(|value| ((*key).to_owned(), value))
            })
            .collect())
    }

    fn set(&self, key: &str, value: Vec<u8>, options: &Options) -> Result<(), Self::Error> {
        let slot = Slot::new(value, options.expires_in, Instant::now());
        self.slots.insert(key.to_owned(), slot);
        Ok(())
    }

    fn delete(&self, key: &str, _options: &Options) -> Result<bool, Self::Error> {
        let now = Instant::now();
        Ok(self
            .slots
            .remove(key)
            .is_some_and(|(_, slot)| !slot.is_expired(now)))
    }

    fn exists(&self, key: &str) -> Result<bool, Self::Error> {
        Ok(self.read(key, |_| ()).is_some())
    }

    fn increment(&self, key: &str) -> Result<u64, Self::Error> {
        let now = Instant::now();

        // the entry guard holds the shard lock, so read-modify-write is atomic per key
        let mut slot = self
            .slots
            .entry(key.to_owned())
            .or_insert_with(|| Slot::new(Vec::new(), None, now));

        let current = if slot.is_expired(now) {
            0
        } else {
            decode_version(&slot.value).unwrap_or(0)
        };
        let next = current.saturating_add(1);
        *slot = Slot::new(encode_version(next), None, now);

        Ok(next)
    }
}
