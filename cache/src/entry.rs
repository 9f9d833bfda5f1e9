use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// What actually gets written under an ordinary cache key: the payload plus the
/// version of every tag it depended on at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry<V> {
    value: V,
    tags: BTreeMap<String, u64>,
}

impl<V> Entry<V> {
    pub fn new<I>(value: V, snapshot: I) -> Self
    where
        I: IntoIterator<Item = (String, u64)>,
    {
        Self {
            value,
            tags: snapshot.into_iter().collect(),
        }
    }

    pub fn untagged(value: V) -> Self {
        Self {
            value,
            tags: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    #[inline]
    pub fn tags(&self) -> &BTreeMap<String, u64> {
        &self.tags
    }

    #[inline]
    pub fn into_value(self) -> V {
        self.value
    }
}

impl<V: Serialize> Entry<V> {
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl<V: DeserializeOwned> Entry<V> {
    /// `None` for anything that is not a well formed entry. Callers treat that as a miss.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }
}
