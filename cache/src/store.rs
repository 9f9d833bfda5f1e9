use std::{collections::HashMap, time::Duration};

/// Per-call options passed through to the underlying store.
///
/// `tags` is the only field [`TaggedStore`](crate::TaggedStore) reads; everything
/// else is the store's business.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub tags: Vec<String>,
    pub expires_in: Option<Duration>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(mut self, name: impl Into<String>) -> Self {
        self.tags.push(name.into());
        self
    }

    pub fn tags<I, T>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn expires_in(mut self, ttl: Duration) -> Self {
        self.expires_in = Some(ttl);
        self
    }
}

/// The primitive operations of a byte-valued key-value backend.
///
/// Implementations must provide read-your-writes consistency per key and an
/// atomic `increment`. Nothing here assumes cross-key transactions.
pub trait Store: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn get(&self, key: &str, options: &Options) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Missing keys are simply absent from the returned map.
    fn get_multi(&self, keys: &[&str]) -> Result<HashMap<String, Vec<u8>>, Self::Error>;

    fn set(&self, key: &str, value: Vec<u8>, options: &Options) -> Result<(), Self::Error>;

    /// Returns whether a key was removed.
    fn delete(&self, key: &str, options: &Options) -> Result<bool, Self::Error>;

    fn exists(&self, key: &str) -> Result<bool, Self::Error>;

    /// Atomically bumps the decimal counter under `key` and returns the new value.
    /// An absent or non-numeric slot is treated as `0`, so the first call yields `1`.
    fn increment(&self, key: &str) -> Result<u64, Self::Error>;

    /// Returns the value under `key`, filling it with `compute` when absent.
    fn fetch<F, E>(&self, key: &str, options: &Options, compute: F) -> Result<Vec<u8>, E>
    where
        F: FnOnce() -> Result<Vec<u8>, E>,
        E: From<Self::Error>,
    {
        if let Some(value) = self.get(key, options)? {
            return Ok(value);
        }

        let value = compute()?;
        self.set(key, value.clone(), options)?;
        Ok(value)
    }
}
