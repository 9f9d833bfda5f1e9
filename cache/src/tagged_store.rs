use std::collections::HashMap;

use serde::{Serialize, de::DeserializeOwned, de::IgnoredAny};

use crate::{CfgDebug, Entry, Error, Options, Store, Tag, TagSet};

pub const DEFAULT_TAG_PREFIX: &str = "tag:";

#[derive(Debug, Clone)]
pub struct TaggedStoreOpts {
    /// Namespace for tag version keys. Ordinary keys may not start with it.
    pub tag_prefix: String,
}

impl Default for TaggedStoreOpts {
    fn default() -> Self {
        Self {
            tag_prefix: DEFAULT_TAG_PREFIX.to_owned(),
        }
    }
}

/// Wraps a [`Store`] so that entries can depend on tags.
///
/// Writes snapshot the current version of each tag in [`Options::tags`]. Reads compare
/// that snapshot against the live versions and evict the entry on any mismatch.
/// Invalidating a tag is a single increment, however many entries reference it.
pub struct TaggedStore<S> {
    store: S,
    opts: TaggedStoreOpts,
}

impl<S: Store> TaggedStore<S> {
    pub fn new(store: S) -> Self {
        Self::with_opts(store, TaggedStoreOpts::default())
    }

    pub fn with_opts(store: S, mut opts: TaggedStoreOpts) -> Self {
        if opts.tag_prefix.is_empty() {
            opts.tag_prefix = DEFAULT_TAG_PREFIX.to_owned();
        }
        Self { store, opts }
    }

    #[inline]
    pub fn inner(&self) -> &S {
        &self.store
    }

    #[inline]
    pub fn into_inner(self) -> S {
        self.store
    }

    #[inline]
    pub fn opts(&self) -> &TaggedStoreOpts {
        &self.opts
    }

    #[inline]
    pub fn tag_set(&self) -> TagSet<'_, S> {
        TagSet::new(&self.store, &self.opts.tag_prefix)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(?key, ?value, tags = ?options.tags), skip_all, err)
    )]
    pub fn set<V>(&self, key: &str, value: &V, options: &Options) -> Result<(), Error<S::Error>>
    where
        V: Serialize + CfgDebug,
    {
        self.ensure_ordinary(key)?;
        let bytes = self.wrap(value, options)?;
        self.store.set(key, bytes, options)?;
        Ok(())
    }

    /// A stale or unreadable entry is deleted and reported as a miss.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(?key), skip_all, err)
    )]
    pub fn get<V>(&self, key: &str, options: &Options) -> Result<Option<V>, Error<S::Error>>
    where
        V: DeserializeOwned,
    {
        self.ensure_ordinary(key)?;
        let Some(bytes) = self.store.get(key, options)? else {
            #[cfg(feature = "tracing")]
            tracing::debug!("miss");

            return Ok(None);
        };

        match self.unwrap_fresh(&bytes)? {
            Some(value) => Ok(Some(value)),
            None => {
                self.store.delete(key, options)?;

                #[cfg(feature = "tracing")]
                tracing::debug!("evicted");

                Ok(None)
            }
        }
    }

    /// Stale and unreadable entries are left out of the result but stay in the
    /// store until a single-key read evicts them. Costs two round trips at most:
    /// one for the entries and one for every tag they reference.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(keys = keys.len()), skip_all, err)
    )]
    pub fn get_multi<V, K>(&self, keys: &[K]) -> Result<HashMap<String, V>, Error<S::Error>>
    where
        V: DeserializeOwned,
        K: AsRef<str>,
    {
        let keys = keys.iter().map(AsRef::as_ref).collect::<Vec<_>>();
        for key in &keys {
            self.ensure_ordinary(key)?;
        }
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let entries = self
            .store
            .get_multi(&keys)?
            .into_iter()
            .filter_map(|(key, bytes)| Entry::<V>::decode(&bytes).map(|entry| (key, entry)))
            .collect::<Vec<_>>();

        let fresh = self
            .tag_set()
            .check_all(&entries.iter().map(|(_, entry)| entry).collect::<Vec<_>>())?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "{} of {} entries fresh",
            fresh.iter().filter(|fresh| **fresh).count(),
            keys.len()
        );

        Ok(entries
            .into_iter()
            .zip(fresh)
            .filter_map(|((key, entry), fresh)| fresh.then(|| (key, entry.into_value())))
            .collect())
    }

    /// True only if a `get` right now would hit.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(?key), skip_all, ret, err)
    )]
    pub fn exists(&self, key: &str) -> Result<bool, Error<S::Error>> {
        self.ensure_ordinary(key)?;
        if !self.store.exists(key)? {
            return Ok(false);
        }

        Ok(self.get::<IgnoredAny>(key, &Options::default())?.is_some())
    }

    /// Returns the cached value, or fills the key with `compute`.
    ///
    /// The underlying store's own `fetch` knows nothing about tags, so a value it
    /// serves is still checked. A stale one is deleted and the fetch is retried once.
    /// `compute` runs at most once.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(?key, tags = ?options.tags), skip_all, ret, err)
    )]
    pub fn fetch<V, F>(
        &self,
        key: &str,
        options: &Options,
        compute: F,
    ) -> Result<V, Error<S::Error>>
    where
        V: Serialize + DeserializeOwned + CfgDebug,
        F: FnOnce() -> V,
    {
        self.ensure_ordinary(key)?;
        let mut pending = Some(compute);

        for _ in 0..2 {
            let mut computed = None;
            let bytes = self.store.fetch(key, options, || {
                let (value, bytes) = self.fill(&mut pending, options)?;
                computed = Some(value);
                Ok::<_, Error<S::Error>>(bytes)
            })?;

            if let Some(value) = computed {
                return Ok(value);
            }
            if let Some(value) = self.unwrap_fresh(&bytes)? {
                return Ok(value);
            }

            #[cfg(feature = "tracing")]
            tracing::debug!("store served a stale entry, retrying");

            self.store.delete(key, options)?;
        }

        // an invalidation raced both attempts
        let (value, bytes) = self.fill(&mut pending, options)?;
        self.store.set(key, bytes, options)?;
        Ok(value)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(?key), skip_all, ret, err)
    )]
    pub fn delete(&self, key: &str, options: &Options) -> Result<bool, Error<S::Error>> {
        self.ensure_ordinary(key)?;
        Ok(self.store.delete(key, options)?)
    }

    /// Bumps the version of every named tag.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, err))]
    pub fn delete_tag<I, T>(&self, names: I) -> Result<(), Error<S::Error>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let tag_set = self.tag_set();
        for tag in Tag::build(names) {
            tag_set.expire(&tag)?;
        }
        Ok(())
    }

    #[inline]
    pub fn expire_tag<I, T>(&self, names: I) -> Result<(), Error<S::Error>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.delete_tag(names)
    }

    #[inline]
    pub fn delete_by_tag<I, T>(&self, names: I) -> Result<(), Error<S::Error>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.delete_tag(names)
    }

    #[inline]
    pub fn delete_by_tags<I, T>(&self, names: I) -> Result<(), Error<S::Error>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.delete_tag(names)
    }

    pub fn tag_versions<I, T>(&self, names: I) -> Result<Vec<(String, Option<u64>)>, Error<S::Error>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let tags = Tag::build(names);
        let versions = self.tag_set().versions(&tags)?;

        Ok(tags
            .into_iter()
            .map(|tag| tag.name().to_owned())
            .zip(versions)
            .collect())
    }

    fn ensure_ordinary(&self, key: &str) -> Result<(), Error<S::Error>> {
        if key.starts_with(&self.opts.tag_prefix) {
            return Err(Error::ReservedKey(key.to_owned()));
        }
        Ok(())
    }

    fn wrap<V: Serialize>(&self, value: &V, options: &Options) -> Result<Vec<u8>, Error<S::Error>> {
        let tags = Tag::build(&options.tags);
        let snapshot = self.tag_set().snapshot(&tags)?;

        Entry::new(value, snapshot).encode().map_err(Error::Encode)
    }

    fn fill<V, F>(
        &self,
        pending: &mut Option<F>,
        options: &Options,
    ) -> Result<(V, Vec<u8>), Error<S::Error>>
    where
        V: Serialize,
        F: FnOnce() -> V,
    {
        let Some(compute) = pending.take() else {
            unreachable!("fetch fills a key at most once");
        };

        let value = compute();
        let bytes = self.wrap(&value, options)?;
        Ok((value, bytes))
    }

    fn unwrap_fresh<V: DeserializeOwned>(&self, bytes: &[u8]) -> Result<Option<V>, S::Error> {
        let Some(entry) = Entry::<V>::decode(bytes) else {
            #[cfg(feature = "tracing")]
            tracing::debug!("unreadable entry");

            return Ok(None);
        };

        if !self.tag_set().check(&entry)? {
            #[cfg(feature = "tracing")]
            tracing::debug!("stale entry :: {:?}", entry.tags());

            return Ok(None);
        }

        Ok(Some(entry.into_value()))
    }
}
