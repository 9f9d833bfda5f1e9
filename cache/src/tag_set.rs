use std::collections::HashMap;

use crate::{Entry, Store, Tag, decode_version};

/// Version bookkeeping for a group of tags against one store.
///
/// Every comparison is positional: the n-th live version is matched against the
/// n-th saved version of the same tag, never checked for mere membership.
pub struct TagSet<'a, S> {
    store: &'a S,
    prefix: &'a str,
}

impl<'a, S: Store> TagSet<'a, S> {
    pub fn new(store: &'a S, prefix: &'a str) -> Self {
        Self { store, prefix }
    }

    /// Live versions, in the order of `tags`, with a single batched read.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(?tags), skip_all, err)
    )]
    pub fn versions(&self, tags: &[Tag]) -> Result<Vec<Option<u64>>, S::Error> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }

        let keys = tags
            .iter()
            .map(|tag| tag.key(self.prefix))
            .collect::<Vec<_>>();
        let refs = keys.iter().map(String::as_str).collect::<Vec<_>>();
        let stored = self.store.get_multi(&refs)?;

        Ok(keys
            .iter()
            .map(|key| stored.get(key).and_then(|bytes| decode_version(bytes)))
            .collect())
    }

    /// The versions a new entry should be written against. Tags that were never
    /// assigned get materialized at their first version so the snapshot is always
    /// comparable.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(?tags), skip_all, err)
    )]
    pub fn snapshot(&self, tags: &[Tag]) -> Result<Vec<(String, u64)>, S::Error> {
        let current = self.versions(tags)?;

        tags.iter()
            .zip(current)
            .map(|(tag, version)| {
                let version = match version {
                    Some(version) => version,
                    None => {
                        #[cfg(feature = "tracing")]
                        tracing::debug!("materializing tag '{}'", tag.name());

                        self.expire(tag)?
                    }
                };
                Ok((tag.name().to_owned(), version))
            })
            .collect()
    }

    /// Whether every tag the entry was written against still has the same version.
    pub fn check<V>(&self, entry: &Entry<V>) -> Result<bool, S::Error> {
        if entry.tags().is_empty() {
            return Ok(true);
        }

        let tags = entry.tags().keys().map(Tag::new).collect::<Vec<_>>();
        let current = self.versions(&tags)?;
        let saved = entry.tags().values().copied().map(Some);

        Ok(current.into_iter().eq(saved))
    }

    /// Checks a batch of entries with one read covering every tag any of them uses.
    pub fn check_all<V>(&self, entries: &[&Entry<V>]) -> Result<Vec<bool>, S::Error> {
        let tags = Tag::build(entries.iter().flat_map(|entry| entry.tags().keys()));
        let live = tags
            .iter()
            .map(Tag::name)
            .zip(self.versions(&tags)?)
            .collect::<HashMap<_, _>>();

        Ok(entries
            .iter()
            .map(|entry| {
                entry
                    .tags()
                    .iter()
                    .all(|(name, saved)| live.get(name.as_str()) == Some(&Some(*saved)))
            })
            .collect())
    }

    /// Invalidates every entry that snapshotted `tag`. Existing entries are not touched.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(tag = tag.name()), skip_all, ret, err)
    )]
    pub fn expire(&self, tag: &Tag) -> Result<u64, S::Error> {
        tag.increment(self.store, self.prefix)
    }
}
