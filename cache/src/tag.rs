use crate::{Options, Store};

/// A named invalidation unit.
///
/// The version lives in the store under [`Tag::key`]; a `Tag` is only an accessor
/// over that slot and never caches it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    name: String,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// One tag per distinct non-empty name, in first-seen order.
    pub fn build<I, T>(names: I) -> Vec<Tag>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut tags: Vec<Tag> = Vec::new();
        for name in names {
            let name = name.as_ref();
            if name.is_empty() || tags.iter().any(|tag| tag.name == name) {
                continue;
            }
            tags.push(Tag::new(name));
        }
        tags
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn key(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.name)
    }

    /// `None` when the slot was never assigned (or holds something unreadable).
    pub fn current_version<S: Store>(
        &self,
        store: &S,
        prefix: &str,
    ) -> Result<Option<u64>, S::Error> {
        Ok(store
            .get(&self.key(prefix), &Options::default())?
            .as_deref()
            .and_then(decode_version))
    }

    pub fn increment<S: Store>(&self, store: &S, prefix: &str) -> Result<u64, S::Error> {
        store.increment(&self.key(prefix))
    }
}

/// Tag versions are stored as decimal ascii, the same layout `INCR` style counters use.
pub fn decode_version(bytes: &[u8]) -> Option<u64> {
    std::str::from_utf8(bytes).ok()?.trim().parse().ok()
}

pub fn encode_version(version: u64) -> Vec<u8> {
    version.to_string().into_bytes()
}
