mod cfg_debug;
mod entry;
mod error;
mod store;
mod tag;
mod tag_set;
mod tagged_store;

pub use cfg_debug::CfgDebug;
pub use entry::Entry;
pub use error::Error;
pub use store::{Options, Store};
pub use tag::{Tag, decode_version, encode_version};
pub use tag_set::TagSet;
pub use tagged_store::{DEFAULT_TAG_PREFIX, TaggedStore, TaggedStoreOpts};
