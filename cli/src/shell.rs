use std::{cell::Cell, time::Duration};

use cache::{Options, TaggedStore};
use clap::{Parser, Subcommand};
use dashcache::DashStore;

#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
pub struct Line {
    #[command(subcommand)]
    pub cmd: ShellCommand,
}

#[derive(Debug, Subcommand)]
pub enum ShellCommand {
    /// Store VALUE under KEY.
    Set {
        key: String,
        value: String,

        /// Tags the entry depends on. May be repeated.
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Seconds until the store drops the entry.
        #[arg(long)]
        ttl: Option<u64>,
    },

    /// Read KEY. Stale entries are evicted and reported as `(nil)`.
    Get { key: String },

    /// Read several keys in one batch. Stale entries are skipped, not evicted.
    Mget {
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Whether a read of KEY would hit.
    Exists { key: String },

    /// Read KEY, storing VALUE first if there is nothing fresh.
    Fetch {
        key: String,
        value: String,

        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Remove KEY.
    Del { key: String },

    /// Invalidate every entry depending on any of the tags.
    #[command(visible_aliases = ["delete-tag", "delete-by-tags"])]
    ExpireTag {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Show the current version of each tag.
    Tags {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// List every key in the store, tag counters included.
    Keys,

    #[command(alias = "exit")]
    Quit,
}

pub enum Flow {
    Continue(String),
    Quit,
}

const NIL: &str = "(nil)";

pub fn run(store: &TaggedStore<DashStore>, cmd: ShellCommand) -> anyhow::Result<Flow> {
    let out = match cmd {
        ShellCommand::Set {
            key,
            value,
            tags,
            ttl,
        } => {
            let mut options = Options::new().tags(tags);
            if let Some(secs) = ttl {
                options = options.expires_in(Duration::from_secs(secs));
            }
            store.set(&key, &value, &options)?;
            "OK".to_owned()
        }

        ShellCommand::Get { key } => store
            .get::<String>(&key, &Options::default())?
            .unwrap_or_else(|| NIL.to_owned()),

        ShellCommand::Mget { keys } => {
            let hits = store.get_multi::<String, _>(&keys)?;
            keys.iter()
                .map(|key| {
                    format!(
                        "{}: {}",
                        key,
                        hits.get(key).map(String::as_str).unwrap_or(NIL)
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        }

        ShellCommand::Exists { key } => store.exists(&key)?.to_string(),

        ShellCommand::Fetch { key, value, tags } => {
            let computed = Cell::new(false);
            let value = store.fetch(&key, &Options::new().tags(tags), || {
                computed.set(true);
                value
            })?;

            if computed.get() {
                format!("{} (computed)", value)
            } else {
                value
            }
        }

        ShellCommand::Del { key } => {
            if store.delete(&key, &Options::default())? {
                "deleted".to_owned()
            } else {
                NIL.to_owned()
            }
        }

        ShellCommand::ExpireTag { names } => {
            store.delete_tag(&names)?;
            "OK".to_owned()
        }

        ShellCommand::Tags { names } => store
            .tag_versions(&names)?
            .into_iter()
            .map(|(name, version)| match version {
                Some(version) => format!("{}: {}", name, version),
                None => format!("{}: {}", name, NIL),
            })
            .collect::<Vec<_>>()
            .join("\n"),

        ShellCommand::Keys => {
            let mut keys = store.inner().keys();
            keys.sort();
            keys.join("\n")
        }

        ShellCommand::Quit => return Ok(Flow::Quit),
    };

    Ok(Flow::Continue(out))
}
