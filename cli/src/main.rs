mod shell;

use std::io::{self, BufRead, Write};

use cache::{TaggedStore, TaggedStoreOpts};
use clap::Parser;
use dashcache::DashStore;
use tracing_subscriber::EnvFilter;

use shell::{Flow, Line};

/// Interactive shell over an in-memory cache with tag-based invalidation.
#[derive(Debug, Parser)]
#[command(name = "tagcache")]
struct Args {
    /// Namespace for tag version keys. Ordinary keys may not start with it.
    /// Example: `tag:`
    #[arg(long, env = "TAGCACHE_TAG_PREFIX", default_value = cache::DEFAULT_TAG_PREFIX)]
    tag_prefix: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let store = TaggedStore::with_opts(DashStore::new(), TaggedStoreOpts {
        tag_prefix: args.tag_prefix,
    });
    tracing::info!("tag versions live under '{}'", store.opts().tag_prefix);

    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout();
    let mut line = String::new();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }

        let words = line.split_whitespace().collect::<Vec<_>>();
        if words.is_empty() {
            continue;
        }

        let cmd = match Line::try_parse_from(words) {
            Ok(parsed) => parsed.cmd,
            Err(err) => {
                err.print()?;
                continue;
            }
        };

        match shell::run(&store, cmd) {
            Ok(Flow::Continue(out)) => writeln!(stdout, "{}", out)?,
            Ok(Flow::Quit) => break,
            Err(err) => writeln!(stdout, "error: {:#}", err)?,
        }
    }

    Ok(())
}
