//! Groupy - keyword rules that cluster a chat sidebar into collapsible groups.
//!
//! The binary is a thin CLI over `groupy_lib`. Logs go to stderr so that
//! `--json` output on stdout stays machine-readable.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Default log filter when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "groupy=info,groupy_lib=info";

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    init_tracing();

    if let Err(err) = groupy_lib::cli::run() {
        eprintln!("groupy: {err}");
        std::process::exit(1);
    }
}
