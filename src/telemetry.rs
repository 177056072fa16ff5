//! Logging setup.
//!
//! Filter comes from `WARDEN_LOG` (falling back to `RUST_LOG`, then `warn`).
//! `WARDEN_LOG_FORMAT=json` switches to one JSON object per line. Logs go to
//! stderr so stdout stays clean for `--format json`.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

pub const LOG_ENV: &str = "WARDEN_LOG";
pub const LOG_FORMAT_ENV: &str = "WARDEN_LOG_FORMAT";

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

fn json_requested() -> bool {
    std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"))
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init() {
    let registry = tracing_subscriber::registry().with(filter());

    let result = if json_requested() {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("warning: logging already initialized: {e}");
    }
}
