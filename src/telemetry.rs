//! Logging initialization.
//!
//! Controlled by `OOXML_LOG` (an `EnvFilter` directive such as `debug` or
//! `ooxml=trace`). Without it the level follows `-v`: warnings only by
//! default, `info` with `-v`, `debug` with `-vv`. Output goes to stderr so
//! it never mixes with command results on stdout.
//!
//! `OOXML_LOG_FORMAT=json` switches to one JSON object per event.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Environment variable holding the filter directive.
pub const LOG_ENV: &str = "OOXML_LOG";
/// Environment variable selecting the output format.
pub const LOG_FORMAT_ENV: &str = "OOXML_LOG_FORMAT";

/// Install the global subscriber. Calling it twice is harmless.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .without_time()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
    if let Err(e) = result {
        eprintln!("warning: logging already initialized: {e}");
    }
}

const fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}
