//! Structured logging for bi-core.
//!
//! Sources emit `tracing` events with stable `event` and `stage` fields (see
//! [`events`]). The library never installs a subscriber on its own; an
//! embedding application calls [`init_logging`] once, or installs its own.
//!
//! ```ignore
//! use bi_core::logging::{init_logging, LogSettings};
//!
//! init_logging(&LogSettings::from_env());
//! ```

pub mod config;
pub mod events;

pub use config::{LogOutput, LogSettings};
pub use events::{event_names, Stage};

use std::io::IsTerminal;
use std::sync::Once;

use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static INIT_TEST_LOGGING: Once = Once::new();

/// Install the global stderr subscriber. Returns `false` if one was already
/// installed.
pub fn init_logging(settings: &LogSettings) -> bool {
    let registry = tracing_subscriber::registry().with(settings.env_filter());

    match settings.output {
        LogOutput::Human => {
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal());
            if settings.timestamps {
                registry.with(layer).try_init().is_ok()
            } else {
                registry.with(layer.without_time()).try_init().is_ok()
            }
        }
        LogOutput::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .is_ok(),
    }
}

/// Route events through the test harness's captured output, honouring
/// `BI_LOG`/`RUST_LOG`. Only the first call installs anything.
pub fn init_test_logging() {
    INIT_TEST_LOGGING.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(LogSettings::from_env().env_filter())
            .with(
                fmt::layer()
                    .with_test_writer()
                    .with_ansi(false)
                    .with_thread_ids(true),
            )
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_refused() {
        init_test_logging();
        let settings = LogSettings::default().with_output(LogOutput::Json);
        assert!(!init_logging(&settings));
    }
}
