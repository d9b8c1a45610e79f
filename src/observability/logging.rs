//! Subscriber setup for hosts that embed the engine.
//!
//! The engine only emits `tracing` events; installing a subscriber is the
//! host's call. [`init_logging`] is the convenience for CI jobs and small
//! binaries: it scopes the requested verbosity to this crate's own targets,
//! keeps everything else at `warn`, and writes to stderr so validation
//! reports printed on stdout stay machine-readable.
//!
//! Two environment variables override the arguments:
//! `SETTINGS_GUARD_LOG_LEVEL` takes a full `EnvFilter` directive and
//! `SETTINGS_GUARD_LOG_FORMAT` takes `human` or `json`.

use std::io::IsTerminal;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;

/// Filter directive override, e.g. `settings_guard::path=trace`.
pub const LOG_LEVEL_ENV: &str = "SETTINGS_GUARD_LOG_LEVEL";

/// Output format override: `human` or `json`.
pub const LOG_FORMAT_ENV: &str = "SETTINGS_GUARD_LOG_FORMAT";

const CRATE_TARGET: &str = "settings_guard";

/// How engine events are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One line per event; colored when stderr is a terminal.
    #[default]
    Human,
    /// Newline-delimited JSON carrying the `run_id` and environment spans,
    /// for log collectors that group a batch run's events.
    Json,
}

/// Unrecognized value for [`LOG_FORMAT_ENV`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log format '{0}' (expected 'human' or 'json')")]
pub struct UnknownLogFormat(pub String);

impl FromStr for LogFormat {
    type Err = UnknownLogFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" | "text" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            _ => Err(UnknownLogFormat(s.to_string())),
        }
    }
}

/// Filter directive for a verbosity level: this crate at the requested
/// level, dependencies at `warn`.
///
/// 0 is `warn`, 1 `info`, 2 `debug`, anything higher `trace`.
#[must_use]
pub fn verbosity_to_directive(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("warn,{CRATE_TARGET}={level}")
}

/// Installs a stderr subscriber unless one is already set.
///
/// Returns `true` if this call installed it. An unparsable
/// [`LOG_FORMAT_ENV`] is ignored in favour of `format`.
pub fn init_logging(format: LogFormat, verbosity: u8) -> bool {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .unwrap_or_else(|_| EnvFilter::new(verbosity_to_directive(verbosity)));
    let format = std::env::var(LOG_FORMAT_ENV)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(format);
    let show_target = verbosity >= 2;

    let installed = match format {
        LogFormat::Human => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none())
            .with_target(show_target)
            .with_writer(std::io::stderr)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(show_target)
            .with_writer(std::io::stderr)
            .try_init(),
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" human ".parse::<LogFormat>(), Ok(LogFormat::Human));
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Human));
        let err = "xml".parse::<LogFormat>().unwrap_err();
        assert!(err.to_string().contains("'xml'"));
    }

    #[test]
    fn verbosity_scopes_to_crate() {
        assert_eq!(verbosity_to_directive(0), "warn,settings_guard=warn");
        assert_eq!(verbosity_to_directive(1), "warn,settings_guard=info");
        assert_eq!(verbosity_to_directive(2), "warn,settings_guard=debug");
        assert_eq!(verbosity_to_directive(9), "warn,settings_guard=trace");
    }

    #[test]
    fn directives_parse_as_filters() {
        for verbosity in 0..4 {
            assert!(EnvFilter::try_new(verbosity_to_directive(verbosity)).is_ok());
        }
    }

    #[test]
    fn second_install_reports_false() {
        init_logging(LogFormat::Human, 0);
        assert!(!init_logging(LogFormat::Json, 3));
    }
}
