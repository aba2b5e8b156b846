//! Log level selection and tracing subscriber setup
//!
//! Levels are cumulative: Debug includes Verbose, Trace includes Debug.
//! `RUST_LOG` overrides the level chosen by flags.

use std::fmt;

use tracing_subscriber::{fmt as tracing_fmt, prelude::*, EnvFilter};

/// Verbosity level for CLI output
///
/// Levels are ordered: Normal < Verbose < Debug < Trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// Warnings and errors only (default)
    #[default]
    Normal = 0,
    /// Progress of each resolution step
    Verbose = 1,
    /// Filters, DNs and LDAP result codes
    Debug = 2,
    /// Everything, including the LDAP client
    Trace = 3,
}

impl LogLevel {
    /// Create LogLevel from CLI flags
    ///
    /// Order of precedence: trace > debug > verbose > normal
    pub fn from_flags(verbose: bool, debug: bool, trace: bool) -> Self {
        if trace {
            Self::Trace
        } else if debug {
            Self::Debug
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    /// `EnvFilter` directive for this level.
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Self::Normal => "warn",
            Self::Verbose => "warn,xavyo_exrbac=info,xavyo_exchange_rbac=info,xavyo_directory=info",
            Self::Debug => "info,xavyo_exrbac=debug,xavyo_exchange_rbac=debug,xavyo_directory=debug",
            Self::Trace => "trace",
        }
    }

    /// Get the display name for this level
    pub fn name(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Verbose => "VERBOSE",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Install the global subscriber. Logs go to stderr so stdout carries only
/// the command's own output.
pub fn init_logging(level: LogLevel, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.filter_directive()))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(filter);

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = if json {
        registry
            .with(
                tracing_fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .flatten_event(true),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
}
