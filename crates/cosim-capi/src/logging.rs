//! Console logging for C hosts.
//!
//! Nothing is installed until [`setup_simple_console_logging`] is called;
//! a host with its own `tracing` subscriber simply never calls it.  The
//! output level may be set before or after setup.

use std::sync::LazyLock;

use parking_lot::Mutex;
use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Registry, fmt, reload};

use cosim_core::{CosimError, CosimResult};

use crate::types::CosimLogSeverity;

/// Overrides the level with a full filter directive, e.g. `cosim_engine=debug`.
pub const LOG_ENV: &str = "COSIM_LOG";

struct Logging {
    level:  LevelFilter,
    handle: Option<reload::Handle<EnvFilter, Registry>>,
}

static LOGGING: LazyLock<Mutex<Logging>> =
    LazyLock::new(|| Mutex::new(Logging { level: LevelFilter::WARN, handle: None }));

pub fn level_filter(severity: CosimLogSeverity) -> LevelFilter {
    LevelFilter::from_level(match severity {
        CosimLogSeverity::Trace   => Level::TRACE,
        CosimLogSeverity::Debug   => Level::DEBUG,
        CosimLogSeverity::Info    => Level::INFO,
        CosimLogSeverity::Warning => Level::WARN,
        CosimLogSeverity::Error | CosimLogSeverity::Fatal => Level::ERROR,
    })
}

fn filter_for(level: LevelFilter) -> EnvFilter {
    EnvFilter::default().add_directive(level.into())
}

/// Install a stderr subscriber.  Idempotent.
pub fn setup_simple_console_logging() -> CosimResult<()> {
    let mut logging = LOGGING.lock();
    if logging.handle.is_some() {
        return Ok(());
    }
    let initial = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| filter_for(logging.level));
    let (filter, handle) = reload::Layer::new(initial);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init()
        .map_err(|e| CosimError::Unspecified(format!("cannot install console logging: {e}")))?;
    logging.handle = Some(handle);
    Ok(())
}

/// Change the output level, now if logging is set up, otherwise at setup.
pub fn set_output_level(severity: CosimLogSeverity) -> CosimResult<()> {
    let mut logging = LOGGING.lock();
    logging.level = level_filter(severity);
    if let Some(handle) = &logging.handle {
        handle
            .reload(filter_for(logging.level))
            .map_err(|e| CosimError::Unspecified(format!("cannot change the log level: {e}")))?;
    }
    Ok(())
}

pub fn output_level() -> LevelFilter {
    LOGGING.lock().level
}
