//! Subscriber setup for the bench binary.

use std::env;
use std::fs::{File, OpenOptions};
use std::io;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error>;

fn open_log_file(path: &str) -> Result<File, BoxError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| format!("Failed to open log file {path}: {err}").into())
}

fn build_filter(level: &str) -> Result<EnvFilter, BoxError> {
    if level.eq_ignore_ascii_case("off") {
        return Ok(EnvFilter::default().add_directive(LevelFilter::OFF.into()));
    }
    EnvFilter::try_new(level).map_err(|err| format!("Invalid log filter '{level}': {err}").into())
}

/// Install the global subscriber.
///
/// `level` falls back to `FRAGTREE_TRACE`, then `off`. `FRAGTREE_LOG_FORMAT`
/// selects `pretty` (default) or `json`; `FRAGTREE_LOG_FILE` mirrors events
/// into a file. Returns false if a subscriber is already installed.
pub fn init_logging(level: Option<&str>) -> Result<bool, BoxError> {
    if tracing::dispatcher::has_been_set() {
        return Ok(false);
    }

    let level = level
        .map(str::to_string)
        .or_else(|| env::var("FRAGTREE_TRACE").ok())
        .unwrap_or_else(|| "off".to_string());
    let filter = build_filter(&level)?;

    let format = env::var("FRAGTREE_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let use_json = format.eq_ignore_ascii_case("json");
    if !use_json && !format.eq_ignore_ascii_case("pretty") {
        return Err("Invalid FRAGTREE_LOG_FORMAT (expected 'json' or 'pretty')".into());
    }
    let log_file = env::var("FRAGTREE_LOG_FILE").ok();

    let init_err = |err: tracing_subscriber::util::TryInitError| -> BoxError {
        format!("Failed to initialize logging: {err}").into()
    };

    if use_json {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .json();
        let base = tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer);
        match log_file {
            Some(path) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(open_log_file(&path)?)
                    .with_ansi(false)
                    .json();
                base.with(file_layer).try_init().map_err(init_err)?;
            }
            None => base.try_init().map_err(init_err)?,
        }
    } else {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .pretty();
        let base = tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer);
        match log_file {
            Some(path) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(open_log_file(&path)?)
                    .with_ansi(false)
                    .pretty();
                base.with(file_layer).try_init().map_err(init_err)?;
            }
            None => base.try_init().map_err(init_err)?,
        }
    }

    Ok(true)
}
