// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Logging initialization for the matching service
//!
//! Configuration via environment variables:
//!
//! - `RUST_LOG`: level filter (default `info`), per-module filters
//!   supported (`RUST_LOG=quasar_matching=debug`)
//! - `LOG_DIR`: root directory for log files (default `./logs`); files
//!   land in `{LOG_DIR}/matching/matching.{date}.log`, rotated daily
//! - `LOG_TO_CONSOLE`: `true`/`1`/`yes` mirrors logs to stderr with
//!   ANSI colors

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use tracing::info;
use tracing_appender::{
    non_blocking,
    rolling::{self, Rotation},
};
use tracing_subscriber::{
    EnvFilter, fmt, layer::SubscriberExt, registry::Registry, util::SubscriberInitExt,
};

use crate::config::{DEFAULT_LOG_LEVEL, LOG_COMPONENT_NAME};
use crate::otel;

// Keeps the non-blocking writer alive for the process lifetime
static LOG_GUARD: OnceLock<non_blocking::WorkerGuard> = OnceLock::new();

fn setup_file_logging(log_dir: &Path) -> Result<non_blocking::NonBlocking> {
    let file_appender = rolling::RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_COMPONENT_NAME.to_string())
        .filename_suffix("log")
        .build(log_dir)
        .with_context(|| {
            format!(
                "Failed to create rolling file appender in {}",
                log_dir.display()
            )
        })?;

    let (file_writer, guard) = non_blocking(file_appender);
    LOG_GUARD.set(guard).ok();

    Ok(file_writer)
}

/// Initialize logging with daily-rolling file output, optional console
/// output and an OpenTelemetry layer.
pub fn init_logging() -> Result<()> {
    dotenv::dotenv().ok();

    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
    let log_root = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

    let log_dir = Path::new(&log_root).join(LOG_COMPONENT_NAME);
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let file_writer = setup_file_logging(&log_dir)?;

    let log_to_console = env::var("LOG_TO_CONSOLE")
        .map(|v| v == "true" || v == "1" || v == "yes")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    let otel_layer = otel::init_tracer()?
        .map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_thread_ids(true)
        .with_target(true)
        .with_ansi(false);

    let console_layer = log_to_console.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_thread_ids(true)
            .with_target(true)
            .with_ansi(true)
    });

    Registry::default()
        .with(filter)
        .with(otel_layer)
        .with(file_layer)
        .with(console_layer)
        .init();

    info!(target: "server", "Log level: {}", log_level);
    info!(target: "server", "Log directory: {}", log_dir.display());
    if log_to_console {
        info!(target: "server", "Console output: enabled");
    }

    Ok(())
}
