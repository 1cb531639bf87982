// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use tracing_chrome::{ChromeLayerBuilder, FlushGuard};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const CHROME_ENV: &str = "LVIS_TRACE_CHROME";

static INITIALISED: OnceLock<()> = OnceLock::new();
static CHROME_GUARD: Mutex<Option<FlushGuard>> = Mutex::new(None);

/// Installs the global subscriber used by the trial loop and the CLI.
///
/// Events go to stderr so command output on stdout stays machine readable.
/// `RUST_LOG` drives the filter (default `info`). When `LVIS_TRACE_CHROME`
/// names a file, spans are additionally written there as a Chrome trace.
pub fn init_tracing() -> Result<(), InitError> {
    INITIALISED
        .set(())
        .map_err(|_| InitError::AlreadyInitialised)?;

    let chrome = chrome_trace_path()?.map(|path| {
        let (layer, guard) = ChromeLayerBuilder::new()
            .file(path)
            .include_args(true)
            .build();
        if let Ok(mut slot) = CHROME_GUARD.lock() {
            *slot = Some(guard);
        }
        layer
    });

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal());

    Registry::default()
        .with(filter)
        .with(stderr)
        .with(chrome)
        .init();
    Ok(())
}

/// Flushes and closes the Chrome trace file, if one is open.
pub fn flush_chrome_trace() {
    if let Ok(mut slot) = CHROME_GUARD.lock() {
        slot.take();
    }
}

fn chrome_trace_path() -> Result<Option<PathBuf>, InitError> {
    match std::env::var(CHROME_ENV) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => Ok(Some(PathBuf::from(raw.trim()))),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(InitError::Env(err)),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("tracing has already been initialised")]
    AlreadyInitialised,
    #[error("failed to read LVIS_TRACE_CHROME: {0}")]
    Env(std::env::VarError),
}
