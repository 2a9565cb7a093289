use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_ENV: &str = "WHISPER_ADMIN_LOG";
const DEFAULT_LOG_FILTER: &str = "whisper_admin=info";
const LOG_FILE_NAME: &str = "whisper-admin.log";

/// File logging always; stderr warnings only outside the terminal editor,
/// where writing to stderr would corrupt the screen.
pub fn init(log_dir: &Path, tui_mode: bool) -> Result<()> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log dir: {}", log_dir.display()))?;
    let path = log_dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file: {}", path.display()))?;

    let file_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let console_filter = if tui_mode { "off" } else { "warn" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::new(console_filter)),
        )
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(())
}
