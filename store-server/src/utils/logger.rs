//! Logging Infrastructure
//!
//! Structured logging setup for development and production:
//! - Console output (pretty in development, JSON in production)
//! - Optional daily rotating application log files, deleted after 14 days

use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_RETENTION_DAYS: i64 = 14;

/// Clean up application log files older than the retention window.
pub fn cleanup_old_logs(log_dir: &Path) -> anyhow::Result<()> {
    use chrono::{Local, TimeZone};

    let cutoff = Local::now() - chrono::Duration::days(LOG_RETENTION_DAYS);

    let app_log_dir = log_dir.join("app");
    if app_log_dir.exists() {
        for entry in fs::read_dir(app_log_dir)? {
            let entry = entry?;
            let path = entry.path();

            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            // Match app.YYYY-MM-DD files produced by the daily appender
            let Some(date_part) = name.strip_prefix("app.") else {
                continue;
            };
            let Ok(naive_date) = chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d") else {
                continue;
            };
            if let Some(local_datetime) = Local
                .from_local_datetime(&naive_date.and_hms_opt(0, 0, 0).unwrap())
                .single()
                && local_datetime < cutoff
            {
                fs::remove_file(&path)?;
                tracing::info!(file = %name, "Deleted old log file");
            }
        }
    }

    Ok(())
}

/// Initialize the logging system.
///
/// # Arguments
/// * `level` - default log level when `RUST_LOG` is unset (e.g. "info")
/// * `json_format` - JSON output (production) or pretty output (development)
/// * `log_dir` - optional directory for daily rotating file logs
pub fn init_logger_with_file(
    level: &str,
    json_format: bool,
    log_dir: Option<&str>,
) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(env_filter);

    let file_layer = match log_dir {
        Some(dir) => {
            let log_dir = Path::new(dir);
            let app_log_dir = log_dir.join("app");
            fs::create_dir_all(&app_log_dir)?;

            let app_log = RollingFileAppender::new(Rotation::DAILY, app_log_dir, "app");
            let layer = fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(app_log))
                .boxed();

            tokio::spawn(periodic_cleanup(log_dir.to_path_buf()));
            Some(layer)
        }
        None => None,
    };

    let registry = registry.with(file_layer);

    if json_format {
        let console_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_file(true)
            .with_line_number(true);
        registry.with(console_layer).init();
    } else {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true);
        registry.with(console_layer).init();
    }

    Ok(())
}

/// Periodic cleanup task - runs hourly to enforce log retention
async fn periodic_cleanup(log_dir: PathBuf) {
    use tokio::time::{Duration, sleep};

    loop {
        sleep(Duration::from_secs(3600)).await;

        if let Err(e) = cleanup_old_logs(&log_dir) {
            tracing::error!(error = %e, "Failed to cleanup old logs");
        }
    }
}

/// Initialize the logging system (console only)
pub fn init_logger(level: &str, json_format: bool) -> anyhow::Result<()> {
    init_logger_with_file(level, json_format, None)
}
