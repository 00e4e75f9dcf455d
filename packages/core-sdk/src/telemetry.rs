use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Result;
use once_cell::sync::Lazy;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::config::GeneratorConfig;

const LOG_FILE_NAME: &str = "gameforge.log";

#[derive(Debug)]
struct TelemetryState {
    enabled: bool,
    log_dir: PathBuf,
}

static TELEMETRY: Lazy<std::sync::RwLock<TelemetryState>> = Lazy::new(|| {
    std::sync::RwLock::new(TelemetryState {
        enabled: false,
        log_dir: PathBuf::from("logs"),
    })
});

/**
 * \brief 按运行配置设置遥测开关与日志目录。
 */
pub fn configure(config: &GeneratorConfig) {
    if let Ok(mut guard) = TELEMETRY.write() {
        guard.enabled = config.telemetry_enabled;
        guard.log_dir = config.log_dir.clone();
    }
}

/**
 * \brief 记录常规事件。
 */
pub fn log_event(category: &str, message: &str) {
    record("INFO", category, message);
}

/**
 * \brief 记录错误事件。
 */
pub fn log_error(category: &str, message: &str) {
    record("ERROR", category, message);
}

fn record(level: &str, category: &str, message: &str) {
    let log_dir = match TELEMETRY.read() {
        Ok(g) if g.enabled => g.log_dir.clone(),
        _ => return,
    };
    if let Err(err) = write_line(&log_dir, level, category, message) {
        eprintln!("telemetry write failed: {}", err);
    }
}

fn format_line(level: &str, category: &str, message: &str) -> Result<String> {
    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339)?;
    Ok(format!("{} [{}] {} - {}", timestamp, level, category, message))
}

fn write_line(log_dir: &Path, level: &str, category: &str, message: &str) -> Result<()> {
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)?;
    }
    let line = format_line(level, category, message)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(LOG_FILE_NAME))?;
    writeln!(file, "{}", line)?;
    Ok(())
}
