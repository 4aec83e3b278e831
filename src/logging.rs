//! Diagnostics through `tracing`.
//!
//! The terminal belongs to the UI, so events go to a log file and never to
//! stdout or stderr. `INTERVIEW_OS_LOG` takes an `EnvFilter` directive and
//! overrides the configured level.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config;

pub const LOG_ENV: &str = "INTERVIEW_OS_LOG";

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub log_file: Option<PathBuf>,
}

impl LogConfig {
    /// Unknown level names fall back to `info`.
    pub fn from_config(cfg: &config::LogConfig) -> Self {
        let level = Level::from_str(cfg.level.trim()).unwrap_or(Level::INFO);
        Self {
            level,
            log_file: cfg.file.clone().or_else(default_log_path),
        }
    }
}

pub fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("interview-os").join("interview-os.log"))
}

/// Installs the global subscriber. Without a usable log path, events are
/// discarded. Installing twice is a no-op.
pub fn init(config: &LogConfig) -> Result<()> {
    let filter = build_env_filter(config.level);
    let Some(path) = config.log_file.as_deref() else {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(io::sink))
            .try_init();
        return Ok(());
    };

    let writer = SharedFileWriter::new(open_log_file(path)?);
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();
    Ok(())
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create log directory {}", parent.display()))?;
        }
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))
}

#[derive(Clone)]
struct SharedFileWriter {
    file: Arc<Mutex<File>>,
}

impl SharedFileWriter {
    fn new(file: File) -> Self {
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }
}

struct SharedFileGuard {
    file: Arc<Mutex<File>>,
}

impl Write for SharedFileGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for SharedFileWriter {
    type Writer = SharedFileGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedFileGuard {
            file: Arc::clone(&self.file),
        }
    }
}

fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        let level = level.as_str().to_lowercase();
        // Dependencies stay at warn.
        EnvFilter::new(format!("warn,interview_os={level}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn level_names_parse_with_info_fallback() {
        let mut cfg = config::LogConfig::default();
        cfg.level = "debug".into();
        assert_eq!(LogConfig::from_config(&cfg).level, Level::DEBUG);
        cfg.level = "loud".into();
        assert_eq!(LogConfig::from_config(&cfg).level, Level::INFO);
    }

    #[test]
    fn explicit_file_wins_over_default() {
        let mut cfg = config::LogConfig::default();
        cfg.file = Some(PathBuf::from("/tmp/custom.log"));
        assert_eq!(
            LogConfig::from_config(&cfg).log_file.as_deref(),
            Some(Path::new("/tmp/custom.log"))
        );
    }

    #[test]
    fn log_file_and_parents_are_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("app.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn shared_writer_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let writer = SharedFileWriter::new(open_log_file(&path).unwrap());
        writer.make_writer().write_all(b"one\n").unwrap();
        writer.make_writer().write_all(b"two\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }
}
