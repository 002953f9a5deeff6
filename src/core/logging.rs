//! Structured logging
//!
//! Sets up the global `tracing` subscriber from [`LoggingConfig`]: JSON or
//! text output, to stdout or a size-rotated file, through a non-blocking
//! writer.

use crate::core::config::LoggingConfig;
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Keeps the background log writer alive; drop it only at shutdown
pub struct Logger {
    _guard: WorkerGuard,
}

impl Logger {
    /// Install the global subscriber
    ///
    /// `RUST_LOG` takes precedence over the configured level when set.
    pub fn init(config: &LoggingConfig) -> Result<Self> {
        let level = parse_log_level(&config.level)?;

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.as_str()));

        let (writer, guard) = match config.output.as_str() {
            "stdout" => tracing_appender::non_blocking(io::stdout()),
            "file" => {
                let log_file = config.log_file.as_ref()
                    .context("log_file must be specified when output is 'file'")?;

                if let Some(parent) = log_file.parent() {
                    std::fs::create_dir_all(parent)
                        .context("Failed to create log directory")?;
                }

                let appender = RollingFileAppender::for_file(
                    log_file,
                    config.max_file_size,
                    config.max_backups,
                )?;
                tracing_appender::non_blocking(appender)
            }
            other => anyhow::bail!("Invalid output configuration: {}", other),
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(format_layer(&config.format, writer)?)
            .try_init()
            .context("Failed to initialize tracing subscriber")?;

        tracing::info!(
            level = %config.level,
            format = %config.format,
            output = %config.output,
            "Logging system initialized"
        );

        Ok(Logger { _guard: guard })
    }
}

fn format_layer<S>(
    format: &str,
    writer: NonBlocking,
) -> Result<Box<dyn Layer<S> + Send + Sync>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = match format {
        "json" => fmt::layer()
            .json()
            .with_writer(writer)
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        "text" => fmt::layer()
            .with_writer(writer)
            .with_span_events(FmtSpan::CLOSE)
            .with_thread_ids(true)
            .with_target(true)
            .boxed(),
        other => anyhow::bail!("Invalid format configuration: {}", other),
    };
    Ok(layer)
}

/// Parse log level string to tracing Level
fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!("Invalid log level: {}", level),
    }
}

/// File writer that rotates to `<name>.1 .. <name>.N` once `max_file_size` is reached
pub struct RollingFileAppender {
    directory: PathBuf,
    filename: String,
    max_file_size: usize,
    max_backups: usize,
    current_file: Mutex<Option<File>>,
    current_size: AtomicUsize,
}

impl RollingFileAppender {
    pub fn new(directory: PathBuf, filename: String, max_file_size: usize, max_backups: usize) -> Self {
        Self {
            directory,
            filename,
            max_file_size,
            max_backups,
            current_file: Mutex::new(None),
            current_size: AtomicUsize::new(0),
        }
    }

    fn for_file(log_file: &Path, max_file_size: usize, max_backups: usize) -> Result<Self> {
        let directory = log_file.parent()
            .context("Log file must have a parent directory")?;

        let filename = log_file.file_name()
            .context("Log file must have a filename")?
            .to_str()
            .context("Log filename must be valid UTF-8")?;

        Ok(Self::new(directory.to_path_buf(), filename.to_string(), max_file_size, max_backups))
    }

    fn current_path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.directory.join(format!("{}.{}", self.filename, index))
    }

    fn lock_file(&self) -> io::Result<MutexGuard<'_, Option<File>>> {
        self.current_file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))
    }

    fn rotate(&self) -> io::Result<()> {
        // Close the current handle before renaming
        *self.lock_file()? = None;

        for i in (1..self.max_backups).rev() {
            let from = self.backup_path(i);
            let to = self.backup_path(i + 1);
            if from.exists() {
                if to.exists() {
                    std::fs::remove_file(&to)?;
                }
                std::fs::rename(&from, &to)?;
            }
        }

        let current = self.current_path();
        if current.exists() {
            let backup = self.backup_path(1);
            if backup.exists() {
                std::fs::remove_file(&backup)?;
            }
            std::fs::rename(&current, &backup)?;
        }

        self.current_size.store(0, Ordering::SeqCst);
        Ok(())
    }

    fn open_file(&self) -> io::Result<MutexGuard<'_, Option<File>>> {
        let mut guard = self.lock_file()?;

        if guard.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.current_path())?;
            self.current_size.store(file.metadata()?.len() as usize, Ordering::SeqCst);
            *guard = Some(file);
        }

        Ok(guard)
    }
}

impl Write for RollingFileAppender {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let current_size = self.current_size.load(Ordering::SeqCst);
        if current_size > 0 && current_size + buf.len() > self.max_file_size {
            self.rotate()?;
        }

        let mut guard = self.open_file()?;
        let written = match guard.as_mut() {
            Some(file) => file.write(buf)?,
            None => return Err(io::Error::new(io::ErrorKind::Other, "log file not open")),
        };

        self.current_size.fetch_add(written, Ordering::SeqCst);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = self.lock_file()?.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert!(matches!(parse_log_level("debug"), Ok(Level::DEBUG)));
        assert!(matches!(parse_log_level("INFO"), Ok(Level::INFO)));
        assert!(matches!(parse_log_level("warn"), Ok(Level::WARN)));
        assert!(matches!(parse_log_level("error"), Ok(Level::ERROR)));
        assert!(parse_log_level("trace-everything").is_err());
    }

    #[test]
    fn test_rolling_appender_paths() {
        let appender = RollingFileAppender::new(
            PathBuf::from("/tmp/logs"),
            "user-manage.log".to_string(),
            1024,
            5,
        );

        assert_eq!(appender.current_path(), PathBuf::from("/tmp/logs/user-manage.log"));
        assert_eq!(appender.backup_path(1), PathBuf::from("/tmp/logs/user-manage.log.1"));
    }

    #[test]
    fn test_rolling_appender_rotates() {
        let dir = tempfile::tempdir().unwrap();
        let mut appender = RollingFileAppender::new(
            dir.path().to_path_buf(),
            "app.log".to_string(),
            16,
            2,
        );

        appender.write_all(b"0123456789").unwrap();
        appender.write_all(b"abcdefghij").unwrap();
        appender.flush().unwrap();

        assert!(dir.path().join("app.log").exists());
        assert!(dir.path().join("app.log.1").exists());
        let rotated = std::fs::read_to_string(dir.path().join("app.log.1")).unwrap();
        assert_eq!(rotated, "0123456789");
    }
}
