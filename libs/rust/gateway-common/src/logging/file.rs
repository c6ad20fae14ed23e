//! Date-rotated log files.
//!
//! Records go to `{prefix}-YYYY-MM-DD.log` in JSON format. When a file would
//! grow past `max_size` the sink rolls to `{prefix}-YYYY-MM-DD.1.log`,
//! `.2.log` and so on. Files older than `max_age_days` are removed whenever
//! a new file is opened.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use parking_lot::Mutex;

use super::format::format_json;
use super::sink::LogSink;
use super::{LogLevel, LogRecord};
use crate::error::SinkError;

/// Rotating file sink configuration.
#[derive(Debug, Clone)]
pub struct RollingFileConfig {
    /// Directory holding the log files
    pub dir: PathBuf,
    /// File name prefix
    pub prefix: String,
    /// Application name stamped into each record
    pub app_name: String,
    /// Size in bytes after which a same-day file is rolled
    pub max_size: u64,
    /// Files dated more than this many days ago are pruned
    pub max_age_days: u64,
    /// Least severe level written; `Error` keeps an error-only stream
    pub max_level: LogLevel,
}

impl RollingFileConfig {
    /// Create a config writing every level to `dir/{prefix}-DATE.log`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            dir: dir.into(),
            app_name: prefix.clone(),
            prefix,
            max_size: 20 * 1024 * 1024,
            max_age_days: 14,
            max_level: LogLevel::Verbose,
        }
    }

    /// Create config with custom app name.
    #[must_use]
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    /// Create config with custom size cap.
    #[must_use]
    pub const fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size = bytes;
        self
    }

    /// Create config with custom retention.
    #[must_use]
    pub const fn with_max_age_days(mut self, days: u64) -> Self {
        self.max_age_days = days;
        self
    }

    /// Only write records at or above `level`.
    #[must_use]
    pub const fn with_max_level(mut self, level: LogLevel) -> Self {
        self.max_level = level;
        self
    }
}

struct OpenFile {
    date: NaiveDate,
    index: u32,
    size: u64,
    file: File,
}

/// File sink rotated by date and size.
pub struct RollingFileSink {
    config: RollingFileConfig,
    current: Mutex<Option<OpenFile>>,
}

impl RollingFileSink {
    /// Create the sink, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(config: RollingFileConfig) -> Result<Self, SinkError> {
        fs::create_dir_all(&config.dir)?;
        Ok(Self {
            config,
            current: Mutex::new(None),
        })
    }

    /// Path of the file for `date` and roll `index`.
    #[must_use]
    pub fn file_path(&self, date: NaiveDate, index: u32) -> PathBuf {
        let name = if index == 0 {
            format!("{}-{}.log", self.config.prefix, date.format("%Y-%m-%d"))
        } else {
            format!("{}-{}.{index}.log", self.config.prefix, date.format("%Y-%m-%d"))
        };
        self.config.dir.join(name)
    }

    fn open(&self, date: NaiveDate, index: u32) -> Result<OpenFile, SinkError> {
        let path = self.file_path(date, index);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let size = file.metadata()?.len();
        self.prune(date);
        Ok(OpenFile {
            date,
            index,
            size,
            file,
        })
    }

    /// Remove files of this sink dated before the retention window.
    fn prune(&self, today: NaiveDate) {
        let Some(cutoff) = today.checked_sub_days(Days::new(self.config.max_age_days)) else {
            return;
        };
        let Ok(entries) = fs::read_dir(&self.config.dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if let Some(date) = file_date(&path, &self.config.prefix) {
                if date < cutoff {
                    let _ = fs::remove_file(&path);
                }
            }
        }
    }
}

/// Date encoded in a file name of the form `{prefix}-YYYY-MM-DD[.N].log`.
fn file_date(path: &Path, prefix: &str) -> Option<NaiveDate> {
    let name = path.file_name()?.to_str()?;
    let rest = name.strip_prefix(prefix)?.strip_prefix('-')?;
    let stem = rest.strip_suffix(".log")?;
    let date_part = stem.split('.').next()?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

impl LogSink for RollingFileSink {
    fn write(&self, record: &LogRecord) -> Result<(), SinkError> {
        if !record.level.is_enabled(self.config.max_level) {
            return Ok(());
        }

        let mut line = format_json(record, &self.config.app_name)?;
        line.push('\n');
        let len = line.len() as u64;
        let mut current = self.current.lock();
        // Only move forward: a late record for an earlier day stays in the
        // open file.
        let date = current
            .as_ref()
            .map_or(record.timestamp.date_naive(), |open| {
                open.date.max(record.timestamp.date_naive())
            });
        let next = match current.as_ref() {
            None => Some((date, 0)),
            Some(open) if open.date < date => Some((date, 0)),
            Some(open) if open.size > 0 && open.size + len > self.config.max_size => {
                Some((date, open.index + 1))
            }
            Some(_) => None,
        };
        if let Some((date, mut index)) = next {
            let mut opened = self.open(date, index)?;
            // A restart may find today's file already full.
            while opened.size > 0 && opened.size + len > self.config.max_size {
                index += 1;
                opened = self.open(date, index)?;
            }
            *current = Some(opened);
        }

        if let Some(open) = current.as_mut() {
            open.file.write_all(line.as_bytes())?;
            open.size += len;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        if let Some(open) = self.current.lock().as_mut() {
            open.file.flush()?;
        }
        Ok(())
    }
}
