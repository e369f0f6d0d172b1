//! Access log: timestamped lines kept in memory and appended to one file per day.

use chrono::{Local, NaiveDateTime};
use log::{info, warn};
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Number of recent lines kept in memory; older ones only live in the files.
pub const MAX_ENTRIES: usize = 1000;

#[derive(Default)]
struct LogState {
    log_dir: Option<PathBuf>,
    entries: VecDeque<String>,
}

impl LogState {
    fn push_entry(&mut self, line: String) {
        if self.entries.len() == MAX_ENTRIES {
            self.entries.pop_front();
        }
        self.entries.push_back(line);
    }
}

/// Shared by the accept loop and every connection handler.
///
/// A single mutex covers both the in-memory sink and the file append, so lines
/// from concurrent connections never interleave.
#[derive(Default)]
pub struct Logger {
    state: Mutex<LogState>,
}

impl Logger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory that receives `log_<YYYY-MM-DD>.txt` files from now on.
    pub fn set_log_dir(&self, dir: impl Into<PathBuf>) {
        self.lock_state().log_dir = Some(dir.into());
    }

    /// The most recent lines (at most [`MAX_ENTRIES`]), oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.lock_state().entries.iter().cloned().collect()
    }

    /// Records `message`. Never fails: file errors end up in the in-memory sink.
    pub fn log(&self, message: impl AsRef<str>) {
        self.log_at(Local::now().naive_local(), message.as_ref());
    }

    pub(crate) fn log_at(&self, now: NaiveDateTime, message: &str) {
        let line = format!("[{}] {}", now.format("%Y-%m-%d %H:%M:%S"), message);
        let mut state = self.lock_state();
        info!("{message}");
        state.push_entry(line.clone());

        let Some(dir) = state.log_dir.clone() else {
            return;
        };
        if let Err(e) = append_line(&log_file_path(&dir, now), &line) {
            warn!("Error saving log to file: {e}");
            state.push_entry(format!(
                "[{}] Error saving log to file: {e}",
                now.format("%Y-%m-%d %H:%M:%S")
            ));
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// `<dir>/log_<YYYY-MM-DD>.txt` for the day containing `now`.
pub fn log_file_path(dir: &Path, now: NaiveDateTime) -> PathBuf {
    dir.join(format!("log_{}.txt", now.format("%Y-%m-%d")))
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}
