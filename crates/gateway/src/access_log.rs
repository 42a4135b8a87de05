//! Request log
//!
//! Append-only, one line per request in common log format. A single mutex
//! over the file handle is enough: lines are small and writes are rare
//! compared with database round-trips. Failures to write degrade to a
//! tracing warning; they never fail the request.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::Mutex;

use chrono::Local;
use tracing::warn;

/// Append-only request log file
pub struct AccessLog {
    file: Mutex<File>,
}

impl AccessLog {
    /// Open (or create) the log file in append mode. `-` logs to stdout.
    pub fn open(path: &str) -> io::Result<Self> {
        let path = if path == "-" { "/dev/stdout" } else { path };
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Append one request line
    pub fn record(&self, remote: &str, method: &str, path_and_query: &str, status: u16, bytes: usize) {
        let line = format!(
            "{remote} - - [{}] \"{method} {path_and_query} HTTP/1.1\" {status} {bytes}\n",
            Local::now().format("%d/%b/%Y:%H:%M:%S %z"),
        );

        let result = self
            .file
            .lock()
            .map(|mut file| file.write_all(line.as_bytes()));
        if let Ok(Err(e)) = result {
            warn!(error = %e, "request log write failed");
        }
    }
}
