//! Logging utilities
//!
//! A size-based rolling file writer so the optional `--log-file` JSON
//! layer never grows without bound.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Maximum log file size before rotation (10MB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum number of rotated files kept on disk
pub const DEFAULT_MAX_FILES: usize = 5;

/// A size-based rolling file writer.
///
/// Rotated files carry a numeric suffix: `app.log`, `app.log.1`,
/// `app.log.2`, … with the highest index being the oldest.
#[derive(Debug, Clone)]
pub struct RollingFileWriter {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug)]
struct Inner {
    base_path: PathBuf,
    file: File,
    current_size: u64,
    max_size: u64,
    max_files: usize,
}

impl RollingFileWriter {
    /// Create a writer rotating at `max_size` bytes, keeping `max_files` rotated files.
    pub fn new(path: impl AsRef<Path>, max_size: u64, max_files: usize) -> io::Result<Self> {
        let base_path = path.as_ref().to_path_buf();

        if let Some(parent) = base_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let current_size = fs::metadata(&base_path).map(|m| m.len()).unwrap_or(0);
        let file = open_append(&base_path)?;

        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                base_path,
                file,
                current_size,
                max_size,
                max_files,
            })),
        })
    }

    /// Create a writer with the default limits (10MB, 5 files).
    pub fn with_defaults(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::new(path, DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_FILES)
    }
}

impl Inner {
    fn rotate(&mut self) -> io::Result<()> {
        // Shift app.log.1 -> app.log.2 and so on, dropping the oldest.
        for i in (1..self.max_files).rev() {
            let from = self.rotated_path(i);
            if !from.exists() {
                continue;
            }
            if i + 1 >= self.max_files {
                fs::remove_file(&from).ok();
            } else {
                fs::rename(&from, self.rotated_path(i + 1)).ok();
            }
        }

        if self.base_path.exists() {
            fs::rename(&self.base_path, self.rotated_path(1))?;
        }

        self.file = open_append(&self.base_path)?;
        self.current_size = 0;
        Ok(())
    }

    fn rotated_path(&self, index: usize) -> PathBuf {
        let mut path = self.base_path.clone();
        let filename = path.file_name().unwrap_or_default().to_string_lossy().to_string();
        path.set_file_name(format!("{}.{}", filename, index));
        path
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

impl Write for RollingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.inner.lock().unwrap();

        if inner.current_size + buf.len() as u64 > inner.max_size {
            inner.rotate()?;
        }

        let written = inner.file.write(buf)?;
        inner.current_size += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().unwrap().file.flush()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for RollingFileWriter {
    type Writer = RollingFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_file_on_construction() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");

        let _writer = RollingFileWriter::with_defaults(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn writes_are_appended() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");

        let mut writer = RollingFileWriter::with_defaults(&path).unwrap();
        writer.write_all(b"first line\n").unwrap();
        writer.write_all(b"second line\n").unwrap();
        writer.flush().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("first line"));
        assert!(content.contains("second line"));
    }

    #[test]
    fn rotates_past_max_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");

        let mut writer = RollingFileWriter::new(&path, 64, 3).unwrap();
        for i in 0..8 {
            writeln!(writer, "log entry number {} with some padding", i).unwrap();
        }
        writer.flush().unwrap();

        assert!(dir.path().join("app.log.1").exists());
    }
}
