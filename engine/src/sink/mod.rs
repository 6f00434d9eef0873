//! Unmatched-input sink
//!
//! Inputs the engine could not understand are appended here, one per line,
//! so the graph author can mine them for new patterns later.

use sdk::errors::Result;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Append-only destination for rejected inputs
pub trait UnmatchedSink {
    /// Append one input as one line
    fn record(&mut self, input: &str) -> Result<()>;

    /// Push buffered lines to the backing store
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: UnmatchedSink + ?Sized> UnmatchedSink for Box<S> {
    fn record(&mut self, input: &str) -> Result<()> {
        (**self).record(input)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Line-per-input file, opened in append mode
///
/// The file stays open for the life of the sink and is flushed when the sink
/// is dropped.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink {
    /// Open (or create) `path` for appending
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!("Unmatched inputs go to {}", path.display());
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl UnmatchedSink for FileSink {
    fn record(&mut self, input: &str) -> Result<()> {
        writeln!(self.writer, "{}", input)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            warn!("Failed to flush {}: {}", self.path.display(), e);
        }
    }
}

/// In-memory sink, mostly for tests and dry runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySink {
    lines: Vec<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl UnmatchedSink for MemorySink {
    fn record(&mut self, input: &str) -> Result<()> {
        self.lines.push(input.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_sink_keeps_order() {
        let mut sink = MemorySink::new();
        sink.record("first").unwrap();
        sink.record("second").unwrap();
        assert_eq!(sink.lines().to_vec(), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_file_sink_appends_and_flushes_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("not_understood.txt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "earlier\n").unwrap();

        {
            let mut sink = FileSink::open(&path).unwrap();
            sink.record("xyzxyz").unwrap();
            sink.record("blorp").unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "earlier\nxyzxyz\nblorp\n");
    }

    #[test]
    fn test_file_sink_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b").join("unmatched.txt");
        let mut sink = FileSink::open(&path).unwrap();
        sink.record("hello").unwrap();
        sink.flush().unwrap();
        assert_eq!(std::fs::read_to_string(sink.path()).unwrap(), "hello\n");
    }

    #[test]
    fn test_boxed_sink_forwards() {
        let mut sink: Box<dyn UnmatchedSink> = Box::new(MemorySink::new());
        sink.record("boxed").unwrap();
        sink.flush().unwrap();
    }
}
