//! Label-tagged capture sessions
//!
//! Groups captures by the input being processed: the host tags the store's
//! current contents with a label (typically the input token) and snapshots
//! them into the log, leaving the store empty for the next input.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::formats::capture::{CaptureReader, CaptureWriter};
use crate::store::CaptureStore;
use crate::tensor::TensorRecord;

/// One snapshot of the capture store, tagged with a label.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub label: String,
    pub records: Vec<TensorRecord>,
}

/// Ordered log of committed sessions.
#[derive(Debug, Default)]
pub struct SessionLog {
    sessions: Vec<Session>,
}

impl SessionLog {
    /// Create an empty log.
    pub const fn new() -> Self {
        Self { sessions: Vec::new() }
    }

    /// Move the store's current records into a new session tagged `label`,
    /// leaving the store empty.
    pub fn commit(&mut self, label: impl Into<String>, store: &mut CaptureStore) {
        self.sessions.push(Session { label: label.into(), records: store.take_records() });
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    /// Write an indexed listing of every session and its records.
    pub fn write_listing<W: Write>(&self, w: &mut W, values: bool) -> std::io::Result<()> {
        for (idx, session) in self.sessions.iter().enumerate() {
            writeln!(w, "{}-{}", idx, session.label)?;
            for rec in &session.records {
                writeln!(w, "  {} shape:{} stride:{:?}", rec.name, rec.shape_string(), rec.nb)?;
                if values {
                    rec.write_values(w)?;
                }
            }
        }
        Ok(())
    }

    /// Serialize the log to `path`, overwriting any existing file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = CaptureWriter::new(BufWriter::new(file));
        writer.write_sessions(&self.sessions)?;
        writer.finish()?;
        Ok(())
    }

    /// Replace the log's contents with the sessions from `path`. The log is
    /// left untouched on failure.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path)?;
        let mut reader = CaptureReader::new(BufReader::new(file));
        let sessions = reader.read_sessions()?;
        self.sessions = sessions;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_drains_store() {
        let mut store = CaptureStore::new();
        store.capture("a", &[1.0], [1, 1, 1, 1], [4, 4, 4, 4]).unwrap();
        store.capture("b", &[2.0], [1, 1, 1, 1], [4, 4, 4, 4]).unwrap();

        let mut log = SessionLog::new();
        log.commit("first", &mut store);

        assert!(store.is_empty());
        assert_eq!(log.len(), 1);
        assert_eq!(log.sessions()[0].label, "first");
        assert_eq!(log.sessions()[0].records.len(), 2);
    }

    #[test]
    fn test_commit_order_preserved() {
        let mut store = CaptureStore::new();
        let mut log = SessionLog::new();

        store.capture("a", &[1.0], [1, 1, 1, 1], [4, 4, 4, 4]).unwrap();
        log.commit("t0", &mut store);
        store.capture("b", &[2.0], [1, 1, 1, 1], [4, 4, 4, 4]).unwrap();
        log.commit("t1", &mut store);

        let labels: Vec<_> = log.sessions().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["t0", "t1"]);
    }

    #[test]
    fn test_listing_format() {
        let mut store = CaptureStore::new();
        store.capture("w", &[1.0, 2.0], [2, 1, 1, 1], [4, 8, 8, 8]).unwrap();
        let mut log = SessionLog::new();
        log.commit("hello", &mut store);

        let mut out = Vec::new();
        log.write_listing(&mut out, false).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("0-hello\n"));
        assert!(text.contains("w shape:2x1x1x1"));
    }
}
