//! The in-memory capture store
//!
//! An ordered, append-only collection of named tensor records. Explicit,
//! constructible state: whoever owns the store decides its lifetime (the FFI
//! crate wraps a single instance behind a mutex).

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::formats::capture::{CaptureReader, CaptureWriter};
use crate::tensor::{TensorRecord, MAX_DIMS};

/// Ordered collection of captured tensors.
#[derive(Debug, Default)]
pub struct CaptureStore {
    records: Vec<TensorRecord>,
    /// Maximum number of records, 0 = unlimited
    limit: usize,
}

impl CaptureStore {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self { records: Vec::new(), limit: 0 }
    }

    /// Cap the number of records the store will accept (0 = unlimited).
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
    }

    /// Append a record. Names are not deduplicated; insertion order is
    /// preserved until the next `clear` or `load`.
    pub fn add(&mut self, record: TensorRecord) -> Result<()> {
        if self.limit != 0 && self.records.len() >= self.limit {
            return Err(Error::InvalidArgument(format!(
                "capture limit of {} records reached",
                self.limit
            )));
        }
        self.records.push(record);
        Ok(())
    }

    /// Capture a tensor from a borrowed source slice and append it.
    pub fn capture(
        &mut self,
        name: &str,
        src: &[f32],
        ne: [i64; MAX_DIMS],
        nb: [u64; MAX_DIMS],
    ) -> Result<()> {
        self.add(TensorRecord::from_strided(name, src, ne, nb)?)
    }

    /// Discard all records. Idempotent.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[TensorRecord] {
        &self.records
    }

    /// First record with the given name, if any.
    pub fn get(&self, name: &str) -> Option<&TensorRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Move all records out, leaving the store empty (used by session
    /// snapshots).
    pub fn take_records(&mut self) -> Vec<TensorRecord> {
        std::mem::take(&mut self.records)
    }

    /// Write a human-readable listing, one record per line in insertion
    /// order. With `values` set, the element data follows each header line.
    pub fn write_listing<W: Write>(&self, w: &mut W, values: bool) -> std::io::Result<()> {
        writeln!(w, "{} captured tensor(s)", self.records.len())?;
        for (idx, rec) in self.records.iter().enumerate() {
            writeln!(
                w,
                "[{}] {} shape:{} stride:{:?}",
                idx,
                rec.name,
                rec.shape_string(),
                rec.nb
            )?;
            if values {
                rec.write_values(w)?;
            }
        }
        Ok(())
    }

    /// Print the listing to stdout.
    pub fn print(&self, values: bool) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        // A broken pipe is the only way this write fails; nothing to report.
        let _ = self.write_listing(&mut lock, values);
    }

    /// Serialize every record to `path`, overwriting any existing file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = CaptureWriter::new(BufWriter::new(file));
        writer.write_store(&self.records)?;
        writer.finish()?;
        Ok(())
    }

    /// Replace the store's contents with the records from `path`.
    ///
    /// On any failure the store is left untouched: records are decoded into
    /// a scratch vector and swapped in only once the whole file has parsed.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path)?;
        let mut reader = CaptureReader::new(BufReader::new(file));
        let records = reader.read_store()?;
        self.records = records;
        Ok(())
    }
}
