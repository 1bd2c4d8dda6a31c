/// Capture container format
///
/// Self-describing little-endian layout with two container kinds sharing one
/// framing scheme:
///
/// - `TCAP`: magic, version, record count, then the records.
/// - `TSES`: magic, version, session count, then per session a
///   length-prefixed label, a record count, and the records.
///
/// Each record is a length-prefixed UTF-8 name, 4 x i64 extents, 4 x u64 byte
/// strides, a u64 element count, and that many f32 payload values.
use crate::error::{Error, Result};
use crate::session::Session;
use crate::tensor::{checked_element_count, TensorRecord, MAX_DIMS};
use std::io::{Read, Write};

/// Capture store magic ("TCAP")
const CAPTURE_MAGIC: u32 = 0x50414354;
/// Session log magic ("TSES")
const SESSION_MAGIC: u32 = 0x53455354;
const CONTAINER_VERSION: u32 = 1;

/// Upper bound on embedded string lengths; anything larger is a corrupt file.
const MAX_NAME_LEN: u64 = 1 << 16;

/// Which container a file holds, decided by its magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Capture,
    Session,
}

/// A fully decoded container.
#[derive(Debug)]
pub enum Container {
    Capture(Vec<TensorRecord>),
    Sessions(Vec<Session>),
}

/// Streaming writer for capture containers.
pub struct CaptureWriter<W: Write> {
    writer: W,
}

impl<W: Write> CaptureWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write a complete `TCAP` container.
    pub fn write_store(&mut self, records: &[TensorRecord]) -> Result<()> {
        self.write_u32(CAPTURE_MAGIC)?;
        self.write_u32(CONTAINER_VERSION)?;
        self.write_u64(records.len() as u64)?;
        self.write_records(records)
    }

    /// Write a complete `TSES` container.
    pub fn write_sessions(&mut self, sessions: &[Session]) -> Result<()> {
        self.write_u32(SESSION_MAGIC)?;
        self.write_u32(CONTAINER_VERSION)?;
        self.write_u64(sessions.len() as u64)?;
        for session in sessions {
            self.write_string(&session.label)?;
            self.write_u64(session.records.len() as u64)?;
            self.write_records(&session.records)?;
        }
        Ok(())
    }

    /// Flush and drop the writer.
    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn write_records(&mut self, records: &[TensorRecord]) -> Result<()> {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    fn write_record(&mut self, record: &TensorRecord) -> Result<()> {
        self.write_string(&record.name)?;
        for &n in &record.ne {
            self.write_i64(n)?;
        }
        for &b in &record.nb {
            self.write_u64(b)?;
        }
        self.write_u64(record.data.len() as u64)?;
        for &value in &record.data {
            self.writer.write_all(&value.to_le_bytes())?;
        }
        Ok(())
    }

    // Helper methods

    fn write_u32(&mut self, value: u32) -> Result<()> {
        self.writer.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn write_i64(&mut self, value: i64) -> Result<()> {
        self.writer.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_u64(value.len() as u64)?;
        self.writer.write_all(value.as_bytes())?;
        Ok(())
    }
}

/// Streaming reader for capture containers.
pub struct CaptureReader<R: Read> {
    reader: R,
}

impl<R: Read> CaptureReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read a `TCAP` container. Fails with `InvalidFormat` if the file is a
    /// session log or anything else.
    pub fn read_store(&mut self) -> Result<Vec<TensorRecord>> {
        match self.read_header()? {
            ContainerKind::Capture => {}
            ContainerKind::Session => {
                return Err(Error::InvalidFormat(
                    "file is a session log, expected a capture file".into(),
                ))
            }
        }
        let count = self.read_u64()?;
        self.read_records(count)
    }

    /// Read a `TSES` container.
    pub fn read_sessions(&mut self) -> Result<Vec<Session>> {
        match self.read_header()? {
            ContainerKind::Session => {}
            ContainerKind::Capture => {
                return Err(Error::InvalidFormat(
                    "file is a capture file, expected a session log".into(),
                ))
            }
        }
        let count = self.read_u64()?;
        let mut sessions = Vec::new();
        for _ in 0..count {
            let label = self.read_string()?;
            let record_count = self.read_u64()?;
            let records = self.read_records(record_count)?;
            sessions.push(Session { label, records });
        }
        Ok(sessions)
    }

    /// Read whichever container the file holds (for inspection tools).
    pub fn read_any(&mut self) -> Result<Container> {
        match self.read_header()? {
            ContainerKind::Capture => {
                let count = self.read_u64()?;
                Ok(Container::Capture(self.read_records(count)?))
            }
            ContainerKind::Session => {
                let count = self.read_u64()?;
                let mut sessions = Vec::new();
                for _ in 0..count {
                    let label = self.read_string()?;
                    let record_count = self.read_u64()?;
                    sessions.push(Session { label, records: self.read_records(record_count)? });
                }
                Ok(Container::Sessions(sessions))
            }
        }
    }

    fn read_header(&mut self) -> Result<ContainerKind> {
        let magic = self.read_u32()?;
        let kind = match magic {
            CAPTURE_MAGIC => ContainerKind::Capture,
            SESSION_MAGIC => ContainerKind::Session,
            _ => {
                return Err(Error::InvalidFormat(format!(
                    "invalid magic: 0x{:08X}",
                    magic
                )))
            }
        };
        let version = self.read_u32()?;
        if version != CONTAINER_VERSION {
            return Err(Error::InvalidFormat(format!(
                "unsupported container version: {}",
                version
            )));
        }
        Ok(kind)
    }

    fn read_records(&mut self, count: u64) -> Result<Vec<TensorRecord>> {
        let mut records = Vec::new();
        for _ in 0..count {
            records.push(self.read_record()?);
        }
        Ok(records)
    }

    fn read_record(&mut self) -> Result<TensorRecord> {
        let name = self.read_string()?;

        let mut ne = [0i64; MAX_DIMS];
        for n in ne.iter_mut() {
            *n = self.read_i64()?;
        }
        if ne.iter().any(|&n| n < 1) {
            return Err(Error::InvalidFormat(format!(
                "record {:?} has non-positive dimension: {:?}",
                name, ne
            )));
        }

        let mut nb = [0u64; MAX_DIMS];
        for b in nb.iter_mut() {
            *b = self.read_u64()?;
        }

        let count = self.read_u64()?;
        let expected = checked_element_count(&ne)
            .ok_or_else(|| Error::InvalidFormat(format!("shape product overflows: {:?}", ne)))?;
        if count != expected as u64 {
            return Err(Error::InvalidFormat(format!(
                "record {:?} claims {} elements but shape {:?} has {}",
                name, count, ne, expected
            )));
        }

        let byte_len = (count as usize)
            .checked_mul(4)
            .ok_or_else(|| Error::InvalidFormat("payload length overflows".into()))?;
        let mut bytes = vec![0u8; byte_len];
        self.fill(&mut bytes)?;

        let mut data = Vec::with_capacity(count as usize);
        for chunk in bytes.chunks_exact(4) {
            data.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }

        Ok(TensorRecord { name, ne, nb, data })
    }

    // Helper methods

    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reader.read_exact(buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::InvalidFormat("unexpected end of file".into())
            } else {
                Error::Io(e)
            }
        })
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.fill(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.fill(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn read_i64(&mut self) -> Result<i64> {
        let mut buf = [0u8; 8];
        self.fill(&mut buf)?;
        Ok(i64::from_le_bytes(buf))
    }

    fn read_string(&mut self) -> Result<String> {
        let len = self.read_u64()?;
        if len > MAX_NAME_LEN {
            return Err(Error::InvalidFormat(format!(
                "string length {} exceeds limit",
                len
            )));
        }
        let mut buf = vec![0u8; len as usize];
        self.fill(&mut buf)?;
        String::from_utf8(buf).map_err(|e| Error::ParseError(format!("Invalid UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_records() -> Vec<TensorRecord> {
        vec![
            TensorRecord::from_contiguous("weight", [2, 2, 1, 1], vec![1.0, 2.0, 3.0, 4.0])
                .unwrap(),
            TensorRecord::from_contiguous("bias", [3, 1, 1, 1], vec![-1.0, 0.5, 2.25]).unwrap(),
        ]
    }

    fn encode_store(records: &[TensorRecord]) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut writer = CaptureWriter::new(&mut buf);
        writer.write_store(records).unwrap();
        buf
    }

    #[test]
    fn test_store_roundtrip() {
        let records = sample_records();
        let buf = encode_store(&records);

        let mut reader = CaptureReader::new(Cursor::new(buf));
        let decoded = reader.read_store().unwrap();
        assert_eq!(decoded, records);
    }

    #[test]
    fn test_empty_store_roundtrip() {
        let buf = encode_store(&[]);
        let mut reader = CaptureReader::new(Cursor::new(buf));
        assert!(reader.read_store().unwrap().is_empty());
    }

    #[test]
    fn test_bad_magic() {
        let mut reader = CaptureReader::new(Cursor::new(vec![0u8; 32]));
        assert!(matches!(reader.read_store(), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_truncated_payload() {
        let mut buf = encode_store(&sample_records());
        buf.truncate(buf.len() - 5);

        let mut reader = CaptureReader::new(Cursor::new(buf));
        assert!(matches!(reader.read_store(), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_unsupported_version() {
        let mut buf = encode_store(&[]);
        buf[4..8].copy_from_slice(&99u32.to_le_bytes());

        let mut reader = CaptureReader::new(Cursor::new(buf));
        assert!(matches!(reader.read_store(), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_element_count_mismatch_rejected() {
        // Corrupt the element count field of a single-record container.
        let record =
            TensorRecord::from_contiguous("w", [2, 1, 1, 1], vec![1.0, 2.0]).unwrap();
        let mut buf = encode_store(&[record]);
        // Header (16) + name (8 + 1) + ne (32) + nb (32) puts the element
        // count at offset 89.
        buf[89..97].copy_from_slice(&7u64.to_le_bytes());

        let mut reader = CaptureReader::new(Cursor::new(buf));
        assert!(matches!(reader.read_store(), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_session_roundtrip() {
        let sessions = vec![
            Session { label: "token-0".into(), records: sample_records() },
            Session { label: "token-1".into(), records: Vec::new() },
        ];

        let mut buf = Vec::new();
        let mut writer = CaptureWriter::new(&mut buf);
        writer.write_sessions(&sessions).unwrap();

        let mut reader = CaptureReader::new(Cursor::new(buf));
        let decoded = reader.read_sessions().unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].label, "token-0");
        assert_eq!(decoded[0].records, sessions[0].records);
        assert!(decoded[1].records.is_empty());
    }

    #[test]
    fn test_kind_mismatch() {
        let buf = encode_store(&[]);
        let mut reader = CaptureReader::new(Cursor::new(buf));
        assert!(matches!(reader.read_sessions(), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_read_any_detects_kind() {
        let buf = encode_store(&sample_records());
        let mut reader = CaptureReader::new(Cursor::new(buf));
        match reader.read_any().unwrap() {
            Container::Capture(records) => assert_eq!(records.len(), 2),
            Container::Sessions(_) => panic!("expected a capture container"),
        }
    }
}
