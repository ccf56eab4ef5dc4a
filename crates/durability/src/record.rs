//! On-disk WAL record framing: `[len: u32][crc32: u32][payload]`.

use std::io::{self, Read, Write};

/// Errors while encoding or decoding a WAL record.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The stored checksum did not match the payload.
    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Checksum read from the record header.
        stored: u32,
        /// Checksum recomputed from the payload.
        computed: u32,
    },
    /// End of file reached cleanly between records (not an error, but the
    /// reader uses this to stop).
    #[error("end of log")]
    Eof,
}

/// Write one length-prefixed, checksummed record.
pub fn write_record<W: Write>(w: &mut W, payload: &[u8]) -> Result<(), RecordError> {
    let crc = crc32fast::hash(payload);
    w.write_all(&(payload.len() as u32).to_le_bytes())?;
    w.write_all(&crc.to_le_bytes())?;
    w.write_all(payload)?;
    Ok(())
}

/// Read one record, verifying its checksum. Returns `Err(RecordError::Eof)`
/// when the stream ends exactly on a record boundary.
pub fn read_record<R: Read>(r: &mut R) -> Result<Vec<u8>, RecordError> {
    let mut len_buf = [0u8; 4];
    match r.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Err(RecordError::Eof),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_le_bytes(len_buf) as usize;
    let mut crc_buf = [0u8; 4];
    r.read_exact(&mut crc_buf)?;
    let stored_crc = u32::from_le_bytes(crc_buf);
    let mut payload = vec![0u8; len];
    r.read_exact(&mut payload)?;
    let computed_crc = crc32fast::hash(&payload);
    if computed_crc != stored_crc {
        return Err(RecordError::ChecksumMismatch { stored: stored_crc, computed: computed_crc });
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip_single_record() {
        let mut buf = Vec::new();
        write_record(&mut buf, b"hello").unwrap();
        let mut cur = Cursor::new(buf);
        let payload = read_record(&mut cur).unwrap();
        assert_eq!(payload, b"hello");
    }

    #[test]
    fn roundtrip_multiple_records() {
        let mut buf = Vec::new();
        write_record(&mut buf, b"one").unwrap();
        write_record(&mut buf, b"two").unwrap();
        let mut cur = Cursor::new(buf);
        assert_eq!(read_record(&mut cur).unwrap(), b"one");
        assert_eq!(read_record(&mut cur).unwrap(), b"two");
        assert!(matches!(read_record(&mut cur), Err(RecordError::Eof)));
    }

    #[test]
    fn corrupted_payload_is_detected() {
        let mut buf = Vec::new();
        write_record(&mut buf, b"hello").unwrap();
        let last = buf.len() - 1;
        buf[last] ^= 0xFF;
        let mut cur = Cursor::new(buf);
        assert!(matches!(read_record(&mut cur), Err(RecordError::ChecksumMismatch { .. })));
    }
}
