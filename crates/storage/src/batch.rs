//! A batch is the unit of atomic apply: every op in it lands in the store
//! together, or none do.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Write};

/// One mutation within a [`Batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Insert or overwrite `key` with `value`.
    Put(Vec<u8>, Vec<u8>),
    /// Remove `key`, if present.
    Delete(Vec<u8>),
}

/// An ordered sequence of mutations applied atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    ops: Vec<BatchOp>,
}

impl Batch {
    /// An empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a put.
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(BatchOp::Put(key.into(), value.into()));
        self
    }

    /// Queue a delete.
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(BatchOp::Delete(key.into()));
        self
    }

    /// Whether this batch has no queued ops.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The queued ops, in apply order.
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    /// Serialize this batch into a WAL payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(self.ops.len() as u32).unwrap();
        for op in &self.ops {
            match op {
                BatchOp::Put(k, v) => {
                    buf.write_u8(0).unwrap();
                    buf.write_u32::<LittleEndian>(k.len() as u32).unwrap();
                    buf.write_all(k).unwrap();
                    buf.write_u32::<LittleEndian>(v.len() as u32).unwrap();
                    buf.write_all(v).unwrap();
                }
                BatchOp::Delete(k) => {
                    buf.write_u8(1).unwrap();
                    buf.write_u32::<LittleEndian>(k.len() as u32).unwrap();
                    buf.write_all(k).unwrap();
                }
            }
        }
        buf
    }

    /// Deserialize a batch previously produced by [`Batch::encode`].
    pub fn decode(bytes: &[u8]) -> io::Result<Self> {
        let mut cur = Cursor::new(bytes);
        let count = cur.read_u32::<LittleEndian>()?;
        let mut ops = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let tag = cur.read_u8()?;
            let klen = cur.read_u32::<LittleEndian>()? as usize;
            let mut key = vec![0u8; klen];
            io::Read::read_exact(&mut cur, &mut key)?;
            match tag {
                0 => {
                    let vlen = cur.read_u32::<LittleEndian>()? as usize;
                    let mut val = vec![0u8; vlen];
                    io::Read::read_exact(&mut cur, &mut val)?;
                    ops.push(BatchOp::Put(key, val));
                }
                1 => ops.push(BatchOp::Delete(key)),
                other => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("unknown batch op tag {other}"),
                    ))
                }
            }
        }
        Ok(Self { ops })
    }
}

impl From<Vec<BatchOp>> for Batch {
    fn from(ops: Vec<BatchOp>) -> Self {
        Self { ops }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_roundtrips_through_encoding() {
        let mut b = Batch::new();
        b.put(b"k1".to_vec(), b"v1".to_vec());
        b.delete(b"k2".to_vec());
        let encoded = b.encode();
        let decoded = Batch::decode(&encoded).unwrap();
        assert_eq!(decoded, b);
    }
}
