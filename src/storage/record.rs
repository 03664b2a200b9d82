//! Binary record codec.
//!
//! A record is an ordered list of opaque byte fields. Each field is written as
//! a little-endian `u32` length followed by its raw bytes, with no padding and
//! no trailer; the reader consumes fields until the input is exhausted.

use crate::storage::error::{StorageError, StorageResult};
use bytes::{Buf, BufMut};

const LENGTH_PREFIX_SIZE: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<Vec<u8>>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields<I, F>(fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Vec<u8>>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn add_field(&mut self, field: impl Into<Vec<u8>>) {
        self.fields.push(field.into());
    }

    pub fn field(&self, index: usize) -> Option<&[u8]> {
        self.fields.get(index).map(Vec::as_slice)
    }

    pub fn fields(&self) -> &[Vec<u8>] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of bytes [`serialize`](Self::serialize) will produce.
    pub fn encoded_size(&self) -> usize {
        self.fields
            .iter()
            .map(|field| LENGTH_PREFIX_SIZE + field.len())
            .sum()
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_size());
        for field in &self.fields {
            buf.put_u32_le(field.len() as u32);
            buf.put_slice(field);
        }
        buf
    }

    pub fn deserialize(mut data: &[u8]) -> StorageResult<Self> {
        let mut record = Record::new();

        while data.has_remaining() {
            if data.remaining() < LENGTH_PREFIX_SIZE {
                return Err(StorageError::TruncatedRecord {
                    needed: LENGTH_PREFIX_SIZE,
                    remaining: data.remaining(),
                });
            }
            let len = data.get_u32_le() as usize;
            if data.remaining() < len {
                return Err(StorageError::TruncatedRecord {
                    needed: len,
                    remaining: data.remaining(),
                });
            }
            record.add_field(&data[..len]);
            data.advance(len);
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let record = Record::from_fields(["hi", "", "abc"]);
        let bytes = record.serialize();

        let mut expected = vec![];
        expected.extend_from_slice(&2u32.to_le_bytes());
        expected.extend_from_slice(b"hi");
        expected.extend_from_slice(&0u32.to_le_bytes());
        expected.extend_from_slice(&3u32.to_le_bytes());
        expected.extend_from_slice(b"abc");

        assert_eq!(bytes, expected);
        assert_eq!(record.encoded_size(), bytes.len());
    }

    #[test]
    fn test_round_trip() -> anyhow::Result<()> {
        let record = Record::from_fields(vec![
            b"1".to_vec(),
            b"alice".to_vec(),
            vec![0u8, 255, 10, 13],
            vec![],
        ]);
        let decoded = Record::deserialize(&record.serialize())?;
        assert_eq!(decoded, record);
        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded.field(1), Some(&b"alice"[..]));
        assert_eq!(decoded.field(4), None);
        Ok(())
    }

    #[test]
    fn test_empty_record() -> anyhow::Result<()> {
        let record = Record::new();
        assert!(record.is_empty());
        assert!(record.serialize().is_empty());
        assert_eq!(Record::deserialize(&[])?, record);
        Ok(())
    }

    #[test]
    fn test_truncated_field() {
        let mut bytes = Record::from_fields(["hello"]).serialize();
        bytes.truncate(bytes.len() - 2);

        match Record::deserialize(&bytes) {
            Err(StorageError::TruncatedRecord { needed, remaining }) => {
                assert_eq!(needed, 5);
                assert_eq!(remaining, 3);
            }
            other => panic!("expected TruncatedRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_length_prefix() {
        let mut bytes = Record::from_fields(["a"]).serialize();
        bytes.extend_from_slice(&[1, 0]);

        assert!(matches!(
            Record::deserialize(&bytes),
            Err(StorageError::TruncatedRecord {
                needed: 4,
                remaining: 2
            })
        ));
    }

    #[test]
    fn test_add_field() {
        let mut record = Record::new();
        record.add_field("x");
        record.add_field(vec![1u8, 2]);
        assert_eq!(record.fields(), &[b"x".to_vec(), vec![1u8, 2]]);
    }
}
