//! Binary `resources.index` writer/reader, both layouts (spec §4.8).
//!
//! Grounded on `original_source/src/resource_table.cpp`'s field order
//! (`IndexHeaderV2`, `KeyConfig`, `IdSetHeader`, `ResTypeHeader`,
//! `ResIndex`, `DataHeader`, `ResInfo`, and the `"KEYS"`/`"IDSS"`/`"DATA"`
//! tags), translated from fixed C-struct writes to explicit
//! `byteorder` little-endian framing.

pub mod header;
pub mod v1;
pub mod v2;

use respack_core::{KeyParam, ResType};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("invalid resource index: {0}")]
    InvalidResourceIndex(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One record the index writer serializes: a resolved resource value
/// under one `(name, limit_key)` pair, with its already-assigned ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedItem {
    pub res_type: ResType,
    pub id: u32,
    pub name: String,
    pub qualifiers: Vec<KeyParam>,
    pub data: Vec<u8>,
    /// Set by the reader on every item it loads back (spec §8 property
    /// 4: "the loader sets `coverable=true` on every re-ingested item").
    pub coverable: bool,
}

impl IndexedItem {
    pub fn new(res_type: ResType, id: u32, name: impl Into<String>, qualifiers: Vec<KeyParam>, data: Vec<u8>) -> Self {
        Self {
            res_type,
            id,
            name: name.into(),
            qualifiers,
            data,
            coverable: false,
        }
    }
}

fn read_exact_tag(buf: &[u8], pos: usize, expected: &[u8; 4]) -> Result<(), IndexError> {
    if buf.len() < pos + 4 {
        return Err(IndexError::InvalidResourceIndex("truncated tag".into()));
    }
    if &buf[pos..pos + 4] != expected {
        return Err(IndexError::InvalidResourceIndex(format!(
            "expected tag {:?}, found {:?}",
            std::str::from_utf8(expected),
            std::str::from_utf8(&buf[pos..pos + 4])
        )));
    }
    Ok(())
}

fn bounds_check(buf: &[u8], pos: usize, len: usize) -> Result<(), IndexError> {
    if buf.len() < pos + len {
        return Err(IndexError::InvalidResourceIndex(format!(
            "read of {len} bytes at {pos} exceeds buffer length {}",
            buf.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use respack_core::QualifierKind;

    fn sample_items() -> Vec<IndexedItem> {
        vec![
            IndexedItem::new(ResType::String, 0x0100_0001, "app_name", vec![], b"Hello".to_vec()),
            IndexedItem::new(
                ResType::String,
                0x0100_0001,
                "app_name",
                vec![KeyParam::new(QualifierKind::Language, respack_core::qualifier::pack_code("zh"))],
                "你好".as_bytes().to_vec(),
            ),
        ]
    }

    #[test]
    fn v1_round_trips_items_up_to_coverable_flag() {
        let items = sample_items();
        let bytes = v1::write(&items).unwrap();
        let loaded = v1::read(&bytes).unwrap();
        assert_eq!(loaded.len(), items.len());
        for (original, reloaded) in items.iter().zip(loaded.iter()) {
            assert_eq!(original.res_type, reloaded.res_type);
            assert_eq!(original.id, reloaded.id);
            assert_eq!(original.name, reloaded.name);
            assert_eq!(original.data, reloaded.data);
            assert!(reloaded.coverable);
        }
    }

    #[test]
    fn v2_round_trips_items_up_to_coverable_flag() {
        let items = sample_items();
        let bytes = v2::write(&items).unwrap();
        let loaded = v2::read(&bytes).unwrap();
        assert_eq!(loaded.len(), items.len());
        for (original, reloaded) in items.iter().zip(loaded.iter()) {
            assert_eq!(original.res_type, reloaded.res_type);
            assert_eq!(original.id, reloaded.id);
            assert_eq!(original.name, reloaded.name);
            assert_eq!(original.data, reloaded.data);
            assert!(reloaded.coverable);
        }
    }

    #[test]
    fn reader_rejects_truncated_buffers() {
        let items = sample_items();
        let bytes = v1::write(&items).unwrap();
        let truncated = &bytes[..bytes.len() - 10];
        assert!(v1::read(truncated).is_err());
    }
}
