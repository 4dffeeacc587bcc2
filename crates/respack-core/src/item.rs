//! `ResourceItem` and the length-prefixed data-payload framing (spec §3.2,
//! §3.4).

use crate::qualifier::{format_limit_key, KeyParam, BASE_LIMIT_KEY};
use crate::restype::ResType;
use std::path::PathBuf;

/// One compiled resource variant.
///
/// Invariants (spec §3.2): `(res_type, name, limit_key)` is unique within
/// a merged set except for overlay pairs where exactly one side is
/// `coverable`; `name` uniqueness is enforced per `res_type`, not
/// globally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceItem {
    pub name: String,
    pub res_type: ResType,
    pub qualifiers: Vec<KeyParam>,
    pub limit_key: String,
    pub source_path: PathBuf,
    pub data: Vec<u8>,
    pub coverable: bool,
}

impl ResourceItem {
    /// Builds an item, deriving `limit_key` from `qualifiers`.
    pub fn new(
        name: impl Into<String>,
        res_type: ResType,
        qualifiers: Vec<KeyParam>,
        source_path: PathBuf,
        data: Vec<u8>,
    ) -> Self {
        let limit_key = format_limit_key(&qualifiers);
        Self {
            name: name.into(),
            res_type,
            qualifiers,
            limit_key,
            source_path,
            data,
            coverable: false,
        }
    }

    pub fn is_base(&self) -> bool {
        self.limit_key == BASE_LIMIT_KEY
    }

    /// The `(res_type, name, limit_key)` triple used for duplicate and
    /// merge-key detection.
    pub fn merge_key(&self) -> (ResType, String, String) {
        (self.res_type, self.name.clone(), self.limit_key.clone())
    }

    /// `data` interpreted as UTF-8 text, for scalar types.
    pub fn data_as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

/// Writes one length-prefixed byte string: `u16` little-endian length,
/// the bytes, then a single trailing NUL (spec §3.4).
pub fn frame_bytes(out: &mut Vec<u8>, value: &[u8]) {
    let len = u16::try_from(value.len()).expect("framed value exceeds u16::MAX bytes");
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(value);
    out.push(0u8);
}

/// Reads one length-prefixed byte string starting at `pos`, advancing
/// `pos` past it (length + bytes + trailing NUL). Returns `None` if the
/// buffer is too short.
pub fn read_framed(buf: &[u8], pos: &mut usize) -> Option<Vec<u8>> {
    if buf.len() < *pos + 2 {
        return None;
    }
    let len = u16::from_le_bytes([buf[*pos], buf[*pos + 1]]) as usize;
    let start = *pos + 2;
    let end = start + len;
    if buf.len() < end + 1 {
        return None;
    }
    let value = buf[start..end].to_vec();
    *pos = end + 1;
    Some(value)
}

/// Concatenates a sequence of byte strings into their framed form
/// (used for `StrArray`/`IntArray`/`Theme`/`Pattern`/`Plural` payloads).
pub fn compose_framed(values: impl IntoIterator<Item = impl AsRef<[u8]>>) -> Vec<u8> {
    let mut out = Vec::new();
    for value in values {
        frame_bytes(&mut out, value.as_ref());
    }
    out
}

/// Inverse of [`compose_framed`]: splits a framed byte buffer back into
/// its component values, in order.
pub fn decompose_framed(buf: &[u8]) -> Vec<Vec<u8>> {
    let mut pos = 0;
    let mut out = Vec::new();
    while let Some(value) = read_framed(buf, &mut pos) {
        out.push(value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_round_trip() {
        let values: Vec<&[u8]> = vec![b"Hello", b"", b"world!"];
        let composed = compose_framed(values.clone());
        let decomposed = decompose_framed(&composed);
        let decomposed_refs: Vec<&[u8]> = decomposed.iter().map(|v| v.as_slice()).collect();
        assert_eq!(decomposed_refs, values);
    }

    #[test]
    fn framing_preserves_empty_string() {
        let composed = compose_framed(vec![b"".as_slice()]);
        assert_eq!(composed, vec![0u8, 0u8, 0u8]);
        let decomposed = decompose_framed(&composed);
        assert_eq!(decomposed, vec![Vec::<u8>::new()]);
    }

    #[test]
    fn read_framed_rejects_truncated_buffer() {
        let mut pos = 0;
        let buf = [5u8, 0u8, b'h', b'i'];
        assert!(read_framed(&buf, &mut pos).is_none());
    }
}
