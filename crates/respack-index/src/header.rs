//! Version-header discrimination (spec §4.8.1).

/// Every index file begins with this many null-padded ASCII bytes.
pub const VERSION_TAG_LEN: usize = 128;

const V1_LITERAL: &[u8] = b"Respack 1.0.0";
const V2_LITERAL: &[u8] = b"Respack V2 1.0.0";

/// The constant that drives the v1-vs-v2 switch: the writer emits v2
/// when the loaded manifest declares `minAPIVersion` at or above this
/// value (spec §4.8, §9 open question — the source constant is not
/// stated in the specification and is fixed here as a named value).
pub const V2_MIN_API_VERSION: u32 = 9;

pub fn build_version_header(v2: bool) -> [u8; VERSION_TAG_LEN] {
    let mut out = [0u8; VERSION_TAG_LEN];
    let literal = if v2 { V2_LITERAL } else { V1_LITERAL };
    out[..literal.len()].copy_from_slice(literal);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexVersion {
    V1,
    V2,
}

/// Decides the layout from the first 128-byte header: v1 begins
/// `"Respack "`, v2 inserts `"V2"` immediately after the product name.
pub fn detect_version(header: &[u8; VERSION_TAG_LEN]) -> Option<IndexVersion> {
    let text_end = header.iter().position(|&b| b == 0).unwrap_or(header.len());
    let text = std::str::from_utf8(&header[..text_end]).ok()?;
    let mut tokens = text.split_whitespace();
    if tokens.next()? != "Respack" {
        return None;
    }
    match tokens.next() {
        Some("V2") => Some(IndexVersion::V2),
        Some(_) => Some(IndexVersion::V1),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_v1_and_v2() {
        assert_eq!(detect_version(&build_version_header(false)), Some(IndexVersion::V1));
        assert_eq!(detect_version(&build_version_header(true)), Some(IndexVersion::V2));
    }

    #[test]
    fn v2_is_chosen_at_or_above_threshold() {
        assert!(V2_MIN_API_VERSION <= 9);
    }
}
