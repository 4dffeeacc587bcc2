//! Qualifier (`KeyParam`) model and canonical limit-key formatting.
//!
//! A qualifier is a typed `(kind, value)` pair attached to a resource
//! variant. The *limit-key* is the canonical string form of an ordered
//! qualifier list, as produced by [`format_limit_key`]. Parsing a
//! directory segment back into a qualifier list is the job of
//! `respack-compiler::qualifier_parser`; this crate only owns the
//! data model and the formatter, since both the scanner and the index
//! writer need the canonical string form.

use serde::{Deserialize, Serialize};

/// The literal limit-key used for resources with no qualifiers.
pub const BASE_LIMIT_KEY: &str = "base";

/// The kind of a single qualifier parameter.
///
/// Discriminants mirror the `KeyType` enum of the packaged format so that
/// `kind as u32` is the wire value used by both index layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum QualifierKind {
    Language = 0,
    Region = 1,
    Resolution = 2,
    Orientation = 3,
    DeviceType = 4,
    Script = 5,
    NightMode = 6,
    Mcc = 7,
    Mnc = 8,
    InputDevice = 10,
}

impl QualifierKind {
    /// All kinds in the fixed recognition / formatting order used by the
    /// directory-name parser and the canonical formatter.
    pub const ORDER: [QualifierKind; 10] = [
        QualifierKind::Language,
        QualifierKind::Script,
        QualifierKind::Region,
        QualifierKind::Mcc,
        QualifierKind::Mnc,
        QualifierKind::Orientation,
        QualifierKind::DeviceType,
        QualifierKind::NightMode,
        QualifierKind::Resolution,
        QualifierKind::InputDevice,
    ];

    /// Joins with the *previous* canonical-form token using `_` instead
    /// of `-`. Only `Region` and `Mnc` do this (spec §3.1).
    pub fn joins_with_underscore(self) -> bool {
        matches!(self, QualifierKind::Region | QualifierKind::Mnc)
    }
}

/// A single typed qualifier parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyParam {
    pub kind: QualifierKind,
    pub value: u32,
}

impl KeyParam {
    pub fn new(kind: QualifierKind, value: u32) -> Self {
        Self { kind, value }
    }
}

/// Device orientation, packed into [`KeyParam::value`] for
/// [`QualifierKind::Orientation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Vertical = 0,
    Horizontal = 1,
}

/// Device type, packed into [`KeyParam::value`] for
/// [`QualifierKind::DeviceType`]. `3` and `5` are reserved and never
/// produced by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Phone = 0,
    Tablet = 1,
    Car = 2,
    Tv = 4,
    Wearable = 6,
    TwoInOne = 7,
}

impl DeviceType {
    pub fn from_value(value: u32) -> Option<Self> {
        Some(match value {
            0 => DeviceType::Phone,
            1 => DeviceType::Tablet,
            2 => DeviceType::Car,
            4 => DeviceType::Tv,
            6 => DeviceType::Wearable,
            7 => DeviceType::TwoInOne,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            DeviceType::Phone => "phone",
            DeviceType::Tablet => "tablet",
            DeviceType::Car => "car",
            DeviceType::Tv => "tv",
            DeviceType::Wearable => "wearable",
            DeviceType::TwoInOne => "2in1",
        }
    }
}

/// Screen resolution bucket (dpi), packed into [`KeyParam::value`] for
/// [`QualifierKind::Resolution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Sdpi = 120,
    Mdpi = 160,
    Ldpi = 240,
    Xldpi = 320,
    Xxldpi = 480,
    Xxxldpi = 640,
}

impl Resolution {
    pub fn from_value(value: u32) -> Option<Self> {
        Some(match value {
            120 => Resolution::Sdpi,
            160 => Resolution::Mdpi,
            240 => Resolution::Ldpi,
            320 => Resolution::Xldpi,
            480 => Resolution::Xxldpi,
            640 => Resolution::Xxxldpi,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Resolution::Sdpi => "sdpi",
            Resolution::Mdpi => "mdpi",
            Resolution::Ldpi => "ldpi",
            Resolution::Xldpi => "xldpi",
            Resolution::Xxldpi => "xxldpi",
            Resolution::Xxxldpi => "xxxldpi",
        }
    }
}

/// `-1` bit pattern used for "not set" on [`QualifierKind::InputDevice`].
pub const INPUT_DEVICE_NOT_SET: u32 = u32::MAX;
/// The only other legal `InputDevice` value: "pointing device".
pub const INPUT_DEVICE_POINTING: u32 = 0;

/// Packs up to 4 ASCII bytes into a `u32` such that reading non-zero
/// bytes from the most-significant byte down to the least-significant
/// byte yields `code` back (spec §3.1). Used for `Language`, `Region`,
/// and `Script` values.
///
/// `code` must be non-empty and at most 4 ASCII bytes; longer input is
/// truncated to the first 4 bytes (callers validate length beforehand).
pub fn pack_code(code: &str) -> u32 {
    let bytes = code.as_bytes();
    let len = bytes.len().min(4);
    let mut out = [0u8; 4];
    // Place bytes at the most-significant end: index 3 is the MSB of a
    // little-endian u32, so the first character of `code` lands there.
    for (i, b) in bytes[..len].iter().enumerate() {
        out[3 - i] = *b;
    }
    u32::from_le_bytes(out)
}

/// Inverse of [`pack_code`]: reads non-zero bytes from MSB to LSB.
pub fn unpack_code(value: u32) -> String {
    let bytes = value.to_le_bytes();
    let mut out = String::with_capacity(4);
    for b in bytes.iter().rev() {
        if *b != 0 {
            out.push(*b as char);
        }
    }
    out
}

/// Renders a single qualifier's value to its canonical textual token,
/// without kind-specific prefixes (`mcc`/`mnc`) or separators.
fn value_token(param: &KeyParam) -> String {
    match param.kind {
        QualifierKind::Orientation => {
            if param.value == Orientation::Vertical as u32 {
                "vertical".to_string()
            } else {
                "horizontal".to_string()
            }
        }
        QualifierKind::NightMode => {
            if param.value == 0 {
                "dark".to_string()
            } else {
                "light".to_string()
            }
        }
        QualifierKind::DeviceType => DeviceType::from_value(param.value)
            .map(|d| d.name().to_string())
            .unwrap_or_default(),
        QualifierKind::Resolution => Resolution::from_value(param.value)
            .map(|r| r.name().to_string())
            .unwrap_or_default(),
        QualifierKind::Language | QualifierKind::Script | QualifierKind::Region => {
            unpack_code(param.value)
        }
        QualifierKind::InputDevice => {
            if param.value == INPUT_DEVICE_NOT_SET {
                String::new()
            } else {
                "pointingdevice".to_string()
            }
        }
        QualifierKind::Mcc | QualifierKind::Mnc => param.value.to_string(),
    }
}

/// Formats an ordered qualifier list into its canonical limit-key
/// string (spec §3.1). Empty input formats to `"base"`.
pub fn format_limit_key(params: &[KeyParam]) -> String {
    if params.is_empty() {
        return BASE_LIMIT_KEY.to_string();
    }
    let mut result = String::new();
    for param in params {
        let mut token = value_token(param);
        if token.is_empty() {
            continue;
        }
        match param.kind {
            QualifierKind::Mcc => token = format!("mcc{token}"),
            QualifierKind::Mnc => token = format!("mnc{token}"),
            _ => {}
        }
        if param.kind.joins_with_underscore() {
            result.push('_');
        } else if !result.is_empty() {
            result.push('-');
        }
        result.push_str(&token);
    }
    if result.is_empty() {
        BASE_LIMIT_KEY.to_string()
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_round_trip() {
        for code in ["zh", "CN", "Hans", "en", "419"] {
            let packed = pack_code(code);
            assert_eq!(unpack_code(packed), code, "round trip for {code}");
        }
    }

    #[test]
    fn base_limit_key_for_empty() {
        assert_eq!(format_limit_key(&[]), "base");
    }

    #[test]
    fn canonical_join_rules() {
        let params = vec![
            KeyParam::new(QualifierKind::Language, pack_code("zh")),
            KeyParam::new(QualifierKind::Region, pack_code("CN")),
            KeyParam::new(QualifierKind::Orientation, Orientation::Vertical as u32),
            KeyParam::new(QualifierKind::DeviceType, DeviceType::Phone as u32),
            KeyParam::new(QualifierKind::Resolution, Resolution::Mdpi as u32),
        ];
        assert_eq!(
            format_limit_key(&params),
            "zh_CN-vertical-phone-mdpi"
        );
    }

    #[test]
    fn mcc_mnc_prefixes_and_underscore() {
        let params = vec![
            KeyParam::new(QualifierKind::Mcc, 460),
            KeyParam::new(QualifierKind::Mnc, 0),
        ];
        assert_eq!(format_limit_key(&params), "mcc460_mnc0");
    }
}
