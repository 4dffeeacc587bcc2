//! Resource type enumerant (spec §Glossary, `original_source/resource_data.h`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of value a [`crate::item::ResourceItem`] carries. Discriminants
/// match the wire format used by the binary index (spec §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ResType {
    Element = 0,
    Raw = 6,
    Integer = 8,
    String = 9,
    StrArray = 10,
    IntArray = 11,
    Boolean = 12,
    Color = 14,
    Id = 15,
    Theme = 16,
    Plural = 17,
    Float = 18,
    Media = 19,
    Profile = 20,
    Pattern = 22,
    Symbol = 23,
    Res = 24,
}

impl ResType {
    /// All element-compiler resource types (the ones valid as the
    /// top-level key of an element JSON file).
    pub const ELEMENT_TYPES: [ResType; 11] = [
        ResType::String,
        ResType::Integer,
        ResType::Boolean,
        ResType::Color,
        ResType::Float,
        ResType::StrArray,
        ResType::IntArray,
        ResType::Theme,
        ResType::Pattern,
        ResType::Plural,
        ResType::Symbol,
    ];

    /// Scalar element types whose `data` is plain UTF-8 text.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            ResType::String
                | ResType::Integer
                | ResType::Boolean
                | ResType::Color
                | ResType::Float
                | ResType::Symbol
        )
    }

    /// Array element types whose `data` is a framed concatenation.
    pub fn is_array(self) -> bool {
        matches!(self, ResType::StrArray | ResType::IntArray)
    }

    /// Pair (key,value) compound types, optionally carrying a parent.
    pub fn is_pair(self) -> bool {
        matches!(self, ResType::Theme | ResType::Pattern | ResType::Plural)
    }

    /// Types whose `data` is a relative output path to a copied asset.
    pub fn is_path(self) -> bool {
        matches!(
            self,
            ResType::Media | ResType::Profile | ResType::Raw | ResType::Res
        )
    }

    /// Parses the lowercase name used as an element JSON top-level key or
    /// inside a `$type:name` reference.
    pub fn from_tag(tag: &str) -> Option<ResType> {
        Some(match tag {
            "string" => ResType::String,
            "integer" => ResType::Integer,
            "boolean" => ResType::Boolean,
            "color" => ResType::Color,
            "float" => ResType::Float,
            "strarray" => ResType::StrArray,
            "intarray" => ResType::IntArray,
            "theme" => ResType::Theme,
            "pattern" => ResType::Pattern,
            "plural" => ResType::Plural,
            "symbol" => ResType::Symbol,
            "media" => ResType::Media,
            "profile" => ResType::Profile,
            "raw" => ResType::Raw,
            "res" => ResType::Res,
            "id" => ResType::Id,
            _ => return None,
        })
    }

    /// The lowercase tag used by `$type:name` references and
    /// `ResourceTable.txt`.
    pub fn tag(self) -> &'static str {
        match self {
            ResType::Element => "element",
            ResType::Raw => "raw",
            ResType::Integer => "integer",
            ResType::String => "string",
            ResType::StrArray => "strarray",
            ResType::IntArray => "intarray",
            ResType::Boolean => "boolean",
            ResType::Color => "color",
            ResType::Id => "id",
            ResType::Theme => "theme",
            ResType::Plural => "plural",
            ResType::Float => "float",
            ResType::Media => "media",
            ResType::Profile => "profile",
            ResType::Pattern => "pattern",
            ResType::Symbol => "symbol",
            ResType::Res => "res",
        }
    }
}

impl fmt::Display for ResType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Which ID allocation cluster a build targets (spec §3.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceIdCluster {
    App,
    System,
}

/// Base ID and legal range bounds for the `app` cluster.
pub const APP_ID_BASE: u32 = 0x0100_0000;
pub const APP_ID_RANGE_LOW: (u32, u32) = (0x0100_0000, 0x06FF_FFFF);
pub const APP_ID_RANGE_HIGH: (u32, u32) = (0x0800_0000, 0xFFFF_FFFF);
/// Reserved for system resources; never assigned to the app cluster.
pub const SYSTEM_RESERVED_RANGE: (u32, u32) = (0x0700_0000, 0x07FF_FFFF);
/// Base ID for the special `ohos.global.systemres` module.
pub const SYSTEM_ID_BASE: u32 = 0x0780_0000;

/// Returns true if `id` falls in one of the two legal app ranges and
/// outside the reserved system range.
pub fn is_legal_app_start_id(id: u32) -> bool {
    let in_low = id >= APP_ID_RANGE_LOW.0 && id <= APP_ID_RANGE_LOW.1;
    let in_high = id >= APP_ID_RANGE_HIGH.0 && id <= APP_ID_RANGE_HIGH.1;
    in_low || in_high
}
