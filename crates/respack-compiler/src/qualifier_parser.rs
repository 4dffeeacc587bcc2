//! Directory-segment qualifier parsing (spec §4.1).
//!
//! No file in `original_source/` survived the corpus filter for this
//! direction (only the limit-key *formatter*, `GetLocaleLimitkey` and
//! `PaserKeyParam`, is present — see `respack_core::qualifier`). The
//! token vocabulary below is reconstructed from spec.md's prose and
//! from the reverse-direction functions that do survive; recorded as
//! a resolved open question in the project's grounding ledger.

use respack_core::qualifier::{pack_code, DeviceType, Orientation, Resolution};
use respack_core::{KeyParam, QualifierKind, BASE_LIMIT_KEY};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QualifierParseError {
    #[error("directory segment {segment:?}: token {token:?} did not match any qualifier kind")]
    UnresolvedToken { segment: String, token: String },
}

fn match_token(kind: QualifierKind, token: &str) -> Option<u32> {
    match kind {
        QualifierKind::Language => {
            let len = token.len();
            (2..=3)
                .contains(&len)
                .then(|| token.chars().all(|c| c.is_ascii_lowercase()))
                .unwrap_or(false)
                .then(|| pack_code(token))
        }
        QualifierKind::Script => {
            let mut chars = token.chars();
            let ok = token.len() == 4
                && chars.next().is_some_and(|c| c.is_ascii_uppercase())
                && chars.clone().all(|c| c.is_ascii_lowercase());
            ok.then(|| pack_code(token))
        }
        QualifierKind::Region => {
            let is_alpha2 = token.len() == 2 && token.chars().all(|c| c.is_ascii_uppercase());
            let is_digit3 = token.len() == 3 && token.chars().all(|c| c.is_ascii_digit());
            (is_alpha2 || is_digit3).then(|| pack_code(token))
        }
        QualifierKind::Mcc => token
            .strip_prefix("mcc")
            .filter(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
            .and_then(|rest| rest.parse().ok()),
        QualifierKind::Mnc => token
            .strip_prefix("mnc")
            .filter(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
            .and_then(|rest| rest.parse().ok()),
        QualifierKind::Orientation => match token {
            "vertical" => Some(Orientation::Vertical as u32),
            "horizontal" => Some(Orientation::Horizontal as u32),
            _ => None,
        },
        QualifierKind::DeviceType => match token {
            "phone" => Some(DeviceType::Phone as u32),
            "tablet" => Some(DeviceType::Tablet as u32),
            "car" => Some(DeviceType::Car as u32),
            "tv" => Some(DeviceType::Tv as u32),
            "wearable" => Some(DeviceType::Wearable as u32),
            "2in1" => Some(DeviceType::TwoInOne as u32),
            _ => None,
        },
        QualifierKind::NightMode => match token {
            "dark" => Some(0),
            "light" => Some(1),
            _ => None,
        },
        QualifierKind::Resolution => match token {
            "sdpi" => Some(Resolution::Sdpi as u32),
            "mdpi" => Some(Resolution::Mdpi as u32),
            "ldpi" => Some(Resolution::Ldpi as u32),
            "xldpi" => Some(Resolution::Xldpi as u32),
            "xxldpi" => Some(Resolution::Xxldpi as u32),
            "xxxldpi" => Some(Resolution::Xxxldpi as u32),
            _ => None,
        },
        QualifierKind::InputDevice => (token == "pointingdevice").then_some(0),
    }
}

/// Parses a directory segment such as `zh_CN-vertical-phone-mdpi` into
/// an ordered `KeyParam` list. `"base"` parses to the empty list.
///
/// Tokens are matched against [`QualifierKind::ORDER`] in order; once
/// a kind is consumed the parser never backtracks to an earlier kind,
/// but a token may match whichever of the *remaining* kinds fits first
/// (e.g. `Hans` between a language and a region token matches `Script`
/// because `Language` was already consumed).
pub fn parse_qualifiers(segment: &str) -> Result<Vec<KeyParam>, QualifierParseError> {
    if segment == BASE_LIMIT_KEY {
        return Ok(Vec::new());
    }
    let tokens: Vec<&str> = segment.split(['-', '_']).filter(|t| !t.is_empty()).collect();
    let mut result = Vec::new();
    let mut next_kind_idx = 0usize;
    'tokens: for token in tokens {
        for idx in next_kind_idx..QualifierKind::ORDER.len() {
            let kind = QualifierKind::ORDER[idx];
            if let Some(value) = match_token(kind, token) {
                result.push(KeyParam::new(kind, value));
                next_kind_idx = idx + 1;
                continue 'tokens;
            }
        }
        return Err(QualifierParseError::UnresolvedToken {
            segment: segment.to_string(),
            token: token.to_string(),
        });
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use respack_core::qualifier::format_limit_key;

    #[test]
    fn base_parses_to_empty() {
        assert_eq!(parse_qualifiers("base"), Ok(Vec::new()));
    }

    #[test]
    fn round_trips_through_formatter() {
        for segment in [
            "zh_CN-vertical-phone-mdpi",
            "en-vertical",
            "zh-Hans-vertical",
            "mcc460_mnc0",
        ] {
            let parsed = parse_qualifiers(segment).unwrap();
            assert_eq!(format_limit_key(&parsed), segment, "round trip for {segment}");
        }
    }

    #[test]
    fn unknown_token_fails_whole_directory() {
        let err = parse_qualifiers("zh-bogus-token").unwrap_err();
        assert!(matches!(err, QualifierParseError::UnresolvedToken { .. }));
    }

    #[test]
    fn script_is_recognized_between_language_and_region() {
        let parsed = parse_qualifiers("zh-Hans-CN").unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[1].kind, QualifierKind::Script);
    }
}
