//! `--target-config` selective-compile filter (spec §6.3).
//!
//! Grammar: `Segment[value{,value}*];Segment[…];…`. An item passes iff
//! every qualifier of its limit-key is either absent from the filter
//! or contained in the filter's value set for that qualifier's
//! segment.

use respack_core::qualifier::{unpack_code, DeviceType, Orientation, Resolution};
use respack_core::{KeyParam, QualifierKind, ResourceItem};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TargetConfigError {
    #[error("malformed --target-config segment: {0:?}")]
    MalformedSegment(String),
    #[error("unknown --target-config segment name: {0:?}")]
    UnknownSegment(String),
}

#[derive(Debug, Default)]
pub struct TargetConfigFilter {
    mcc_mnc: Option<HashSet<String>>,
    locale: Option<HashSet<String>>,
    orientation: Option<HashSet<String>>,
    device: Option<HashSet<String>>,
    color_mode: Option<HashSet<String>>,
    density: Option<HashSet<String>>,
}

/// Parses the grammar of spec §6.3. `Locale` values are split on `_`
/// so that a filter value like `zh_CN` matches either the `Language`
/// or the `Region` qualifier of an item independently.
pub fn parse_target_config(spec: &str) -> Result<TargetConfigFilter, TargetConfigError> {
    let mut filter = TargetConfigFilter::default();
    for segment in spec.split(';').filter(|s| !s.trim().is_empty()) {
        let open = segment.find('[').ok_or_else(|| TargetConfigError::MalformedSegment(segment.to_string()))?;
        if !segment.ends_with(']') {
            return Err(TargetConfigError::MalformedSegment(segment.to_string()));
        }
        let name = &segment[..open];
        let values_raw = &segment[open + 1..segment.len() - 1];
        let values: HashSet<String> = values_raw.split(',').map(|v| v.trim().to_string()).filter(|v| !v.is_empty()).collect();
        match name {
            "MccMnc" => filter.mcc_mnc = Some(values),
            "Locale" => {
                let mut components = HashSet::new();
                for value in &values {
                    components.insert(value.clone());
                    for part in value.split('_') {
                        components.insert(part.to_string());
                    }
                }
                filter.locale = Some(components);
            }
            "Orientation" => filter.orientation = Some(values),
            "Device" => filter.device = Some(values),
            "ColorMode" => filter.color_mode = Some(values),
            "Density" => filter.density = Some(values),
            _ => return Err(TargetConfigError::UnknownSegment(name.to_string())),
        }
    }
    Ok(filter)
}

fn mcc_mnc_token(param: &KeyParam) -> String {
    match param.kind {
        QualifierKind::Mcc => format!("mcc{}", param.value),
        QualifierKind::Mnc => format!("mnc{}", param.value),
        _ => unreachable!(),
    }
}

impl TargetConfigFilter {
    /// Whether `item` survives the filter: every qualifier it carries
    /// must be unrestricted or present in the matching value set.
    pub fn allows(&self, item: &ResourceItem) -> bool {
        for param in &item.qualifiers {
            let passes = match param.kind {
                QualifierKind::Language | QualifierKind::Region | QualifierKind::Script => self
                    .locale
                    .as_ref()
                    .map(|set| set.contains(&unpack_code(param.value)))
                    .unwrap_or(true),
                QualifierKind::Orientation => self
                    .orientation
                    .as_ref()
                    .map(|set| {
                        let name = if param.value == Orientation::Vertical as u32 { "vertical" } else { "horizontal" };
                        set.contains(name)
                    })
                    .unwrap_or(true),
                QualifierKind::DeviceType => self
                    .device
                    .as_ref()
                    .map(|set| {
                        DeviceType::from_value(param.value)
                            .map(|d| set.contains(d.name()))
                            .unwrap_or(false)
                    })
                    .unwrap_or(true),
                QualifierKind::NightMode => self
                    .color_mode
                    .as_ref()
                    .map(|set| set.contains(if param.value == 0 { "dark" } else { "light" }))
                    .unwrap_or(true),
                QualifierKind::Resolution => self
                    .density
                    .as_ref()
                    .map(|set| Resolution::from_value(param.value).map(|r| set.contains(r.name())).unwrap_or(false))
                    .unwrap_or(true),
                QualifierKind::Mcc | QualifierKind::Mnc => {
                    self.mcc_mnc.as_ref().map(|set| set.contains(&mcc_mnc_token(param))).unwrap_or(true)
                }
                QualifierKind::InputDevice => true,
            };
            if !passes {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use respack_core::{ResType, ResourceItem};
    use std::path::PathBuf;

    #[test]
    fn device_and_locale_filter_excludes_other_variants() {
        let filter = parse_target_config("Device[phone];Locale[en_US]").unwrap();
        let en = ResourceItem::new(
            "app_name",
            ResType::String,
            vec![KeyParam::new(QualifierKind::Language, respack_core::qualifier::pack_code("en"))],
            PathBuf::from("en/string.json"),
            b"Hello".to_vec(),
        );
        let zh = ResourceItem::new(
            "app_name",
            ResType::String,
            vec![KeyParam::new(QualifierKind::Language, respack_core::qualifier::pack_code("zh"))],
            PathBuf::from("zh/string.json"),
            b"Hi".to_vec(),
        );
        assert!(filter.allows(&en));
        assert!(!filter.allows(&zh));
    }

    #[test]
    fn unrestricted_segment_allows_everything() {
        let filter = parse_target_config("Device[phone]").unwrap();
        let item = ResourceItem::new(
            "app_name",
            ResType::String,
            vec![KeyParam::new(QualifierKind::Orientation, Orientation::Horizontal as u32)],
            PathBuf::from("p/string.json"),
            b"v".to_vec(),
        );
        assert!(filter.allows(&item));
    }

    #[test]
    fn malformed_segment_is_rejected() {
        assert!(parse_target_config("Device(phone)").is_err());
    }
}
