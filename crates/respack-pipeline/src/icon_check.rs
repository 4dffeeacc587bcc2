//! Icon checker (spec §4.12, optional): validates PNG icon dimensions
//! against a per-(dpi,device) maximum, including layered-icon media
//! recorded by the resolver (spec §4.7).

use respack_core::qualifier::{DeviceType, Resolution};
use respack_core::{DiagKind, DiagSink, Diagnostic, KeyParam, QualifierKind};

/// `(icon max, startwindow max)` per (dpi, device) pair (spec §4.12).
/// `DeviceType::Car` has no entries, matching the source table, which
/// only defines sizes for phone and tablet.
const NORMAL_SIZE_TABLE: &[((Resolution, DeviceType), (u32, u32))] = &[
    ((Resolution::Sdpi, DeviceType::Phone), (41, 144)),
    ((Resolution::Sdpi, DeviceType::Tablet), (51, 192)),
    ((Resolution::Mdpi, DeviceType::Phone), (54, 192)),
    ((Resolution::Mdpi, DeviceType::Tablet), (68, 256)),
    ((Resolution::Ldpi, DeviceType::Phone), (81, 288)),
    ((Resolution::Ldpi, DeviceType::Tablet), (102, 384)),
    ((Resolution::Xldpi, DeviceType::Phone), (108, 384)),
    ((Resolution::Xldpi, DeviceType::Tablet), (136, 512)),
    ((Resolution::Xxldpi, DeviceType::Phone), (162, 576)),
    ((Resolution::Xxldpi, DeviceType::Tablet), (204, 768)),
    ((Resolution::Xxxldpi, DeviceType::Phone), (216, 768)),
    ((Resolution::Xxxldpi, DeviceType::Tablet), (272, 1024)),
];

fn normal_size_for(resolution: Resolution, device: DeviceType) -> Option<(u32, u32)> {
    NORMAL_SIZE_TABLE
        .iter()
        .find(|((r, d), _)| *r == resolution && *d == device)
        .map(|(_, size)| *size)
}

fn resolution_of(qualifiers: &[KeyParam]) -> Option<Resolution> {
    qualifiers
        .iter()
        .find(|p| p.kind == QualifierKind::Resolution)
        .and_then(|p| Resolution::from_value(p.value))
}

fn device_of(qualifiers: &[KeyParam]) -> Option<DeviceType> {
    qualifiers
        .iter()
        .find(|p| p.kind == QualifierKind::DeviceType)
        .and_then(|p| DeviceType::from_value(p.value))
}

/// A decoded PNG's `(width, height)`, read by a minimal IHDR parse
/// (the transcoder boundary owns real image decoding; this only needs
/// the header for dimension checks).
fn png_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    if bytes.len() < 24 || bytes[..8] != PNG_SIGNATURE {
        return None;
    }
    let width = u32::from_be_bytes(bytes[16..20].try_into().ok()?);
    let height = u32::from_be_bytes(bytes[20..24].try_into().ok()?);
    Some((width, height))
}

/// Which manifest field slot an icon item was resolved through,
/// selecting column 0 (`icon`) or 1 (`startWindowIcon`) of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconSlot {
    Icon,
    StartWindow,
}

/// One icon to validate: the media item's own qualifiers/id, which
/// slot it fills, and its on-disk PNG bytes (already resolved to an
/// absolute path by the caller).
pub struct IconCandidate<'a> {
    pub id: u32,
    pub qualifiers: &'a [KeyParam],
    pub slot: IconSlot,
    pub png_bytes: &'a [u8],
}

/// Validates one icon candidate. Emits a warning per violation; never
/// fatal. Layered icons (spec §4.7 "layer-icon tracking") are not this
/// candidate's concern — the caller walks
/// [`ReferenceResolver::layer_icons_for`] and calls this once per layer
/// too, since only the caller has the item table and on-disk bytes
/// needed to build each layer's own `IconCandidate`.
pub fn check_icon(candidate: &IconCandidate, diag: &DiagSink) {
    check_one(candidate.id, candidate.qualifiers, candidate.slot, candidate.png_bytes, diag);
}

fn check_one(id: u32, qualifiers: &[KeyParam], slot: IconSlot, png_bytes: &[u8], diag: &DiagSink) {
    let Some((width, height)) = png_dimensions(png_bytes) else {
        return;
    };
    if width != height {
        diag.push(Diagnostic::new(
            DiagKind::IconSizeViolation,
            &[&id.to_string(), &width.to_string(), &height.to_string(), "square", "n/a", "?", "?"],
        ));
        return;
    }
    let Some(resolution) = resolution_of(qualifiers) else { return };
    let Some(device) = device_of(qualifiers) else { return };
    let Some((icon_max, startwindow_max)) = normal_size_for(resolution, device) else {
        return;
    };
    let max = match slot {
        IconSlot::Icon => icon_max,
        IconSlot::StartWindow => startwindow_max,
    };
    if width > max {
        diag.push(Diagnostic::new(
            DiagKind::IconSizeViolation,
            &[
                &id.to_string(),
                &width.to_string(),
                &height.to_string(),
                "max-width",
                &max.to_string(),
                resolution.name(),
                device.name(),
            ],
        ));
    }
}

/// Whether `key` (a manifest JSON field name from spec §4.7 item 4) is
/// one of the two icon slots the checker cares about.
pub fn icon_slot_for_field(field: &str) -> Option<IconSlot> {
    match field {
        "icon" => Some(IconSlot::Icon),
        "startWindowIcon" => Some(IconSlot::StartWindow),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_with_size(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&[0, 0, 0, 13]); // IHDR length, unused by our parser
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes
    }

    #[test]
    fn non_square_icon_warns() {
        let diag = DiagSink::new();
        let bytes = png_with_size(54, 60);
        let qualifiers = vec![
            KeyParam::new(QualifierKind::Resolution, Resolution::Mdpi as u32),
            KeyParam::new(QualifierKind::DeviceType, DeviceType::Phone as u32),
        ];
        check_one(1, &qualifiers, IconSlot::Icon, &bytes, &diag);
        assert_eq!(diag.len(), 1);
    }

    #[test]
    fn icon_within_limit_is_silent() {
        let diag = DiagSink::new();
        let bytes = png_with_size(54, 54);
        let qualifiers = vec![
            KeyParam::new(QualifierKind::Resolution, Resolution::Mdpi as u32),
            KeyParam::new(QualifierKind::DeviceType, DeviceType::Phone as u32),
        ];
        check_one(1, &qualifiers, IconSlot::Icon, &bytes, &diag);
        assert!(diag.is_empty());
    }

    #[test]
    fn icon_exceeding_limit_warns() {
        let diag = DiagSink::new();
        let bytes = png_with_size(200, 200);
        let qualifiers = vec![
            KeyParam::new(QualifierKind::Resolution, Resolution::Mdpi as u32),
            KeyParam::new(QualifierKind::DeviceType, DeviceType::Phone as u32),
        ];
        check_one(1, &qualifiers, IconSlot::Icon, &bytes, &diag);
        assert_eq!(diag.len(), 1);
    }

    #[test]
    fn unknown_dpi_device_pair_is_not_checked() {
        let diag = DiagSink::new();
        let bytes = png_with_size(999, 999);
        let qualifiers = vec![
            KeyParam::new(QualifierKind::Resolution, Resolution::Sdpi as u32),
            KeyParam::new(QualifierKind::DeviceType, DeviceType::Car as u32),
        ];
        check_one(1, &qualifiers, IconSlot::Icon, &bytes, &diag);
        assert!(diag.is_empty());
    }
}
