//! Canonical data model, diagnostics, and shared pipeline state for a
//! directory-driven resource packager.
//!
//! This crate has no I/O and no concurrency of its own: it defines the
//! types every other `respack-*` crate exchanges (`ResourceItem`,
//! `ResType`, `KeyParam`/limit-keys), the diagnostic catalog, and the
//! dedup state threaded explicitly through a build.

pub mod context;
pub mod diag;
pub mod item;
pub mod qualifier;
pub mod restype;

pub use context::{ClaimOutcome, DedupState};
pub use diag::{DiagCategory, DiagKind, DiagSink, Diagnostic};
pub use item::{compose_framed, decompose_framed, frame_bytes, read_framed, ResourceItem};
pub use qualifier::{
    format_limit_key, DeviceType, KeyParam, Orientation, QualifierKind, Resolution,
    BASE_LIMIT_KEY,
};
pub use restype::{
    is_legal_app_start_id, ResType, ResourceIdCluster, APP_ID_BASE, APP_ID_RANGE_HIGH,
    APP_ID_RANGE_LOW, SYSTEM_ID_BASE, SYSTEM_RESERVED_RANGE,
};

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn base_item_round_trips_through_merge_key() {
        let item = ResourceItem::new(
            "app_name",
            ResType::String,
            vec![],
            PathBuf::from("base/element/string.json"),
            b"My App".to_vec(),
        );
        assert!(item.is_base());
        assert_eq!(
            item.merge_key(),
            (ResType::String, "app_name".to_string(), "base".to_string())
        );
        assert_eq!(item.data_as_str(), Some("My App"));
    }

    #[test]
    fn qualified_item_derives_limit_key_from_params() {
        let params = vec![KeyParam::new(
            QualifierKind::Language,
            qualifier::pack_code("zh"),
        )];
        let item = ResourceItem::new(
            "app_name",
            ResType::String,
            params,
            PathBuf::from("zh/element/string.json"),
            b"\xe5\xba\x94\xe7\x94\xa8".to_vec(),
        );
        assert_eq!(item.limit_key, "zh");
        assert!(!item.is_base());
    }

    #[test]
    fn dedup_state_and_diag_sink_compose_across_threads() {
        let dedup = DedupState::new();
        let diags = DiagSink::new();
        let path = PathBuf::from("out/resources/base/media/icon.png");
        assert_eq!(dedup.claim(&path), ClaimOutcome::Proceed);
        if dedup.claim(&path) == ClaimOutcome::AlreadyWritten {
            diags.push(Diagnostic::new(
                DiagKind::ResourceDuplicate,
                &["media", "icon", "base", "a.png", "b.png"],
            ));
        }
        assert_eq!(diags.len(), 1);
    }
}
