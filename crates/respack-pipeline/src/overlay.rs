//! Overlay / HAP load (spec §4.9): the first input becomes module 0
//! and pre-seeds the dedup sets, merger, and ID worker before the
//! remaining modules compile.

use respack_core::context::DedupState;
use respack_core::{KeyParam, ResourceItem};
use respack_index::{header, v1, v2, IndexError, IndexedItem};
use respack_ids::ResKey;
use std::collections::HashMap;
use std::path::Path;
use walkdir::WalkDir;

/// Whether `first_input` looks like a prior HAP build: it carries a
/// `resources.index` at its root (spec §4.9 "signaled by the first
/// input path containing a prebuilt resources.index").
pub fn is_overlay_input(first_input: &Path) -> bool {
    first_input.join("resources.index").exists()
}

pub struct OverlayLoad {
    pub items: Vec<ResourceItem>,
    pub ids: HashMap<ResKey, u32>,
}

fn indexed_to_resource(item: IndexedItem, module_name: &str) -> ResourceItem {
    let qualifiers: Vec<KeyParam> = item.qualifiers;
    let mut resource = ResourceItem::new(
        item.name,
        item.res_type,
        qualifiers,
        Path::new(module_name).join("resources.index"),
        item.data,
    );
    resource.coverable = true;
    resource
}

/// Loads a prior HAP's binary trees and index (spec §4.9 steps 1-2):
/// every file under a `rawfile`/`resfile` tree is registered into
/// both dedup sets via [`DedupState::seed_from_hap`], and every loaded
/// item comes back marked `coverable`.
pub fn load_hap(hap_root: &Path, dedup: &DedupState) -> Result<OverlayLoad, IndexError> {
    for cluster_dir in ["rawfile", "resfile"] {
        for entry in WalkDir::new(hap_root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.components().any(|c| c.as_os_str() == cluster_dir) {
                dedup.seed_from_hap(path.to_path_buf());
            }
        }
    }

    let index_path = hap_root.join("resources.index");
    let bytes = std::fs::read(&index_path).map_err(|e| IndexError::InvalidResourceIndex(e.to_string()))?;
    if bytes.len() < header::VERSION_TAG_LEN {
        return Err(IndexError::InvalidResourceIndex("index file too short".into()));
    }
    let mut tag = [0u8; header::VERSION_TAG_LEN];
    tag.copy_from_slice(&bytes[..header::VERSION_TAG_LEN]);
    let indexed = match header::detect_version(&tag) {
        Some(header::IndexVersion::V1) => v1::read(&bytes)?,
        Some(header::IndexVersion::V2) => v2::read(&bytes)?,
        None => return Err(IndexError::InvalidResourceIndex("unrecognized version header".into())),
    };

    let module_name = hap_root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("hap")
        .to_string();
    let mut ids = HashMap::new();
    let mut items = Vec::with_capacity(indexed.len());
    for item in indexed {
        ids.entry((item.res_type, item.name.clone())).or_insert(item.id);
        items.push(indexed_to_resource(item, &module_name));
    }
    Ok(OverlayLoad { items, ids })
}

#[cfg(test)]
mod tests {
    use super::*;
    use respack_core::ResType;
    use tempfile::tempdir;

    #[test]
    fn detects_overlay_by_index_presence() {
        let dir = tempdir().unwrap();
        assert!(!is_overlay_input(dir.path()));
        std::fs::write(dir.path().join("resources.index"), b"x").unwrap();
        assert!(is_overlay_input(dir.path()));
    }

    #[test]
    fn loads_index_and_marks_items_coverable() {
        let dir = tempdir().unwrap();
        let items = vec![IndexedItem::new(ResType::String, 0x0100_0000, "app_name", vec![], b"Hello".to_vec())];
        let bytes = v1::write(&items).unwrap();
        std::fs::write(dir.path().join("resources.index"), bytes).unwrap();

        let dedup = DedupState::new();
        let loaded = load_hap(dir.path(), &dedup).unwrap();
        assert_eq!(loaded.items.len(), 1);
        assert!(loaded.items[0].coverable);
        assert_eq!(loaded.ids[&(ResType::String, "app_name".to_string())], 0x0100_0000);
    }
}
