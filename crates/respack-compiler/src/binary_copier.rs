//! Binary copier for `rawfile`/`resfile` trees (spec §4.4 item 5,
//! §4.10 cancellation pattern): recursive copy honoring the dedup
//! sets and a cooperative cancellation flag.

use crate::scanner::Cluster;
use respack_core::context::{ClaimOutcome, DedupState};
use respack_core::{DiagKind, Diagnostic, ResType, ResourceItem};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Copies every file under `source_dir` into
/// `<output_root>/resources/<limit_key>/<cluster>/<relative path>`,
/// polling `is_cancelled` at each directory-iteration boundary. A
/// task that observes cancellation returns
/// `Err(Diagnostic{kind: Cancelled, ..})` without touching the
/// filesystem (spec §8 property 8).
pub fn copy_binary_tree(
    source_dir: &Path,
    limit_key: &str,
    cluster: Cluster,
    module_name: &str,
    output_root: &Path,
    dedup: &DedupState,
    is_cancelled: &dyn Fn() -> bool,
) -> Result<Vec<ResourceItem>, Diagnostic> {
    if is_cancelled() {
        return Err(Diagnostic::new(DiagKind::Cancelled, &[&source_dir.display().to_string()]));
    }
    let res_type = cluster
        .fixed_res_type()
        .filter(|t| matches!(t, ResType::Raw | ResType::Res))
        .ok_or_else(|| {
            Diagnostic::new(DiagKind::SchemaViolation, &["binary", "?", "cluster is not a binary tree"])
        })?;
    let cluster_name = if res_type == ResType::Raw { "rawfile" } else { "resfile" };

    let mut items = Vec::new();
    let mut entries: Vec<PathBuf> = WalkDir::new(source_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .collect();
    entries.sort();

    for (seen_dirs, src_path) in entries.iter().enumerate() {
        if seen_dirs % 32 == 0 && is_cancelled() {
            return Err(Diagnostic::new(DiagKind::Cancelled, &[&src_path.display().to_string()]));
        }
        let relative = src_path
            .strip_prefix(source_dir)
            .unwrap_or(src_path)
            .to_string_lossy()
            .replace('\\', "/");
        let output_path = output_root
            .join("resources")
            .join(limit_key)
            .join(cluster_name)
            .join(&relative);

        if dedup.claim(&output_path) == ClaimOutcome::AlreadyWritten {
            continue;
        }
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Diagnostic::new(DiagKind::IoFailure, &[&parent.display().to_string(), &e.to_string()]))?;
        }
        std::fs::copy(src_path, &output_path)
            .map_err(|e| Diagnostic::new(DiagKind::IoFailure, &[&src_path.display().to_string(), &e.to_string()]))?;

        let data = format!("{module_name}/resources/{limit_key}/{cluster_name}/{relative}");
        items.push(ResourceItem::new(
            relative,
            res_type,
            Vec::new(),
            src_path.clone(),
            data.into_bytes(),
        ));
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::tempdir;

    #[test]
    fn copies_nested_tree_preserving_relative_paths() {
        let src_root = tempdir().unwrap();
        let out_root = tempdir().unwrap();
        fs::create_dir_all(src_root.path().join("sub")).unwrap();
        fs::write(src_root.path().join("a.bin"), b"a").unwrap();
        fs::write(src_root.path().join("sub/b.bin"), b"b").unwrap();

        let dedup = DedupState::new();
        let items = copy_binary_tree(
            src_root.path(),
            "base",
            Cluster::RawFile,
            "entry",
            out_root.path(),
            &dedup,
            &|| false,
        )
        .unwrap();
        assert_eq!(items.len(), 2);
        assert!(out_root.path().join("resources/base/rawfile/sub/b.bin").exists());
    }

    #[test]
    fn cancellation_is_observed_before_filesystem_touch() {
        let src_root = tempdir().unwrap();
        let out_root = tempdir().unwrap();
        fs::write(src_root.path().join("a.bin"), b"a").unwrap();
        let dedup = DedupState::new();
        let cancelled = AtomicBool::new(true);
        let err = copy_binary_tree(
            src_root.path(),
            "base",
            Cluster::RawFile,
            "entry",
            out_root.path(),
            &dedup,
            &|| cancelled.load(Ordering::SeqCst),
        )
        .unwrap_err();
        assert_eq!(err.kind, DiagKind::Cancelled);
        assert!(!out_root.path().join("resources").exists());
    }
}
