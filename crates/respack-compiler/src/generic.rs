//! Generic (media/profile) compiler (spec §4.4).

use crate::scanner::FileInfo;
use crate::transcoder::Transcoder;
use respack_core::context::{ClaimOutcome, DedupState};
use respack_core::{DiagKind, Diagnostic, ResType, ResourceItem};
use std::path::{Path, PathBuf};

/// Options that vary per invoking module (spec §4.4 step 4).
pub struct GenericCompileOptions<'a> {
    pub module_name: &'a str,
    pub output_root: &'a Path,
    pub allow_transcode_fallback: bool,
    pub overlay_sourced: bool,
}

/// Result of compiling one media/profile/raw/res file: `None` means
/// the path was a dedup hit and a warning was already recorded.
pub fn compile_generic_file(
    file: &FileInfo,
    res_type: ResType,
    opts: &GenericCompileOptions,
    dedup: &DedupState,
    transcoder: &dyn Transcoder,
) -> Result<Option<ResourceItem>, Diagnostic> {
    let cluster_name = file
        .dir
        .dir_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let relative = format!(
        "resources/{}/{}/{}",
        file.dir.limit_key, cluster_name, file.filename
    );
    let output_path: PathBuf = opts.output_root.join(&relative);

    let claim = dedup.claim(&output_path);
    if claim == ClaimOutcome::AlreadyWritten {
        return Ok(None);
    }

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Diagnostic::new(DiagKind::IoFailure, &[&parent.display().to_string(), &e.to_string()]))?;
    }

    let bytes = if opts.module_name != "har" && res_type == ResType::Media {
        match transcoder.transcode(&file.file_path, true) {
            Ok(result) => result.dst_bytes,
            Err(err) if err.is_not_applicable() || opts.allow_transcode_fallback => {
                std::fs::read(&file.file_path).map_err(|e| {
                    Diagnostic::new(
                        DiagKind::IoFailure,
                        &[&file.file_path.display().to_string(), &e.to_string()],
                    )
                })?
            }
            Err(err) => {
                return Err(Diagnostic::new(
                    DiagKind::TranscodeFailed,
                    &[&file.file_path.display().to_string(), &err.to_string()],
                ))
            }
        }
    } else {
        std::fs::read(&file.file_path).map_err(|e| {
            Diagnostic::new(
                DiagKind::IoFailure,
                &[&file.file_path.display().to_string(), &e.to_string()],
            )
        })?
    };
    std::fs::write(&output_path, &bytes)
        .map_err(|e| Diagnostic::new(DiagKind::IoFailure, &[&output_path.display().to_string(), &e.to_string()]))?;

    let module_relative = format!(
        "{}/{}",
        opts.module_name, relative
    );
    let mut item = ResourceItem::new(
        file.filename.clone(),
        res_type,
        file.dir.qualifiers.clone(),
        file.file_path.clone(),
        module_relative.into_bytes(),
    );
    item.coverable = opts.overlay_sourced;
    Ok(Some(item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{Cluster, DirectoryInfo};
    use crate::transcoder::IdentityTranscoder;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn copies_file_and_records_module_relative_path() {
        let src_root = tempdir().unwrap();
        let out_root = tempdir().unwrap();
        let media_dir = src_root.path().join("base/media");
        fs::create_dir_all(&media_dir).unwrap();
        fs::write(media_dir.join("icon.png"), b"pngdata").unwrap();

        let dir = DirectoryInfo {
            limit_key: "base".into(),
            cluster: Cluster::Media,
            dir_path: media_dir.clone(),
            qualifiers: vec![],
        };
        let file = FileInfo {
            dir,
            file_path: media_dir.join("icon.png"),
            filename: "icon.png".into(),
        };
        let dedup = DedupState::new();
        let transcoder = IdentityTranscoder;
        let opts = GenericCompileOptions {
            module_name: "entry",
            output_root: out_root.path(),
            allow_transcode_fallback: true,
            overlay_sourced: false,
        };
        let item = compile_generic_file(&file, ResType::Media, &opts, &dedup, &transcoder)
            .unwrap()
            .unwrap();
        assert_eq!(item.data_as_str(), Some("entry/resources/base/media/icon.png"));
        assert!(out_root.path().join("resources/base/media/icon.png").exists());
    }

    #[test]
    fn second_write_to_same_path_is_a_dedup_hit() {
        let src_root = tempdir().unwrap();
        let out_root = tempdir().unwrap();
        let media_dir = src_root.path().join("base/media");
        fs::create_dir_all(&media_dir).unwrap();
        fs::write(media_dir.join("icon.png"), b"pngdata").unwrap();

        let dir = DirectoryInfo {
            limit_key: "base".into(),
            cluster: Cluster::Media,
            dir_path: media_dir.clone(),
            qualifiers: vec![],
        };
        let file = FileInfo {
            dir,
            file_path: media_dir.join("icon.png"),
            filename: "icon.png".into(),
        };
        let dedup = DedupState::new();
        let transcoder = IdentityTranscoder;
        let opts = GenericCompileOptions {
            module_name: "entry",
            output_root: out_root.path(),
            allow_transcode_fallback: true,
            overlay_sourced: false,
        };
        compile_generic_file(&file, ResType::Media, &opts, &dedup, &transcoder).unwrap();
        let second = compile_generic_file(&file, ResType::Media, &opts, &dedup, &transcoder).unwrap();
        assert!(second.is_none());
    }
}
