//! Directory scanning, qualifier parsing, and the element/generic/binary
//! compilers (spec §4.1–§4.4, §4.11).

pub mod binary_copier;
pub mod element;
pub mod generic;
pub mod qualifier_parser;
pub mod scanner;
pub mod transcoder;

pub use element::compile_element_file;
pub use generic::{compile_generic_file, GenericCompileOptions};
pub use qualifier_parser::{parse_qualifiers, QualifierParseError};
pub use scanner::{scan_files, scan_root, Cluster, DirectoryInfo, FileInfo, IgnoreConfig, IgnoreScope};
pub use transcoder::{DylibTranscoder, IdentityTranscoder, ImageSize, TranscodeError, Transcoder};

#[cfg(test)]
mod integration_tests {
    use super::*;
    use respack_core::context::DedupState;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn scanner_and_element_compiler_compose() {
        let root = tempdir().unwrap();
        fs::create_dir_all(root.path().join("base/element")).unwrap();
        fs::write(
            root.path().join("base/element/string.json"),
            r#"{"string":[{"name":"app_name","value":"Hello"}]}"#,
        )
        .unwrap();

        let ignore = IgnoreConfig::default();
        let dirs = scan_root(root.path(), &ignore).unwrap();
        let dir = dirs.into_iter().find(|d| d.cluster == Cluster::Element).unwrap();
        let files = scan_files(&dir, &ignore).unwrap();
        let json = fs::read_to_string(&files[0].file_path).unwrap();
        let items =
            compile_element_file(&files[0].file_path, &dir.limit_key, &dir.qualifiers, &json).unwrap();
        assert_eq!(items[0].name, "app_name");
    }

    #[test]
    fn generic_compiler_respects_shared_dedup_state() {
        let root = tempdir().unwrap();
        let out_root = tempdir().unwrap();
        fs::create_dir_all(root.path().join("base/media")).unwrap();
        fs::write(root.path().join("base/media/icon.png"), b"png").unwrap();

        let ignore = IgnoreConfig::default();
        let dirs = scan_root(root.path(), &ignore).unwrap();
        let dir = dirs.into_iter().find(|d| d.cluster == Cluster::Media).unwrap();
        let files = scan_files(&dir, &ignore).unwrap();
        let dedup = DedupState::new();
        let transcoder = IdentityTranscoder;
        let opts = GenericCompileOptions {
            module_name: "entry",
            output_root: out_root.path(),
            allow_transcode_fallback: true,
            overlay_sourced: false,
        };
        let item = compile_generic_file(
            &files[0],
            respack_core::ResType::Media,
            &opts,
            &dedup,
            &transcoder,
        )
        .unwrap()
        .unwrap();
        assert_eq!(dedup.written_count(), 1);
        assert!(item.data_as_str().unwrap().ends_with("icon.png"));
    }
}
