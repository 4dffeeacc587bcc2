//! Directory scanner (spec §4.2): walks `resources/<limit-key>/<cluster>/*`
//! and routes files to the right compiler by cluster.

use crate::qualifier_parser::{parse_qualifiers, QualifierParseError};
use regex::Regex;
use respack_core::{KeyParam, ResType};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Qualifier(#[from] QualifierParseError),
    #[error("unknown cluster name {0:?} under limit-key directory")]
    UnknownCluster(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Which sub-directory a resource file lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cluster {
    Element,
    Media,
    Profile,
    RawFile,
    ResFile,
}

impl Cluster {
    fn from_name(name: &str) -> Option<Cluster> {
        match name {
            "element" => Some(Cluster::Element),
            "media" => Some(Cluster::Media),
            "profile" => Some(Cluster::Profile),
            _ if name.starts_with("rawfile") => Some(Cluster::RawFile),
            _ if name.starts_with("resfile") => Some(Cluster::ResFile),
            _ => None,
        }
    }

    /// The fixed resource type for clusters whose type doesn't vary
    /// per file (media/profile/binary clusters); `None` for `element`,
    /// whose type comes from each JSON file's root key.
    pub fn fixed_res_type(self) -> Option<ResType> {
        match self {
            Cluster::Media => Some(ResType::Media),
            Cluster::Profile => Some(ResType::Profile),
            Cluster::RawFile => Some(ResType::Raw),
            Cluster::ResFile => Some(ResType::Res),
            Cluster::Element => None,
        }
    }
}

/// One `<limit-key>/<cluster>` directory discovered under an input root.
#[derive(Debug, Clone)]
pub struct DirectoryInfo {
    pub limit_key: String,
    pub cluster: Cluster,
    pub dir_path: PathBuf,
    pub qualifiers: Vec<KeyParam>,
}

/// A single file inside a cluster directory.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub dir: DirectoryInfo,
    pub file_path: PathBuf,
    pub filename: String,
}

/// The three sub-modes of a user-supplied ignore override (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreScope {
    All,
    FilesOnly,
    DirsOnly,
}

const DEFAULT_IGNORE_EXACT: &[&str] = &[".git", ".svn", "CVS", "Thumbs.db", "desktop.ini", "picasa.ini"];

fn default_ignored(name: &str) -> bool {
    name.starts_with('.') || name.ends_with(".scc") || name.ends_with('~') || DEFAULT_IGNORE_EXACT.contains(&name)
}

/// Process-wide ignore configuration: the fixed default set plus an
/// optional user regex override restricted to files, directories, or
/// both.
#[derive(Debug, Clone, Default)]
pub struct IgnoreConfig {
    pub override_regex: Option<(Regex, IgnoreScope)>,
}

impl IgnoreConfig {
    pub fn is_ignored(&self, name: &str, is_dir: bool) -> bool {
        if default_ignored(name) {
            return true;
        }
        if let Some((re, scope)) = &self.override_regex {
            let applies = match scope {
                IgnoreScope::All => true,
                IgnoreScope::FilesOnly => !is_dir,
                IgnoreScope::DirsOnly => is_dir,
            };
            if applies && re.is_match(name) {
                return true;
            }
        }
        false
    }
}

/// Scans one input root, producing every cluster directory beneath it
/// in lexicographic child order (spec §5 "merge order ... file-scan
/// order").
pub fn scan_root(root: &Path, ignore: &IgnoreConfig) -> Result<Vec<DirectoryInfo>, ScanError> {
    let mut top_level: Vec<PathBuf> = std::fs::read_dir(root)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    top_level.sort();

    let mut out = Vec::new();
    for entry in top_level {
        let name = entry
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        if !entry.is_dir() || ignore.is_ignored(&name, true) {
            continue;
        }
        let limit_key = name;
        let qualifiers = parse_qualifiers(&limit_key)?;

        let mut children: Vec<PathBuf> = std::fs::read_dir(&entry)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .collect();
        children.sort();
        for child in children {
            let cluster_name = child
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            if !child.is_dir() || ignore.is_ignored(&cluster_name, true) {
                continue;
            }
            let cluster = Cluster::from_name(&cluster_name)
                .ok_or_else(|| ScanError::UnknownCluster(cluster_name.clone()))?;
            out.push(DirectoryInfo {
                limit_key: limit_key.clone(),
                cluster,
                dir_path: child,
                qualifiers: qualifiers.clone(),
            });
        }
    }
    Ok(out)
}

/// Lists every non-ignored file directly inside `dir.dir_path`, sorted
/// lexicographically.
pub fn scan_files(dir: &DirectoryInfo, ignore: &IgnoreConfig) -> Result<Vec<FileInfo>, ScanError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(&dir.dir_path)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    let mut out = Vec::new();
    for file_path in files {
        let filename = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        if ignore.is_ignored(&filename, false) {
            continue;
        }
        out.push(FileInfo {
            dir: dir.clone(),
            file_path,
            filename,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn scans_cluster_dirs_and_skips_ignored_entries() {
        let root = tempdir().unwrap();
        fs::create_dir_all(root.path().join("base/element")).unwrap();
        fs::create_dir_all(root.path().join("base/.git")).unwrap();
        fs::write(root.path().join("base/element/string.json"), "{}").unwrap();
        fs::write(root.path().join("base/element/Thumbs.db"), "").unwrap();

        let ignore = IgnoreConfig::default();
        let dirs = scan_root(root.path(), &ignore).unwrap();
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].limit_key, "base");
        assert_eq!(dirs[0].cluster, Cluster::Element);

        let files = scan_files(&dirs[0], &ignore).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "string.json");
    }

    #[test]
    fn unknown_cluster_name_fails() {
        let root = tempdir().unwrap();
        fs::create_dir_all(root.path().join("base/bogus")).unwrap();
        let err = scan_root(root.path(), &IgnoreConfig::default()).unwrap_err();
        assert!(matches!(err, ScanError::UnknownCluster(_)));
    }
}
