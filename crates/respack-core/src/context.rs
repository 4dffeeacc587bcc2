//! Process-wide dedup state, threaded explicitly through the pipeline
//! (spec §3.5, §9 design note — no module globals).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Outcome of attempting to claim an output path for writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Path was not previously written; the caller should proceed.
    Proceed,
    /// Path was already written by this build; the caller must skip and
    /// emit a dedup warning.
    AlreadyWritten,
    /// Path previously belonged to an overlaid HAP and has now been
    /// reclaimed by a new contributor; the caller should proceed and the
    /// HAP copy is considered shadowed.
    ReclaimedFromHap,
}

/// The two dedup sets of spec §3.5, guarded by a single mutex so that
/// insertion is the single serialization point for "this file has been
/// handled".
#[derive(Default)]
pub struct DedupState {
    written_paths: Mutex<HashSet<PathBuf>>,
    hap_paths: Mutex<HashSet<PathBuf>>,
}

impl DedupState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds `hap_paths` with paths copied from an overlaid HAP (spec
    /// §4.9 step 1); these paths are also inserted into `written_paths`.
    pub fn seed_from_hap(&self, path: PathBuf) {
        self.hap_paths.lock().unwrap().insert(path.clone());
        self.written_paths.lock().unwrap().insert(path);
    }

    /// Attempts to claim `path` for a new output. This is the single
    /// entry point used by the generic compiler and binary copier (spec
    /// §4.4 step 2).
    pub fn claim(&self, path: &Path) -> ClaimOutcome {
        let mut hap = self.hap_paths.lock().unwrap();
        let reclaimed = hap.remove(path);

        let mut written = self.written_paths.lock().unwrap();
        if reclaimed {
            // A HAP-sourced path is always considered already written;
            // the new contributor overwrites it.
            return ClaimOutcome::ReclaimedFromHap;
        }
        if written.contains(path) {
            return ClaimOutcome::AlreadyWritten;
        }
        written.insert(path.to_path_buf());
        ClaimOutcome::Proceed
    }

    /// Total count of distinct output paths emitted (spec §8 property 7).
    pub fn written_count(&self) -> usize {
        self.written_paths.lock().unwrap().len()
    }

    pub fn is_written(&self, path: &Path) -> bool {
        self.written_paths.lock().unwrap().contains(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_claim_proceeds_second_is_dedup() {
        let state = DedupState::new();
        let path = PathBuf::from("out/resources/base/media/a.png");
        assert_eq!(state.claim(&path), ClaimOutcome::Proceed);
        assert_eq!(state.claim(&path), ClaimOutcome::AlreadyWritten);
        assert_eq!(state.written_count(), 1);
    }

    #[test]
    fn hap_path_is_reclaimed_by_new_contributor() {
        let state = DedupState::new();
        let path = PathBuf::from("out/resources/base/media/a.png");
        state.seed_from_hap(path.clone());
        assert_eq!(state.claim(&path), ClaimOutcome::ReclaimedFromHap);
        // A further attempt at the same path is now a plain dedup hit.
        assert_eq!(state.claim(&path), ClaimOutcome::AlreadyWritten);
    }
}
