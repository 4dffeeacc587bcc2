//! The validated configuration object the core treats as already
//! built from the command line (spec §6.1, §9 design note — the
//! option parser and file-list JSON reader are external collaborators
//! that only need to populate this struct).

use std::path::PathBuf;

/// One input module: a source tree plus the module name it packages
/// under.
#[derive(Debug, Clone)]
pub struct ModuleInput {
    pub name: String,
    pub root: PathBuf,
}

/// Fully resolved build configuration (spec §6.1).
#[derive(Debug, Clone)]
pub struct PackageConfig {
    pub inputs: Vec<ModuleInput>,
    pub package_name: String,
    pub output_path: PathBuf,
    pub res_headers: Vec<PathBuf>,
    pub force_write: bool,
    pub start_id: Option<u32>,
    pub combine: bool,
    pub ids_output_dir: Option<PathBuf>,
    pub defined_ids_path: Option<PathBuf>,
    pub defined_sysids_paths: Vec<PathBuf>,
    pub depend_entry: Option<PathBuf>,
    pub icon_check: bool,
    pub target_config: Option<String>,
    pub compressed_config_path: Option<PathBuf>,
    pub thread_count: Option<usize>,
    /// Whether the first input is a prior HAP build to overlay (spec
    /// §4.9); detected by the caller from `resources.index` presence,
    /// or forced for tests.
    pub overlay: bool,
    /// `module.json → app.minAPIVersion`, already extracted by the
    /// manifest reader (out of scope per spec §1); drives the v1/v2
    /// index layout switch (spec §4.8, §9).
    pub min_api_version: u32,
    /// Parsed manifest tree (`config.json`/`module.json`), already
    /// loaded as JSON by the external manifest reader.
    pub manifest: serde_json::Value,
}

impl PackageConfig {
    pub fn module_names(&self) -> Vec<&str> {
        self.inputs.iter().map(|m| m.name.as_str()).collect()
    }
}
