//! Translates the parsed command line (spec §6.1) into a
//! [`respack_pipeline::config::PackageConfig`] the pipeline driver
//! consumes.

pub mod cli_args;

use anyhow::{bail, Context, Result};
use cli_args::Cli;
use respack_pipeline::config::{ModuleInput, PackageConfig};
use serde::Deserialize;
use std::path::PathBuf;

/// Mirrors the flag set of [`cli_args::Cli`] for `--fileList` (spec
/// §6.1): CLI flags take precedence; any flag left unset falls back to
/// the matching key here.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListOptions {
    #[serde(default)]
    input_path: Vec<String>,
    package_name: Option<String>,
    output_path: Option<String>,
    #[serde(default)]
    res_header: Vec<String>,
    #[serde(default)]
    force_write: bool,
    modules: Option<String>,
    start_id: Option<String>,
    #[serde(default)]
    append: Vec<String>,
    #[serde(default)]
    combine: bool,
    ids: Option<String>,
    defined_ids: Option<String>,
    depend_entry: Option<String>,
    #[serde(default)]
    icon_check: bool,
    target_config: Option<String>,
    #[serde(default)]
    defined_sysids: Vec<String>,
    compressed_config: Option<String>,
    thread: Option<usize>,
}

fn parse_start_id(raw: &str) -> Result<u32> {
    let stripped = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| anyhow::anyhow!("--startId must be a 0x-prefixed hex literal, got {raw:?}"))?;
    u32::from_str_radix(stripped, 16).with_context(|| format!("malformed --startId {raw:?}"))
}

fn module_name_for(index: usize, root: &str, modules: &Option<String>) -> String {
    if let Some(names) = modules {
        if let Some(name) = names.split(',').nth(index) {
            if !name.trim().is_empty() {
                return name.trim().to_string();
            }
        }
    }
    PathBuf::from(root)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("module")
        .to_string()
}

/// Builds a [`PackageConfig`] from the parsed CLI, reading `--json` and
/// `--fileList` from disk as needed. Does no filesystem writes.
pub fn build_config(cli: &Cli) -> Result<PackageConfig> {
    let file_list: FileListOptions = match &cli.file_list {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading --fileList {path}"))?;
            serde_json::from_str(&text).with_context(|| format!("parsing --fileList {path}"))?
        }
        None => FileListOptions::default(),
    };

    let mut input_paths = if cli.input_path.is_empty() { file_list.input_path.clone() } else { cli.input_path.clone() };
    input_paths.extend(if cli.append.is_empty() { file_list.append.clone() } else { cli.append.clone() });
    if input_paths.is_empty() {
        bail!("at least one --inputPath (or --fileList inputPath) is required");
    }

    let modules = cli.modules.clone().or_else(|| file_list.modules.clone());
    let inputs: Vec<ModuleInput> = input_paths
        .iter()
        .enumerate()
        .map(|(index, root)| ModuleInput {
            name: module_name_for(index, root, &modules),
            root: PathBuf::from(root),
        })
        .collect();

    let package_name = cli
        .package_name
        .clone()
        .or_else(|| file_list.package_name.clone())
        .ok_or_else(|| anyhow::anyhow!("--packageName is required"))?;
    let output_path = cli
        .output_path
        .clone()
        .or_else(|| file_list.output_path.clone())
        .ok_or_else(|| anyhow::anyhow!("--outputPath is required"))?;

    let start_id_raw = cli.start_id.clone().or_else(|| file_list.start_id.clone());
    let defined_ids = cli.defined_ids.clone().or_else(|| file_list.defined_ids.clone());
    if start_id_raw.is_some() && defined_ids.is_some() {
        bail!("--startId and --defined-ids are mutually exclusive");
    }
    let start_id = start_id_raw.as_deref().map(parse_start_id).transpose()?;

    let manifest = match &cli.json {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading --json {path}"))?;
            serde_json::from_str(&text).with_context(|| format!("parsing --json {path}"))?
        }
        None => serde_json::json!({}),
    };
    let min_api_version = manifest
        .pointer("/app/minAPIVersion")
        .and_then(|v| v.as_u64())
        .unwrap_or(8) as u32;

    let first_input = inputs.first().map(|m| m.root.as_path());
    let overlay = first_input.map(respack_pipeline::overlay::is_overlay_input).unwrap_or(false);

    let res_headers = if cli.res_header.is_empty() { file_list.res_header.clone() } else { cli.res_header.clone() };
    let defined_sysids_paths = if cli.defined_sysids.is_empty() { file_list.defined_sysids.clone() } else { cli.defined_sysids.clone() }
        .into_iter()
        .map(PathBuf::from)
        .collect();

    Ok(PackageConfig {
        inputs,
        package_name,
        output_path: PathBuf::from(output_path),
        res_headers: res_headers.into_iter().map(PathBuf::from).collect(),
        force_write: cli.force_write || file_list.force_write,
        start_id,
        combine: cli.combine || file_list.combine,
        ids_output_dir: cli.ids.clone().or(file_list.ids.clone()).map(PathBuf::from),
        defined_ids_path: defined_ids.map(PathBuf::from),
        defined_sysids_paths,
        depend_entry: cli.depend_entry.clone().or(file_list.depend_entry.clone()).map(PathBuf::from),
        icon_check: cli.icon_check || file_list.icon_check,
        target_config: cli.target_config.clone().or(file_list.target_config.clone()),
        compressed_config_path: cli.compressed_config.clone().or(file_list.compressed_config.clone()).map(PathBuf::from),
        thread_count: cli.thread.or(file_list.thread),
        overlay,
        min_api_version,
        manifest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn minimal_flags_build_a_config() {
        let cli = Cli::parse_from([
            "respack",
            "-i",
            "src",
            "-p",
            "com.example.app",
            "-o",
            "out",
        ]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.package_name, "com.example.app");
        assert_eq!(config.inputs.len(), 1);
        assert_eq!(config.inputs[0].name, "src");
    }

    #[test]
    fn start_id_and_defined_ids_are_mutually_exclusive() {
        let cli = Cli::parse_from([
            "respack",
            "-i",
            "src",
            "-p",
            "app",
            "-o",
            "out",
            "-e",
            "0x01000000",
            "--defined-ids",
            "id_defined.json",
        ]);
        assert!(build_config(&cli).is_err());
    }

    #[test]
    fn missing_package_name_is_rejected() {
        let cli = Cli::parse_from(["respack", "-i", "src", "-o", "out"]);
        assert!(build_config(&cli).is_err());
    }
}
