//! End-to-end build driver (spec §2 dataflow, §4): wires the scanner,
//! compilers, merger, resolver, and index writer into one `run()`.
//!
//! Grounded on `original_source/src/resource_pack.cpp`'s top-level
//! `Package()` sequencing (scan each module, merge, resolve references,
//! then write the index and `id_defined.json`), translated into a
//! single function that threads explicit state instead of member
//! fields on a `ResourcePack` object.

pub mod config;
pub mod icon_check;
pub mod merge;
pub mod overlay;
pub mod resource_table;
pub mod target_config;

use anyhow::{bail, Context, Result};
use config::PackageConfig;
use icon_check::{icon_slot_for_field, check_icon, IconCandidate};
use merge::Merger;
use respack_compiler::{
    compile_element_file, compile_generic_file, scan_files, scan_root, Cluster, GenericCompileOptions,
    IdentityTranscoder, IgnoreConfig,
};
use respack_core::context::DedupState;
use respack_core::{DiagSink, Diagnostic, ResType, ResourceItem};
use respack_ids::{parse_app_manifest, parse_sys_manifest, write_id_defined, IdWorker, ResKey};
use respack_index::{header, v1, v2, IndexedItem};
use respack_pool::WorkerPool;
use respack_resolve::ReferenceResolver;
use std::collections::HashMap;
use std::path::PathBuf;

/// Everything a build produced, beyond the files it wrote: the
/// diagnostics collected along the way and the id assignment table
/// (exposed so a caller can print a summary or fail CI on warnings).
pub struct BuildReport {
    pub diagnostics: Vec<Diagnostic>,
    pub ids: HashMap<ResKey, u32>,
    pub item_count: usize,
}

/// Compiles every module of `config`, merges, resolves references, and
/// writes `resources.index`, `id_defined.json` (if requested), and
/// `ResourceTable.txt` under `config.output_path`.
pub fn run(config: &PackageConfig) -> Result<BuildReport> {
    std::fs::create_dir_all(&config.output_path)
        .with_context(|| format!("creating output directory {}", config.output_path.display()))?;

    let dedup = DedupState::new();
    let diag = DiagSink::new();
    let mut merger = Merger::new();
    let mut overlay_ids: HashMap<ResKey, u32> = HashMap::new();

    let mut module_inputs = config.inputs.as_slice();
    if config.overlay {
        let Some(first) = config.inputs.first() else {
            bail!("overlay mode requires at least one input");
        };
        let loaded = overlay::load_hap(&first.root, &dedup)
            .with_context(|| format!("loading prior HAP at {}", first.root.display()))?;
        overlay_ids = loaded.ids;
        merger.merge_module(loaded.items, &diag).map_err(anyhow::Error::from)?;
        module_inputs = &config.inputs[1..];
    }

    let ignore = IgnoreConfig::default();
    let pool = WorkerPool::new(config.thread_count.unwrap_or(4));
    let transcoder = IdentityTranscoder;

    for module in module_inputs {
        let directories = scan_root(&module.root, &ignore)
            .with_context(|| format!("scanning module {} at {}", module.name, module.root.display()))?;

        let mut module_items = Vec::new();
        for dir in &directories {
            match dir.cluster {
                Cluster::RawFile | Cluster::ResFile => {
                    let cancel = pool.cancel_token();
                    let is_cancelled = || cancel.is_cancelled();
                    let items = respack_compiler::binary_copier::copy_binary_tree(
                        &dir.dir_path,
                        &dir.limit_key,
                        dir.cluster,
                        &module.name,
                        &config.output_path,
                        &dedup,
                        &is_cancelled,
                    )
                    .map_err(anyhow::Error::from)?;
                    module_items.extend(items);
                }
                Cluster::Element => {
                    let files = scan_files(dir, &ignore)
                        .with_context(|| format!("listing {}", dir.dir_path.display()))?;
                    let results = pool.run_indexed(files, move |_index, file, _cancel| {
                        std::fs::read_to_string(&file.file_path)
                            .map_err(|e| {
                                Diagnostic::new(
                                    respack_core::DiagKind::IoFailure,
                                    &[&file.file_path.display().to_string(), &e.to_string()],
                                )
                            })
                            .and_then(|json| {
                                compile_element_file(&file.file_path, &file.dir.limit_key, &file.dir.qualifiers, &json)
                            })
                    });
                    for result in results {
                        match result {
                            Ok(items) => module_items.extend(items),
                            Err(d) => diag.push(d),
                        }
                    }
                }
                Cluster::Media | Cluster::Profile => {
                    let Some(res_type) = dir.cluster.fixed_res_type() else { continue };
                    let files = scan_files(dir, &ignore)
                        .with_context(|| format!("listing {}", dir.dir_path.display()))?;
                    for file in files {
                        let opts = GenericCompileOptions {
                            module_name: &module.name,
                            output_root: &config.output_path,
                            allow_transcode_fallback: true,
                            overlay_sourced: false,
                        };
                        match compile_generic_file(&file, res_type, &opts, &dedup, &transcoder) {
                            Ok(Some(item)) => module_items.push(item),
                            Ok(None) => {}
                            Err(d) => diag.push(d),
                        }
                    }
                }
            }
        }

        merger.merge_module(module_items, &diag).map_err(anyhow::Error::from)?;
    }
    pool.join();

    let mut items = merger.finish(&diag);

    if let Some(spec) = &config.target_config {
        let filter = target_config::parse_target_config(spec).context("parsing --target-config")?;
        items.retain(|item| filter.allows(item));
    }

    let mut id_worker = IdWorker::new(config.start_id)?;
    if let Some(path) = &config.defined_ids_path {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        id_worker.set_app_defined(parse_app_manifest(&json)?);
    }
    for path in &config.defined_sysids_paths {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        id_worker.set_sys_defined(parse_sys_manifest(&json)?);
    }
    id_worker.load_from_hap(overlay_ids);

    // One id per (type, name), in first-appearance order, shared across
    // every limit-key variant of that name (spec §3.3).
    for item in &items {
        let key: ResKey = (item.res_type, item.name.clone());
        id_worker.generate_id(key)?;
    }

    let app_ids: HashMap<ResKey, u32> = id_worker.assigned().map(|(k, v)| (k.clone(), *v)).collect();
    let sys_ids: HashMap<ResKey, u32> = HashMap::new();
    let resolver = ReferenceResolver::new(&app_ids, &sys_ids);

    for item in &mut items {
        let id = app_ids.get(&(item.res_type, item.name.clone())).copied();
        if item.res_type == ResType::Media || item.res_type == ResType::Profile {
            if let Ok(mut json) = serde_json::from_slice::<serde_json::Value>(&item.data) {
                if resolver.resolve_json(&mut json, id).unwrap_or(false) {
                    item.data = serde_json::to_vec(&json).unwrap_or_else(|_| item.data.clone());
                }
                continue;
            }
        }
        match resolver.resolve_item(item) {
            Ok(_) => {}
            Err(d) => diag.push(d),
        }
    }

    let mut manifest = config.manifest.clone();
    if let Err(d) = resolver.resolve_manifest(&mut manifest) {
        diag.push(d);
    }

    if config.icon_check {
        run_icon_check(&config.output_path, &items, &app_ids, &manifest, &resolver, &diag);
    }

    let indexed_items: Vec<IndexedItem> = items
        .iter()
        .filter_map(|item| {
            let id = *app_ids.get(&(item.res_type, item.name.clone()))?;
            Some(IndexedItem::new(item.res_type, id, item.name.clone(), item.qualifiers.clone(), item.data.clone()))
        })
        .collect();

    let use_v2 = config.min_api_version >= header::V2_MIN_API_VERSION;
    let index_bytes = if use_v2 { v2::write(&indexed_items)? } else { v1::write(&indexed_items)? };
    std::fs::write(config.output_path.join("resources.index"), index_bytes)
        .context("writing resources.index")?;

    if let Some(dir) = &config.ids_output_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let entries: Vec<(ResKey, u32)> = app_ids.iter().map(|(k, v)| (k.clone(), *v)).collect();
        let rendered = write_id_defined(&entries)?;
        std::fs::write(dir.join("id_defined.json"), rendered).context("writing id_defined.json")?;
    }

    let table = resource_table::render(&items, &app_ids);
    std::fs::write(config.output_path.join("ResourceTable.txt"), table)
        .context("writing ResourceTable.txt")?;

    Ok(BuildReport {
        diagnostics: diag.into_vec(),
        ids: app_ids,
        item_count: items.len(),
    })
}

/// Icon dimension checks for `icon`/`startWindowIcon` manifest fields
/// (spec §4.12): finds the media item each resolved id points back to,
/// reads its written PNG bytes, validates against the per-(dpi,
/// device) table, then transitively checks every layer the resolver
/// recorded against that same owner id (spec §4.7 "layer-icon
/// tracking").
fn run_icon_check(
    output_root: &std::path::Path,
    items: &[ResourceItem],
    app_ids: &HashMap<ResKey, u32>,
    manifest: &serde_json::Value,
    resolver: &ReferenceResolver,
    diag: &DiagSink,
) {
    let mut by_id: HashMap<u32, &ResourceItem> = HashMap::new();
    for item in items {
        if let Some(&id) = app_ids.get(&(item.res_type, item.name.clone())) {
            by_id.insert(id, item);
        }
    }

    let check_one_id = |id: u32, qualifiers: &[respack_core::KeyParam], slot: icon_check::IconSlot| {
        let Some(item) = by_id.get(&id) else { return };
        let Some(relative) = item.data_as_str() else { return };
        let strip_module_prefix = relative.splitn(2, '/').nth(1).unwrap_or(relative);
        let png_path: PathBuf = output_root.join(strip_module_prefix);
        let Ok(bytes) = std::fs::read(&png_path) else { return };
        let candidate = IconCandidate { id, qualifiers, slot, png_bytes: &bytes };
        check_icon(&candidate, diag);
    };

    let Some(obj) = manifest.as_object() else { return };
    for (field, _) in obj {
        let Some(slot) = icon_slot_for_field(field) else { continue };
        let id_field = format!("{field}Id");
        let Some(id) = obj.get(&id_field).and_then(|v| v.as_u64()) else { continue };
        let id = id as u32;
        let Some(item) = by_id.get(&id) else { continue };
        let qualifiers = item.qualifiers.clone();
        check_one_id(id, &qualifiers, slot);
        for layer_id in resolver.layer_icons_for(id) {
            check_one_id(layer_id, &qualifiers, slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::ModuleInput;
    use std::fs;
    use tempfile::tempdir;

    fn base_config(input_root: PathBuf, output_path: PathBuf) -> PackageConfig {
        PackageConfig {
            inputs: vec![ModuleInput { name: "entry".into(), root: input_root }],
            package_name: "com.example.app".into(),
            output_path,
            res_headers: vec![],
            force_write: false,
            start_id: None,
            combine: false,
            ids_output_dir: None,
            defined_ids_path: None,
            defined_sysids_paths: vec![],
            depend_entry: None,
            icon_check: false,
            target_config: None,
            compressed_config_path: None,
            thread_count: Some(2),
            overlay: false,
            min_api_version: 8,
            manifest: serde_json::json!({}),
        }
    }

    #[test]
    fn end_to_end_build_writes_resource_table_and_index() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        fs::create_dir_all(src.path().join("base/element")).unwrap();
        fs::write(
            src.path().join("base/element/string.json"),
            r#"{"string":[{"name":"app_name","value":"Hello"}]}"#,
        )
        .unwrap();

        let config = base_config(src.path().to_path_buf(), out.path().to_path_buf());
        let report = run(&config).unwrap();

        assert_eq!(report.item_count, 1);
        assert_eq!(report.ids[&(ResType::String, "app_name".to_string())], 0x0100_0000);

        let table = fs::read_to_string(out.path().join("ResourceTable.txt")).unwrap();
        assert_eq!(table, "string app_name 0x01000000\n");
        assert!(out.path().join("resources.index").exists());
    }

    #[test]
    fn duplicate_name_within_one_module_fails_the_build() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        fs::create_dir_all(src.path().join("base/element")).unwrap();
        fs::write(
            src.path().join("base/element/string.json"),
            r#"{"string":[{"name":"app_name","value":"a"},{"name":"app_name","value":"b"}]}"#,
        )
        .unwrap();

        let config = base_config(src.path().to_path_buf(), out.path().to_path_buf());
        assert!(run(&config).is_err());
    }

    #[test]
    fn target_config_filter_drops_excluded_locale() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        fs::create_dir_all(src.path().join("base/element")).unwrap();
        fs::write(
            src.path().join("base/element/string.json"),
            r#"{"string":[{"name":"app_name","value":"Hello"}]}"#,
        )
        .unwrap();
        fs::create_dir_all(src.path().join("zh-Hans/element")).unwrap();
        fs::write(
            src.path().join("zh-Hans/element/string.json"),
            r#"{"string":[{"name":"app_name","value":"Ni hao"}]}"#,
        )
        .unwrap();

        let mut config = base_config(src.path().to_path_buf(), out.path().to_path_buf());
        config.target_config = Some("Locale[en]".to_string());
        let report = run(&config).unwrap();
        assert_eq!(report.item_count, 1);
    }
}
