//! Merger (spec §3.2 invariants, §4.6): combines per-module compiler
//! output into one `(type, name) -> Vec<ResourceItem>` map, enforcing
//! duplicate/overlay semantics and flagging missing `base` variants.

use respack_core::{DiagKind, DiagSink, Diagnostic, ResType, ResourceItem};
use std::collections::HashMap;

type NameKey = (ResType, String);

/// Accumulates merged items across however many modules are fed in
/// via [`Merger::merge_module`], in module order (spec §5: "module
/// order is the order given on the command line").
#[derive(Default)]
pub struct Merger {
    items: HashMap<NameKey, Vec<ResourceItem>>,
}

impl Merger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one module's already-compiled items. `module_items` must
    /// all originate from the same module invocation so the
    /// within-module duplicate check (spec §4.6 bullet 1) is scoped
    /// correctly; cross-module collisions are resolved against
    /// whatever has already been merged.
    pub fn merge_module(&mut self, module_items: Vec<ResourceItem>, diag: &DiagSink) -> Result<(), Diagnostic> {
        let mut seen_this_module: HashMap<(ResType, String, String), std::path::PathBuf> = HashMap::new();
        for item in &module_items {
            let merge_key = item.merge_key();
            if let Some(prior_path) = seen_this_module.get(&merge_key) {
                return Err(Diagnostic::new(
                    DiagKind::ResourceDuplicate,
                    &[
                        merge_key.0.tag(),
                        &merge_key.1,
                        &merge_key.2,
                        &prior_path.display().to_string(),
                        &item.source_path.display().to_string(),
                    ],
                ));
            }
            seen_this_module.insert(merge_key, item.source_path.clone());
        }

        for item in module_items {
            let name_key = (item.res_type, item.name.clone());
            let bucket = self.items.entry(name_key).or_default();
            match bucket.iter().position(|existing| existing.limit_key == item.limit_key) {
                None => bucket.push(item),
                Some(pos) => {
                    if bucket[pos].coverable {
                        bucket[pos] = item;
                    } else {
                        diag.push(Diagnostic::new(
                            DiagKind::ResourceDuplicate,
                            &[
                                item.res_type.tag(),
                                &item.name,
                                &item.limit_key,
                                &bucket[pos].source_path.display().to_string(),
                                &item.source_path.display().to_string(),
                            ],
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Flags every `(type,name)` with no `base` variant (warning, spec
    /// §3.2/§4.6) and flattens the merged map into one item vector.
    pub fn finish(self, diag: &DiagSink) -> Vec<ResourceItem> {
        let mut out = Vec::new();
        for ((res_type, name), variants) in self.items {
            if !variants.iter().any(ResourceItem::is_base) {
                diag.push(Diagnostic::new(DiagKind::MissingBaseLimitKey, &[res_type.tag(), &name]));
            }
            out.extend(variants);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use respack_core::qualifier::{KeyParam, QualifierKind};
    use std::path::PathBuf;

    fn item(name: &str, limit_key_params: Vec<KeyParam>, coverable: bool, source: &str) -> ResourceItem {
        let mut it = ResourceItem::new(name, ResType::String, limit_key_params, PathBuf::from(source), b"v".to_vec());
        it.coverable = coverable;
        it
    }

    #[test]
    fn duplicate_within_one_module_is_fatal() {
        let mut merger = Merger::new();
        let sink = DiagSink::new();
        let items = vec![
            item("app_name", vec![], false, "a/string.json"),
            item("app_name", vec![], false, "b/string.json"),
        ];
        let err = merger.merge_module(items, &sink).unwrap_err();
        assert_eq!(err.kind, DiagKind::ResourceDuplicate);
    }

    #[test]
    fn coverable_entry_is_silently_replaced() {
        let mut merger = Merger::new();
        let sink = DiagSink::new();
        merger
            .merge_module(vec![item("primary", vec![], true, "hap/color.json")], &sink)
            .unwrap();
        merger
            .merge_module(vec![item("primary", vec![], false, "module/color.json")], &sink)
            .unwrap();
        assert!(sink.is_empty());
        let merged = merger.finish(&sink);
        assert_eq!(merged[0].source_path, PathBuf::from("module/color.json"));
    }

    #[test]
    fn non_coverable_conflict_keeps_first_and_warns() {
        let mut merger = Merger::new();
        let sink = DiagSink::new();
        merger
            .merge_module(vec![item("primary", vec![], false, "a/color.json")], &sink)
            .unwrap();
        merger
            .merge_module(vec![item("primary", vec![], false, "b/color.json")], &sink)
            .unwrap();
        assert_eq!(sink.len(), 1);
        let merged = merger.finish(&sink);
        assert_eq!(merged[0].source_path, PathBuf::from("a/color.json"));
    }

    #[test]
    fn missing_base_variant_warns() {
        let mut merger = Merger::new();
        let sink = DiagSink::new();
        let zh = KeyParam::new(QualifierKind::Language, respack_core::qualifier::pack_code("zh"));
        merger.merge_module(vec![item("greeting", vec![zh], false, "zh/string.json")], &sink).unwrap();
        merger.finish(&sink);
        assert_eq!(sink.len(), 1);
    }
}
