//! Reference resolver (spec §4.7): rewrites `$type:name` and
//! `$ohos:type:name` references to numeric IDs inside compiled item
//! data, media/profile side-car JSON, and the manifest node tree.

use regex::Regex;
use respack_core::item::{compose_framed, decompose_framed};
use respack_core::{DiagKind, Diagnostic, ResType, ResourceItem};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, OnceLock};

/// `(type, name)` lookup key, matching `respack-ids::ResKey`.
pub type ResKey = (ResType, String);

const RECOGNIZED_TYPES: &[&str] = &[
    "id", "boolean", "color", "float", "media", "profile", "integer", "string", "pattern",
    "plural", "theme", "symbol",
];

fn reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\$(ohos:)?([A-Za-z]+):([A-Za-z0-9_]+)$").unwrap())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedReference<'a> {
    pub is_system: bool,
    pub type_tag: &'a str,
    pub name: &'a str,
}

/// Parses `text` as a reference if it matches `$<type>:<name>` or
/// `$ohos:<type>:<name>` with a recognized type tag; `None` otherwise
/// (the value is left untouched, not an error).
pub fn parse_reference(text: &str) -> Option<ParsedReference<'_>> {
    let caps = reference_regex().captures(text)?;
    let type_tag = caps.get(2).unwrap().as_str();
    if !RECOGNIZED_TYPES.contains(&type_tag) {
        return None;
    }
    Some(ParsedReference {
        is_system: caps.get(1).is_some(),
        type_tag,
        name: caps.get(3).unwrap().as_str(),
    })
}

/// The two ID pools a resolver consults.
pub struct ReferenceResolver<'a> {
    app_ids: &'a HashMap<ResKey, u32>,
    sys_ids: &'a HashMap<ResKey, u32>,
    /// Media item id -> set of resolved ids found inside its side-car
    /// JSON, for transitive icon-size checking (spec §4.7, §4.12).
    layer_icons: Mutex<HashMap<u32, HashSet<u32>>>,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(app_ids: &'a HashMap<ResKey, u32>, sys_ids: &'a HashMap<ResKey, u32>) -> Self {
        Self {
            app_ids,
            sys_ids,
            layer_icons: Mutex::new(HashMap::new()),
        }
    }

    fn lookup(&self, reference: &ParsedReference) -> Option<u32> {
        let res_type = ResType::from_tag(reference.type_tag)?;
        let key = (res_type, reference.name.to_string());
        if reference.is_system {
            self.sys_ids.get(&key).copied()
        } else {
            self.app_ids.get(&key).copied()
        }
    }

    /// Resolves a single scalar string. Returns `Ok(None)` if `text`
    /// is not a reference (left unchanged); `Ok(Some(replacement))`
    /// on success; `Err` if the reference cannot be resolved.
    pub fn resolve_scalar(&self, text: &str) -> Result<Option<String>, Diagnostic> {
        let Some(reference) = parse_reference(text) else {
            return Ok(None);
        };
        let id = self
            .lookup(&reference)
            .ok_or_else(|| Diagnostic::new(DiagKind::ReferenceNotResolved, &[text]))?;
        let replacement = if reference.type_tag == "id" {
            id.to_string()
        } else {
            format!("${}:{}", reference.type_tag, id)
        };
        Ok(Some(replacement))
    }

    /// Rewrites a `ResourceItem`'s `data` in place. Scalar types
    /// resolve the whole byte string; array/pair types decompose,
    /// resolve each element independently, and recompose. Returns
    /// whether anything changed.
    pub fn resolve_item(&self, item: &mut ResourceItem) -> Result<bool, Diagnostic> {
        if item.res_type.is_scalar() {
            let text = item.data_as_str().unwrap_or_default().to_string();
            if let Some(replacement) = self.resolve_scalar(&text)? {
                item.data = replacement.into_bytes();
                return Ok(true);
            }
            return Ok(false);
        }
        if item.res_type.is_array() || item.res_type.is_pair() {
            let elements = decompose_framed(&item.data);
            let mut changed = false;
            let mut resolved = Vec::with_capacity(elements.len());
            for element in elements {
                let text = String::from_utf8_lossy(&element).into_owned();
                match self.resolve_scalar(&text)? {
                    Some(replacement) => {
                        changed = true;
                        resolved.push(replacement.into_bytes());
                    }
                    None => resolved.push(element),
                }
            }
            if changed {
                item.data = compose_framed(resolved);
            }
            return Ok(changed);
        }
        Ok(false)
    }

    /// Recursively resolves every string leaf of a JSON tree (media
    /// side-car descriptors, base-limit profile JSON). `owner_id`, if
    /// given, accumulates resolved ids for later layer-icon checking.
    pub fn resolve_json(&self, value: &mut Value, owner_id: Option<u32>) -> Result<bool, Diagnostic> {
        let mut changed = false;
        match value {
            Value::String(s) => {
                if let Some(replacement) = self.resolve_scalar(s)? {
                    if let (Some(owner), Some(reference)) = (owner_id, parse_reference(s)) {
                        if let Some(id) = self.lookup(&reference) {
                            self.layer_icons.lock().unwrap().entry(owner).or_default().insert(id);
                        }
                    }
                    *s = replacement;
                    changed = true;
                }
            }
            Value::Array(items) => {
                for item in items {
                    changed |= self.resolve_json(item, owner_id)?;
                }
            }
            Value::Object(map) => {
                for (_, v) in map.iter_mut() {
                    changed |= self.resolve_json(v, owner_id)?;
                }
            }
            _ => {}
        }
        Ok(changed)
    }

    pub fn layer_icons_for(&self, owner_id: u32) -> HashSet<u32> {
        self.layer_icons
            .lock()
            .unwrap()
            .get(&owner_id)
            .cloned()
            .unwrap_or_default()
    }
}

/// One entry of the manifest node-tree table: `key` names the JSON
/// field, `allowed_prefix` the reference type tag it accepts.
pub struct ManifestFieldRule {
    pub key: &'static str,
    pub allowed_type: &'static str,
}

/// The fixed table of manifest fields eligible for resolution (spec
/// §4.7 item 4). `icon`/`startWindowIcon` accept `media`; `label`
/// accepts `string`.
pub const MANIFEST_FIELD_TABLE: &[ManifestFieldRule] = &[
    ManifestFieldRule { key: "icon", allowed_type: "media" },
    ManifestFieldRule { key: "startWindowIcon", allowed_type: "media" },
    ManifestFieldRule { key: "label", allowed_type: "string" },
    ManifestFieldRule { key: "startWindowBackground", allowed_type: "media" },
    ManifestFieldRule { key: "description", allowed_type: "string" },
];

impl<'a> ReferenceResolver<'a> {
    /// Resolves the manifest (`config.json`/`module.json`) node tree:
    /// for every object field whose key matches
    /// [`MANIFEST_FIELD_TABLE`] and whose value is a reference of the
    /// allowed type, substitutes the numeric ID and adds a sibling
    /// `<key>Id` node (spec §4.7 item 4).
    pub fn resolve_manifest(&self, value: &mut Value) -> Result<bool, Diagnostic> {
        let mut changed = false;
        if let Value::Object(map) = value {
            let mut additions = Vec::new();
            for rule in MANIFEST_FIELD_TABLE {
                if let Some(Value::String(s)) = map.get(rule.key) {
                    if let Some(reference) = parse_reference(s) {
                        if reference.type_tag == rule.allowed_type {
                            if let Some(id) = self.lookup(&reference) {
                                additions.push((format!("{}Id", rule.key), id));
                                changed = true;
                            } else {
                                return Err(Diagnostic::new(DiagKind::ReferenceNotResolved, &[s]));
                            }
                        }
                    }
                }
            }
            for (key, id) in additions {
                map.insert(key, Value::from(id));
            }
            let keys: Vec<String> = map.keys().cloned().collect();
            for key in keys {
                if let Some(child) = map.get_mut(&key) {
                    changed |= self.resolve_manifest(child)?;
                }
            }
        } else if let Value::Array(items) = value {
            for item in items {
                changed |= self.resolve_manifest(item)?;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> HashMap<ResKey, u32> {
        let mut map = HashMap::new();
        map.insert((ResType::String, "app_name".to_string()), 0x0100_0001);
        map.insert((ResType::Media, "icon".to_string()), 0x0100_0002);
        map
    }

    #[test]
    fn resolves_app_string_reference() {
        let app = ids();
        let sys = HashMap::new();
        let resolver = ReferenceResolver::new(&app, &sys);
        let resolved = resolver.resolve_scalar("$string:app_name").unwrap().unwrap();
        assert_eq!(resolved, format!("${}", "string:16777217"));
    }

    #[test]
    fn non_reference_text_is_left_unchanged() {
        let app = ids();
        let sys = HashMap::new();
        let resolver = ReferenceResolver::new(&app, &sys);
        assert_eq!(resolver.resolve_scalar("just text").unwrap(), None);
    }

    #[test]
    fn unresolvable_reference_is_an_error() {
        let app = ids();
        let sys = HashMap::new();
        let resolver = ReferenceResolver::new(&app, &sys);
        let err = resolver.resolve_scalar("$string:missing").unwrap_err();
        assert_eq!(err.kind, DiagKind::ReferenceNotResolved);
    }

    #[test]
    fn id_type_resolves_to_bare_decimal() {
        let mut app = HashMap::new();
        app.insert((ResType::Id, "some_id".to_string()), 42);
        let sys = HashMap::new();
        let resolver = ReferenceResolver::new(&app, &sys);
        assert_eq!(resolver.resolve_scalar("$id:some_id").unwrap().unwrap(), "42");
    }

    #[test]
    fn manifest_icon_field_gets_sibling_id_node() {
        let app = ids();
        let sys = HashMap::new();
        let resolver = ReferenceResolver::new(&app, &sys);
        let mut manifest: Value = serde_json::json!({ "icon": "$media:icon" });
        resolver.resolve_manifest(&mut manifest).unwrap();
        assert_eq!(manifest["iconId"], Value::from(0x0100_0002u32));
    }

    #[test]
    fn array_item_resolution_recomposes_correctly() {
        let app = ids();
        let sys = HashMap::new();
        let resolver = ReferenceResolver::new(&app, &sys);
        let mut item = ResourceItem::new(
            "names",
            ResType::StrArray,
            vec![],
            "base/element/strarray.json".into(),
            compose_framed(vec![b"$string:app_name".to_vec(), b"literal".to_vec()]),
        );
        let changed = resolver.resolve_item(&mut item).unwrap();
        assert!(changed);
        let decomposed = decompose_framed(&item.data);
        assert_eq!(decomposed[0], b"$string:16777217");
        assert_eq!(decomposed[1], b"literal");
    }
}
