//! Element (JSON) compiler (spec §4.3, §4.3.1).

use regex::Regex;
use respack_core::item::{compose_framed, frame_bytes};
use respack_core::{DiagKind, Diagnostic, KeyParam, ResType, ResourceItem};
use serde_json::Value;
use std::path::Path;
use std::sync::OnceLock;

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap())
}

fn color_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#([0-9A-Fa-f]{3}|[0-9A-Fa-f]{4}|[0-9A-Fa-f]{6}|[0-9A-Fa-f]{8})$").unwrap())
}

fn is_reference(s: &str, type_tag: &str) -> bool {
    s.starts_with(&format!("${type_tag}:")) || s.starts_with(&format!("$ohos:{type_tag}:"))
}

fn fail(kind: DiagKind, args: &[&str], source_path: &Path) -> Diagnostic {
    Diagnostic::new(kind, args).with_position(source_path.display().to_string())
}

/// Strips the matched pair `{noTranslateStart}…{noTranslateEnd}` from
/// `text`, retaining the content between them. Rejects unmatched or
/// out-of-order tags (spec §4.3.1).
pub fn strip_translate_tags(text: &str, name: &str, source_path: &Path) -> Result<String, Diagnostic> {
    const START: &str = "{noTranslateStart}";
    const END: &str = "{noTranslateEnd}";
    if !text.contains(START) && !text.contains(END) {
        return Ok(text.to_string());
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    loop {
        match rest.find(START) {
            Some(start_pos) => {
                let before = &rest[..start_pos];
                let after_start = &rest[start_pos + START.len()..];
                let end_pos = after_start.find(END).ok_or_else(|| {
                    fail(DiagKind::TranslateTagMismatch, &["string", name], source_path)
                })?;
                // Reject a stray second start tag before the matching end.
                if let Some(next_start) = after_start.find(START) {
                    if next_start < end_pos {
                        return Err(fail(DiagKind::TranslateTagMismatch, &["string", name], source_path));
                    }
                }
                out.push_str(before);
                out.push_str(&after_start[..end_pos]);
                rest = &after_start[end_pos + END.len()..];
            }
            None => {
                if rest.contains(END) {
                    return Err(fail(DiagKind::TranslateTagMismatch, &["string", name], source_path));
                }
                out.push_str(rest);
                break;
            }
        }
    }
    Ok(out)
}

struct Entry<'a> {
    name: &'a str,
    value: &'a Value,
    parent: Option<&'a str>,
}

fn parse_entries<'a>(
    array: &'a [Value],
    source_path: &Path,
    type_tag: &str,
) -> Result<Vec<Entry<'a>>, Diagnostic> {
    let mut out = Vec::with_capacity(array.len());
    for item in array {
        let obj = item
            .as_object()
            .ok_or_else(|| fail(DiagKind::SchemaViolation, &[type_tag, "?", "entry is not an object"], source_path))?;
        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| fail(DiagKind::SchemaViolation, &[type_tag, "?", "missing name"], source_path))?;
        if !name_regex().is_match(name) {
            return Err(fail(DiagKind::SchemaViolation, &[type_tag, name, "invalid name"], source_path));
        }
        let value = obj
            .get("value")
            .ok_or_else(|| fail(DiagKind::SchemaViolation, &[type_tag, name, "missing value"], source_path))?;
        let parent = obj.get("parent").and_then(Value::as_str);
        out.push(Entry { name, value, parent });
    }
    Ok(out)
}

fn compile_string_value(
    value: &Value,
    name: &str,
    limit_key: &str,
    source_path: &Path,
) -> Result<Vec<u8>, Diagnostic> {
    let text = value
        .as_str()
        .ok_or_else(|| fail(DiagKind::SchemaViolation, &["string", name, "value is not a string"], source_path))?;
    let text = if limit_key == "base" && !is_reference(text, "string") {
        strip_translate_tags(text, name, source_path)?
    } else {
        text.to_string()
    };
    Ok(text.into_bytes())
}

fn compile_integer_value(value: &Value, name: &str, source_path: &Path) -> Result<Vec<u8>, Diagnostic> {
    if let Some(s) = value.as_str() {
        if is_reference(s, "integer") {
            return Ok(s.as_bytes().to_vec());
        }
        return Err(fail(DiagKind::SchemaViolation, &["integer", name, "value is not an integer reference"], source_path));
    }
    if let Some(n) = value.as_i64() {
        return Ok(n.to_string().into_bytes());
    }
    if let Some(f) = value.as_f64() {
        if f.fract() == 0.0 {
            return Ok((f as i64).to_string().into_bytes());
        }
    }
    Err(fail(DiagKind::SchemaViolation, &["integer", name, "value is not an integer"], source_path))
}

fn compile_boolean_value(value: &Value, name: &str, source_path: &Path) -> Result<Vec<u8>, Diagnostic> {
    if let Some(s) = value.as_str() {
        if is_reference(s, "boolean") {
            return Ok(s.as_bytes().to_vec());
        }
        return Err(fail(DiagKind::SchemaViolation, &["boolean", name, "value is not a boolean reference"], source_path));
    }
    if let Some(b) = value.as_bool() {
        return Ok(if b { b"true".to_vec() } else { b"false".to_vec() });
    }
    Err(fail(DiagKind::SchemaViolation, &["boolean", name, "value is not a boolean"], source_path))
}

fn compile_color_value(value: &Value, name: &str, source_path: &Path) -> Result<Vec<u8>, Diagnostic> {
    let text = value
        .as_str()
        .ok_or_else(|| fail(DiagKind::SchemaViolation, &["color", name, "value is not a string"], source_path))?;
    if is_reference(text, "color") || color_regex().is_match(text) {
        Ok(text.as_bytes().to_vec())
    } else {
        Err(fail(DiagKind::InvalidColorValue, &[text], source_path))
    }
}

fn compile_float_value(value: &Value, name: &str, source_path: &Path) -> Result<Vec<u8>, Diagnostic> {
    let text = value
        .as_str()
        .ok_or_else(|| fail(DiagKind::SchemaViolation, &["float", name, "value is not a string"], source_path))?;
    if is_reference(text, "float") || text.parse::<f64>().is_ok() {
        Ok(text.as_bytes().to_vec())
    } else {
        Err(fail(DiagKind::SchemaViolation, &["float", name, text], source_path))
    }
}

fn compile_symbol_value(value: &Value, name: &str, source_path: &Path) -> Result<Vec<u8>, Diagnostic> {
    let text = value
        .as_str()
        .ok_or_else(|| fail(DiagKind::SchemaViolation, &["symbol", name, "value is not a string"], source_path))?;
    if is_reference(text, "symbol") {
        return Ok(text.as_bytes().to_vec());
    }
    let hex = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")).unwrap_or(text);
    let codepoint = u32::from_str_radix(hex, 16)
        .map_err(|_| fail(DiagKind::InvalidSymbol, &[text], source_path))?;
    let in_plane = (0xF0000..=0xFFFFF).contains(&codepoint) || (0x100000..=0x10FFFF).contains(&codepoint);
    if in_plane {
        Ok(text.as_bytes().to_vec())
    } else {
        Err(fail(DiagKind::InvalidSymbol, &[text], source_path))
    }
}

const QUANTITIES: [&str; 6] = ["zero", "one", "two", "few", "many", "other"];

fn compile_plural_pairs(value: &Value, name: &str, source_path: &Path) -> Result<Vec<u8>, Diagnostic> {
    let array = value
        .as_array()
        .ok_or_else(|| fail(DiagKind::SchemaViolation, &["plural", name, "value is not an array"], source_path))?;
    let mut seen = Vec::new();
    let mut has_other = false;
    let mut pairs = Vec::new();
    for entry in array {
        let obj = entry
            .as_object()
            .ok_or_else(|| fail(DiagKind::SchemaViolation, &["plural", name, "entry is not an object"], source_path))?;
        let quantity = obj
            .get("quantity")
            .and_then(Value::as_str)
            .ok_or_else(|| fail(DiagKind::SchemaViolation, &["plural", name, "missing quantity"], source_path))?;
        if !QUANTITIES.contains(&quantity) {
            return Err(fail(DiagKind::SchemaViolation, &["plural", name, "unknown quantity"], source_path));
        }
        if seen.contains(&quantity) {
            return Err(fail(DiagKind::SchemaViolation, &["plural", name, "duplicate quantity"], source_path));
        }
        seen.push(quantity);
        has_other |= quantity == "other";
        let text = obj
            .get("value")
            .and_then(Value::as_str)
            .ok_or_else(|| fail(DiagKind::SchemaViolation, &["plural", name, "missing value"], source_path))?;
        pairs.push(quantity.as_bytes().to_vec());
        pairs.push(text.as_bytes().to_vec());
    }
    if !has_other {
        return Err(fail(DiagKind::QuantityNoOther, &[name], source_path));
    }
    Ok(compose_framed(pairs))
}

fn normalize_pair_parent(parent: &str, type_tag: &str) -> String {
    if parent.starts_with('$') {
        parent.to_string()
    } else {
        format!("${type_tag}:{parent}")
    }
}

fn compile_theme_or_pattern(
    value: &Value,
    name: &str,
    parent: Option<&str>,
    type_tag: &str,
    source_path: &Path,
) -> Result<Vec<u8>, Diagnostic> {
    let array = value
        .as_array()
        .ok_or_else(|| fail(DiagKind::SchemaViolation, &[type_tag, name, "value is not an array"], source_path))?;
    let mut pairs = Vec::new();
    if let Some(parent) = parent {
        pairs.push(normalize_pair_parent(parent, type_tag).into_bytes());
    }
    for entry in array {
        let obj = entry
            .as_object()
            .ok_or_else(|| fail(DiagKind::SchemaViolation, &[type_tag, name, "entry is not an object"], source_path))?;
        let entry_name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| fail(DiagKind::SchemaViolation, &[type_tag, name, "entry missing name"], source_path))?;
        let entry_value = obj
            .get("value")
            .and_then(Value::as_str)
            .ok_or_else(|| fail(DiagKind::SchemaViolation, &[type_tag, name, "entry missing value"], source_path))?;
        pairs.push(entry_name.as_bytes().to_vec());
        pairs.push(entry_value.as_bytes().to_vec());
    }
    Ok(compose_framed(pairs))
}

fn compile_str_array(value: &Value, name: &str, limit_key: &str, source_path: &Path) -> Result<Vec<u8>, Diagnostic> {
    let array = value
        .as_array()
        .ok_or_else(|| fail(DiagKind::SchemaViolation, &["strarray", name, "value is not an array"], source_path))?;
    let mut elements = Vec::with_capacity(array.len());
    for item in array {
        let obj = item
            .as_object()
            .ok_or_else(|| fail(DiagKind::SchemaViolation, &["strarray", name, "entry is not an object"], source_path))?;
        let inner = obj
            .get("value")
            .ok_or_else(|| fail(DiagKind::SchemaViolation, &["strarray", name, "entry missing value"], source_path))?;
        elements.push(compile_string_value(inner, name, limit_key, source_path)?);
    }
    Ok(compose_framed(elements))
}

fn compile_int_array(value: &Value, name: &str, source_path: &Path) -> Result<Vec<u8>, Diagnostic> {
    let array = value
        .as_array()
        .ok_or_else(|| fail(DiagKind::SchemaViolation, &["intarray", name, "value is not an array"], source_path))?;
    let mut elements = Vec::with_capacity(array.len());
    for item in array {
        elements.push(compile_integer_value(item, name, source_path)?);
    }
    Ok(compose_framed(elements))
}

/// Compiles one element JSON file into one `ResourceItem` per array
/// entry. The file's single top-level key names the resource type.
pub fn compile_element_file(
    source_path: &Path,
    limit_key: &str,
    qualifiers: &[KeyParam],
    json_text: &str,
) -> Result<Vec<ResourceItem>, Diagnostic> {
    let root: Value = serde_json::from_str(json_text).map_err(|e| {
        fail(DiagKind::SchemaViolation, &["element", "?", &e.to_string()], source_path)
    })?;
    let obj = root
        .as_object()
        .ok_or_else(|| fail(DiagKind::SchemaViolation, &["element", "?", "root is not an object"], source_path))?;
    if obj.len() != 1 {
        return Err(fail(
            DiagKind::SchemaViolation,
            &["element", "?", "expected exactly one top-level key"],
            source_path,
        ));
    }
    let (tag, array_value) = obj.iter().next().unwrap();
    let res_type = ResType::from_tag(tag)
        .filter(|t| ResType::ELEMENT_TYPES.contains(t))
        .ok_or_else(|| fail(DiagKind::SchemaViolation, &["element", "?", "unknown element type"], source_path))?;
    let array = array_value
        .as_array()
        .ok_or_else(|| fail(DiagKind::SchemaViolation, &[tag, "?", "expected an array"], source_path))?;
    let entries = parse_entries(array, source_path, tag)?;

    let mut items = Vec::with_capacity(entries.len());
    for entry in entries {
        let data = match res_type {
            ResType::String => compile_string_value(entry.value, entry.name, limit_key, source_path)?,
            ResType::Integer => compile_integer_value(entry.value, entry.name, source_path)?,
            ResType::Boolean => compile_boolean_value(entry.value, entry.name, source_path)?,
            ResType::Color => compile_color_value(entry.value, entry.name, source_path)?,
            ResType::Float => compile_float_value(entry.value, entry.name, source_path)?,
            ResType::Symbol => compile_symbol_value(entry.value, entry.name, source_path)?,
            ResType::StrArray => compile_str_array(entry.value, entry.name, limit_key, source_path)?,
            ResType::IntArray => compile_int_array(entry.value, entry.name, source_path)?,
            ResType::Plural => compile_plural_pairs(entry.value, entry.name, source_path)?,
            ResType::Theme | ResType::Pattern => {
                compile_theme_or_pattern(entry.value, entry.name, entry.parent, tag, source_path)?
            }
            _ => {
                return Err(fail(
                    DiagKind::SchemaViolation,
                    &[tag, entry.name, "not an element resource type"],
                    source_path,
                ))
            }
        };
        items.push(ResourceItem::new(
            entry.name,
            res_type,
            qualifiers.to_vec(),
            source_path.to_path_buf(),
            data,
        ));
    }
    Ok(items)
}

/// `data` built by [`frame_bytes`] alone, used by callers composing a
/// single-element framed payload outside the array forms above.
pub fn frame_single(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    frame_bytes(&mut out, value);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn path() -> PathBuf {
        PathBuf::from("base/element/test.json")
    }

    #[test]
    fn compiles_simple_string() {
        let json = r#"{"string":[{"name":"app_name","value":"Hello"}]}"#;
        let items = compile_element_file(&path(), "base", &[], json).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].data_as_str(), Some("Hello"));
        assert_eq!(items[0].res_type, ResType::String);
    }

    #[test]
    fn strips_translate_tags_on_base_strings() {
        let json = r#"{"string":[{"name":"s","value":"hi {noTranslateStart}DO-NOT-TRANSLATE{noTranslateEnd} bye"}]}"#;
        let items = compile_element_file(&path(), "base", &[], json).unwrap();
        assert_eq!(items[0].data_as_str(), Some("hi DO-NOT-TRANSLATE bye"));
    }

    #[test]
    fn mismatched_translate_tag_is_rejected() {
        let json = r#"{"string":[{"name":"s","value":"hi {noTranslateStart} bye"}]}"#;
        let err = compile_element_file(&path(), "base", &[], json).unwrap_err();
        assert_eq!(err.kind, DiagKind::TranslateTagMismatch);
    }

    #[test]
    fn plural_without_other_is_rejected() {
        let json = r#"{"plural":[{"name":"p","value":[{"quantity":"one","value":"1 item"}]}]}"#;
        let err = compile_element_file(&path(), "base", &[], json).unwrap_err();
        assert_eq!(err.kind, DiagKind::QuantityNoOther);
    }

    #[test]
    fn color_requires_hash_literal_or_reference() {
        let json = r#"{"color":[{"name":"c","value":"12345"}]}"#;
        let err = compile_element_file(&path(), "base", &[], json).unwrap_err();
        assert_eq!(err.kind, DiagKind::InvalidColorValue);

        let json_ok = r#"{"color":[{"name":"c","value":"#102030"}]}"#;
        let items = compile_element_file(&path(), "base", &[], json_ok).unwrap();
        assert_eq!(items[0].data_as_str(), Some("#102030"));
    }

    #[test]
    fn color_rejects_five_digit_hex() {
        let json = r#"{"color":[{"name":"c","value":"#12345"}]}"#;
        let err = compile_element_file(&path(), "base", &[], json).unwrap_err();
        assert_eq!(err.kind, DiagKind::InvalidColorValue);
    }

    #[test]
    fn color_accepts_3_4_6_8_digit_hex() {
        for literal in ["#abc", "#abcd", "#aabbcc", "#aabbccdd"] {
            let json = format!(r#"{{"color":[{{"name":"c","value":"{literal}"}}]}}"#);
            assert!(compile_element_file(&path(), "base", &[], &json).is_ok(), "{literal} should be accepted");
        }
    }

    #[test]
    fn integer_accepts_literal_and_reference_rejects_garbage_string() {
        let json_literal = r#"{"integer":[{"name":"n","value":7}]}"#;
        let items = compile_element_file(&path(), "base", &[], json_literal).unwrap();
        assert_eq!(items[0].data_as_str(), Some("7"));

        let json_ref = r#"{"integer":[{"name":"n","value":"$integer:other"}]}"#;
        assert!(compile_element_file(&path(), "base", &[], json_ref).is_ok());

        let json_garbage = r#"{"integer":[{"name":"n","value":"not_a_number"}]}"#;
        let err = compile_element_file(&path(), "base", &[], json_garbage).unwrap_err();
        assert_eq!(err.kind, DiagKind::SchemaViolation);
    }

    #[test]
    fn boolean_accepts_literal_and_reference_rejects_garbage_string() {
        let json_literal = r#"{"boolean":[{"name":"b","value":true}]}"#;
        let items = compile_element_file(&path(), "base", &[], json_literal).unwrap();
        assert_eq!(items[0].data_as_str(), Some("true"));

        let json_ref = r#"{"boolean":[{"name":"b","value":"$ohos:boolean:other"}]}"#;
        assert!(compile_element_file(&path(), "base", &[], json_ref).is_ok());

        let json_garbage = r#"{"boolean":[{"name":"b","value":"maybe"}]}"#;
        let err = compile_element_file(&path(), "base", &[], json_garbage).unwrap_err();
        assert_eq!(err.kind, DiagKind::SchemaViolation);
    }

    #[test]
    fn symbol_rejects_plane_14_accepts_plane_15() {
        let json = r#"{"symbol":[{"name":"s","value":"0xE0000"}]}"#;
        let err = compile_element_file(&path(), "base", &[], json).unwrap_err();
        assert_eq!(err.kind, DiagKind::InvalidSymbol);

        let json_ok = r#"{"symbol":[{"name":"s","value":"0xF0000"}]}"#;
        assert!(compile_element_file(&path(), "base", &[], json_ok).is_ok());
    }

    #[test]
    fn theme_parent_is_normalized_to_reference() {
        let json = r#"{"theme":[{"name":"t","parent":"other_theme","value":[{"name":"bg","value":"#FFFFFF"}]}]}"#;
        let items = compile_element_file(&path(), "base", &[], json).unwrap();
        let decomposed = respack_core::item::decompose_framed(&items[0].data);
        assert_eq!(decomposed[0], b"$theme:other_theme");
    }
}
