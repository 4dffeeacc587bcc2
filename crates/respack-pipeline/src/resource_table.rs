//! `ResourceTable.txt` generation: one line per merged item,
//! `<type> <name> <id>` in hex, matching the textual artifact named
//! in spec §8 end-to-end scenario 1.

use respack_core::ResourceItem;
use respack_ids::ResKey;
use std::collections::HashMap;
use std::fmt::Write as _;

pub fn render(items: &[ResourceItem], ids: &HashMap<ResKey, u32>) -> String {
    let mut lines: Vec<(String, String, u32)> = items
        .iter()
        .filter_map(|item| {
            let id = ids.get(&(item.res_type, item.name.clone()))?;
            Some((item.res_type.tag().to_string(), item.name.clone(), *id))
        })
        .collect();
    lines.sort();
    lines.dedup();

    let mut out = String::new();
    for (res_type, name, id) in lines {
        let _ = writeln!(out, "{res_type} {name} {id:#010x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use respack_core::ResType;
    use std::path::PathBuf;

    #[test]
    fn renders_one_sorted_line_per_name() {
        let items = vec![ResourceItem::new(
            "app_name",
            ResType::String,
            vec![],
            PathBuf::from("base/element/string.json"),
            b"Hello".to_vec(),
        )];
        let mut ids = HashMap::new();
        ids.insert((ResType::String, "app_name".to_string()), 0x0100_0000u32);
        assert_eq!(render(&items, &ids), "string app_name 0x01000000\n");
    }
}
