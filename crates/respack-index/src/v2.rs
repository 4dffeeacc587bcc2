//! v2 index layout (spec §4.8.3): resource metadata hoisted into a
//! single search structure, payloads shared across qualifier sets by
//! offset into a data pool.

use crate::header::{build_version_header, detect_version, IndexVersion, VERSION_TAG_LEN};
use crate::{bounds_check, read_exact_tag, IndexError, IndexedItem};
use byteorder::{LittleEndian, WriteBytesExt};
use respack_core::{KeyParam, QualifierKind, ResType};
use std::collections::HashMap;

const KEYS_TAG: &[u8; 4] = b"KEYS";
const IDSS_TAG: &[u8; 4] = b"IDSS";
const DATA_TAG: &[u8; 4] = b"DATA";

struct ConfigGroup {
    qualifiers: Vec<KeyParam>,
}

fn kind_from_u32(v: u32) -> Option<QualifierKind> {
    Some(match v {
        0 => QualifierKind::Language,
        1 => QualifierKind::Region,
        2 => QualifierKind::Resolution,
        3 => QualifierKind::Orientation,
        4 => QualifierKind::DeviceType,
        5 => QualifierKind::Script,
        6 => QualifierKind::NightMode,
        7 => QualifierKind::Mcc,
        8 => QualifierKind::Mnc,
        10 => QualifierKind::InputDevice,
        _ => return None,
    })
}

fn res_type_from_u32(v: u32) -> Option<ResType> {
    Some(match v {
        0 => ResType::Element,
        6 => ResType::Raw,
        8 => ResType::Integer,
        9 => ResType::String,
        10 => ResType::StrArray,
        11 => ResType::IntArray,
        12 => ResType::Boolean,
        14 => ResType::Color,
        15 => ResType::Id,
        16 => ResType::Theme,
        17 => ResType::Plural,
        18 => ResType::Float,
        19 => ResType::Media,
        20 => ResType::Profile,
        22 => ResType::Pattern,
        23 => ResType::Symbol,
        24 => ResType::Res,
        _ => return None,
    })
}

/// One resolved value of a resource, tagged with which config it
/// belongs to.
struct ResourceRecord {
    res_type: ResType,
    id: u32,
    name: String,
    config_id: u32,
    data: Vec<u8>,
}

/// Serializes `items` into the v2 layout.
pub fn write(items: &[IndexedItem]) -> Result<Vec<u8>, IndexError> {
    // Assign dense config ids in order of first appearance.
    let mut configs: Vec<ConfigGroup> = Vec::new();
    let mut config_id_of = |qualifiers: &[KeyParam], configs: &mut Vec<ConfigGroup>| -> u32 {
        let key = respack_core::format_limit_key(qualifiers);
        if let Some(pos) = configs
            .iter()
            .position(|g| respack_core::format_limit_key(&g.qualifiers) == key)
        {
            pos as u32
        } else {
            configs.push(ConfigGroup { qualifiers: qualifiers.to_vec() });
            (configs.len() - 1) as u32
        }
    };
    let records: Vec<ResourceRecord> = items
        .iter()
        .map(|item| ResourceRecord {
            res_type: item.res_type,
            id: item.id,
            name: item.name.clone(),
            config_id: config_id_of(&item.qualifiers, &mut configs),
            data: item.data.clone(),
        })
        .collect();

    // KeyConfig section size.
    let key_config_size: usize = configs.iter().map(|g| 4 + 4 + 4 + g.qualifiers.len() * 8).sum();
    let header_size = VERSION_TAG_LEN + 4 + 4 + 4;

    // Group records by res_id, preserving first-seen (res_type, name).
    struct ResGroup {
        res_type: ResType,
        id: u32,
        name: String,
        variants: Vec<(u32, usize)>, // (config_id, index into dedup pool)
    }
    let mut groups: Vec<ResGroup> = Vec::new();
    let mut group_index_of_id: HashMap<u32, usize> = HashMap::new();

    // Dedup pool of identical payloads.
    let mut pool_bytes: Vec<Vec<u8>> = Vec::new();
    let mut pool_index_of: HashMap<Vec<u8>, usize> = HashMap::new();

    for record in &records {
        let pool_idx = *pool_index_of.entry(record.data.clone()).or_insert_with(|| {
            pool_bytes.push(record.data.clone());
            pool_bytes.len() - 1
        });
        if let Some(&gidx) = group_index_of_id.get(&record.id) {
            groups[gidx].variants.push((record.config_id, pool_idx));
        } else {
            group_index_of_id.insert(record.id, groups.len());
            groups.push(ResGroup {
                res_type: record.res_type,
                id: record.id,
                name: record.name.clone(),
                variants: vec![(record.config_id, pool_idx)],
            });
        }
    }

    // ResTypeHeader/ResIndex section, grouped by res_type in first-seen order.
    let mut type_order: Vec<ResType> = Vec::new();
    let mut groups_by_type: HashMap<ResType, Vec<usize>> = HashMap::new();
    for (gi, group) in groups.iter().enumerate() {
        if !type_order.contains(&group.res_type) {
            type_order.push(group.res_type);
        }
        groups_by_type.entry(group.res_type).or_default().push(gi);
    }

    let res_index_section_size: usize = type_order
        .iter()
        .map(|t| {
            let gidxs = &groups_by_type[t];
            4 + 4 + 4 + gidxs.iter().map(|&gi| 4 + 4 + 4 + groups[gi].name.len()).sum::<usize>()
        })
        .sum();
    let idset_header_size = 4 + 4 + 4 + 4 + res_index_section_size;

    let data_header_start = header_size + key_config_size + idset_header_size;
    // Per-group ResInfo entry size and offsets, in group order.
    let res_info_sizes: Vec<usize> = groups.iter().map(|g| 4 + 4 + 4 + g.variants.len() * 8).collect();
    let mut res_info_offsets = Vec::with_capacity(groups.len());
    let mut cursor = data_header_start + 4 + 4 + 4; // past "DATA", length, id_count
    for size in &res_info_sizes {
        res_info_offsets.push(cursor as u32);
        cursor += size;
    }
    let data_pool_start = cursor;
    let data_header_size = 4 + 4 + 4 + res_info_sizes.iter().sum::<usize>();

    // Data pool offsets for each distinct payload.
    let mut pool_offsets = Vec::with_capacity(pool_bytes.len());
    let mut pool_cursor = data_pool_start;
    for bytes in &pool_bytes {
        pool_offsets.push(pool_cursor as u32);
        pool_cursor += 2 + bytes.len();
    }
    let file_length = pool_cursor;

    let mut out = Vec::with_capacity(file_length);
    out.extend_from_slice(&build_version_header(true));
    out.write_u32::<LittleEndian>(file_length as u32)?;
    out.write_u32::<LittleEndian>(configs.len() as u32)?;
    out.write_u32::<LittleEndian>(data_header_start as u32)?;

    for (config_id, group) in configs.iter().enumerate() {
        out.extend_from_slice(KEYS_TAG);
        out.write_u32::<LittleEndian>(config_id as u32)?;
        out.write_u32::<LittleEndian>(group.qualifiers.len() as u32)?;
        for param in &group.qualifiers {
            out.write_u32::<LittleEndian>(param.kind as u32)?;
            out.write_u32::<LittleEndian>(param.value)?;
        }
    }

    out.extend_from_slice(IDSS_TAG);
    out.write_u32::<LittleEndian>(idset_header_size as u32)?;
    out.write_u32::<LittleEndian>(type_order.len() as u32)?;
    out.write_u32::<LittleEndian>(groups.len() as u32)?;
    for res_type in &type_order {
        let gidxs = &groups_by_type[res_type];
        let type_header_len = 4 + 4 + 4 + gidxs.iter().map(|&gi| 4 + 4 + 4 + groups[gi].name.len()).sum::<usize>();
        out.write_u32::<LittleEndian>(*res_type as u32)?;
        out.write_u32::<LittleEndian>(type_header_len as u32)?;
        out.write_u32::<LittleEndian>(gidxs.len() as u32)?;
        for &gi in gidxs {
            let group = &groups[gi];
            out.write_u32::<LittleEndian>(group.id)?;
            out.write_u32::<LittleEndian>(res_info_offsets[gi])?;
            out.write_u32::<LittleEndian>(group.name.len() as u32)?;
            out.extend_from_slice(group.name.as_bytes());
        }
    }

    out.extend_from_slice(DATA_TAG);
    out.write_u32::<LittleEndian>(data_header_size as u32)?;
    out.write_u32::<LittleEndian>(groups.len() as u32)?;
    for group in &groups {
        out.write_u32::<LittleEndian>(group.id)?;
        let len = 4 + 4 + 4 + group.variants.len() * 8;
        out.write_u32::<LittleEndian>(len as u32)?;
        out.write_u32::<LittleEndian>(group.variants.len() as u32)?;
        for &(config_id, pool_idx) in &group.variants {
            out.write_u32::<LittleEndian>(config_id)?;
            out.write_u32::<LittleEndian>(pool_offsets[pool_idx])?;
        }
    }

    for bytes in &pool_bytes {
        out.write_u16::<LittleEndian>(bytes.len() as u16)?;
        out.extend_from_slice(bytes);
    }

    debug_assert_eq!(out.len(), file_length);
    Ok(out)
}

/// Parses the v2 layout, bounds-checking every access.
pub fn read(buf: &[u8]) -> Result<Vec<IndexedItem>, IndexError> {
    bounds_check(buf, 0, VERSION_TAG_LEN + 12)?;
    let mut header_tag = [0u8; VERSION_TAG_LEN];
    header_tag.copy_from_slice(&buf[..VERSION_TAG_LEN]);
    if detect_version(&header_tag) != Some(IndexVersion::V2) {
        return Err(IndexError::InvalidResourceIndex("not a v2 index".into()));
    }
    let length = u32::from_le_bytes(buf[VERSION_TAG_LEN..VERSION_TAG_LEN + 4].try_into().unwrap()) as usize;
    let key_count = u32::from_le_bytes(buf[VERSION_TAG_LEN + 4..VERSION_TAG_LEN + 8].try_into().unwrap()) as usize;
    bounds_check(buf, 0, length)?;

    let mut pos = VERSION_TAG_LEN + 12;
    let mut configs = Vec::with_capacity(key_count);
    for _ in 0..key_count {
        read_exact_tag(buf, pos, KEYS_TAG)?;
        pos += 4;
        bounds_check(buf, pos, 8)?;
        let _config_id = u32::from_le_bytes(buf[pos..pos + 4].try_into().unwrap());
        let key_count_inner = u32::from_le_bytes(buf[pos + 4..pos + 8].try_into().unwrap()) as usize;
        pos += 8;
        bounds_check(buf, pos, key_count_inner * 8)?;
        let mut qualifiers = Vec::with_capacity(key_count_inner);
        for i in 0..key_count_inner {
            let entry = pos + i * 8;
            let kind_raw = u32::from_le_bytes(buf[entry..entry + 4].try_into().unwrap());
            let value = u32::from_le_bytes(buf[entry + 4..entry + 8].try_into().unwrap());
            let kind = kind_from_u32(kind_raw)
                .ok_or_else(|| IndexError::InvalidResourceIndex(format!("unknown qualifier kind {kind_raw}")))?;
            qualifiers.push(KeyParam::new(kind, value));
        }
        pos += key_count_inner * 8;
        configs.push(qualifiers);
    }

    read_exact_tag(buf, pos, IDSS_TAG)?;
    pos += 4;
    bounds_check(buf, pos, 12)?;
    let type_count = u32::from_le_bytes(buf[pos + 4..pos + 8].try_into().unwrap()) as usize;
    pos += 12;

    struct ResLocation {
        res_type: ResType,
        id: u32,
        name: String,
        res_info_offset: usize,
    }
    let mut locations = Vec::new();
    for _ in 0..type_count {
        bounds_check(buf, pos, 12)?;
        let res_type_raw = u32::from_le_bytes(buf[pos..pos + 4].try_into().unwrap());
        let count = u32::from_le_bytes(buf[pos + 8..pos + 12].try_into().unwrap()) as usize;
        let res_type = res_type_from_u32(res_type_raw)
            .ok_or_else(|| IndexError::InvalidResourceIndex(format!("unknown res_type {res_type_raw}")))?;
        pos += 12;
        for _ in 0..count {
            bounds_check(buf, pos, 12)?;
            let id = u32::from_le_bytes(buf[pos..pos + 4].try_into().unwrap());
            let res_info_offset = u32::from_le_bytes(buf[pos + 4..pos + 8].try_into().unwrap()) as usize;
            let name_len = u32::from_le_bytes(buf[pos + 8..pos + 12].try_into().unwrap()) as usize;
            pos += 12;
            bounds_check(buf, pos, name_len)?;
            let name = String::from_utf8(buf[pos..pos + name_len].to_vec())
                .map_err(|_| IndexError::InvalidResourceIndex("non-utf8 name".into()))?;
            pos += name_len;
            locations.push(ResLocation { res_type, id, name, res_info_offset });
        }
    }

    read_exact_tag(buf, pos, DATA_TAG)?;

    let mut items = Vec::new();
    for location in &locations {
        let mut info_pos = location.res_info_offset;
        bounds_check(buf, info_pos, 12)?;
        let info_id = u32::from_le_bytes(buf[info_pos..info_pos + 4].try_into().unwrap());
        if info_id != location.id {
            return Err(IndexError::InvalidResourceIndex("id mismatch between ResIndex and ResInfo".into()));
        }
        let value_count = u32::from_le_bytes(buf[info_pos + 8..info_pos + 12].try_into().unwrap()) as usize;
        info_pos += 12;
        bounds_check(buf, info_pos, value_count * 8)?;
        for v in 0..value_count {
            let entry = info_pos + v * 8;
            let config_id = u32::from_le_bytes(buf[entry..entry + 4].try_into().unwrap()) as usize;
            let data_offset = u32::from_le_bytes(buf[entry + 4..entry + 8].try_into().unwrap()) as usize;
            bounds_check(buf, data_offset, 2)?;
            let data_len = u16::from_le_bytes(buf[data_offset..data_offset + 2].try_into().unwrap()) as usize;
            bounds_check(buf, data_offset + 2, data_len)?;
            let data = buf[data_offset + 2..data_offset + 2 + data_len].to_vec();
            let qualifiers = configs
                .get(config_id)
                .cloned()
                .ok_or_else(|| IndexError::InvalidResourceIndex("config_id out of range".into()))?;
            let mut item = IndexedItem::new(location.res_type, location.id, location.name.clone(), qualifiers, data);
            item.coverable = true;
            items.push(item);
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedups_identical_payloads_across_configs() {
        let items = vec![
            IndexedItem::new(ResType::Color, 1, "c", vec![], b"#FFFFFF".to_vec()),
            IndexedItem::new(
                ResType::Color,
                1,
                "c",
                vec![KeyParam::new(QualifierKind::NightMode, 0)],
                b"#FFFFFF".to_vec(),
            ),
        ];
        let bytes = write(&items).unwrap();
        let loaded = read(&bytes).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].data, loaded[1].data);
    }
}
