//! Legacy index layout (spec §4.8.2).

use crate::header::{build_version_header, detect_version, IndexVersion, VERSION_TAG_LEN};
use crate::{bounds_check, read_exact_tag, IndexError, IndexedItem};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use respack_core::item::{frame_bytes, read_framed};
use respack_core::{KeyParam, QualifierKind, ResType};
use std::io::Cursor;

const KEYS_TAG: &[u8; 4] = b"KEYS";
const IDSS_TAG: &[u8; 4] = b"IDSS";

struct ConfigGroup {
    qualifiers: Vec<KeyParam>,
    item_indices: Vec<usize>,
}

fn group_by_limit_key(items: &[IndexedItem]) -> Vec<ConfigGroup> {
    let mut groups: Vec<ConfigGroup> = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        let key = respack_core::format_limit_key(&item.qualifiers);
        if let Some(group) = groups
            .iter_mut()
            .find(|g| respack_core::format_limit_key(&g.qualifiers) == key)
        {
            group.item_indices.push(idx);
        } else {
            groups.push(ConfigGroup {
                qualifiers: item.qualifiers.clone(),
                item_indices: vec![idx],
            });
        }
    }
    groups
}

fn config_entry_size(group: &ConfigGroup) -> usize {
    4 + 4 + 4 + group.qualifiers.len() * 8
}

fn idset_entry_size(group: &ConfigGroup) -> usize {
    4 + 4 + group.item_indices.len() * 8
}

fn record_bytes(item: &IndexedItem) -> Vec<u8> {
    let mut payload = Vec::new();
    frame_bytes(&mut payload, &item.data);
    frame_bytes(&mut payload, item.name.as_bytes());
    let mut record = Vec::new();
    record.write_u32::<LittleEndian>((8 + payload.len()) as u32).unwrap();
    record.write_u32::<LittleEndian>(item.res_type as u32).unwrap();
    record.write_u32::<LittleEndian>(item.id).unwrap();
    record.extend_from_slice(&payload);
    record
}

/// Serializes `items` into the v1 layout.
pub fn write(items: &[IndexedItem]) -> Result<Vec<u8>, IndexError> {
    let groups = group_by_limit_key(items);
    let header_size = VERSION_TAG_LEN + 4 + 4;
    let configs_size: usize = groups.iter().map(config_entry_size).sum();
    let idsets_size: usize = groups.iter().map(idset_entry_size).sum();
    let record_pool_start = header_size + configs_size + idsets_size;

    let record_bodies: Vec<Vec<u8>> = items.iter().map(record_bytes).collect();
    let mut record_offsets = Vec::with_capacity(items.len());
    let mut cursor = record_pool_start;
    for body in &record_bodies {
        record_offsets.push(cursor as u32);
        cursor += body.len();
    }
    let file_size = cursor;

    let mut out = Vec::with_capacity(file_size);
    out.extend_from_slice(&build_version_header(false));
    out.write_u32::<LittleEndian>(file_size as u32)?;
    out.write_u32::<LittleEndian>(groups.len() as u32)?;

    let mut idset_offset = header_size + configs_size;
    for group in &groups {
        out.extend_from_slice(KEYS_TAG);
        out.write_u32::<LittleEndian>(idset_offset as u32)?;
        out.write_u32::<LittleEndian>(group.qualifiers.len() as u32)?;
        for param in &group.qualifiers {
            out.write_u32::<LittleEndian>(param.kind as u32)?;
            out.write_u32::<LittleEndian>(param.value)?;
        }
        idset_offset += idset_entry_size(group);
    }

    for group in &groups {
        out.extend_from_slice(IDSS_TAG);
        out.write_u32::<LittleEndian>(group.item_indices.len() as u32)?;
        for &idx in &group.item_indices {
            out.write_u32::<LittleEndian>(items[idx].id)?;
            out.write_u32::<LittleEndian>(record_offsets[idx])?;
        }
    }

    for body in &record_bodies {
        out.extend_from_slice(body);
    }
    debug_assert_eq!(out.len(), file_size);
    Ok(out)
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

/// Parses the v1 layout, bounds-checking every access (spec §4.8.4).
pub fn read(buf: &[u8]) -> Result<Vec<IndexedItem>, IndexError> {
    bounds_check(buf, 0, VERSION_TAG_LEN + 8)?;
    let mut header_tag = [0u8; VERSION_TAG_LEN];
    header_tag.copy_from_slice(&buf[..VERSION_TAG_LEN]);
    if detect_version(&header_tag) != Some(IndexVersion::V1) {
        return Err(IndexError::InvalidResourceIndex("not a v1 index".into()));
    }
    let mut cursor = Cursor::new(&buf[VERSION_TAG_LEN..VERSION_TAG_LEN + 8]);
    let file_size = cursor.read_u32::<LittleEndian>()? as usize;
    let key_config_count = cursor.read_u32::<LittleEndian>()? as usize;
    bounds_check(buf, 0, file_size)?;

    let mut pos = VERSION_TAG_LEN + 8;
    struct Config {
        idset_offset: usize,
        qualifiers: Vec<KeyParam>,
    }
    let mut configs = Vec::with_capacity(key_config_count);
    for _ in 0..key_config_count {
        read_exact_tag(buf, pos, KEYS_TAG)?;
        pos += 4;
        bounds_check(buf, pos, 8)?;
        let idset_offset = u32::from_le_bytes(buf[pos..pos + 4].try_into().unwrap()) as usize;
        let key_count = u32::from_le_bytes(buf[pos + 4..pos + 8].try_into().unwrap()) as usize;
        pos += 8;
        bounds_check(buf, pos, key_count * 8)?;
        let mut qualifiers = Vec::with_capacity(key_count);
        for i in 0..key_count {
            let entry = pos + i * 8;
            let kind_raw = u32::from_le_bytes(buf[entry..entry + 4].try_into().unwrap());
            let value = u32::from_le_bytes(buf[entry + 4..entry + 8].try_into().unwrap());
            let kind = kind_from_u32(kind_raw)
                .ok_or_else(|| IndexError::InvalidResourceIndex(format!("unknown qualifier kind {kind_raw}")))?;
            qualifiers.push(KeyParam::new(kind, value));
        }
        pos += key_count * 8;
        configs.push(Config { idset_offset, qualifiers });
    }

    let mut items = Vec::new();
    for config in configs {
        let mut pos = config.idset_offset;
        read_exact_tag(buf, pos, IDSS_TAG)?;
        pos += 4;
        bounds_check(buf, pos, 4)?;
        let id_count = u32::from_le_bytes(buf[pos..pos + 4].try_into().unwrap()) as usize;
        pos += 4;
        for _ in 0..id_count {
            bounds_check(buf, pos, 8)?;
            let id = u32::from_le_bytes(buf[pos..pos + 4].try_into().unwrap());
            let record_offset = u32::from_le_bytes(buf[pos + 4..pos + 8].try_into().unwrap()) as usize;
            pos += 8;

            bounds_check(buf, record_offset, 12)?;
            let size = u32::from_le_bytes(buf[record_offset..record_offset + 4].try_into().unwrap()) as usize;
            let res_type_raw = u32::from_le_bytes(buf[record_offset + 4..record_offset + 8].try_into().unwrap());
            let record_id = u32::from_le_bytes(buf[record_offset + 8..record_offset + 12].try_into().unwrap());
            if record_id != id {
                return Err(IndexError::InvalidResourceIndex("id mismatch between IdSet and record".into()));
            }
            let res_type = res_type_from_u32(res_type_raw)
                .ok_or_else(|| IndexError::InvalidResourceIndex(format!("unknown res_type {res_type_raw}")))?;
            bounds_check(buf, record_offset + 12, size.saturating_sub(8))?;
            let payload = &buf[record_offset + 12..record_offset + 4 + size];
            let mut payload_pos = 0usize;
            let data = read_framed(payload, &mut payload_pos)
                .ok_or_else(|| IndexError::InvalidResourceIndex("truncated payload value".into()))?;
            let name_bytes = read_framed(payload, &mut payload_pos)
                .ok_or_else(|| IndexError::InvalidResourceIndex("truncated payload name".into()))?;
            let name = String::from_utf8(name_bytes)
                .map_err(|_| IndexError::InvalidResourceIndex("non-utf8 name".into()))?;

            let mut item = IndexedItem::new(res_type, id, name, config.qualifiers.clone(), data);
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
    fn tag_mismatch_is_rejected() {
        let mut buf = vec![0u8; VERSION_TAG_LEN + 8];
        buf[..8].copy_from_slice(b"Respack ");
        buf.extend_from_slice(b"XXXX");
        let err = read_exact_tag(&buf, VERSION_TAG_LEN + 8, KEYS_TAG);
        assert!(err.is_err());
    }
}
