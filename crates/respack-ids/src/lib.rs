//! 32-bit resource ID allocation, `id_defined.json` manifests, and
//! prior-HAP ID ingestion (spec §3.3, §4.5, §6.2).
//!
//! Grounded on `original_source/include/id_worker.h` and
//! `src/id_worker.cpp`: the allocation algorithm, free-list reuse on
//! tombstoned HAP entries, and the `GetMaxId` single-bit round-up are
//! carried over verbatim; the singleton `CmdParser` dependency called
//! out in that source is replaced by explicit constructor arguments
//! per the design note in spec §9.

use respack_core::ResType;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// `(type, name)` — the key every ID table and manifest indexes by.
pub type ResKey = (ResType, String);

#[derive(Debug, Error)]
pub enum IdError {
    #[error("start id {0:#010x} is not in a legal app range")]
    IllegalStartId(u32),
    #[error("id exceeded: next candidate {next:#010x} > app_max {max:#010x}")]
    IdExceeded { next: u64, max: u64 },
    #[error("--startId and an id_defined.json manifest are mutually exclusive")]
    ExclusiveStartId,
    #[error("duplicate id {0:#010x} in manifest")]
    DuplicateId(u32),
    #[error("duplicate (type,name) {0:?}:{1} in manifest")]
    DuplicateKey(String, String),
    #[error("manifest record missing required field: {0}")]
    MissingField(&'static str),
    #[error("unknown resource type tag {0:?}")]
    UnknownType(String),
    #[error("malformed hex id {0:?}")]
    MalformedHex(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Rounds `start_id` up to the next single-bit boundary: returns the
/// inclusive upper bound of the block whose size is `start_id`'s
/// lowest set bit. Mirrors `IdWorker::GetMaxId` bit for bit.
pub fn round_up_single_bit(start_id: u32) -> u32 {
    let mut flag: u32 = 1;
    while flag & start_id == 0 {
        flag <<= 1;
    }
    start_id.wrapping_add(flag).wrapping_sub(1)
}

/// Allocates 32-bit IDs for the app and system clusters (spec §3.3,
/// §4.5). Single-threaded by construction: only the main thread
/// invokes allocation, after all per-module compilation has merged.
#[derive(Debug, Default)]
pub struct IdWorker {
    app_next: u64,
    app_max: u64,
    ids: HashMap<ResKey, u32>,
    app_defined: HashMap<ResKey, u32>,
    sys_defined: HashMap<ResKey, u32>,
    free_list: VecDeque<u32>,
    cache: HashMap<ResKey, u32>,
}

impl IdWorker {
    /// Creates a worker whose app pool begins at `start_id` (or the
    /// default base `0x01000000`).
    pub fn new(start_id: Option<u32>) -> Result<Self, IdError> {
        let start = start_id.unwrap_or(respack_core::APP_ID_BASE);
        if !respack_core::is_legal_app_start_id(start) {
            return Err(IdError::IllegalStartId(start));
        }
        Ok(Self {
            app_next: start as u64,
            app_max: round_up_single_bit(start) as u64,
            ..Self::default()
        })
    }

    pub fn set_app_defined(&mut self, defined: HashMap<ResKey, u32>) {
        self.app_defined = defined;
    }

    pub fn set_sys_defined(&mut self, defined: HashMap<ResKey, u32>) {
        self.sys_defined = defined;
    }

    pub fn set_cache(&mut self, cache: HashMap<ResKey, u32>) {
        self.cache = cache;
    }

    /// Ingests every `(type,name) -> id` pair from a loaded prior HAP
    /// (spec §4.5 "Loading from a prior HAP"): installs each into
    /// `ids`, then advances `app_next`/`app_max` to cover the loaded
    /// range.
    pub fn load_from_hap(&mut self, entries: impl IntoIterator<Item = (ResKey, u32)>) {
        let mut min_id = u32::MAX;
        let mut max_id = 0u32;
        for (key, id) in entries {
            min_id = min_id.min(id);
            max_id = max_id.max(id);
            self.ids.insert(key, id);
        }
        if max_id >= min_id {
            self.app_next = self.app_next.max(max_id as u64 + 1);
            self.app_max = self.app_max.max(round_up_single_bit(min_id) as u64);
        }
    }

    /// Returns an already-tombstoned id to the free list, so a later
    /// allocation can reuse it before extending `app_next`.
    pub fn free(&mut self, id: u32) {
        self.free_list.push_back(id);
    }

    /// Allocates (or returns the existing) ID for `key` in the app
    /// cluster, per the 5-step algorithm of spec §4.5.
    pub fn generate_id(&mut self, key: ResKey) -> Result<u32, IdError> {
        if let Some(&id) = self.ids.get(&key) {
            return Ok(id);
        }
        if let Some(&id) = self.app_defined.get(&key) {
            self.ids.insert(key, id);
            return Ok(id);
        }
        if let Some(&id) = self.cache.get(&key) {
            self.ids.insert(key, id);
            return Ok(id);
        }
        if let Some(id) = self.free_list.pop_front() {
            self.ids.insert(key, id);
            return Ok(id);
        }
        let defined: std::collections::HashSet<u32> = self.app_defined.values().copied().collect();
        loop {
            if self.app_next > self.app_max {
                return Err(IdError::IdExceeded {
                    next: self.app_next,
                    max: self.app_max,
                });
            }
            let candidate = self.app_next as u32;
            self.app_next += 1;
            if !defined.contains(&candidate) {
                self.ids.insert(key, candidate);
                return Ok(candidate);
            }
        }
    }

    /// Resolves a system-cluster ID. Only pre-defined entries resolve;
    /// there is no dynamic system allocation.
    pub fn generate_sys_id(&self, key: &ResKey) -> Option<u32> {
        self.sys_defined.get(key).copied()
    }

    pub fn assigned(&self) -> impl Iterator<Item = (&ResKey, &u32)> {
        self.ids.iter()
    }

    pub fn app_max(&self) -> u64 {
        self.app_max
    }

    pub fn app_next(&self) -> u64 {
        self.app_next
    }
}

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(rename = "startId")]
    start_id: Option<String>,
    record: Vec<ManifestRecord>,
}

#[derive(Debug, Deserialize)]
struct ManifestRecord {
    #[serde(rename = "type")]
    res_type: String,
    name: String,
    id: Option<String>,
    order: Option<u32>,
}

fn parse_hex_id(raw: &str) -> Result<u32, IdError> {
    let stripped = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| IdError::MalformedHex(raw.to_string()))?;
    u32::from_str_radix(stripped, 16).map_err(|_| IdError::MalformedHex(raw.to_string()))
}

/// Parses an *application* `id_defined.json`: `id` is mandatory on
/// every record, `order` must be absent (spec §4.5, §6.2).
pub fn parse_app_manifest(json: &str) -> Result<HashMap<ResKey, u32>, IdError> {
    let file: ManifestFile = serde_json::from_str(json)?;
    let mut out = HashMap::new();
    let mut seen_ids = std::collections::HashSet::new();
    for record in file.record {
        let res_type =
            ResType::from_tag(&record.res_type).ok_or(IdError::UnknownType(record.res_type))?;
        let id_str = record.id.ok_or(IdError::MissingField("id"))?;
        let id = parse_hex_id(&id_str)?;
        if !seen_ids.insert(id) {
            return Err(IdError::DuplicateId(id));
        }
        let key = (res_type, record.name);
        if out.insert(key.clone(), id).is_some() {
            return Err(IdError::DuplicateKey(key.0.to_string(), key.1));
        }
    }
    Ok(out)
}

/// Parses a *system* `id_defined.json`: `order` is mandatory, `id` is
/// derived as `startId + order` (spec §4.5, §6.2).
pub fn parse_sys_manifest(json: &str) -> Result<HashMap<ResKey, u32>, IdError> {
    let file: ManifestFile = serde_json::from_str(json)?;
    let start_id = match &file.start_id {
        Some(s) => parse_hex_id(s)?,
        None => respack_core::SYSTEM_ID_BASE,
    };
    let mut out = HashMap::new();
    let mut seen_ids = std::collections::HashSet::new();
    for record in file.record {
        let res_type =
            ResType::from_tag(&record.res_type).ok_or(IdError::UnknownType(record.res_type))?;
        let order = record.order.ok_or(IdError::MissingField("order"))?;
        let id = start_id + order;
        if !seen_ids.insert(id) {
            return Err(IdError::DuplicateId(id));
        }
        let key = (res_type, record.name);
        if out.insert(key.clone(), id).is_some() {
            return Err(IdError::DuplicateKey(key.0.to_string(), key.1));
        }
    }
    Ok(out)
}

/// Renders a normalized `id_defined.json` for every assigned entry, in
/// hexadecimal form (spec §4.8.5).
pub fn write_id_defined(entries: &[(ResKey, u32)]) -> Result<String, IdError> {
    #[derive(Serialize)]
    struct OutRecord {
        #[serde(rename = "type")]
        res_type: String,
        name: String,
        id: String,
    }
    #[derive(Serialize)]
    struct OutFile {
        record: Vec<OutRecord>,
    }
    let record = entries
        .iter()
        .map(|((res_type, name), id)| OutRecord {
            res_type: res_type.tag().to_string(),
            name: name.clone(),
            id: format!("{id:#010x}"),
        })
        .collect();
    Ok(serde_json::to_string_pretty(&OutFile { record })?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_bit_round_up_matches_reserved_boundary() {
        assert_eq!(round_up_single_bit(0x0100_0000), 0x01FF_FFFF);
        assert_eq!(round_up_single_bit(0x0680_0000), 0x06FF_FFFF);
    }

    #[test]
    fn allocator_monotonicity_and_stability() {
        let mut worker = IdWorker::new(None).unwrap();
        let a = worker
            .generate_id((ResType::String, "app_name".into()))
            .unwrap();
        let b = worker
            .generate_id((ResType::String, "app_desc".into()))
            .unwrap();
        assert!(b > a);
        let a_again = worker
            .generate_id((ResType::String, "app_name".into()))
            .unwrap();
        assert_eq!(a, a_again);
    }

    #[test]
    fn exhausts_at_boundary_in_two_allocations() {
        let mut worker = IdWorker::new(Some(0xFFFF_FFFE)).unwrap();
        worker.generate_id((ResType::String, "a".into())).unwrap();
        worker.generate_id((ResType::String, "b".into())).unwrap();
        let err = worker.generate_id((ResType::String, "c".into()));
        assert!(matches!(err, Err(IdError::IdExceeded { .. })));
    }

    #[test]
    fn start_id_crossing_reserved_range_is_rejected() {
        assert!(IdWorker::new(Some(0x0700_0000)).is_err());
    }

    #[test]
    fn free_list_is_reused_before_extending_app_next() {
        let mut worker = IdWorker::new(None).unwrap();
        let a = worker.generate_id((ResType::String, "a".into())).unwrap();
        worker.free(a);
        let before_next = worker.app_next();
        let reused = worker.generate_id((ResType::String, "b".into())).unwrap();
        assert_eq!(reused, a);
        assert_eq!(worker.app_next(), before_next);
    }

    #[test]
    fn app_manifest_requires_id_and_rejects_duplicates() {
        let json = r#"{"record":[
            {"type":"string","name":"app_name","id":"0x01000001"},
            {"type":"string","name":"app_name","id":"0x01000002"}
        ]}"#;
        let err = parse_app_manifest(json).unwrap_err();
        assert!(matches!(err, IdError::DuplicateKey(_, _)));
    }

    #[test]
    fn sys_manifest_derives_id_from_start_and_order() {
        let json = r#"{"startId":"0x07800000","record":[
            {"type":"color","name":"primary","order":0},
            {"type":"color","name":"secondary","order":1}
        ]}"#;
        let parsed = parse_sys_manifest(json).unwrap();
        assert_eq!(parsed[&(ResType::Color, "primary".to_string())], 0x0780_0000);
        assert_eq!(parsed[&(ResType::Color, "secondary".to_string())], 0x0780_0001);
    }
}
