// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Store file persistence.
//!
//! # File Format (format_version 1)
//! A single JSON object. Fields are always emitted in this order, and every
//! map inside is ordered by key, so the same store always serializes to the
//! same bytes:
//! ```text
//! magic               "MYOSOTIS"
//! format_version      1
//! genesis_state       null | node table + allocator mark
//! genesis_state_hash  null | [u8; 32]
//! genesis_commit      sequence number of the genesis point (omitted when 0)
//! commits             [Commit]
//! checkpoints         [Checkpoint]
//! next_node_id        u64
//! ```
//!
//! Files without `magic` and `format_version` are read as the headerless
//! legacy layout and gain a header on the next save. Hashes never cover this
//! representation, so migrating a file changes no hash.

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::commit::Commit;
use crate::compact::GenesisSnapshot;
use crate::config::{StoreConfig, FILE_MAGIC, FORMAT_VERSION};
use crate::error::{IntegrityViolation, MyosotisError, Result};
use crate::log::CommitLog;
use crate::snapshot::blake3::hash_state;
use crate::state::graph::GraphState;
use crate::store::{CompactionOutcome, LoadMode, Store};
use crate::types::id::{Hash, NodeId};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Serialize)]
struct StoreFileRef<'a> {
    magic: &'a str,
    format_version: u32,
    genesis_state: Option<&'a GraphState>,
    genesis_state_hash: Option<Hash>,
    #[serde(skip_serializing_if = "is_zero")]
    genesis_commit: u64,
    commits: &'a [Commit],
    checkpoints: &'a [Checkpoint],
    next_node_id: NodeId,
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

/// Everything after the header. Shared by current and legacy files.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StoreBody {
    genesis_state: Option<GraphState>,
    genesis_state_hash: Option<Hash>,
    #[serde(default)]
    genesis_commit: Option<u64>,
    commits: Vec<Commit>,
    checkpoints: Vec<Checkpoint>,
    next_node_id: NodeId,
}

/// Serializes a store to its canonical file representation.
pub fn to_bytes(store: &Store) -> Result<Vec<u8>> {
    let genesis = store.genesis();
    let file = StoreFileRef {
        magic: FILE_MAGIC,
        format_version: FORMAT_VERSION,
        genesis_state: genesis.map(GenesisSnapshot::state),
        genesis_state_hash: genesis.map(GenesisSnapshot::state_hash),
        genesis_commit: store.log().base_seq(),
        commits: store.commits(),
        checkpoints: store.checkpoints().as_slice(),
        next_node_id: store.next_node_id(),
    };
    Ok(serde_json::to_vec_pretty(&file)?)
}

/// Parses and verifies a store file's contents.
pub fn from_bytes(data: &[u8], mode: LoadMode, config: StoreConfig) -> Result<Store> {
    let mut root: serde_json::Value =
        serde_json::from_slice(data).map_err(|e| MyosotisError::MalformedFile(e.to_string()))?;
    let obj = root
        .as_object_mut()
        .ok_or_else(|| MyosotisError::MalformedFile("top level is not an object".into()))?;

    let has_magic = obj.contains_key("magic");
    let has_version = obj.contains_key("format_version");

    match (has_magic, has_version) {
        (true, false) => return Err(MyosotisError::MissingFormatVersion),
        (false, true) => return Err(MyosotisError::InvalidMagic),
        (false, false) => info!("reading headerless legacy store file"),
        (true, true) => {
            let version = obj
                .get("format_version")
                .and_then(|v| v.as_u64())
                .ok_or(MyosotisError::MissingFormatVersion)?;
            if version == 0 {
                return Err(MyosotisError::MissingFormatVersion);
            }
            if version > FORMAT_VERSION as u64 {
                return Err(MyosotisError::FormatUnsupported {
                    found: u32::try_from(version).unwrap_or(u32::MAX),
                    supported: FORMAT_VERSION,
                });
            }
            if obj.get("magic").and_then(|v| v.as_str()) != Some(FILE_MAGIC) {
                return Err(MyosotisError::InvalidMagic);
            }
            obj.remove("magic");
            obj.remove("format_version");
        }
    }

    let body: StoreBody =
        serde_json::from_value(root).map_err(|e| MyosotisError::MalformedFile(e.to_string()))?;
    assemble(body, mode, config)
}

fn assemble(body: StoreBody, mode: LoadMode, config: StoreConfig) -> Result<Store> {
    let genesis = match (body.genesis_state, body.genesis_state_hash) {
        (Some(state), Some(state_hash)) => {
            let commit_seq = body
                .genesis_commit
                .or_else(|| body.commits.first().map(|c| c.seq().saturating_sub(1)))
                .unwrap_or(0);
            Some(GenesisSnapshot {
                commit_seq,
                state,
                state_hash,
            })
        }
        (None, None) => None,
        _ => return Err(IntegrityViolation::GenesisHash.into()),
    };

    let base_seq = genesis.as_ref().map_or(0, GenesisSnapshot::commit_seq);
    let anchor = genesis.as_ref().map(GenesisSnapshot::state_hash);
    let log = CommitLog::from_parts(base_seq, anchor, body.commits);
    let checkpoints = CheckpointStore::from_vec(body.checkpoints);

    Store::open(config, genesis, log, checkpoints, body.next_node_id, mode)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Removes the temporary file when `result` is an error.
fn discard_on_err<T>(tmp: &Path, result: Result<T>) -> Result<T> {
    if result.is_err() {
        let _ = fs::remove_file(tmp);
    }
    result
}

fn write_synced(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()?;
    Ok(())
}

/// Writes `data` to the temporary sibling of `path` and syncs it. Nothing is
/// left behind on failure.
fn write_tmp(path: &Path, data: &[u8]) -> Result<PathBuf> {
    let tmp = tmp_path(path);
    discard_on_err(&tmp, write_synced(&tmp, data))?;
    Ok(tmp)
}

/// Moves a synced temporary file over `path`.
fn publish(tmp: &Path, path: &Path) -> Result<()> {
    discard_on_err(tmp, fs::rename(tmp, path).map_err(MyosotisError::from))
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let tmp = write_tmp(path, data)?;
    publish(&tmp, path)
}

/// Writes the store, replacing any existing file only once the new content
/// is fully on disk. A store opened read-only after a failed integrity check
/// cannot be saved until it is repaired.
pub fn save(path: impl AsRef<Path>, store: &Store) -> Result<()> {
    let path = path.as_ref();
    if !store.is_writable() {
        return Err(MyosotisError::WritesBlocked);
    }
    let data = to_bytes(store)?;
    write_atomic(path, &data)?;
    info!(path = %path.display(), commits = store.commits().len(), "saved store");
    Ok(())
}

pub fn load(path: impl AsRef<Path>) -> Result<Store> {
    load_with_mode(path, LoadMode::Strict)
}

pub fn load_with_mode(path: impl AsRef<Path>, mode: LoadMode) -> Result<Store> {
    load_with(path, mode, StoreConfig::default())
}

pub fn load_with(path: impl AsRef<Path>, mode: LoadMode, config: StoreConfig) -> Result<Store> {
    let path = path.as_ref();
    let data = fs::read(path)?;
    let store = from_bytes(&data, mode, config)?;
    info!(path = %path.display(), tip = store.tip_seq(), writable = store.is_writable(), "loaded store");
    Ok(store)
}

pub fn exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().exists()
}

/// Compacts a store file in place.
///
/// The compacted store is written to a temporary file and loaded back
/// strictly; the original is replaced only if the reloaded tip state hashes
/// the same as before.
pub fn compact_file(path: impl AsRef<Path>, upto: Option<u64>) -> Result<CompactionOutcome> {
    let path = path.as_ref();
    let mut store = load(path)?;
    let before = hash_state(store.head());

    let outcome = store.compact(upto)?;

    let tmp = write_tmp(path, &to_bytes(&store)?)?;

    let after = hash_state(discard_on_err(&tmp, load(&tmp))?.head());
    if after != before {
        return discard_on_err(
            &tmp,
            Err(IntegrityViolation::CompactionDivergence { before, after }.into()),
        );
    }

    publish(&tmp, path)?;
    info!(path = %path.display(), genesis_seq = outcome.genesis_seq, retired = outcome.retired, "compacted store file");
    Ok(outcome)
}
