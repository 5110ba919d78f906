//! Atomic JSON snapshots of runtime state (registry dumps, instrument db).
//!
//! Several nodes share one root directory, so every writer stages its
//! snapshot under its own temp name before renaming it into place.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Writes `state` as pretty JSON to `path`, replacing any previous snapshot.
///
/// The JSON goes to a temp file next to `path` that is named after the
/// writing process, is synced, and is then renamed over `path`. Readers see
/// either the old or the new snapshot. Missing parent directories are created.
pub fn save_state<T: Serialize>(path: &Path, state: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create snapshot directory {:?}", parent))?;
    }
    let json = serde_json::to_vec_pretty(state)
        .with_context(|| format!("cannot encode snapshot for {:?}", path))?;

    let staging = staging_path(path);
    let written = File::create(&staging)
        .and_then(|mut file| {
            file.write_all(&json)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&staging, path));
    if let Err(e) = written {
        // staging file is ours alone
        let _ = fs::remove_file(&staging);
        return Err(e).with_context(|| format!("cannot write snapshot {:?}", path));
    }
    Ok(())
}

/// Reads a snapshot written by `save_state`.
pub fn load_state<T: DeserializeOwned>(path: &Path) -> Result<T> {
    load_state_opt(path)?.with_context(|| format!("no snapshot at {:?}", path))
}

/// Reads a snapshot written by `save_state`, `None` if there is none yet.
pub fn load_state_opt<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("cannot open snapshot {:?}", path)),
    };
    let state = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("snapshot {:?} is malformed", path))?;
    Ok(Some(state))
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_save_replaces_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut state = BTreeMap::new();
        state.insert("msg_in_cnt".to_string(), 1u64);
        save_state(&path, &state).unwrap();
        state.insert("msg_in_cnt".to_string(), 2u64);
        save_state(&path, &state).unwrap();

        let loaded: BTreeMap<String, u64> = load_state(&path).unwrap();
        assert_eq!(loaded["msg_in_cnt"], 2);
        // only the snapshot itself is left behind
        let entries = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_missing_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        let missing: Option<BTreeMap<String, u64>> = load_state_opt(&path).unwrap();
        assert!(missing.is_none());
        let result: Result<BTreeMap<String, u64>> = load_state(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, b"{ not json").unwrap();

        let result: Result<Option<BTreeMap<String, u64>>> = load_state_opt(&path);
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("malformed"));
    }
}
