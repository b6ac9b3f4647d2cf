// src/ingest/dedup.rs
//! Process-lifetime set of processed identity keys.
//!
//! Grows monotonically; nothing is ever evicted. With a `state_path` the set is
//! loaded at startup and written back after each iteration that adds keys, so a
//! restart does not re-process stories already sent.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::fs;

use super::types::IdentityKey;

#[derive(Debug, Default)]
pub struct ProcessedSet {
    keys: HashSet<IdentityKey>,
    state_path: Option<PathBuf>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path` if it exists; a missing file starts empty.
    /// A corrupt file is an error rather than a silent reset.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let keys = match fs::read_to_string(&path).await {
            Ok(s) => {
                let v: Vec<IdentityKey> = serde_json::from_str(&s)
                    .with_context(|| format!("parsing processed set {}", path.display()))?;
                v.into_iter().collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("reading processed set {}", path.display()))
            }
        };
        Ok(Self {
            keys,
            state_path: Some(path),
        })
    }

    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.keys.contains(key)
    }

    /// Returns `true` when the key was not present before.
    pub fn insert(&mut self, key: IdentityKey) -> bool {
        self.keys.insert(key)
    }

    /// Insert many keys; returns how many were new.
    pub fn extend<I: IntoIterator<Item = IdentityKey>>(&mut self, keys: I) -> usize {
        keys.into_iter().filter(|k| self.keys.insert(k.clone())).count()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Persist to the state path (temp file + rename). No-op without a path.
    pub async fn save(&self) -> Result<()> {
        let Some(path) = &self.state_path else {
            return Ok(());
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating state dir {}", dir.display()))?;
        }
        let mut sorted: Vec<&IdentityKey> = self.keys.iter().collect();
        sorted.sort();
        let json = serde_json::to_vec_pretty(&sorted).context("serializing processed set")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .await
            .with_context(|| format!("renaming into {}", path.display()))?;
        Ok(())
    }
}
