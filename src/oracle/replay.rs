use super::{ModelBackend, RawCandidate};
use crate::error::Result;
use crate::types::Event;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const FALLBACK_KEY: &str = "*";

/// Offline backend answering from a recorded table.
///
/// The table maps the code of the last event in a history to the ranked
/// candidates the model produced after it. A `"*"` entry answers for any
/// history whose last code is not listed; without one, unknown histories get
/// an empty pool.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ReplayBackend {
    table: BTreeMap<String, Vec<RawCandidate>>,
}

impl ReplayBackend {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn insert(&mut self, after: impl Into<String>, candidates: Vec<RawCandidate>) {
        self.table.insert(after.into(), candidates);
    }
}

impl ModelBackend for ReplayBackend {
    fn rank(&self, history: &[Event], top_k: usize) -> Result<Vec<RawCandidate>> {
        let entry = history
            .last()
            .and_then(|event| self.table.get(event.code()))
            .or_else(|| self.table.get(FALLBACK_KEY));

        Ok(entry
            .map(|candidates| candidates.iter().take(top_k).cloned().collect())
            .unwrap_or_default())
    }

    fn describe(&self) -> String {
        let mut hasher = Sha256::new();
        for (key, candidates) in &self.table {
            hasher.update(key.as_bytes());
            for candidate in candidates {
                hasher.update(candidate.token.as_bytes());
                hasher.update(candidate.probability.to_le_bytes());
            }
        }
        let digest = hasher.finalize();
        let short: String = digest.iter().take(8).map(|b| format!("{:02x}", b)).collect();
        format!("replay:{}", short)
    }
}
