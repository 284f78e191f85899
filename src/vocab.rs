use crate::error::{PathwayError, Result};
use crate::types::split_code;
use log::warn;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoincEntry {
    #[serde(rename = "DisplayName", default)]
    pub display_name: Option<String>,
    #[serde(rename = "LONG_COMMON_NAME", default)]
    pub long_common_name: Option<String>,
}

impl LoincEntry {
    fn name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self.long_common_name.as_deref())
            .filter(|name| !name.is_empty())
    }
}

/// Display names for LOINC and CPT4 codes.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    loinc: HashMap<String, LoincEntry>,
    cpt4: HashMap<String, String>,
}

impl Vocabulary {
    pub fn new(loinc: HashMap<String, LoincEntry>, cpt4: HashMap<String, String>) -> Self {
        Self { loinc, cpt4 }
    }

    /// Loads both tables; a missing file leaves that table empty.
    pub fn load(loinc_path: Option<&Path>, cpt4_path: Option<&Path>) -> Result<Self> {
        Ok(Self {
            loinc: load_table(loinc_path, "LOINC")?,
            cpt4: load_table(cpt4_path, "CPT4")?,
        })
    }

    pub fn lookup(&self, system: &str, identifier: &str) -> Option<&str> {
        let key = identifier.split_whitespace().next().unwrap_or(identifier);
        match system {
            "LOINC" => self.loinc.get(key).and_then(LoincEntry::name),
            "CPT4" => self.cpt4.get(key).map(String::as_str),
            _ => None,
        }
    }

    /// Human-readable name for `code`, falling back to the identifier itself.
    pub fn display_name(&self, code: &str) -> String {
        let (system, identifier) = split_code(code);
        self.lookup(system, identifier)
            .unwrap_or(identifier)
            .to_string()
    }
}

fn load_table<T>(path: Option<&Path>, label: &str) -> Result<HashMap<String, T>>
where
    T: for<'de> Deserialize<'de>,
{
    let Some(path) = path else {
        return Ok(HashMap::new());
    };
    if !path.exists() {
        warn!("{} vocabulary not found at {}", label, path.display());
        return Ok(HashMap::new());
    }

    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| PathwayError::Vocabulary(format!("{} ({}): {}", label, path.display(), e)))
}
