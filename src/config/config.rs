use crate::oracle::DEFAULT_CANDIDATE_POOL;
use crate::pathway::engine::{DEFAULT_BRANCH_WIDTH, DEFAULT_MAX_LEVELS};
use crate::pathway::{ExpansionConfig, DEFAULT_TOP_K};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Endpoint of the next-event model.
    #[serde(default)]
    pub model_url: Option<String>,
    #[serde(default = "default_model_timeout")]
    pub model_timeout: u64,
    #[serde(default = "default_candidate_pool")]
    pub candidate_pool: usize,
    #[serde(default = "default_max_levels")]
    pub max_levels: usize,
    #[serde(default = "default_branch_width")]
    pub branch_width: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub loinc_path: Option<PathBuf>,
    #[serde(default)]
    pub cpt4_path: Option<PathBuf>,
    #[serde(default = "default_cache_results")]
    pub cache_results: bool,
}

fn default_model_timeout() -> u64 {
    300
}

fn default_candidate_pool() -> usize {
    DEFAULT_CANDIDATE_POOL
}

fn default_max_levels() -> usize {
    DEFAULT_MAX_LEVELS
}

fn default_branch_width() -> usize {
    DEFAULT_BRANCH_WIDTH
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_cache_results() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_url: None,
            model_timeout: default_model_timeout(),
            candidate_pool: default_candidate_pool(),
            max_levels: default_max_levels(),
            branch_width: default_branch_width(),
            top_k: default_top_k(),
            loinc_path: None,
            cpt4_path: None,
            cache_results: default_cache_results(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "clinical-pathways", "clinical-pathways")
}

impl Config {
    pub fn path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Reads the user config, falling back to defaults when absent or unreadable.
    pub fn load() -> Self {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Config::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Config::default();
        }
        match fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|content| toml::from_str(&content).map_err(anyhow::Error::from))
        {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring config at {}: {}", path.display(), e);
                Config::default()
            }
        }
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path().context("Failed to determine project directories")?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn expansion(&self) -> ExpansionConfig {
        ExpansionConfig {
            max_levels: self.max_levels,
            branch_width: self.branch_width,
        }
    }
}
