use crate::error::Result;
use crate::pathway::{Expansion, ExpansionConfig};
use crate::types::Event;
use chrono::{Datelike, Local};
use directories::ProjectDirs;
use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Memoizes the first successful expansion for the lifetime of the cache.
///
/// The first caller computes while holding the gate; callers arriving in the
/// meantime block and then receive the same result. Failures are not stored,
/// so the next caller computes again.
#[derive(Default)]
pub struct ExpansionCache {
    slot: Mutex<Option<Arc<Expansion>>>,
    computations: AtomicUsize,
}

impl ExpansionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute<F>(&self, compute: F) -> Result<Arc<Expansion>>
    where
        F: FnOnce() -> Result<Expansion>,
    {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(expansion) = slot.as_ref() {
            return Ok(Arc::clone(expansion));
        }

        let expansion = Arc::new(compute()?);
        self.computations.fetch_add(1, Ordering::SeqCst);
        *slot = Some(Arc::clone(&expansion));
        Ok(expansion)
    }

    pub fn get(&self) -> Option<Arc<Expansion>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn invalidate(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Number of successful computations this cache has stored.
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::SeqCst)
    }
}

/// Identifies an expansion by everything that determines its shape.
pub fn fingerprint(
    seed: &[Event],
    config: ExpansionConfig,
    pool_size: usize,
    backend: &str,
) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(backend.as_bytes());
    hasher.update(config.max_levels.to_le_bytes());
    hasher.update(config.branch_width.to_le_bytes());
    hasher.update(pool_size.to_le_bytes());
    hasher.update(serde_json::to_vec(seed)?);
    let digest = hasher.finalize();
    Ok(digest.iter().take(16).map(|b| format!("{:02x}", b)).collect())
}

/// Expansions persisted between runs, one JSON file per fingerprint and week.
pub struct ResultStore {
    cache_dir: PathBuf,
}

impl ResultStore {
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("com", "clinical-pathways", "clinical-pathways")
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Failed to determine project directories",
                )
            })?;
        Self::at(proj_dirs.cache_dir().join("expansions"))
    }

    pub fn at(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    fn get_cache_path(&self, fingerprint: &str) -> PathBuf {
        let now = Local::now();
        let year = now.year();
        let week = now.iso_week().week();
        self.cache_dir
            .join(format!("{fingerprint}_{year}_w{week:02}.json"))
    }

    fn is_cache_valid(&self, path: &Path) -> bool {
        if !path.exists() {
            return false;
        }

        match fs::metadata(path) {
            Ok(metadata) => {
                if let Some(modified) = metadata.modified().ok() {
                    if let Ok(age) = modified.elapsed() {
                        return age.as_secs() < 7 * 24 * 60 * 60;
                    }
                }
            }
            Err(_) => return false,
        }
        false
    }

    pub fn load(&self, fingerprint: &str) -> Option<Expansion> {
        let path = self.get_cache_path(fingerprint);
        if !self.is_cache_valid(&path) {
            return None;
        }

        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(expansion) => {
                info!("Loaded cached expansion from {}", path.display());
                Some(expansion)
            }
            Err(e) => {
                warn!("Ignoring unreadable cache file {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn save(&self, fingerprint: &str, expansion: &Expansion) -> Result<()> {
        let path = self.get_cache_path(fingerprint);
        fs::write(&path, serde_json::to_string(expansion)?)?;
        debug!("Cached expansion at {}", path.display());
        Ok(())
    }
}
