use super::path::{Path, PathId};
use crate::api::{ProgressCallback, ProgressEvent};
use crate::error::{PathwayError, Result};
use crate::oracle::{ModelBackend, OracleAdapter};
use crate::types::Event;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_MAX_LEVELS: usize = 4;
pub const DEFAULT_BRANCH_WIDTH: usize = 2;

const TASK: &str = "Pathway expansion";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionConfig {
    pub max_levels: usize,
    pub branch_width: usize,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            max_levels: DEFAULT_MAX_LEVELS,
            branch_width: DEFAULT_BRANCH_WIDTH,
        }
    }
}

impl ExpansionConfig {
    /// Rejects trees whose leaf positions cannot be addressed.
    pub fn validate(&self) -> Result<()> {
        if self.branch_width == 0 {
            return Err(PathwayError::InvalidConfig(
                "branch width must be at least 1".to_string(),
            ));
        }
        let leaves = u32::try_from(self.max_levels)
            .ok()
            .and_then(|levels| self.branch_width.checked_pow(levels));
        if leaves.is_none() {
            return Err(PathwayError::InvalidConfig(format!(
                "{} levels of width {} overflow path positions",
                self.max_levels, self.branch_width
            )));
        }
        Ok(())
    }
}

/// Every leaf of a finished branch tree together with the history it grew from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expansion {
    pub seed: Vec<Event>,
    pub paths: Vec<Path>,
    pub config: ExpansionConfig,
}

impl Expansion {
    pub fn total_paths(&self) -> usize {
        self.paths.len()
    }

    pub fn paths_with_diagnosis(&self) -> usize {
        self.paths.iter().filter(|p| p.diagnosis_found()).count()
    }
}

/// Grows a branch tree level by level from a seed history.
pub struct BranchEngine<B> {
    oracle: OracleAdapter<B>,
    config: ExpansionConfig,
    progress_callback: Option<ProgressCallback>,
}

impl<B: ModelBackend> BranchEngine<B> {
    pub fn new(oracle: OracleAdapter<B>, config: ExpansionConfig) -> Self {
        Self {
            oracle,
            config,
            progress_callback: None,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn config(&self) -> ExpansionConfig {
        self.config
    }

    pub fn oracle(&self) -> &OracleAdapter<B> {
        &self.oracle
    }

    pub fn expand(&self, seed: &[Event]) -> Result<Expansion> {
        self.config.validate()?;
        self.emit_progress(ProgressEvent::Started {
            task: TASK.to_string(),
        });

        let width = self.config.branch_width;
        let mut frontier = vec![Path::root(seed)];
        // paths the oracle could not extend; they stay put like diagnosed ones
        let mut dead_ends: HashSet<PathId> = HashSet::new();

        for level in 1..=self.config.max_levels {
            let mut next = Vec::with_capacity(frontier.len());

            for path in frontier {
                if path.diagnosis_found() || dead_ends.contains(&path.id()) {
                    next.push(path);
                    continue;
                }

                let candidates = match self.oracle.predict(path.history(), width) {
                    Ok(candidates) => candidates,
                    Err(e) if level == 1 => {
                        self.emit_progress(ProgressEvent::Error {
                            task: TASK.to_string(),
                            error: e.to_string(),
                        });
                        return Err(PathwayError::RootExpansion(Box::new(e)));
                    }
                    Err(e) => {
                        warn!("{} cannot branch further: {}", path.id(), e);
                        self.emit_progress(ProgressEvent::Message {
                            task: TASK.to_string(),
                            message: format!("{} stopped early: {}", path.id(), e),
                        });
                        Vec::new()
                    }
                };

                if candidates.is_empty() {
                    debug!("{} is a dead end at level {}", path.id(), level);
                    dead_ends.insert(path.id());
                    next.push(path);
                    continue;
                }

                next.reserve(candidates.len().min(width));
                for (slot, candidate) in candidates.iter().take(width).enumerate() {
                    let id = path.id().child(width, slot).ok_or_else(|| {
                        PathwayError::InvalidConfig(format!(
                            "no position for slot {} under {}",
                            slot,
                            path.id()
                        ))
                    })?;
                    let child = path.branch(id, candidate)?;
                    debug!(
                        "{} -> {}: {} (prob: {:.4})",
                        path.id(),
                        child.id(),
                        candidate.token,
                        candidate.probability
                    );
                    next.push(child);
                }
            }

            frontier = next;
            self.emit_progress(ProgressEvent::Progress {
                task: TASK.to_string(),
                current: level as u64,
                total: self.config.max_levels as u64,
            });
        }

        let expansion = Expansion {
            seed: seed.to_vec(),
            paths: frontier,
            config: self.config,
        };
        info!(
            "Expanded {} levels into {} paths ({} with a diagnosis)",
            self.config.max_levels,
            expansion.total_paths(),
            expansion.paths_with_diagnosis()
        );

        self.emit_progress(ProgressEvent::Completed {
            task: TASK.to_string(),
        });
        Ok(expansion)
    }

    fn emit_progress(&self, event: ProgressEvent) {
        if let Some(callback) = &self.progress_callback {
            callback(event);
        }
    }
}
