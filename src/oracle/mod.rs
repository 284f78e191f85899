//! Candidate generation on top of an external next-event model.
//!
//! A [`ModelBackend`] ranks raw vocabulary tokens for a history. The
//! [`OracleAdapter`] turns that raw pool into clinical candidates: it drops
//! structural tokens and unrecognized systems, removes anything the history
//! already contains, and truncates to the requested count.

pub mod http;
pub mod replay;

use crate::error::{PathwayError, Result};
use crate::types::{base_code, Category, CodeSystem, Event};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub use http::HttpModelBackend;
pub use replay::ReplayBackend;

pub const DEFAULT_CANDIDATE_POOL: usize = 100;

const SPECIAL_TOKENS: [&str; 4] = ["<pad>", "<unk>", "<s>", "</s>"];
const STRUCTURAL_PREFIXES: [&str; 2] = ["Domain/", "Visit/"];

/// One entry of a model's ranked output, before any filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCandidate {
    pub token: String,
    pub probability: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl RawCandidate {
    pub fn new(token: impl Into<String>, probability: f64) -> Self {
        Self {
            token: token.into(),
            probability,
            category: None,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }
}

/// A model that ranks possible next tokens for a history.
pub trait ModelBackend {
    /// Returns up to `top_k` tokens ordered by descending probability.
    fn rank(&self, history: &[Event], top_k: usize) -> Result<Vec<RawCandidate>>;

    /// Stable description used to fingerprint cached results.
    fn describe(&self) -> String;
}

impl<B: ModelBackend + ?Sized> ModelBackend for Box<B> {
    fn rank(&self, history: &[Event], top_k: usize) -> Result<Vec<RawCandidate>> {
        (**self).rank(history, top_k)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// A filtered, history-novel prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub token: String,
    pub probability: f64,
    pub category: Category,
}

impl Candidate {
    pub fn code(&self) -> &str {
        base_code(&self.token)
    }
}

pub struct OracleAdapter<B> {
    backend: B,
    pool_size: usize,
}

impl<B: ModelBackend> OracleAdapter<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            pool_size: DEFAULT_CANDIDATE_POOL,
        }
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Up to `n` candidates for the next event after `history`.
    pub fn predict(&self, history: &[Event], n: usize) -> Result<Vec<Candidate>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let pool = self.backend.rank(history, self.pool_size)?;
        validate_pool(&pool)?;

        let known: HashSet<&str> = history
            .iter()
            .map(|event| base_code(event.code()))
            .collect();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut candidates = Vec::with_capacity(n.min(pool.len()));

        for raw in pool.iter().take(self.pool_size) {
            if is_structural(&raw.token) || !is_predictable_code(&raw.token) {
                continue;
            }
            let code = base_code(&raw.token);
            if known.contains(code) || !seen.insert(code) {
                continue;
            }
            candidates.push(Candidate {
                token: raw.token.clone(),
                probability: raw.probability,
                category: raw.category.unwrap_or_else(|| Category::infer(&raw.token)),
            });
            if candidates.len() >= n {
                break;
            }
        }

        debug!(
            "Oracle kept {} of {} pooled candidates (history length {})",
            candidates.len(),
            pool.len(),
            history.len()
        );
        Ok(candidates)
    }
}

fn validate_pool(pool: &[RawCandidate]) -> Result<()> {
    for raw in pool {
        if !raw.probability.is_finite() || !(0.0..=1.0).contains(&raw.probability) {
            return Err(PathwayError::unavailable(format!(
                "model returned probability {} for '{}'",
                raw.probability, raw.token
            )));
        }
    }
    if pool
        .windows(2)
        .any(|pair| pair[0].probability < pair[1].probability)
    {
        return Err(PathwayError::unavailable(
            "model output is not ordered by probability",
        ));
    }
    Ok(())
}

fn is_structural(token: &str) -> bool {
    SPECIAL_TOKENS.contains(&token)
        || STRUCTURAL_PREFIXES
            .iter()
            .any(|prefix| token.starts_with(prefix))
        || (token.starts_with('<') && token.ends_with('>'))
}

fn is_predictable_code(token: &str) -> bool {
    let code = base_code(token);
    match code.split_once('/') {
        Some((_, identifier)) if !identifier.is_empty() => {
            CodeSystem::of(code).is_some_and(|system| system.is_predictable())
        }
        _ => false,
    }
}
