//! Positional frequency statistics over a finished branch tree.
//!
//! A code predicted once near the root is inherited by every leaf below it.
//! Counting it per leaf would inflate it, so every step is first mapped to a
//! slot that stands for the tree node that produced it, and codes are counted
//! per slot.

use super::engine::Expansion;
use super::path::Path;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_TOP_K: usize = 10;

/// How steps are mapped onto slots.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotStrategy {
    /// Slot of the ancestor that produced the step, recovered from the path id.
    #[default]
    #[value(name = "ancestral")]
    Ancestral,
    /// Balanced-tree divisors (8/4/2/1 for four binary levels). Approximate
    /// once lineages stop early.
    #[value(name = "fixed-divisor")]
    FixedDivisor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub step_level: usize,
    pub slot_group: usize,
    pub extra_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeFrequency {
    pub code: String,
    pub count: usize,
    /// Share of all slots, in percent, one decimal.
    pub percentage: f64,
}

/// Code observed at every slot of the tree. Later paths overwrite earlier
/// ones at the same slot.
pub fn slot_codes(expansion: &Expansion, strategy: SlotStrategy) -> BTreeMap<SlotKey, String> {
    let mut slots = BTreeMap::new();
    for path in &expansion.paths {
        for (step_idx, step) in path.steps().iter().enumerate() {
            let key = slot_key(path, step_idx, expansion, strategy);
            slots.insert(key, step.token.clone());
        }
    }
    slots
}

fn slot_key(path: &Path, step_idx: usize, expansion: &Expansion, strategy: SlotStrategy) -> SlotKey {
    let id = path.id();
    let width = expansion.config.branch_width;
    let step_level = step_idx + 1;

    let group = match strategy {
        SlotStrategy::Ancestral => id.ancestor_position(step_level, width),
        SlotStrategy::FixedDivisor => {
            let levels = expansion.config.max_levels;
            if step_level > levels {
                None
            } else {
                width
                    .checked_pow((levels - step_level) as u32)
                    .filter(|divisor| *divisor > 0)
                    .map(|divisor| id.position / divisor)
            }
        }
    };

    match group {
        Some(slot_group) => SlotKey {
            step_level,
            slot_group,
            extra_index: 0,
        },
        None => SlotKey {
            step_level: id.level,
            slot_group: id.position,
            extra_index: step_idx,
        },
    }
}

/// The `k` most frequent codes across slots, most frequent first; ties by code.
pub fn top_codes(expansion: &Expansion, k: usize, strategy: SlotStrategy) -> Vec<CodeFrequency> {
    let slots = slot_codes(expansion, strategy);
    let total = slots.len();
    if total == 0 {
        return Vec::new();
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for code in slots.values() {
        *counts.entry(code.as_str()).or_insert(0) += 1;
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    ranked
        .into_iter()
        .take(k)
        .map(|(code, count)| CodeFrequency {
            code: code.to_string(),
            count,
            percentage: (count as f64 / total as f64 * 1000.0).round() / 10.0,
        })
        .collect()
}
