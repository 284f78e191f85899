use crate::error::Result;
use crate::oracle::Candidate;
use crate::types::{Category, Event};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Position of a path in the branch tree.
///
/// The root is level 0, position 0. A child created at level `l` from a
/// parent at position `p` through branch slot `s` sits at
/// `(l, p * width + s)`, so the id alone recovers every ancestor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathId {
    pub level: usize,
    pub position: usize,
}

impl PathId {
    pub const ROOT: PathId = PathId {
        level: 0,
        position: 0,
    };

    /// `None` when the child position does not fit in a `usize`.
    pub fn child(&self, width: usize, slot: usize) -> Option<PathId> {
        let position = self.position.checked_mul(width)?.checked_add(slot)?;
        Some(PathId {
            level: self.level + 1,
            position,
        })
    }

    /// Position of this path's ancestor at `level`, which must not exceed ours.
    pub fn ancestor_position(&self, level: usize, width: usize) -> Option<usize> {
        if level > self.level || width == 0 {
            return None;
        }
        let divisor = width.checked_pow((self.level - level) as u32)?;
        Some(self.position / divisor)
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.level == 0 {
            write!(f, "Path-{}", self.position)
        } else {
            write!(f, "Path-{}-{}", self.level, self.position)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePathIdError(String);

impl fmt::Display for ParsePathIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid path id '{}'", self.0)
    }
}

impl std::error::Error for ParsePathIdError {}

impl FromStr for PathId {
    type Err = ParsePathIdError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let err = || ParsePathIdError(s.to_string());
        let rest = s.strip_prefix("Path-").ok_or_else(err)?;
        let parts: Vec<&str> = rest.split('-').collect();
        match parts.as_slice() {
            [root] => {
                let position = root.parse().map_err(|_| err())?;
                Ok(PathId { level: 0, position })
            }
            [level, position] => Ok(PathId {
                level: level.parse().map_err(|_| err())?,
                position: position.parse().map_err(|_| err())?,
            }),
            _ => Err(err()),
        }
    }
}

impl Serialize for PathId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PathId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A model-generated event as recorded on a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub token: String,
    pub probability: f64,
    #[serde(rename = "type")]
    pub category: Category,
}

/// One hypothetical trajectory through the branch tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    id: PathId,
    parent_id: Option<PathId>,
    history: Vec<Event>,
    steps: Vec<Step>,
    diagnosis_found: bool,
    final_diagnosis: Option<String>,
}

impl Path {
    /// Root path; diagnoses already present in the seed do not freeze it.
    pub fn root(seed: &[Event]) -> Self {
        Self {
            id: PathId::ROOT,
            parent_id: None,
            history: seed.to_vec(),
            steps: Vec::new(),
            diagnosis_found: false,
            final_diagnosis: None,
        }
    }

    /// Clone of this path placed at `id`, extended by `candidate`.
    pub fn branch(&self, id: PathId, candidate: &Candidate) -> Result<Self> {
        let at = self.history.iter().filter_map(Event::start).max();
        let event = Event::predicted(&candidate.token, candidate.category, at)?;

        let mut child = Self {
            id,
            parent_id: Some(self.id),
            history: self.history.clone(),
            steps: self.steps.clone(),
            diagnosis_found: false,
            final_diagnosis: None,
        };
        child.history.push(event);
        child.steps.push(Step {
            token: candidate.token.clone(),
            probability: candidate.probability,
            category: candidate.category,
        });
        if candidate.category == Category::Condition {
            child.diagnosis_found = true;
            child.final_diagnosis = Some(candidate.token.clone());
        }
        Ok(child)
    }

    pub fn id(&self) -> PathId {
        self.id
    }

    pub fn parent_id(&self) -> Option<PathId> {
        self.parent_id
    }

    pub fn history(&self) -> &[Event] {
        &self.history
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn diagnosis_found(&self) -> bool {
        self.diagnosis_found
    }

    pub fn final_diagnosis(&self) -> Option<&str> {
        self.final_diagnosis.as_deref()
    }

    /// Events that came from the seed rather than the model.
    pub fn seed_len(&self) -> usize {
        self.history.len() - self.steps.len()
    }
}
