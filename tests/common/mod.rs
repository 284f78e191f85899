#![allow(dead_code)]

use clinical_pathways::error::{PathwayError, Result};
use clinical_pathways::oracle::{ModelBackend, RawCandidate};
use clinical_pathways::types::{Category, Event, EventFields, EventValue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize the logger for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

/// Backend whose answer is a pure function of the history.
pub struct ScriptedBackend<F> {
    script: F,
    description: String,
    calls: AtomicUsize,
}

impl<F> ScriptedBackend<F>
where
    F: Fn(&[Event]) -> Result<Vec<RawCandidate>>,
{
    pub fn new(script: F) -> Self {
        Self {
            script,
            description: "scripted".to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<F> ModelBackend for ScriptedBackend<F>
where
    F: Fn(&[Event]) -> Result<Vec<RawCandidate>>,
{
    fn rank(&self, history: &[Event], top_k: usize) -> Result<Vec<RawCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut ranked = (self.script)(history)?;
        ranked.truncate(top_k);
        Ok(ranked)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

/// Two fresh procedure codes keyed by history length, never a diagnosis.
pub fn two_fresh(history: &[Event]) -> Result<Vec<RawCandidate>> {
    let n = history.len();
    Ok(vec![
        RawCandidate::new(format!("CPT4/{}0", n), 0.3),
        RawCandidate::new(format!("CPT4/{}1", n), 0.2),
    ])
}

pub fn nothing(_history: &[Event]) -> Result<Vec<RawCandidate>> {
    Ok(Vec::new())
}

pub fn offline(_history: &[Event]) -> Result<Vec<RawCandidate>> {
    Err(PathwayError::unavailable("model server unreachable"))
}

pub fn event(code: &str, category: Category) -> Event {
    Event::new(code, EventFields::of(category)).unwrap()
}

/// Palpitations work-up: history of hypertension, current vitals.
pub fn seed_history() -> Vec<Event> {
    vec![
        Event::new(
            "SNOMED/38341003",
            EventFields::of(Category::Condition)
                .value(EventValue::Text("Hypertension".to_string()))
                .start("1990-05-10T00:00:00Z".parse().unwrap()),
        )
        .unwrap(),
        event("RxNorm/310798", Category::DrugExposure),
        event("SNOMED/80313002", Category::Observation),
        Event::new(
            "LOINC/8867-4",
            EventFields::of(Category::Measurement)
                .value(EventValue::Numeric(105.0))
                .unit("bpm")
                .start("2025-09-18T10:15:00Z".parse().unwrap()),
        )
        .unwrap(),
    ]
}
