mod common;

use clinical_pathways::error::PathwayError;
use clinical_pathways::oracle::{OracleAdapter, RawCandidate};
use clinical_pathways::pathway::{top_codes, BranchEngine, ExpansionConfig, SlotStrategy};
use clinical_pathways::types::{Category, Event};
use common::*;
use std::sync::atomic::{AtomicUsize, Ordering};

fn engine<F>(script: F) -> BranchEngine<ScriptedBackend<F>>
where
    F: Fn(&[Event]) -> clinical_pathways::Result<Vec<RawCandidate>>,
{
    init_test_logger();
    BranchEngine::new(
        OracleAdapter::new(ScriptedBackend::new(script)),
        ExpansionConfig::default(),
    )
}

#[test]
fn zero_candidates_leave_single_root() {
    let engine = engine(nothing);
    let expansion = engine.expand(&seed_history()).unwrap();

    // a dead end is never asked again
    assert_eq!(engine.oracle().backend().calls(), 1);

    assert_eq!(expansion.total_paths(), 1);
    assert_eq!(expansion.paths_with_diagnosis(), 0);
    let root = &expansion.paths[0];
    assert_eq!(root.id().to_string(), "Path-0");
    assert!(root.parent_id().is_none());
    assert!(root.steps().is_empty());
    assert_eq!(root.history(), seed_history().as_slice());
}

#[test]
fn two_candidates_every_level_give_sixteen_leaves() {
    let seed = seed_history();
    let engine = engine(two_fresh);
    let expansion = engine.expand(&seed).unwrap();

    // one oracle call per active path: 1 + 2 + 4 + 8
    assert_eq!(engine.oracle().backend().calls(), 15);
    assert_eq!(expansion.total_paths(), 16);
    assert_eq!(expansion.paths_with_diagnosis(), 0);

    let ids: Vec<String> = expansion.paths.iter().map(|p| p.id().to_string()).collect();
    let expected: Vec<String> = (0..16).map(|i| format!("Path-4-{}", i)).collect();
    assert_eq!(ids, expected);

    for path in &expansion.paths {
        assert_eq!(path.steps().len(), 4);
        assert_eq!(path.history().len(), seed.len() + path.steps().len());
        let tail: Vec<&str> = path.history()[seed.len()..].iter().map(Event::code).collect();
        let steps: Vec<&str> = path.steps().iter().map(|s| s.token.as_str()).collect();
        assert_eq!(tail, steps);
    }

    assert_eq!(
        expansion.paths[13].parent_id().map(|id| id.to_string()).as_deref(),
        Some("Path-3-6")
    );
}

#[test]
fn diagnosis_freezes_lineage() {
    let seed = seed_history();
    let trigger = format!("CPT4/{}0", seed.len());
    let script = move |history: &[Event]| {
        if history.last().map(Event::code) == Some(trigger.as_str()) {
            let n = history.len();
            return Ok(vec![
                RawCandidate::new("SNOMED/49436004", 0.4).with_category(Category::Condition),
                RawCandidate::new(format!("CPT4/{}1", n), 0.2),
            ]);
        }
        two_fresh(history)
    };

    let expansion = engine(script).expand(&seed).unwrap();

    let diagnosed: Vec<_> = expansion.paths.iter().filter(|p| p.diagnosis_found()).collect();
    assert_eq!(diagnosed.len(), 1);
    let frozen = diagnosed[0];
    assert_eq!(frozen.id().to_string(), "Path-2-0");
    assert_eq!(frozen.final_diagnosis(), Some("SNOMED/49436004"));
    assert_eq!(frozen.steps().len(), 2);
    assert_eq!(frozen.steps().last().map(|s| s.category), Some(Category::Condition));

    // 1 frozen + 3 lineages doubling twice more
    assert_eq!(expansion.total_paths(), 1 + 3 * 4);
}

#[test]
fn seed_diagnosis_does_not_freeze_root() {
    let seed = vec![event("SNOMED/38341003", Category::Condition)];
    let expansion = engine(two_fresh).expand(&seed).unwrap();
    assert_eq!(expansion.total_paths(), 16);
    assert_eq!(expansion.paths_with_diagnosis(), 0);
}

#[test]
fn single_candidate_replaces_parent() {
    let script = |history: &[Event]| {
        let n = history.len();
        Ok(vec![RawCandidate::new(format!("LOINC/{}-1", n), 0.5)])
    };
    let expansion = engine(script).expand(&seed_history()).unwrap();

    assert_eq!(expansion.total_paths(), 1);
    let only = &expansion.paths[0];
    assert_eq!(only.id().to_string(), "Path-4-0");
    assert_eq!(only.steps().len(), 4);
}

#[test]
fn root_failure_is_fatal() {
    let err = engine(offline).expand(&seed_history()).unwrap_err();
    assert!(matches!(err, PathwayError::RootExpansion(_)));
}

#[test]
fn later_failures_degrade_per_path() {
    let seed = seed_history();
    let seed_len = seed.len();
    let script = move |history: &[Event]| {
        if history.len() == seed_len {
            two_fresh(history)
        } else {
            offline(history)
        }
    };
    let expansion = engine(script).expand(&seed).unwrap();

    assert_eq!(expansion.total_paths(), 2);
    assert!(expansion.paths.iter().all(|p| p.steps().len() == 1));
}

#[test]
fn failed_path_stays_a_dead_end_after_recovery() {
    let queries = AtomicUsize::new(0);
    let script = move |history: &[Event]| {
        // the model is down for exactly the first level-2 query
        if queries.fetch_add(1, Ordering::SeqCst) == 1 {
            offline(history)
        } else {
            two_fresh(history)
        }
    };
    let engine = engine(script);
    let expansion = engine.expand(&seed_history()).unwrap();

    let stalled = &expansion.paths[0];
    assert_eq!(stalled.id().to_string(), "Path-1-0");
    assert_eq!(stalled.steps().len(), 1);
    assert!(expansion.paths[1..].iter().all(|p| p.steps().len() == 4));
    assert_eq!(expansion.total_paths(), 1 + 8);
    // root, both level-1 paths, then 2 + 4 under Path-1-1
    assert_eq!(engine.oracle().backend().calls(), 1 + 2 + 2 + 4);
}

#[test]
fn repeated_expansion_is_identical() {
    let seed = seed_history();
    let first = engine(two_fresh).expand(&seed).unwrap();
    let second = engine(two_fresh).expand(&seed).unwrap();
    assert_eq!(first, second);
}

#[test]
fn oracle_never_proposes_known_code() {
    let adapter = OracleAdapter::new(ScriptedBackend::new(|_: &[Event]| {
        Ok(vec![
            RawCandidate::new("LOINC/8867-4", 0.5),
            RawCandidate::new("LOINC/8867-4 || bpm || high", 0.3),
            RawCandidate::new("LOINC/8480-6", 0.1),
        ])
    }));
    let candidates = adapter.predict(&seed_history(), 2).unwrap();
    assert!(candidates.iter().all(|c| c.code() != "LOINC/8867-4"));
    assert_eq!(candidates.len(), 1);
}

#[test]
fn shared_first_step_counts_once() {
    let seed = seed_history();
    let expansion = engine(two_fresh).expand(&seed).unwrap();

    // eight leaves inherit each level-one prediction
    let first = format!("CPT4/{}0", seed.len());
    let inheriting = expansion
        .paths
        .iter()
        .filter(|p| p.steps()[0].token == first)
        .count();
    assert_eq!(inheriting, 8);

    for strategy in [SlotStrategy::Ancestral, SlotStrategy::FixedDivisor] {
        let top = top_codes(&expansion, 100, strategy);
        let entry = top.iter().find(|f| f.code == first).unwrap();
        assert_eq!(entry.count, 1);
    }
}

#[test]
fn ancestral_slots_stay_exact_when_lineages_freeze() {
    let seed = seed_history();
    let trigger = format!("CPT4/{}1", seed.len());
    let script = move |history: &[Event]| {
        if history.last().map(Event::code) == Some(trigger.as_str()) {
            return Ok(vec![
                RawCandidate::new("SNOMED/22298006", 0.6).with_category(Category::Condition)
            ]);
        }
        two_fresh(history)
    };
    let expansion = engine(script).expand(&seed).unwrap();

    // Path-2-2 froze; its level-one ancestor is Path-1-1, shared with nobody else
    let top = top_codes(&expansion, 100, SlotStrategy::Ancestral);
    let level_one = top
        .iter()
        .find(|f| f.code == format!("CPT4/{}1", seed.len()))
        .unwrap();
    assert_eq!(level_one.count, 1);
    let diagnosis = top.iter().find(|f| f.code == "SNOMED/22298006").unwrap();
    assert_eq!(diagnosis.count, 1);
}
