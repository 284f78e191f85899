mod common;

use clinical_pathways::api::PathwayService;
use clinical_pathways::oracle::{OracleAdapter, ReplayBackend};
use clinical_pathways::pathway::{BranchEngine, ExpansionConfig};
use clinical_pathways::types::load_history;
use clinical_pathways::vocab::Vocabulary;
use std::path::PathBuf;

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

// Replays the bundled palpitations work-up end to end.
#[test]
fn bundled_demo_expands() {
    common::init_test_logger();
    let seed = load_history(demo("palpitations_patient.json")).expect("load demo patient");
    assert_eq!(seed.len(), 11);

    let backend = ReplayBackend::from_file(demo("palpitations_replay.json")).expect("load replay");
    let engine = BranchEngine::new(OracleAdapter::new(backend), ExpansionConfig::default());
    let service = PathwayService::new(engine, seed, Vocabulary::default());

    let pathways = service.get_pathways().unwrap();
    assert_eq!(pathways.paths_with_diagnosis, 1);
    let diagnosed = pathways
        .pathways
        .iter()
        .find(|p| p.diagnosis_found)
        .unwrap();
    assert_eq!(diagnosed.id, "Path-2-0");
    assert_eq!(diagnosed.final_diagnosis.as_deref(), Some("SNOMED/49436004"));

    // the creatinine branch keeps its unit suffix in the step token
    assert!(pathways
        .pathways
        .iter()
        .any(|p| p.steps.first().map(|s| s.token.as_str()) == Some("LOINC/2160-0 || mg/dL")));

    let predictions = service.get_predictions().unwrap();
    assert!(!predictions.predictions.is_empty());
    assert!(predictions.predictions.iter().all(|p| p.count >= 1));
}
