use super::{ApiResult, ProgressCallback};
use crate::oracle::ModelBackend;
use crate::pathway::{top_codes, BranchEngine, Expansion, SlotStrategy, DEFAULT_TOP_K};
use crate::types::{split_code, Event, EventValue};
use crate::utils::cache::{fingerprint, ExpansionCache, ResultStore};
use crate::vocab::Vocabulary;
use log::warn;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct InitialEvent {
    pub code: String,
    pub name: String,
    pub system: String,
    pub value: Option<EventValue>,
    pub omop_table: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub token: String,
    pub system: String,
    /// Display name, or the bare identifier when the vocabulary has none.
    pub code: String,
    pub fullcode: String,
    pub probability: f64,
    #[serde(rename = "type")]
    pub category: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PathwayView {
    pub id: String,
    pub parent_id: Option<String>,
    pub diagnosis_found: bool,
    pub final_diagnosis: Option<String>,
    pub steps: Vec<StepView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PathwaysResponse {
    pub initial_patient: Vec<InitialEvent>,
    pub pathways: Vec<PathwayView>,
    pub total_paths: usize,
    pub paths_with_diagnosis: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionView {
    pub name: String,
    /// Share of tree slots, in percent.
    pub probability: f64,
    pub code: String,
    pub system: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionsResponse {
    pub predictions: Vec<PredictionView>,
}

/// Read-only queries over one patient's memoized branch tree.
pub struct PathwayService<B> {
    engine: BranchEngine<B>,
    seed: Vec<Event>,
    vocabulary: Vocabulary,
    cache: Arc<ExpansionCache>,
    store: Option<ResultStore>,
    top_k: usize,
    strategy: SlotStrategy,
}

impl<B: ModelBackend> PathwayService<B> {
    pub fn new(engine: BranchEngine<B>, seed: Vec<Event>, vocabulary: Vocabulary) -> Self {
        Self {
            engine,
            seed,
            vocabulary,
            cache: Arc::new(ExpansionCache::new()),
            store: None,
            top_k: DEFAULT_TOP_K,
            strategy: SlotStrategy::default(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<ExpansionCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_store(mut self, store: ResultStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_strategy(mut self, strategy: SlotStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.engine = self.engine.with_progress(callback);
        self
    }

    /// The branch tree, computed on first use.
    pub fn expansion(&self) -> ApiResult<Arc<Expansion>> {
        let expansion = self.cache.get_or_compute(|| {
            let key = match &self.store {
                Some(_) => Some(fingerprint(
                    &self.seed,
                    self.engine.config(),
                    self.engine.oracle().pool_size(),
                    &self.engine.oracle().backend().describe(),
                )?),
                None => None,
            };

            if let (Some(store), Some(key)) = (&self.store, &key) {
                if let Some(expansion) = store.load(key) {
                    return Ok(expansion);
                }
            }

            let expansion = self.engine.expand(&self.seed)?;
            if let (Some(store), Some(key)) = (&self.store, &key) {
                if let Err(e) = store.save(key, &expansion) {
                    warn!("Could not persist expansion: {}", e);
                }
            }
            Ok(expansion)
        })?;
        Ok(expansion)
    }

    pub fn get_pathways(&self) -> ApiResult<PathwaysResponse> {
        let expansion = self.expansion()?;

        let initial_patient = expansion
            .seed
            .iter()
            .map(|event| {
                let (system, _) = split_code(event.code());
                InitialEvent {
                    code: event.code().to_string(),
                    name: self.display_or_raw(event.code()),
                    system: system.to_string(),
                    value: event.value().cloned(),
                    omop_table: event.category().to_string(),
                }
            })
            .collect();

        let pathways = expansion
            .paths
            .iter()
            .map(|path| PathwayView {
                id: path.id().to_string(),
                parent_id: path.parent_id().map(|id| id.to_string()),
                diagnosis_found: path.diagnosis_found(),
                final_diagnosis: path.final_diagnosis().map(str::to_string),
                steps: path
                    .steps()
                    .iter()
                    .map(|step| {
                        let (system, fullcode) = split_code(&step.token);
                        StepView {
                            token: step.token.clone(),
                            system: system.to_string(),
                            code: self.vocabulary.display_name(&step.token),
                            fullcode: fullcode.to_string(),
                            probability: step.probability,
                            category: step.category.to_string(),
                        }
                    })
                    .collect(),
            })
            .collect();

        Ok(PathwaysResponse {
            initial_patient,
            pathways,
            total_paths: expansion.total_paths(),
            paths_with_diagnosis: expansion.paths_with_diagnosis(),
        })
    }

    pub fn get_predictions(&self) -> ApiResult<PredictionsResponse> {
        let expansion = self.expansion()?;

        let predictions = top_codes(&expansion, self.top_k, self.strategy)
            .into_iter()
            .map(|frequency| {
                let system = split_code(&frequency.code).0.to_string();
                PredictionView {
                    name: self.vocabulary.display_name(&frequency.code),
                    probability: frequency.percentage,
                    system,
                    code: frequency.code,
                    count: frequency.count,
                }
            })
            .collect();

        Ok(PredictionsResponse { predictions })
    }

    // Seed events show their full code when the vocabulary has no entry.
    fn display_or_raw(&self, code: &str) -> String {
        let (system, identifier) = split_code(code);
        self.vocabulary
            .lookup(system, identifier)
            .map(str::to_string)
            .unwrap_or_else(|| code.to_string())
    }
}
