pub mod config;
pub mod pathways;
pub mod predictions;

use crate::api::{ApiResult, PathwayService};
use crate::cli::ExpansionArgs;
use crate::config::Config;
use crate::oracle::{HttpModelBackend, ModelBackend, OracleAdapter, ReplayBackend};
use crate::pathway::BranchEngine;
use crate::types::load_history;
use crate::utils::cache::ResultStore;
use crate::utils::progress_bar_builder::spinner_callback;
use crate::vocab::Vocabulary;
use anyhow::{anyhow, bail, Context, Result};
use indicatif::ProgressBar;
use log::warn;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

type DynBackend = Box<dyn ModelBackend>;

fn build_backend(args: &ExpansionArgs, config: &Config) -> Result<DynBackend> {
    if let Some(replay) = &args.replay {
        let backend = ReplayBackend::from_file(replay)
            .with_context(|| format!("loading replay table {}", replay.display()))?;
        return Ok(Box::new(backend));
    }

    let Some(url) = args.model_url.as_ref().or(config.model_url.as_ref()) else {
        bail!("No model configured: pass --model-url or --replay, or set model_url in the config file");
    };
    Ok(Box::new(HttpModelBackend::new(url.clone(), config.model_timeout)?))
}

pub(crate) fn build_service(
    args: &ExpansionArgs,
    config: &Config,
    progress: &ProgressBar,
) -> Result<PathwayService<DynBackend>> {
    let seed = load_history(&args.patient_file)
        .with_context(|| format!("reading patient history {}", args.patient_file.display()))?;

    let mut expansion = config.expansion();
    if let Some(levels) = args.levels {
        expansion.max_levels = levels;
    }
    if let Some(width) = args.width {
        expansion.branch_width = width;
    }
    expansion.validate()?;
    let pool = args.pool.unwrap_or(config.candidate_pool);

    let oracle = OracleAdapter::new(build_backend(args, config)?).with_pool_size(pool);
    let engine = BranchEngine::new(oracle, expansion);
    let vocabulary = Vocabulary::load(config.loinc_path.as_deref(), config.cpt4_path.as_deref())?;

    let mut service = PathwayService::new(engine, seed, vocabulary)
        .with_top_k(config.top_k)
        .with_progress(spinner_callback(progress));

    if config.cache_results && !args.no_cache {
        match ResultStore::new() {
            Ok(store) => service = service.with_store(store),
            Err(e) => warn!("Result cache disabled: {}", e),
        }
    }
    Ok(service)
}

/// Writes a query result, or its error body, as pretty JSON.
pub(crate) fn write_response<T: Serialize>(result: ApiResult<T>, output: Option<&Path>) -> Result<()> {
    let (body, failure) = match result {
        Ok(value) => (serde_json::to_string_pretty(&value)?, None),
        Err(e) => (serde_json::to_string_pretty(&e.to_response())?, Some(e)),
    };

    match output {
        Some(path) => {
            let mut writer = BufWriter::new(
                File::create(path).with_context(|| format!("creating {}", path.display()))?,
            );
            writeln!(writer, "{}", body)?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", body)?;
        }
    }

    match failure {
        Some(e) => Err(anyhow!(e)),
        None => Ok(()),
    }
}
