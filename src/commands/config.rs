use crate::config::Config;
use anyhow::Result;
use std::path::PathBuf;

pub fn run(
    show: bool,
    model_url: Option<String>,
    model_timeout: Option<u64>,
    loinc: Option<PathBuf>,
    cpt4: Option<PathBuf>,
    cache_results: Option<bool>,
) -> Result<()> {
    let mut config = Config::load();
    let changed = model_url.is_some()
        || model_timeout.is_some()
        || loinc.is_some()
        || cpt4.is_some()
        || cache_results.is_some();

    if let Some(url) = model_url {
        config.model_url = Some(url);
    }
    if let Some(timeout) = model_timeout {
        config.model_timeout = timeout;
    }
    if let Some(path) = loinc {
        config.loinc_path = Some(path);
    }
    if let Some(path) = cpt4 {
        config.cpt4_path = Some(path);
    }
    if let Some(enabled) = cache_results {
        config.cache_results = enabled;
    }

    if changed {
        let path = config.save()?;
        println!("Configuration written to {}", path.display());
    }
    if show || !changed {
        print!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}
