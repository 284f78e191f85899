use clap::Parser;
use clinical_pathways::{cli, commands};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = cli::Args::parse();

    let result = match args.command {
        cli::Commands::Pathways { expansion } => commands::pathways::run(expansion),
        cli::Commands::Predictions {
            expansion,
            top,
            strategy,
        } => commands::predictions::run(expansion, top, strategy),
        cli::Commands::Config {
            show,
            model_url,
            model_timeout,
            loinc,
            cpt4,
            cache_results,
        } => commands::config::run(show, model_url, model_timeout, loinc, cpt4, cache_results),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
