use super::{build_service, write_response};
use crate::cli::ExpansionArgs;
use crate::config::Config;
use crate::utils::progress_bar_builder::ProgressBarBuilder;
use anyhow::Result;

pub fn run(args: ExpansionArgs) -> Result<()> {
    let config = Config::load();
    let progress = ProgressBarBuilder::new("Preparing pathway expansion...")
        .with_tick()
        .build()?;

    let service = build_service(&args, &config, &progress)?;
    let result = service.get_pathways();
    progress.finish_and_clear();

    write_response(result, args.output_file.as_deref())
}
