use super::{build_service, write_response};
use crate::cli::ExpansionArgs;
use crate::config::Config;
use crate::pathway::SlotStrategy;
use crate::utils::progress_bar_builder::ProgressBarBuilder;
use anyhow::Result;

pub fn run(args: ExpansionArgs, top: Option<usize>, strategy: SlotStrategy) -> Result<()> {
    let config = Config::load();
    let progress = ProgressBarBuilder::new("Preparing pathway expansion...")
        .with_tick()
        .build()?;

    let mut service = build_service(&args, &config, &progress)?.with_strategy(strategy);
    if let Some(top) = top {
        service = service.with_top_k(top);
    }
    let result = service.get_predictions();
    progress.finish_and_clear();

    write_response(result, args.output_file.as_deref())
}
