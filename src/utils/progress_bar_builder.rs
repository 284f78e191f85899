use crate::api::{ProgressCallback, ProgressEvent};
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct ProgressBarBuilder {
    style_template: &'static str,
    message: String,
    enable_tick: bool,
}

impl ProgressBarBuilder {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            style_template: "{spinner:.green} {msg}",
            message: message.into(),
            enable_tick: false,
        }
    }

    pub(crate) fn with_tick(mut self) -> Self {
        self.enable_tick = true;
        self
    }

    pub(crate) fn build(self) -> Result<ProgressBar> {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template(self.style_template)?);
        pb.set_message(self.message);

        if self.enable_tick {
            pb.enable_steady_tick(Duration::from_millis(120));
        }

        Ok(pb)
    }
}

/// Forwards expansion progress to a spinner.
pub(crate) fn spinner_callback(pb: &ProgressBar) -> ProgressCallback {
    let pb = pb.clone();
    Arc::new(move |event: ProgressEvent| match event {
        ProgressEvent::Started { task } => pb.set_message(format!("{}...", task)),
        ProgressEvent::Progress {
            task,
            current,
            total,
        } => pb.set_message(format!("{}: level {}/{}", task, current, total)),
        ProgressEvent::Message { message, .. } => pb.set_message(message),
        ProgressEvent::Completed { task } => pb.finish_with_message(format!("{} complete", task)),
        ProgressEvent::Error { task, error } => {
            pb.abandon_with_message(format!("{} failed: {}", task, error))
        }
    })
}
