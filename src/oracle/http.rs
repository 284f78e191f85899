use super::{ModelBackend, RawCandidate};
use crate::error::{PathwayError, Result};
use crate::types::Event;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct RankRequest<'a> {
    events: &'a [Event],
    top_k: usize,
}

#[derive(Deserialize)]
struct RankResponse {
    candidates: Vec<RawCandidate>,
}

/// Model served behind an HTTP endpoint that accepts a history and answers
/// with its ranked next-token candidates.
pub struct HttpModelBackend {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpModelBackend {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

impl ModelBackend for HttpModelBackend {
    fn rank(&self, history: &[Event], top_k: usize) -> Result<Vec<RawCandidate>> {
        debug!("Requesting {} candidates from {}", top_k, self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&RankRequest {
                events: history,
                top_k,
            })
            .send()
            .map_err(|e| PathwayError::unavailable(format!("{}: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Model endpoint {} answered {}", self.url, status);
            return Err(PathwayError::unavailable(format!(
                "{} answered {}",
                self.url, status
            )));
        }

        let body: RankResponse = response
            .json()
            .map_err(|e| PathwayError::unavailable(format!("unreadable model output: {}", e)))?;

        Ok(body.candidates)
    }

    fn describe(&self) -> String {
        format!("http:{}", self.url)
    }
}
