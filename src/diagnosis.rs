//! Text diagnosis of failing targets
//!
//! A [`Diagnoser`] turns the last response text of a target into a free-text
//! explanation. The monitor tolerates any failure and records
//! [`DIAGNOSIS_FAILED`] instead.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::DiagnosisConfig;

/// Recorded on a target when the diagnosis service fails
pub const DIAGNOSIS_FAILED: &str = "AI analysis failed";

#[async_trait]
pub trait Diagnoser: Send + Sync {
    async fn diagnose(&self, url: &str, last_response: &str) -> Result<String>;
}

/// Diagnoser used when no service is configured
pub struct Unavailable;

#[async_trait]
impl Diagnoser for Unavailable {
    async fn diagnose(&self, _url: &str, _last_response: &str) -> Result<String> {
        anyhow::bail!("no diagnosis service configured")
    }
}

#[derive(Debug, Serialize)]
struct DiagnosisRequest<'a> {
    url: &'a str,
    response: &'a str,
}

#[derive(Debug, Deserialize)]
struct DiagnosisResponse {
    diagnosis: String,
}

/// Diagnoser backed by a remote HTTP endpoint
///
/// POSTs `{ "url", "response" }` and expects `{ "diagnosis" }` back.
pub struct RemoteDiagnoser {
    client: reqwest::Client,
    config: DiagnosisConfig,
}

impl RemoteDiagnoser {
    pub fn new(config: DiagnosisConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Diagnoser for RemoteDiagnoser {
    #[instrument(skip(self, last_response))]
    async fn diagnose(&self, url: &str, last_response: &str) -> Result<String> {
        let mut request = self.client.post(&self.config.url).json(&DiagnosisRequest {
            url,
            response: last_response,
        });

        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("failed to reach diagnosis service")?
            .error_for_status()
            .context("diagnosis service returned an error")?;

        let body: DiagnosisResponse = response
            .json()
            .await
            .context("failed to parse diagnosis response")?;

        debug!("received diagnosis ({} chars)", body.diagnosis.len());
        Ok(body.diagnosis)
    }
}
