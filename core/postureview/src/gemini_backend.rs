use std::time::Duration;

use reqwest::blocking::Client;

use crate::analysis::{AnalysisBackend, AnalysisRequest};
use crate::config::{AnalyzerConfig, ApiKey};
use crate::error::AnalysisError;
use crate::gemini;

/// Blocking HTTPS transport for the Gemini `generateContent` endpoint.
pub struct GeminiBackend {
    client: Client,
    url: String,
}

impl GeminiBackend {
    pub fn new(config: &AnalyzerConfig) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                AnalysisError::TransientFailure(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self {
            client,
            url: gemini::generate_content_url(&config.endpoint, &config.model),
        })
    }
}

fn transient(e: reqwest::Error) -> AnalysisError {
    AnalysisError::TransientFailure(e.to_string())
}

impl AnalysisBackend for GeminiBackend {
    fn generate(
        &self,
        request: &AnalysisRequest,
        api_key: &ApiKey,
    ) -> Result<String, AnalysisError> {
        let body = gemini::request_body(request);

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", api_key.expose())
            .json(&body)
            .send()
            .map_err(transient)?;

        let status = response.status();
        let text = response.text().map_err(transient)?;

        if !status.is_success() {
            return Err(gemini::error_from_status(status.as_u16(), &text));
        }

        gemini::extract_text(&text)
    }
}
