//! Ollama HTTP client.
//!
//! Speaks the non-streaming generate API:
//! - `POST {base}/api/generate` with `{model, prompt, options, stream: false}`
//!   returning `{response, done}`
//! - `GET {base}/api/tags` returning `{models: [{name}]}`
//!
//! See: <https://github.com/ollama/ollama/blob/main/docs/api.md>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::traits::{BackendReply, BackendRequest, GenerationOptions, InferenceBackend};
use crate::error::InferenceFailure;

/// Default base URL for a local Ollama daemon.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for an Ollama server.
#[derive(Clone)]
pub struct OllamaBackend {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl OllamaBackend {
    /// Create a client for the default local URL.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom base URL and timeout (also used for testing with wiremock).
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn transport_failure(&self, err: reqwest::Error) -> InferenceFailure {
        if err.is_timeout() {
            InferenceFailure::Timeout(self.timeout)
        } else if err.is_connect() {
            InferenceFailure::ConnectionRefused(err.to_string())
        } else if err.is_decode() {
            InferenceFailure::Decode(err.to_string())
        } else {
            InferenceFailure::Http(err.to_string())
        }
    }

    /// Map non-success status codes to failures.
    async fn check_status(&self, response: Response) -> Result<Response, InferenceFailure> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(InferenceFailure::RateLimited { retry_after });
        }
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };
        Err(InferenceFailure::Api {
            status: status.as_u16(),
            message,
        })
    }
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, request: &BackendRequest) -> Result<BackendReply, InferenceFailure> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(&GenerateBody {
                model: &request.model,
                prompt: &request.prompt,
                options: &request.options,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| self.transport_failure(e))?;

        let response = self.check_status(response).await?;

        let body: GenerateReplyBody = response
            .json()
            .await
            .map_err(|e| InferenceFailure::Decode(e.to_string()))?;

        Ok(BackendReply {
            text: body.response,
            done: body.done,
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, InferenceFailure> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_failure(e))?;

        let response = self.check_status(response).await?;

        let body: TagsBody = response
            .json()
            .await
            .map_err(|e| InferenceFailure::Decode(e.to_string()))?;

        Ok(body.models.into_iter().map(|m| m.name).collect())
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    options: &'a GenerationOptions,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateReplyBody {
    #[serde(default)]
    response: String,
    /// Servers that omit the flag are taken to have finished.
    #[serde(default = "finished")]
    done: bool,
}

fn finished() -> bool {
    true
}

#[derive(Deserialize)]
struct TagsBody {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let backend = OllamaBackend::with_base_url("http://ollama:11434/", DEFAULT_TIMEOUT);
        assert_eq!(backend.base_url(), "http://ollama:11434");
    }

    #[test]
    fn generate_body_matches_wire_contract() {
        let options = GenerationOptions {
            temperature: 0.5,
            top_p: 0.9,
            repeat_penalty: 1.1,
            num_predict: 200,
            num_ctx: 2048,
        };
        let body = serde_json::to_value(GenerateBody {
            model: "llama3.1",
            prompt: "hi",
            options: &options,
            stream: false,
        })
        .unwrap();
        assert_eq!(body["model"], "llama3.1");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 200);
        assert_eq!(body["options"]["num_ctx"], 2048);
        assert!(body["options"]["repeat_penalty"].is_number());
    }
}
