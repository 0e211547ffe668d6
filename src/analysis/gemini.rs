//! Gemini vision estimator.
//!
//! Sends the photo as inline data together with a strict instruction and
//! expects the model to answer with a single JSON object in the estimate
//! shape. Everything the model returns is treated as untrusted: fences are
//! stripped, the JSON is parsed, and the estimate is validated before it
//! reaches the orchestrator.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use super::errors::AnalysisError;
use super::provider::{AnalysisProvider, ImageInput};
use crate::config::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
use crate::nutrition::AnalysisEstimate;

const INSTRUCTION: &str = r#"Role: you are a sports nutrition expert.
Goal: analyse the photo of a meal, estimate quantities and report its protein content.

Strict instructions:
1. Identify the main food item.
2. Estimate its total weight in grams.
3. Compute the protein content in grams.

Reply ONLY with this exact JSON schema, no prose, no markdown:
{
  "aliment": "Name of the main food item",
  "confiance_score": 0.9,
  "poids_estime": 150,
  "volume_estime_cm3": 0,
  "proteines_calculees": 30,
  "marge_erreur": 5,
  "details_analyse": {
    "reference_detectee": "Reference object or short advice",
    "methode_calcul": "Gemini Expert"
  }
}
confiance_score is between 0 and 1. All numbers are non-negative.
If no food is visible in the photo, reply exactly {"aucun_aliment": true}."#;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

pub struct GeminiEstimator {
    api_key: Option<String>,
    client: Client,
    model: String,
    base_url: String,
}

impl GeminiEstimator {
    /// A missing key is accepted here and reported on every `estimate` call.
    pub fn new(api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("build gemini http client")?;
        Ok(Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client,
            model: DEFAULT_GEMINI_MODEL.to_owned(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_owned(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn build_request(image: &ImageInput) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text {
                        text: INSTRUCTION.to_owned(),
                    },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: image.mime_type.clone(),
                            data: Base64::encode_string(&image.bytes),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: 0.2,
            },
        }
    }

    fn map_status(status: StatusCode, body: &str) -> AnalysisError {
        let message = serde_json::from_str::<GenerateResponse>(body)
            .ok()
            .and_then(|r| r.error)
            .map_or_else(|| body.chars().take(200).collect(), |e| e.message);
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                AnalysisError::Configuration(format!("credential rejected ({status}): {message}"))
            }
            _ => AnalysisError::Transport(format!("gemini returned {status}: {message}")),
        }
    }
}

lazy_static! {
    static ref FENCE_RE: Regex = Regex::new(r"(?s)^```[A-Za-z0-9_-]*\s*(.*?)\s*```$").unwrap();
}

/// Removes markdown fences or surrounding prose around the first JSON object.
pub(crate) fn strip_json_wrapping(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(inner) = FENCE_RE.captures(trimmed).and_then(|c| c.get(1)) {
        return inner.as_str();
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// Converts raw model text into a validated estimate.
pub(crate) fn parse_estimate(raw: &str) -> Result<AnalysisEstimate, AnalysisError> {
    let body = strip_json_wrapping(raw);
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| AnalysisError::InvalidResponse(format!("not JSON: {e}")))?;

    if value.get("aucun_aliment").and_then(serde_json::Value::as_bool) == Some(true) {
        return Err(AnalysisError::Recognition("model found no food in the photo".into()));
    }

    let estimate: AnalysisEstimate = serde_json::from_value(value)
        .map_err(|e| AnalysisError::InvalidResponse(format!("unexpected shape: {e}")))?;
    estimate.validate().map_err(AnalysisError::InvalidResponse)?;
    Ok(estimate)
}

fn extract_text(response: GenerateResponse) -> Result<String, AnalysisError> {
    if let Some(err) = response.error {
        return Err(AnalysisError::InvalidResponse(format!("gemini error: {}", err.message)));
    }
    let text: String = response
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(AnalysisError::InvalidResponse("no text in gemini response".into()));
    }
    Ok(text)
}

#[async_trait]
impl AnalysisProvider for GeminiEstimator {
    fn name(&self) -> &'static str {
        "gemini"
    }

    #[instrument(skip(self, image), fields(model = %self.model, bytes = image.bytes.len()))]
    async fn estimate(&self, image: &ImageInput) -> Result<AnalysisEstimate, AnalysisError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AnalysisError::Configuration("GEMINI_API_KEY is not set".into()))?;

        let started = std::time::Instant::now();
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .json(&Self::build_request(image))
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "gemini request did not complete");
                AnalysisError::Transport(format!("request failed: {e}"))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::Transport(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            error!(%status, "gemini api error");
            return Err(Self::map_status(status, &body));
        }

        let envelope: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| AnalysisError::InvalidResponse(format!("bad envelope: {e}")))?;
        let text = extract_text(envelope)?;
        let estimate = parse_estimate(&text).map_err(|e| {
            warn!(error = %e, "gemini answer rejected");
            e
        })?;

        debug!(
            aliment = %estimate.aliment,
            protein = estimate.proteines_calculees,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "gemini estimate"
        );
        Ok(estimate)
    }
}
