use crate::model::{ModelRequest, ModelResponse, Part, TurnRole, VisionModel};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("request to the model failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("model returned status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("failed to decode model response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("model returned no candidates")]
    NoCandidates,
    #[error("model returned an empty reply (finish reason: {finish_reason})")]
    EmptyReply { finish_reason: String },
}

#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// [`VisionModel`] backed by the Gemini `generateContent` REST endpoint.
pub struct GeminiModel {
    http_client: Client,
    endpoint: String,
    api_key: String,
}

impl GeminiModel {
    pub fn new(config: GeminiConfig) -> Result<Self, GeminiError> {
        let http_client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http_client,
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            api_key: config.api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl VisionModel for GeminiModel {
    type Error = GeminiError;

    async fn generate(&self, request: ModelRequest) -> Result<ModelResponse, Self::Error> {
        let body = GenerateContentRequest::from(&request);

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(GeminiError::Status { status, body: text });
        }

        let reply: GenerateContentResponse = serde_json::from_str(&text)?;
        let text = reply.into_text()?;
        log::debug!("Model reply: {text:?}");

        Ok(ModelResponse { text })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WirePart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

impl From<&ModelRequest> for GenerateContentRequest {
    fn from(request: &ModelRequest) -> Self {
        let contents = request
            .turns
            .iter()
            .map(|turn| Content {
                role: Some(match turn.role {
                    TurnRole::User => "user",
                    TurnRole::Model => "model",
                }),
                parts: turn.parts.iter().map(WirePart::from).collect(),
            })
            .collect();

        Self {
            system_instruction: request.system_instruction.as_ref().map(|text| Content {
                role: None,
                parts: vec![WirePart::Text { text: text.clone() }],
            }),
            contents,
            generation_config: request
                .temperature
                .map(|temperature| GenerationConfig { temperature }),
        }
    }
}

impl From<&Part> for WirePart {
    fn from(part: &Part) -> Self {
        match part {
            Part::Text(text) => WirePart::Text { text: text.clone() },
            Part::Image(image) => WirePart::InlineData {
                inline_data: Blob {
                    mime_type: image.mime().to_string(),
                    data: image.base64(),
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
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

impl GenerateContentResponse {
    /// Joins the text parts of the first candidate.
    ///
    /// A candidate without any text, e.g. one stopped by a safety filter, is
    /// an error just like a reply without candidates.
    fn into_text(self) -> Result<String, GeminiError> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or(GeminiError::NoCandidates)?;

        let candidate_reason = candidate.finish_reason;
        let texts: Vec<String> = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        let text = texts.join("\n").trim().to_string();
        if text.is_empty() {
            return Err(GeminiError::EmptyReply {
                finish_reason: candidate_reason.unwrap_or_else(|| "unspecified".to_string()),
            });
        }
        Ok(text)
    }
}
