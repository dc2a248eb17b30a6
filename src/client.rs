use crate::{
    image::ImageData,
    messages::{AnalysisResult, AnalyzeRequest, ChatRequest, ChatResponse, ErrorResponse},
};
use reqwest::{Client, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;

pub const ANALYZE_PATH: &str = "/api/analyze";
pub const CHAT_PATH: &str = "/api/chat";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Unexpected status {status}: {text}")]
    UnexpectedStatus { status: StatusCode, text: String },
}

/// HTTP client for the rating gateway.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http_client: Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a client for the gateway at `base_url`.
    ///
    /// # Errors
    /// If the underlying HTTP client can't be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Asks the gateway to rate `image`.
    ///
    /// # Errors
    /// * If the request can't be sent or the body can't be read.
    /// * If the gateway answers with a non-success status.
    pub async fn analyze(&self, image: &ImageData) -> Result<AnalysisResult, ClientError> {
        let request = AnalyzeRequest {
            image: image.to_data_url(),
        };
        self.post_json(ANALYZE_PATH, &request).await
    }

    /// Sends one chat turn and returns the assistant's reply.
    ///
    /// # Errors
    /// * If the request can't be sent or the body can't be read.
    /// * If the gateway answers with a non-success status.
    pub async fn chat(&self, request: &ChatRequest) -> Result<String, ClientError> {
        let response: ChatResponse = self.post_json(CHAT_PATH, request).await?;
        Ok(response.response)
    }

    async fn post_json<T: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<R, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http_client.post(&url).json(body).send().await?;

        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            status => {
                let text = response.text().await?;
                // prefer the gateway's own error message over the raw body
                let text = serde_json::from_str::<ErrorResponse>(&text)
                    .map(|body| body.error)
                    .unwrap_or(text);
                Err(ClientError::UnexpectedStatus { status, text })
            }
        }
    }
}
