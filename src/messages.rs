use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of `POST /api/analyze`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalyzeRequest {
    /// Data URL (or bare base64) of the image to rate.
    pub image: String,
}

/// A performativity rating and the reasoning behind it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnalysisResult {
    /// Score from 0 (genuine) to 10 (fully staged).
    pub rating: u8,
    /// Short reasoning behind the score, or the model's raw reply when it gave no JSON.
    pub explanation: String,
}

impl AnalysisResult {
    /// Creates a result from a rating and its explanation.
    pub fn new(rating: u8, explanation: impl Into<String>) -> Self {
        Self {
            rating,
            explanation: explanation.into(),
        }
    }

    /// The rating as shown to users, e.g. `7/10`.
    pub fn score_label(&self) -> String {
        format!("{}/10", self.rating)
    }
}

impl fmt::Display for AnalysisResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Performativity score: {}\n\n{}", self.score_label(), self.explanation)
    }
}

/// Author of a chat message, serialized as `user` or `assistant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed by the person who uploaded the image.
    User,
    /// Produced by the model, or a failure notice standing in for it.
    Assistant,
}

/// One entry of the follow-up chat about the current image.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChatMessage {
    /// Who wrote the message.
    pub role: Role,
    /// The message text as sent or received.
    pub content: String,
}

impl ChatMessage {
    /// A message written by the user.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// A message written by the assistant.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Content with literal `\n` escapes, which models sometimes emit, turned into newlines.
    pub fn display_content(&self) -> String {
        self.content.replace("\\n", "\n")
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatRequest {
    /// Data URL of the image under discussion.
    pub image: String,
    /// The new user message.
    pub message: String,
    /// Turns preceding `message`, oldest first.
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
}

/// Successful reply of `POST /api/chat`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatResponse {
    /// The assistant's answer.
    pub response: String,
}

/// Body returned with every non-success gateway status.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    /// Human-readable reason; upstream details are never included.
    pub error: String,
}
