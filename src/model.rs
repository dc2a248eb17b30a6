use crate::image::ImageData;
use std::{fmt, future::Future};

/// Trait for the hosted multimodal model the gateway forwards requests to.
///
/// Implementors own their transport; the gateway only builds [`ModelRequest`]s
/// and reads back the text reply. Calls may run concurrently, so `generate`
/// takes `&self`.
pub trait VisionModel {
    /// The error type that can be returned by the upstream call.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sends the request upstream and waits for the complete reply.
    fn generate(
        &self,
        request: ModelRequest,
    ) -> impl Future<Output = Result<ModelResponse, Self::Error>> + Send;
}

/// Which side of the conversation a [`Turn`] belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnRole {
    /// Content supplied by the user: images, instructions and chat messages.
    User,
    /// Earlier replies of the model, replayed as context.
    Model,
}

/// A single piece of content inside a [`Turn`].
#[derive(Clone, Debug, PartialEq)]
pub enum Part {
    /// Plain text.
    Text(String),
    /// An inline image sent with its MIME type.
    Image(ImageData),
}

/// One message of the conversation sent upstream.
#[derive(Clone, Debug, PartialEq)]
pub struct Turn {
    /// Author of the turn.
    pub role: TurnRole,
    /// Content of the turn, in order.
    pub parts: Vec<Part>,
}

impl Turn {
    /// A user turn made of `parts`.
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: TurnRole::User,
            parts,
        }
    }

    /// A model turn holding a single text part.
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            parts: vec![Part::Text(text.into())],
        }
    }
}

/// A complete conversation to send upstream, oldest turn first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelRequest {
    /// Instruction applied to the whole conversation, if any.
    pub system_instruction: Option<String>,
    /// Sampling temperature; the model's default when `None`.
    pub temperature: Option<f32>,
    /// The conversation itself.
    pub turns: Vec<Turn>,
}

impl ModelRequest {
    /// Extracts lightweight metadata for logging without touching image bytes.
    pub fn summary(&self) -> RequestSummary {
        let mut summary = RequestSummary {
            turns: self.turns.len(),
            ..Default::default()
        };
        for part in self.turns.iter().flat_map(|turn| &turn.parts) {
            if let Part::Image(image) = part {
                summary.images += 1;
                summary.image_bytes += image.len();
            }
        }
        summary
    }
}

/// Lightweight metadata describing a [`ModelRequest`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestSummary {
    /// Number of turns in the conversation.
    pub turns: usize,
    /// Number of image parts across all turns.
    pub images: usize,
    /// Decoded size of all images together.
    pub image_bytes: usize,
}

impl fmt::Display for RequestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} turn(s), {} image(s), {} image bytes",
            self.turns, self.images, self.image_bytes
        )
    }
}

/// The model's complete reply.
///
/// Call timing is measured and logged by the caller, not carried here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelResponse {
    /// Reply text as produced by the model, before any extraction.
    pub text: String,
}
