//! Rates how "performative" an image looks using a hosted multimodal model,
//! and keeps a follow-up chat about it.
//!
//! The [`gateway`] module is the HTTP service in front of the model; the
//! [`session`], [`client`] and [`analyzer`] modules make up the client side.

pub mod analyzer;
pub mod client;
pub mod extract;
pub mod gateway;
pub mod gemini;
pub mod image;
pub mod messages;
pub mod model;
pub mod prompt;
pub mod session;

pub use analyzer::Analyzer;
pub use client::{ApiClient, ClientError};
pub use gateway::{Gateway, GatewayConfig, GatewayError, router};
pub use gemini::{GeminiConfig, GeminiError, GeminiModel};
pub use image::{ImageData, ImageError};
pub use messages::{AnalysisResult, ChatMessage, ChatRequest, Role};
pub use model::{ModelRequest, ModelResponse, Part, Turn, TurnRole, VisionModel};
pub use session::{Session, SessionState};
