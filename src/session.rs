use crate::{
    image::ImageData,
    messages::{AnalysisResult, ChatMessage, ChatRequest},
};
use std::{fmt, mem};

/// Explanation shown when the analysis call fails.
pub const ANALYSIS_FAILED_EXPLANATION: &str = "Failed to analyze the image. Please try again.";
/// Assistant message appended when a chat call fails.
pub const CHAT_FAILED_MESSAGE: &str = "Failed to process your message. Please try again.";

/// Everything the client knows about the current image.
///
/// The analysis and the chat thread only exist inside `Result`, so replacing
/// the state on upload or reset drops both together.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum SessionState {
    #[default]
    Empty,
    Loading {
        image: ImageData,
    },
    Result {
        image: ImageData,
        analysis: AnalysisResult,
        chat: ChatThread,
    },
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Empty => "empty",
            SessionState::Loading { .. } => "loading",
            SessionState::Result { .. } => "result",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatThread {
    messages: Vec<ChatMessage>,
    in_flight: bool,
}

impl ChatThread {
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// True while a message is waiting for its reply; input is disabled meanwhile.
    pub fn is_busy(&self) -> bool {
        self.in_flight
    }
}

/// Issued by [`Session::upload`]; hand it back with the gateway's answer.
#[derive(Debug)]
pub struct AnalysisTicket {
    generation: u64,
    image: ImageData,
}

impl AnalysisTicket {
    pub fn image(&self) -> &ImageData {
        &self.image
    }
}

/// Issued by [`Session::begin_chat`]; hand it back with the gateway's answer.
#[derive(Debug)]
pub struct PendingChat {
    generation: u64,
    request: ChatRequest,
}

impl PendingChat {
    pub fn request(&self) -> &ChatRequest {
        &self.request
    }
}

/// Client-side state machine for one image at a time.
///
/// Every upload or reset starts a new generation; answers carrying an older
/// generation belong to a previous image and are dropped.
#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
    generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn image(&self) -> Option<&ImageData> {
        match &self.state {
            SessionState::Empty => None,
            SessionState::Loading { image } | SessionState::Result { image, .. } => Some(image),
        }
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        match &self.state {
            SessionState::Result { analysis, .. } => Some(analysis),
            _ => None,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        match &self.state {
            SessionState::Result { chat, .. } => chat.messages(),
            _ => &[],
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, SessionState::Loading { .. })
    }

    pub fn can_chat(&self) -> bool {
        matches!(&self.state, SessionState::Result { chat, .. } if !chat.is_busy())
    }

    /// Replaces whatever was shown with `image` and enters `Loading`.
    pub fn upload(&mut self, image: ImageData) -> AnalysisTicket {
        self.generation += 1;
        self.state = SessionState::Loading {
            image: image.clone(),
        };
        log::debug!("Uploaded {image:?} (generation {})", self.generation);

        AnalysisTicket {
            generation: self.generation,
            image,
        }
    }

    /// Leaves `Loading` with the gateway's answer, or a zero rating if the call failed.
    ///
    /// Returns `false` when the ticket is stale and nothing changed.
    pub fn finish_analysis<E: fmt::Display>(
        &mut self,
        ticket: AnalysisTicket,
        outcome: Result<AnalysisResult, E>,
    ) -> bool {
        if ticket.generation != self.generation || !self.is_loading() {
            log::debug!("Dropping analysis for generation {}", ticket.generation);
            return false;
        }

        let analysis = outcome.unwrap_or_else(|err| {
            log::error!("Analysis error: {err}");
            AnalysisResult::new(0, ANALYSIS_FAILED_EXPLANATION)
        });

        self.state = match mem::take(&mut self.state) {
            SessionState::Loading { image } | SessionState::Result { image, .. } => {
                SessionState::Result {
                    image,
                    analysis,
                    chat: ChatThread::default(),
                }
            }
            SessionState::Empty => SessionState::Empty,
        };
        true
    }

    /// Back to `Empty`, dropping the image, the analysis and the chat.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = SessionState::Empty;
    }

    /// Appends the user's message and returns the request to send.
    ///
    /// Returns `None` without touching anything when there is no analysed
    /// image, the input is blank, or a previous message is still in flight.
    pub fn begin_chat(&mut self, input: &str) -> Option<PendingChat> {
        let SessionState::Result { image, chat, .. } = &mut self.state else {
            return None;
        };
        if input.trim().is_empty() || chat.in_flight {
            return None;
        }

        let conversation_history = chat.messages.clone();
        chat.messages.push(ChatMessage::user(input));
        chat.in_flight = true;

        Some(PendingChat {
            generation: self.generation,
            request: ChatRequest {
                image: image.to_data_url(),
                message: input.to_string(),
                conversation_history,
            },
        })
    }

    /// Appends exactly one assistant message and re-enables input.
    ///
    /// Returns `false` when the reply belongs to an earlier image.
    pub fn finish_chat<E: fmt::Display>(
        &mut self,
        pending: PendingChat,
        outcome: Result<String, E>,
    ) -> bool {
        if pending.generation != self.generation {
            log::debug!("Dropping chat reply for generation {}", pending.generation);
            return false;
        }
        let SessionState::Result { chat, .. } = &mut self.state else {
            return false;
        };
        if !chat.in_flight {
            return false;
        }

        let reply = match outcome {
            Ok(response) => ChatMessage::assistant(response),
            Err(err) => {
                log::error!("Chat error: {err}");
                ChatMessage::assistant(CHAT_FAILED_MESSAGE)
            }
        };
        chat.messages.push(reply);
        chat.in_flight = false;
        true
    }
}
