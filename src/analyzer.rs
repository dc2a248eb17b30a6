use crate::{
    client::ApiClient,
    image::{ImageData, ImageError},
    messages::{AnalysisResult, ChatMessage},
    session::Session,
};
use std::path::Path;

/// Drives a [`Session`] against the gateway, one call at a time.
pub struct Analyzer {
    client: ApiClient,
    session: Session,
}

impl Analyzer {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            session: Session::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Reads and rates an image file.
    ///
    /// Files that are not images are ignored: the session is left untouched
    /// and `Ok(None)` is returned.
    pub async fn upload_path(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<Option<&AnalysisResult>, ImageError> {
        let image = match ImageData::from_path(path) {
            Ok(image) => image,
            Err(ImageError::NotAnImage(mime)) => {
                log::debug!("Ignoring non-image file ({mime})");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        Ok(self.upload(image).await)
    }

    /// Rates `image`, replacing any previous image, analysis and chat.
    pub async fn upload(&mut self, image: ImageData) -> Option<&AnalysisResult> {
        let ticket = self.session.upload(image);
        let outcome = self.client.analyze(ticket.image()).await;
        self.session.finish_analysis(ticket, outcome);
        self.session.analysis()
    }

    /// Sends a follow-up message and returns the assistant's reply.
    ///
    /// Returns `None` when the message was not sent (blank input or no analysed image).
    pub async fn send(&mut self, input: &str) -> Option<&ChatMessage> {
        let pending = self.session.begin_chat(input)?;
        let outcome = self.client.chat(pending.request()).await;
        self.session.finish_chat(pending, outcome);
        self.session.messages().last()
    }

    pub fn reset(&mut self) {
        self.session.reset();
    }
}
