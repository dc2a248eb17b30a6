#![allow(dead_code)]

use performative::{Gateway, GatewayConfig, ImageData, ModelRequest, ModelResponse, VisionModel, router};
use std::sync::{Arc, Mutex};

#[derive(Debug, thiserror::Error)]
#[error("upstream unavailable")]
pub struct Unavailable;

/// Model double that answers every request with the same text, or fails.
#[derive(Clone)]
pub struct ScriptedModel {
    reply: Option<String>,
    requests: Arc<Mutex<Vec<ModelRequest>>>,
}

impl ScriptedModel {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            requests: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            requests: Arc::default(),
        }
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl VisionModel for ScriptedModel {
    type Error = Unavailable;

    async fn generate(&self, request: ModelRequest) -> Result<ModelResponse, Self::Error> {
        self.requests.lock().unwrap().push(request);
        match &self.reply {
            Some(text) => Ok(ModelResponse { text: text.clone() }),
            None => Err(Unavailable),
        }
    }
}

pub fn test_image() -> ImageData {
    ImageData::from_bytes("image/png", vec![0x89, b'P', b'N', b'G', 1, 2, 3, 4]).unwrap()
}

/// Serves the gateway on an ephemeral loopback port and returns its base URL.
pub async fn spawn_gateway(model: ScriptedModel, config: GatewayConfig) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(Arc::new(Gateway::new(model, config)));
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
}
