use argh::FromArgs;
use performative::{
    Gateway, GatewayConfig, GeminiConfig, GeminiModel,
    gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL},
    router,
};
use std::{sync::Arc, time::Duration};

// defaults for the server
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_IMAGE_MB: usize = 10;

const API_KEY_VAR: &str = "GENAI_API_KEY";

#[derive(FromArgs)]
/// Rates how performative an image looks using a hosted multimodal model.
struct GatewayArgs {
    /// the host to run the server on
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to run the server on
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// the upstream model name
    #[argh(option, short = 'm', default = "DEFAULT_MODEL.to_string()")]
    model: String,

    /// the upstream API base URL
    #[argh(option, default = "DEFAULT_BASE_URL.to_string()")]
    api_base: String,

    /// seconds to wait for the upstream model before giving up
    #[argh(option, default = "DEFAULT_TIMEOUT_SECS")]
    timeout_secs: u64,

    /// largest accepted image in megabytes
    #[argh(option, default = "DEFAULT_MAX_IMAGE_MB")]
    max_image_mb: usize,

    /// an origin allowed to call the API from a browser, may be repeated
    #[argh(option)]
    allow_origin: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args: GatewayArgs = argh::from_env();

    let api_key = std::env::var(API_KEY_VAR).map_err(|_| format!("{API_KEY_VAR} is not set"))?;

    let mut model_config = GeminiConfig::new(api_key);
    model_config.model = args.model;
    model_config.base_url = args.api_base;
    model_config.timeout = Duration::from_secs(args.timeout_secs);
    let model = GeminiModel::new(model_config)?;

    let mut config = GatewayConfig {
        max_image_bytes: args.max_image_mb * 1024 * 1024,
        ..Default::default()
    };
    if !args.allow_origin.is_empty() {
        config.allowed_origins = args.allow_origin;
    }

    log::info!("🧠 Upstream model: {}", model.endpoint());
    log::info!("🌐 Allowed origins: {}", config.allowed_origins.join(", "));

    let app = router(Arc::new(Gateway::new(model, config)));

    // format the host and port
    let addr = format!("{}:{}", args.host, args.port);

    log::info!("🚀 Starting the gateway");
    log::info!("🔥 Listening on: {}", addr);
    log::info!("🔧 Press Ctrl+C to stop the server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("Shutting down");
        })
        .await?;

    Ok(())
}
