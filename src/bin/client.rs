use argh::FromArgs;
use performative::{Analyzer, ApiClient, SessionState};
use std::{io::Write, path::PathBuf, time::Duration};
use tokio::io::{AsyncBufReadExt, BufReader};

// defaults for the client
const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 90;

const BASE_URL_VAR: &str = "PERFORMATIVE_API_URL";

fn default_base_url() -> String {
    std::env::var(BASE_URL_VAR).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

#[derive(FromArgs)]
/// Client for rating images and chatting about them
struct ClientArgs {
    /// the gateway base URL
    #[argh(option, short = 'u', default = "default_base_url()")]
    base_url: String,

    /// seconds to wait for each gateway call
    #[argh(option, default = "DEFAULT_TIMEOUT_SECS")]
    timeout_secs: u64,

    /// command to execute: "analyze" or "chat"
    #[argh(subcommand)]
    command: ClientCommands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum ClientCommands {
    Analyze(AnalyzeCommand),
    Chat(ChatCommand),
}

#[derive(FromArgs)]
/// Rate a single image
#[argh(subcommand, name = "analyze")]
struct AnalyzeCommand {
    /// the path to the image
    #[argh(option, short = 'i')]
    image_path: PathBuf,
}

#[derive(FromArgs)]
/// Rate an image, then chat about it (/image <path>, /reset, /quit)
#[argh(subcommand, name = "chat")]
struct ChatCommand {
    /// the path to the image
    #[argh(option, short = 'i')]
    image_path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::init();
    let args: ClientArgs = argh::from_env();

    let client = ApiClient::new(&args.base_url, Duration::from_secs(args.timeout_secs))?;
    let mut analyzer = Analyzer::new(client);

    match args.command {
        ClientCommands::Analyze(command) => {
            if let Some(result) = analyzer.upload_path(&command.image_path).await? {
                println!("{result}");
            }
        }
        ClientCommands::Chat(command) => {
            if let Some(result) = analyzer.upload_path(&command.image_path).await? {
                println!("{result}\n");
            }
            chat_loop(&mut analyzer).await?;
        }
    }

    Ok(())
}

async fn chat_loop(analyzer: &mut Analyzer) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{}> ", analyzer.session().state().as_str());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        if line == "/quit" {
            break;
        } else if line == "/reset" {
            analyzer.reset();
        } else if let Some(path) = line.strip_prefix("/image ") {
            if let Some(result) = analyzer.upload_path(path.trim()).await? {
                println!("{result}\n");
            }
        } else if let Some(reply) = analyzer.send(line).await {
            println!("{}\n", reply.display_content());
        } else if matches!(analyzer.session().state(), SessionState::Empty) && !line.is_empty() {
            println!("Upload an image first with /image <path>");
        }
    }

    Ok(())
}
