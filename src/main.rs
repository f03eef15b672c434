use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use paperchat_core::{ApiClient, Config, FileTokenStore, TokenStore};

mod app;
mod cli;
mod handler;
mod input;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "paperchat")]
#[command(version, about = "Chat with your research papers from the terminal")]
struct Cli {
    /// Backend base URL (overrides config and PAPERCHAT_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive interface (default)
    Tui,
    /// Log in and store the session token
    Login {
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Create an account
    Register,
    /// Forget the stored session token
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List uploaded documents
    Documents,
    /// Upload a PDF (or an image with --image)
    Upload {
        path: PathBuf,
        #[arg(long)]
        image: bool,
    },
    /// Download a document
    Download {
        id: String,
        /// Directory to save into
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Delete a document
    Delete {
        id: String,
        #[arg(short, long)]
        yes: bool,
    },
    /// Ask a question about a document
    Ask {
        question: String,
        /// Document id to ask about
        #[arg(short, long)]
        document: String,
        #[arg(short, long)]
        model: Option<String>,
        /// concise, technical or casual
        #[arg(short, long)]
        style: Option<String>,
    },
    /// Print the chat history
    History {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Delete the chat history
    ClearHistory {
        #[arg(short, long)]
        yes: bool,
    },
    /// Summarize a document
    Summary {
        id: String,
        #[arg(short, long)]
        regenerate: bool,
        /// Also write the summary to the download directory
        #[arg(short, long)]
        export: bool,
    },
    /// Show the knowledge graph of a document
    Graph { id: String },
    /// Questions asked per model
    Stats,
    /// Create a shareable link for an answer
    Share { text: String },
    /// Open a shared answer
    Shared { token: String },
    /// Transcribe an audio file, or record from the microphone
    Transcribe {
        file: Option<PathBuf>,
        /// Seconds to record when no file is given
        #[arg(short, long, default_value = "5")]
        seconds: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Tui);
    let interactive = matches!(command, Commands::Tui);

    let _log_guard = logging::init_tracing(!interactive);

    let mut config = Config::load()?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::open(Config::token_path()?));
    let api = ApiClient::from_config(&config, tokens)?;
    tracing::info!("Using backend {}", api.base_url());

    let ctx = cli::Context::new(config, api);

    match command {
        Commands::Tui => run_tui(ctx).await?,
        Commands::Login { email } => cli::login(&ctx, email).await?,
        Commands::Register => cli::register(&ctx).await?,
        Commands::Logout => cli::logout(&ctx),
        Commands::Whoami => cli::whoami(&ctx).await?,
        Commands::Documents => cli::documents(&ctx).await?,
        Commands::Upload { path, image } => cli::upload(&ctx, &path, image).await?,
        Commands::Download { id, out } => cli::download(&ctx, &id, out).await?,
        Commands::Delete { id, yes } => cli::delete(&ctx, &id, yes).await?,
        Commands::Ask { question, document, model, style } => {
            cli::ask(&ctx, &question, &document, model, style).await?
        }
        Commands::History { limit } => cli::history(&ctx, limit).await?,
        Commands::ClearHistory { yes } => cli::clear_history(&ctx, yes).await?,
        Commands::Summary { id, regenerate, export } => {
            cli::summary(&ctx, &id, regenerate, export).await?
        }
        Commands::Graph { id } => cli::graph(&ctx, &id).await?,
        Commands::Stats => cli::stats(&ctx).await?,
        Commands::Share { text } => cli::share(&ctx, &text).await?,
        Commands::Shared { token } => cli::shared(&ctx, &token).await?,
        Commands::Transcribe { file, seconds } => cli::transcribe(&ctx, file, seconds).await?,
    }

    Ok(())
}

async fn run_tui(ctx: cli::Context) -> Result<()> {
    let cli::Context { config, api, auth } = ctx;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new(config, api, auth, events.sender());

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event)?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    app.chat.flush().await;
    result
}
