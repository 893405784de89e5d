use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use relaybot::chat::{ChatSurface, SlackChat};
use relaybot::config::Config;
use relaybot::dedup::DedupGuard;
use relaybot::llm::{CompletionClient, OpenAiClient};
use relaybot::relay::{ConversationManager, TurnOptions};
use relaybot::server::{start_server, WebhookState};
use relaybot::store::{ContextStore, MemoryStore};

#[derive(Parser, Debug)]
#[command(
    name = "relaybot",
    version,
    about = "Streams completion replies into chat threads"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the webhook server.
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to bind the webhook server to.
    #[arg(long, env = "LISTEN_ADDR")]
    listen_addr: Option<SocketAddr>,

    /// Database file for durable context (in-memory store when unset).
    #[arg(long, env = "STORE_PATH")]
    store_path: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(args).await,
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    init_tracing(args.log_format);

    let mut config = Config::from_env()?;
    if let Some(addr) = args.listen_addr {
        config.server.listen_addr = addr;
    }
    if args.store_path.is_some() {
        config.store.path = args.store_path;
    }

    let store = build_store(&config).await?;
    let chat: Arc<dyn ChatSurface> = Arc::new(SlackChat::new(config.slack.clone())?);
    let llm: Arc<dyn CompletionClient> = Arc::new(OpenAiClient::new(config.openai.clone())?);

    let options = TurnOptions::from_config(&config);
    let manager = Arc::new(ConversationManager::new(
        Arc::clone(&store),
        chat,
        llm,
        options,
    ));
    let dedup = DedupGuard::new(store, config.store.context_ttl);
    let state = Arc::new(WebhookState { manager, dedup });

    let addr = start_server(config.server.listen_addr, state).await?;
    tracing::info!(%addr, model = %config.openai.model, "relaybot ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Ctrl+C received, shutting down...");
    Ok(())
}

#[cfg(feature = "libsql")]
async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn ContextStore>> {
    use relaybot::store::LibSqlStore;

    match &config.store.path {
        Some(path) => {
            tracing::info!(path = %path.display(), "using libsql context store");
            Ok(Arc::new(LibSqlStore::new_local(path).await?))
        }
        None => {
            tracing::info!("using in-memory context store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[cfg(not(feature = "libsql"))]
async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn ContextStore>> {
    if config.store.path.is_some() {
        anyhow::bail!("STORE_PATH is set but this build does not include the libsql feature");
    }
    tracing::info!("using in-memory context store");
    Ok(Arc::new(MemoryStore::new()))
}
