use agentic_chat::config::Settings;
use agentic_chat::context::settings_factory;
use agentic_chat::server::{self, AppState};
use agentic_chat::session::SessionStore;
use agentic_chat::ui::PageLabels;
use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "agentic-chat", version, about = "Web-search chat agent served in the browser")]
struct Cli {
    /// Interface to bind the chat UI to
    #[arg(long, env = "CHAT_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port for the chat UI
    #[arg(long, env = "CHAT_PORT", default_value_t = 8501)]
    port: u16,

    /// Debug logging and a colored agent trace on stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "agentic_chat=debug,tower_http=debug"
    } else {
        "agentic_chat=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = Settings::from_env().with_verbose(cli.verbose);
    if settings.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; chat requests will fail");
    }

    let labels = PageLabels::new(&settings.caption);
    let sessions = SessionStore::with_ttl(settings.session_ttl);
    let state = AppState::new(settings_factory(settings), labels).with_sessions(sessions);

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
    server::serve(state, addr).await
}
