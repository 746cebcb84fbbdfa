use agent_market::cli;
use agent_market::config::Config;
use agent_market::gateway;
use agent_market::registry::{SearchFilters, SortOrder};

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "agent-market", version, about = "Local marketplace for AI agents")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP API (default)
    Serve {
        /// Listen address, overriding gateway.addr
        #[arg(long)]
        addr: Option<String>,
    },
    /// Manage agents
    Agent {
        #[command(subcommand)]
        action: AgentAction,
    },
    /// Evaluate a math expression with the calculator tool
    Calc {
        /// Expression (words are joined with spaces)
        #[arg(required = true, num_args = 1..)]
        expression: Vec<String>,
    },
    /// Chat with an agent (interactive unless --message is given)
    Chat {
        /// Agent identifier
        id: String,
        /// Send a single message and exit
        #[arg(short, long)]
        message: Option<String>,
        /// Save the transcript to the chats directory
        #[arg(long)]
        save: bool,
    },
    /// List supported models
    Models,
    /// List available tools
    Tools,
}

#[derive(Subcommand, Debug)]
enum AgentAction {
    /// List agents, optionally searched, filtered and sorted
    List {
        /// Case-insensitive text query
        #[arg(short, long, default_value = "")]
        query: String,
        /// Exact author
        #[arg(long)]
        author: Option<String>,
        /// Exact model id
        #[arg(long)]
        model: Option<String>,
        /// Tool id (repeatable; any match passes)
        #[arg(long = "tool")]
        tools: Vec<String>,
        /// stored, newest, name, name_desc or author
        #[arg(long, default_value = "stored")]
        sort: SortOrder,
    },
    /// Show one agent
    Show {
        /// Agent identifier
        id: String,
    },
    /// Create agents from a JSON file (one object or an array)
    Import {
        file: PathBuf,
    },
    /// Print or write an agent as JSON
    Export {
        /// Agent identifier
        id: String,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete an agent
    Delete {
        /// Agent identifier
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    {
        use tracing_subscriber::layer::SubscriberExt;
        use tracing_subscriber::util::SubscriberInitExt;

        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let cli = Cli::parse();
    let config_path = cli
        .config
        .unwrap_or_else(|| agent_market::market_home().join("config.yaml"));
    let cfg = Config::load_or_default(&config_path)
        .await
        .with_context(|| format!("loading {}", config_path.display()))?;

    match cli.command.unwrap_or(Command::Serve { addr: None }) {
        Command::Serve { addr } => serve(&cfg, addr).await,
        Command::Agent { action } => match action {
            AgentAction::List {
                query,
                author,
                model,
                tools,
                sort,
            } => {
                let filters = SearchFilters { author, model, tools };
                cli::list_agents(&cfg, &query, &filters, sort).await
            }
            AgentAction::Show { id } => cli::show_agent(&cfg, &id).await,
            AgentAction::Import { file } => cli::import_agents(&cfg, &file).await,
            AgentAction::Export { id, output } => {
                cli::export_agent(&cfg, &id, output.as_deref()).await
            }
            AgentAction::Delete { id } => cli::delete_agent(&cfg, &id).await,
        },
        Command::Calc { expression } => {
            cli::calc(&expression.join(" "));
            Ok(())
        }
        Command::Chat { id, message, save } => cli::chat(&cfg, &id, message, save).await,
        Command::Models => {
            cli::list_models(&cfg);
            Ok(())
        }
        Command::Tools => {
            cli::list_tools();
            Ok(())
        }
    }
}

async fn serve(cfg: &Config, addr: Option<String>) -> anyhow::Result<()> {
    cli::init_storage(cfg).await?;

    let addr: std::net::SocketAddr = match addr {
        Some(a) => a.parse().with_context(|| format!("invalid --addr: {a}"))?,
        None => cfg.gateway.socket_addr()?,
    };
    let gw = gateway::start_gateway_with_config(addr, cfg)
        .await
        .with_context(|| format!("binding gateway on {addr}"))?;

    info!(addr = %gw.addr, data_dir = %cfg.storage.data_dir, "agent market ready");
    info!("{}", cfg.provider.api_key_status());

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    gw.handle.abort();
    Ok(())
}
