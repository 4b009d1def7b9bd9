mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "browserpilot")]
#[command(about = "An LLM-driven browser automation agent", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Talk to the agent (interactive mode if no message is given)
    Chat {
        /// Message to send
        #[arg(short, long)]
        message: Option<String>,

        /// Conversation id
        #[arg(short, long, default_value = "default")]
        session: String,
    },

    /// Start the HTTP gateway (long-running daemon)
    Gateway {
        /// Port to listen on (overrides config gateway.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides config gateway.host)
        #[arg(long)]
        host: Option<String>,
    },

    /// Write a default configuration file
    Onboard {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// List the action catalog
    Actions,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    match cli.command {
        Commands::Chat { message, session } => commands::chat::run(message, session).await,
        Commands::Gateway { port, host } => commands::gateway::run(port, host).await,
        Commands::Onboard { force } => commands::onboard::run(force),
        Commands::Actions => commands::actions_cmd::run(),
    }
}
