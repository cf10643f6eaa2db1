use anyhow::Result;
use clap::{Parser, Subcommand};
use radium_cli::transport;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "radium")]
#[command(author, version, about = "Radium - client tools for the Radium LLM server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: platform config dir, radium/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the app mode (chat or deploy) for each navigation path in turn
    Mode {
        /// Paths, e.g. /deploy/abc /chat/1
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Classify an error message and print the suggested fallback
    Classify {
        /// Error message to classify
        message: String,

        /// Fallback model to suggest (default: configured fallback_model)
        #[arg(short, long)]
        fallback: Option<String>,
    },

    /// Send a prompt to the Radium LLM server
    Chat {
        /// Prompt text
        prompt: String,

        /// Model to use (default: configured model)
        #[arg(short, long)]
        model: Option<String>,

        /// Stream the reply as it is generated
        #[arg(long)]
        stream: bool,
    },

    /// List models served by the Radium LLM server
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "radium=debug,radium_cli=debug"
    } else {
        "radium=info,radium_cli=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = transport::cli::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Mode { paths } => transport::cli::run_mode(&config, &paths)?,
        Commands::Classify { message, fallback } => {
            transport::cli::run_classify(&config, &message, fallback.as_deref())?
        }
        Commands::Chat {
            prompt,
            model,
            stream,
        } => transport::cli::run_chat(&config, &prompt, model, stream).await?,
        Commands::Models => transport::cli::run_models(&config).await?,
    }

    Ok(())
}
