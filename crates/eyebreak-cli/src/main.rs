use clap::{Parser, Subcommand};

mod commands;
mod notify;

#[derive(Parser)]
#[command(name = "eyebreak", version, about = "Eyebreak 20-20-20 timer CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a foreground timer session
    Run {
        /// Delay the first tick by this many seconds
        #[arg(long)]
        delay: Option<u64>,
    },
    /// Print the initial timer state as JSON
    Status,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("eyebreak=info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run { delay } => commands::run::run(delay).await,
        Commands::Status => commands::status::run(),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
