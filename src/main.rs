mod cli;

use clap::Parser;
use gqlfuzz::errors::FuzzError;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(!cli.no_color)
            .init();
    }

    let result = match cli.command {
        cli::Commands::Fuzz(args) => cli::fuzz::handle_fuzz(args).await,
        cli::Commands::Single(args) => cli::fuzz::handle_single(args).await,
        cli::Commands::Idor(args) => cli::fuzz::handle_idor(args).await,
        cli::Commands::Graph(args) => cli::graph::handle_graph(args).await,
        cli::Commands::Validate(args) => handle_validate(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        let exit_code = match e.downcast_ref::<FuzzError>() {
            Some(FuzzError::Config(_)) => 2,
            Some(FuzzError::Schema(_)) => 3,
            Some(FuzzError::Network(_) | FuzzError::Timeout(_)) => 4,
            _ => 1,
        };
        std::process::exit(exit_code);
    }
}

async fn handle_validate(args: cli::commands::ValidateArgs) -> anyhow::Result<()> {
    let path = std::path::PathBuf::from(&args.config);
    let _config = gqlfuzz::config::parse_config(&path).await?;
    println!("Configuration is valid: {}", args.config);
    Ok(())
}
