use clap::Parser;
use profile_sync::cli::{Cli, ReportedError};
use profile_sync::config::AppConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so PLATFORM_URL and PLATFORM_ANON_KEY can live there
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Starting account CLI in {:?} mode", config.environment);

    if let Err(e) = profile_sync::cli::run(cli, config).await {
        if e.is::<ReportedError>() {
            std::process::exit(1);
        }
        match std::env::var("CLI_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => eprintln!("Error: {e:?}"),
            _ => eprintln!("Error: {e}"),
        }
        std::process::exit(1);
    }

    Ok(())
}
