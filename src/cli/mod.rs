pub mod commands;
pub mod config;
pub mod utils;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::ViewError;
use crate::platform::{AuthProvider, FileSessionStore, Platform, PlatformClient, Session};

#[derive(Parser)]
#[command(name = "account")]
#[command(about = "Account CLI - sign in with a magic link and manage your profile")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Passwordless sign-in and session management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "View and edit your profile")]
    Profile {
        #[command(subcommand)]
        cmd: commands::profile::ProfileCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Everything a command needs, assembled once per invocation
pub struct AppContext {
    pub config: AppConfig,
    pub client: Arc<PlatformClient>,
    pub platform: Platform,
}

impl AppContext {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let sessions = Arc::new(FileSessionStore::new(config::session_file()?));
        let client = Arc::new(PlatformClient::new(&config, sessions)?);
        let platform = Platform::from_client(client.clone());

        Ok(Self {
            config,
            client,
            platform,
        })
    }
}

/// Which view the host should show
#[derive(Debug)]
pub enum Gate {
    Profile(Session),
    Login,
}

impl Gate {
    pub async fn resolve(auth: &dyn AuthProvider) -> Result<Self, ViewError> {
        Ok(match auth.get_session().await? {
            Some(session) => Gate::Profile(session),
            None => Gate::Login,
        })
    }

    /// The session, or the same failure a view reports without one
    pub fn require_session(self) -> Result<Session, ViewError> {
        match self {
            Gate::Profile(session) => Ok(session),
            Gate::Login => Err(ViewError::Unauthenticated),
        }
    }
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let ctx = AppContext::new(config)?;

    let result = match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, &ctx, output_format.clone()).await,
        Commands::Profile { cmd } => commands::profile::handle(cmd, &ctx, output_format.clone()).await,
    };

    report_failure(result, &output_format)
}

/// A failure that has already been written to stdout as JSON
#[derive(Debug, thiserror::Error)]
#[error("error already reported")]
pub struct ReportedError;

/// In JSON mode failures go to stdout once, and the caller only sets the exit code
fn report_failure(result: anyhow::Result<()>, output_format: &OutputFormat) -> anyhow::Result<()> {
    match (result, output_format) {
        (Err(err), OutputFormat::Json) => {
            let code = err.downcast_ref::<ViewError>().map(ViewError::error_code);
            utils::output_error(output_format, &err.to_string(), code)?;
            Err(ReportedError.into())
        }
        (result, _) => result,
    }
}
