use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::{AppContext, Gate, OutputFormat};
use crate::platform::Session;
use crate::views::LoginView;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Email a magic sign-in link")]
    Login {
        #[arg(help = "Email address")]
        email: String,
    },

    #[command(about = "Sign in with the one-time code from the email")]
    Verify {
        #[arg(help = "Email address the code was sent to")]
        email: String,
        #[arg(help = "One-time code")]
        code: String,
    },

    #[command(about = "Sign in with the URL the magic link redirected to")]
    Callback {
        #[arg(help = "Full redirect URL including the #fragment")]
        url: String,
    },

    #[command(about = "Show current authentication status")]
    Status,
}

fn session_details(session: &Session) -> serde_json::Value {
    json!({
        "id": session.user.id,
        "email": session.user.email,
        "expires_at": session.expires_at,
    })
}

fn display_name(session: &Session) -> String {
    session
        .user
        .email
        .clone()
        .unwrap_or_else(|| session.user.id.to_string())
}

pub async fn handle(cmd: AuthCommands, ctx: &AppContext, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login { email } => {
            if let Gate::Profile(session) = Gate::resolve(ctx.platform.auth.as_ref()).await? {
                return output_success(
                    &output_format,
                    &format!("Already signed in as {}", display_name(&session)),
                    Some(json!({ "user": session_details(&session) })),
                );
            }

            let mut view = LoginView::new(ctx.platform.auth.clone());
            view.set_email(email);
            let notice = view.submit().await?;
            output_success(&output_format, notice.message(), None)
        }
        AuthCommands::Verify { email, code } => {
            let session = ctx.client.verify_otp(&email, &code).await?;
            output_success(
                &output_format,
                &format!("Signed in as {}", display_name(&session)),
                Some(json!({ "user": session_details(&session) })),
            )
        }
        AuthCommands::Callback { url } => {
            let session = ctx.client.session_from_redirect(&url).await?;
            output_success(
                &output_format,
                &format!("Signed in as {}", display_name(&session)),
                Some(json!({ "user": session_details(&session) })),
            )
        }
        AuthCommands::Status => match Gate::resolve(ctx.platform.auth.as_ref()).await? {
            Gate::Profile(session) => {
                let name = display_name(&session);
                output_current_user(&output_format, Some((name.as_str(), session_details(&session))))
            }
            Gate::Login => output_current_user(&output_format, None),
        },
    }
}
