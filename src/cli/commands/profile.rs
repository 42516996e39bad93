use std::path::PathBuf;

use anyhow::Context;
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::{AppContext, Gate, OutputFormat};
use crate::platform::PendingImage;
use crate::views::ProfileView;

#[derive(Subcommand)]
pub enum ProfileCommands {
    #[command(about = "Show your profile")]
    Show,

    #[command(about = "Edit profile fields and optionally upload a new avatar")]
    Update {
        #[arg(long, help = "New username")]
        username: Option<String>,
        #[arg(long, help = "New full name")]
        full_name: Option<String>,
        #[arg(long, help = "New website")]
        website: Option<String>,
        #[arg(long, help = "Image file to upload as the avatar")]
        avatar: Option<PathBuf>,
    },

    #[command(about = "Sign out")]
    SignOut,
}

/// Mount the profile view for the current session and load it
async fn mount(ctx: &AppContext) -> anyhow::Result<(ProfileView, Option<String>)> {
    let session = Gate::resolve(ctx.platform.auth.as_ref()).await?.require_session()?;
    let mut view = ProfileView::new(ctx.platform.clone(), ctx.config.platform.avatar_bucket.clone());
    view.activate(&session).await?;
    Ok((view, session.user.email))
}

pub async fn handle(cmd: ProfileCommands, ctx: &AppContext, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ProfileCommands::Show => {
            let (view, email) = mount(ctx).await?;
            output_profile(&output_format, email.as_deref(), view.fields(), &view.avatar_src())
        }
        ProfileCommands::Update {
            username,
            full_name,
            website,
            avatar,
        } => {
            let (mut view, email) = mount(ctx).await?;

            if let Some(username) = username {
                view.set_username(username);
            }
            if let Some(full_name) = full_name {
                view.set_full_name(full_name);
            }
            if let Some(website) = website {
                view.set_website(website);
            }

            // Upload first; the new path only sticks once the save below succeeds
            if let Some(path) = avatar {
                let image = PendingImage::from_path(&path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?;
                view.select_image(Some(image));
                view.upload_avatar().await?;
            }

            view.save().await?;

            match output_format {
                OutputFormat::Json => output_success(
                    &output_format,
                    "Profile updated",
                    Some(json!({ "profile": view.fields(), "avatar_src": view.avatar_src() })),
                ),
                OutputFormat::Text => {
                    output_success(&output_format, "Profile updated", None)?;
                    output_profile(&output_format, email.as_deref(), view.fields(), &view.avatar_src())
                }
            }
        }
        ProfileCommands::SignOut => {
            let session = Gate::resolve(ctx.platform.auth.as_ref()).await?.require_session()?;
            let view = ProfileView::new(ctx.platform.clone(), ctx.config.platform.avatar_bucket.clone());
            view.sign_out().await?;
            output_success(
                &output_format,
                "Signed out",
                Some(json!({ "user_id": session.user.id })),
            )
        }
    }
}
