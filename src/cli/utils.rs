use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::platform::ProfileFields;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(
    output_format: &OutputFormat,
    message: &str,
    error_code: Option<&str>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// Output the signed-in user, if any
pub fn output_current_user(
    output_format: &OutputFormat,
    user: Option<(&str, Value)>,
) -> anyhow::Result<()> {
    match (output_format, user) {
        (OutputFormat::Json, Some((_, details))) => {
            println!("{}", serde_json::to_string_pretty(&json!({ "current_user": details }))?);
        }
        (OutputFormat::Json, None) => {
            println!("{}", serde_json::to_string_pretty(&json!({ "current_user": null }))?);
        }
        (OutputFormat::Text, Some((name, details))) => {
            println!("Signed in as: {}", name);
            if let Some(id) = details.get("id").and_then(Value::as_str) {
                println!("User ID: {}", id);
            }
            if let Some(expires_at) = details.get("expires_at").and_then(Value::as_i64) {
                println!("Expires at: {}", expires_at);
            }
        }
        (OutputFormat::Text, None) => {
            println!("Not signed in");
        }
    }
    Ok(())
}

/// Output profile fields with the resolved avatar URL
pub fn output_profile(
    output_format: &OutputFormat,
    email: Option<&str>,
    fields: &ProfileFields,
    avatar_src: &str,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "email": email,
                    "profile": fields,
                    "avatar_src": avatar_src,
                }))?
            );
        }
        OutputFormat::Text => {
            let show = |value: &Option<String>| value.clone().unwrap_or_default();
            println!("Email: {}", email.unwrap_or_default());
            println!("Username: {}", show(&fields.username));
            println!("Full Name: {}", show(&fields.full_name));
            println!("Website: {}", show(&fields.website));
            println!("Avatar: {}", avatar_src);
        }
    }
    Ok(())
}
