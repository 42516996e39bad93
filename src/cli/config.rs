use std::fs;
use std::path::PathBuf;

pub const SESSION_FILE: &str = "session.json";

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("PROFILE_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("profile-sync")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Where the signed-in session is kept between invocations
pub fn session_file() -> anyhow::Result<PathBuf> {
    Ok(get_config_dir()?.join(SESSION_FILE))
}
