use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use tracing::warn;
use url::Url;

pub const DEFAULT_PROFILE_TABLE: &str = "profiles";
pub const DEFAULT_AVATAR_BUCKET: &str = "avatars";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid platform URL '{value}': {source}")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub platform: PlatformConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Where the hosted platform lives and which table/bucket hold profile data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub url: Url,
    pub anon_key: String,
    pub profile_table: String,
    pub avatar_bucket: String,
    /// Where magic links should send the user back to
    pub redirect_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when RUST_LOG is unset
    pub default_filter: String,
}

impl PlatformConfig {
    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.url.as_str().trim_end_matches('/')
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup (env in production, a map in tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let raw_url = lookup("PLATFORM_URL").ok_or(ConfigError::Missing("PLATFORM_URL"))?;
        let url = Url::parse(&raw_url).map_err(|source| ConfigError::InvalidUrl {
            value: raw_url.clone(),
            source,
        })?;
        let anon_key = lookup("PLATFORM_ANON_KEY").ok_or(ConfigError::Missing("PLATFORM_ANON_KEY"))?;

        let platform = PlatformConfig {
            url,
            anon_key,
            profile_table: DEFAULT_PROFILE_TABLE.to_string(),
            avatar_bucket: DEFAULT_AVATAR_BUCKET.to_string(),
            redirect_url: None,
        };

        Ok(Self::defaults(environment, platform).with_overrides(lookup))
    }

    fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Platform overrides
        if let Some(v) = lookup("PLATFORM_PROFILE_TABLE") {
            self.platform.profile_table = v;
        }
        if let Some(v) = lookup("PLATFORM_AVATAR_BUCKET") {
            self.platform.avatar_bucket = v;
        }
        if let Some(v) = lookup("PLATFORM_REDIRECT_URL") {
            self.platform.redirect_url = Some(v).filter(|s| !s.is_empty());
        }

        // HTTP overrides
        if let Some(v) = lookup("PLATFORM_REQUEST_TIMEOUT_SECS") {
            match v.parse() {
                Ok(secs) => self.http.request_timeout_secs = secs,
                Err(_) => warn!(
                    value = %v,
                    default = self.http.request_timeout_secs,
                    "ignoring invalid PLATFORM_REQUEST_TIMEOUT_SECS"
                ),
            }
        }
        if let Some(v) = lookup("PLATFORM_USER_AGENT") {
            self.http.user_agent = v;
        }

        if let Some(v) = lookup("LOG_DEFAULT_FILTER") {
            self.logging.default_filter = v;
        }

        self
    }

    fn defaults(environment: Environment, platform: PlatformConfig) -> Self {
        let user_agent = format!("profile-sync/{}", env!("CARGO_PKG_VERSION"));

        let (request_timeout_secs, default_filter) = match environment {
            Environment::Development => (30, "profile_sync=debug,info"),
            Environment::Staging => (15, "profile_sync=info,warn"),
            Environment::Production => (10, "warn"),
        };

        Self {
            environment,
            platform,
            http: HttpConfig {
                request_timeout_secs,
                user_agent,
            },
            logging: LoggingConfig {
                default_filter: default_filter.to_string(),
            },
        }
    }
}
