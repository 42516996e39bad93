#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use uuid::Uuid;
use wiremock::MockServer;

use profile_sync::config::AppConfig;
use profile_sync::platform::{MemorySessionStore, Platform, PlatformClient, Session, SessionStore, User};

pub const ANON_KEY: &str = "anon-test-key";

/// A mock platform plus a client pointed at it
pub struct Harness {
    pub server: MockServer,
    pub client: Arc<PlatformClient>,
    pub sessions: Arc<MemorySessionStore>,
}

impl Harness {
    pub async fn start() -> Result<Self> {
        Self::start_with(&[]).await
    }

    /// Start with extra config entries on top of the platform URL and key
    pub async fn start_with(extra: &[(&str, &str)]) -> Result<Self> {
        let server = MockServer::start().await;
        let url = server.uri();
        let extra: Vec<(String, String)> = extra
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let config = AppConfig::from_lookup(|key| match key {
            "PLATFORM_URL" => Some(url.clone()),
            "PLATFORM_ANON_KEY" => Some(ANON_KEY.to_string()),
            other => extra.iter().find(|(k, _)| k == other).map(|(_, v)| v.clone()),
        })?;

        let sessions = Arc::new(MemorySessionStore::new());
        let client = Arc::new(PlatformClient::new(&config, sessions.clone())?);

        Ok(Self {
            server,
            client,
            sessions,
        })
    }

    pub fn platform(&self) -> Platform {
        Platform::from_client(self.client.clone())
    }

    /// Store a valid session and return it
    pub fn sign_in(&self) -> Session {
        let session = session(Some(Utc::now().timestamp() + 3600));
        self.sessions.save(&session).expect("memory store never fails");
        session
    }
}

pub fn session(expires_at: Option<i64>) -> Session {
    Session {
        access_token: format!("access-{}", Uuid::new_v4().simple()),
        refresh_token: format!("refresh-{}", Uuid::new_v4().simple()),
        token_type: "bearer".to_string(),
        expires_at,
        user: User {
            id: Uuid::new_v4(),
            email: Some("someone@example.com".to_string()),
        },
    }
}

/// Access token shaped like the auth service's, signed with a throwaway secret
pub fn access_token(sub: Uuid, email: &str, exp: i64) -> String {
    encode(
        &Header::default(),
        &json!({ "sub": sub, "email": email, "exp": exp, "aud": "authenticated", "role": "authenticated" }),
        &EncodingKey::from_secret(b"test-secret"),
    )
    .expect("encoding a test token")
}

/// Token grant body as returned by verify/refresh
pub fn token_body(access_token: &str, refresh_token: &str, user_id: Uuid) -> serde_json::Value {
    json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": refresh_token,
        "user": {
            "id": user_id,
            "aud": "authenticated",
            "role": "authenticated",
            "email": "someone@example.com"
        }
    })
}
