//! Typed access to the hosted platform: auth, the relational store and object storage.
//!
//! The views only see the three traits below. [`PlatformClient`] implements all
//! of them over HTTP; tests substitute in-memory fakes.

pub mod auth;
pub mod client;
pub mod models;
pub mod rest;
pub mod session_store;
pub mod storage;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::PlatformError;

pub use client::PlatformClient;
pub use models::{PendingImage, ProfileFields, ProfileUpdate, Session, StoredObject, User};
pub use session_store::{FileSessionStore, MemorySessionStore, SessionStore};

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Current session, if any
    async fn get_session(&self) -> Result<Option<Session>, PlatformError>;

    /// Ask the auth service to email a one-time sign-in link
    async fn sign_in_with_otp(&self, email: &str) -> Result<(), PlatformError>;

    async fn sign_out(&self) -> Result<(), PlatformError>;
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch exactly one profile row. Zero rows is reported as a 406 API error.
    async fn fetch_profile(&self, user_id: Uuid) -> Result<ProfileFields, PlatformError>;

    /// Insert or overwrite the row keyed by `update.user_id`
    async fn upsert_profile(&self, update: &ProfileUpdate) -> Result<(), PlatformError>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        image: &PendingImage,
    ) -> Result<StoredObject, PlatformError>;

    /// Publicly readable URL of an object
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// The three collaborators a view needs, assembled once by the host
#[derive(Clone)]
pub struct Platform {
    pub auth: Arc<dyn AuthProvider>,
    pub records: Arc<dyn RecordStore>,
    pub objects: Arc<dyn ObjectStore>,
}

impl Platform {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        records: Arc<dyn RecordStore>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            auth,
            records,
            objects,
        }
    }

    pub fn from_client(client: Arc<PlatformClient>) -> Self {
        Self {
            auth: client.clone(),
            records: client.clone(),
            objects: client,
        }
    }
}
