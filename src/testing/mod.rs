use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::PlatformError;
use crate::platform::{
    AuthProvider, ObjectStore, PendingImage, Platform, ProfileFields, ProfileUpdate, RecordStore,
    Session, StoredObject, User,
};
use crate::views::LoadingFlag;

pub const PUBLIC_BASE: &str = "https://demo.example.co/storage/v1/object/public";

/// Every call the fake received, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetSession,
    SignInWithOtp(String),
    SignOut,
    FetchProfile(Uuid),
    UpsertProfile(ProfileUpdate),
    Upload { bucket: String, key: String },
}

#[derive(Default)]
struct State {
    session: Option<Session>,
    rows: HashMap<Uuid, ProfileFields>,
    objects: HashMap<String, Vec<u8>>,
    calls: Vec<Call>,
    fail_with: Option<(u16, String)>,
    fail_only: Option<fn(&Call) -> bool>,
    watched_flag: Option<LoadingFlag>,
    flag_seen: Vec<bool>,
}

/// In-memory stand-in for all three platform services
#[derive(Clone, Default)]
pub struct FakePlatform {
    state: Arc<Mutex<State>>,
}

pub fn sample_session() -> Session {
    Session {
        access_token: format!("access-{}", Uuid::new_v4()),
        refresh_token: "refresh".into(),
        token_type: "bearer".into(),
        expires_at: None,
        user: User {
            id: Uuid::new_v4(),
            email: Some("someone@example.com".into()),
        },
    }
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in() -> (Self, Session) {
        let fake = Self::new();
        let session = sample_session();
        fake.set_session(Some(session.clone()));
        (fake, session)
    }

    pub fn platform(&self) -> Platform {
        let shared = Arc::new(self.clone());
        Platform::new(shared.clone(), shared.clone(), shared)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn set_session(&self, session: Option<Session>) {
        self.state().session = session;
    }

    pub fn insert_row(&self, user_id: Uuid, fields: ProfileFields) {
        self.state().rows.insert(user_id, fields);
    }

    pub fn row(&self, user_id: Uuid) -> Option<ProfileFields> {
        self.state().rows.get(&user_id).cloned()
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.state().objects.get(key).cloned()
    }

    /// Make every subsequent call fail with this status and message
    pub fn fail_with(&self, status: u16, message: &str) {
        let mut state = self.state();
        state.fail_with = Some((status, message.to_string()));
        state.fail_only = None;
    }

    /// Like [`fail_with`](Self::fail_with) but only for calls matching `only`
    pub fn fail_when(&self, only: fn(&Call) -> bool, status: u16, message: &str) {
        let mut state = self.state();
        state.fail_with = Some((status, message.to_string()));
        state.fail_only = Some(only);
    }

    /// Record the flag's value whenever a service is called
    pub fn watch(&self, flag: LoadingFlag) {
        self.state().watched_flag = Some(flag);
    }

    pub fn flag_seen(&self) -> Vec<bool> {
        self.state().flag_seen.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn upserts(&self) -> Vec<ProfileUpdate> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::UpsertProfile(update) => Some(update),
                _ => None,
            })
            .collect()
    }

    fn enter(&self, call: Call) -> Result<(), PlatformError> {
        let mut state = self.state();
        let selected = state.fail_only.map_or(true, |only| only(&call));
        state.calls.push(call);
        if let Some(flag) = state.watched_flag.clone() {
            state.flag_seen.push(flag.is_set());
        }
        match &state.fail_with {
            Some((status, message)) if selected => Err(PlatformError::Api {
                status: *status,
                code: None,
                message: message.clone(),
                description: None,
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl AuthProvider for FakePlatform {
    async fn get_session(&self) -> Result<Option<Session>, PlatformError> {
        let session = self.state().session.clone();
        self.enter(Call::GetSession)?;
        Ok(session)
    }

    async fn sign_in_with_otp(&self, email: &str) -> Result<(), PlatformError> {
        self.enter(Call::SignInWithOtp(email.to_string()))
    }

    async fn sign_out(&self) -> Result<(), PlatformError> {
        self.enter(Call::SignOut)?;
        self.state().session = None;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FakePlatform {
    async fn fetch_profile(&self, user_id: Uuid) -> Result<ProfileFields, PlatformError> {
        self.enter(Call::FetchProfile(user_id))?;
        self.row(user_id).ok_or_else(|| PlatformError::Api {
            status: 406,
            code: Some("PGRST116".into()),
            message: "JSON object requested, multiple (or no) rows returned".into(),
            description: None,
        })
    }

    async fn upsert_profile(&self, update: &ProfileUpdate) -> Result<(), PlatformError> {
        self.enter(Call::UpsertProfile(update.clone()))?;
        self.insert_row(update.user_id, update.fields());
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for FakePlatform {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        image: &PendingImage,
    ) -> Result<StoredObject, PlatformError> {
        self.enter(Call::Upload {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })?;
        self.state()
            .objects
            .insert(format!("{bucket}/{key}"), image.bytes.clone());
        Ok(StoredObject {
            path: key.to_string(),
            full_path: Some(format!("{bucket}/{key}")),
        })
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{PUBLIC_BASE}/{bucket}/{path}")
    }
}
