use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Columns requested when loading a profile
pub const PROFILE_COLUMNS: &str = "username,full_name,website,avatar_url";

/// The four user-editable profile columns. Every column is nullable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFields {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Upsert payload, keyed by `userID`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(rename = "userID")]
    pub user_id: Uuid,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub website: Option<String>,
    pub avatar_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileUpdate {
    pub fn new(user_id: Uuid, fields: &ProfileFields, updated_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            username: fields.username.clone(),
            full_name: fields.full_name.clone(),
            website: fields.website.clone(),
            avatar_url: fields.avatar_url.clone(),
            updated_at,
        }
    }

    pub fn fields(&self) -> ProfileFields {
        ProfileFields {
            username: self.username.clone(),
            full_name: self.full_name.clone(),
            website: self.website.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}
