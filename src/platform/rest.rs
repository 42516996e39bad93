use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::Method;
use uuid::Uuid;

use crate::error::PlatformError;
use crate::platform::client::PlatformClient;
use crate::platform::models::profile::PROFILE_COLUMNS;
use crate::platform::models::{ProfileFields, ProfileUpdate};
use crate::platform::RecordStore;

/// Asks the REST layer for a bare object; zero (or many) rows answers 406
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Upsert on conflict, don't echo the row back
const UPSERT_PREFERENCE: &str = "resolution=merge-duplicates,return=minimal";

/// Unique key column of the profile table
pub const PROFILE_KEY_COLUMN: &str = "userID";

impl PlatformClient {
    fn table_endpoint(&self) -> String {
        self.endpoint(&format!("rest/v1/{}", self.profile_table))
    }
}

#[async_trait]
impl RecordStore for PlatformClient {
    async fn fetch_profile(&self, user_id: Uuid) -> Result<ProfileFields, PlatformError> {
        let token = self.access_token().await?;
        let builder = self
            .request(Method::GET, self.table_endpoint(), token.as_deref())
            .header(ACCEPT, HeaderValue::from_static(SINGLE_OBJECT))
            .query(&[
                ("select", PROFILE_COLUMNS.to_string()),
                (PROFILE_KEY_COLUMN, format!("eq.{user_id}")),
            ]);

        self.send_json(builder).await
    }

    async fn upsert_profile(&self, update: &ProfileUpdate) -> Result<(), PlatformError> {
        let token = self.access_token().await?;
        let builder = self
            .request(Method::POST, self.table_endpoint(), token.as_deref())
            .header("Prefer", UPSERT_PREFERENCE)
            .query(&[("on_conflict", PROFILE_KEY_COLUMN)])
            .json(update);

        self.send(builder).await?;
        Ok(())
    }
}
