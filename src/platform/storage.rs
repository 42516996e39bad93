use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::Deserialize;

use crate::error::PlatformError;
use crate::platform::client::PlatformClient;
use crate::platform::models::{PendingImage, StoredObject};
use crate::platform::ObjectStore;

const CACHE_CONTROL: &str = "max-age=3600";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "Key", default)]
    key: Option<String>,
}

#[async_trait]
impl ObjectStore for PlatformClient {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        image: &PendingImage,
    ) -> Result<StoredObject, PlatformError> {
        let url = self.endpoint_with_segments("storage/v1/object", &[bucket, key])?;
        let token = self.access_token().await?;

        let builder = self
            .request(Method::POST, url, token.as_deref())
            .header(CONTENT_TYPE, image.content_type.as_str())
            .header("cache-control", CACHE_CONTROL)
            .header("x-upsert", "false")
            .body(image.bytes.clone());

        let response: UploadResponse = self.send_json(builder).await?;

        Ok(StoredObject {
            path: key.to_string(),
            full_path: response.key,
        })
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url(), bucket, path)
    }
}
