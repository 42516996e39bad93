use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// An image chosen for upload but not yet sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl PendingImage {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .to_string();

        Self {
            file_name,
            bytes,
            content_type,
        }
    }

    /// Read an image from disk, keeping only its final path component as the name
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self::new(file_name, bytes))
    }
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    /// Path of the object inside its bucket
    pub path: String,
    /// Bucket-qualified key as reported by the storage service
    #[serde(default)]
    pub full_path: Option<String>,
}

/// Storage key for an upload: `<unix millis>_<original name>`.
/// The original name is used verbatim.
pub fn object_key(uploaded_at: DateTime<Utc>, file_name: &str) -> String {
    format!("{}_{}", uploaded_at.timestamp_millis(), file_name)
}
