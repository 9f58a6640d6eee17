use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;

use crate::common::serde::{optional_i64_as_string, optional_mime_as_string};

/// Processing state of an uploaded file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    /// The default value, also used when the service omits the state
    #[default]
    StateUnspecified,
    /// File is being processed and cannot be used for inference yet
    Processing,
    /// File is processed and available for inference
    Active,
    /// File failed processing
    Failed,
    /// A state this crate does not know yet; treated as still processing
    #[serde(other)]
    Unrecognized,
}

impl FileState {
    /// Whether no further transition can happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, FileState::Active | FileState::Failed)
    }
}

/// Error status attached to a file that failed processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatus {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "code {}: {}", self.code, self.message)
    }
}

/// Metadata of a file stored by the Files API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    /// Resource name, e.g. `files/abc-123`
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "optional_mime_as_string")]
    pub mime_type: Option<mime::Mime>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "optional_i64_as_string")]
    pub size_bytes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "time::serde::rfc3339::option")]
    pub create_time: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "time::serde::rfc3339::option")]
    pub update_time: Option<OffsetDateTime>,
    /// When the service deletes the file, 48 hours after upload
    #[serde(default, skip_serializing_if = "Option::is_none", with = "time::serde::rfc3339::option")]
    pub expiration_time: Option<OffsetDateTime>,
    /// Base64 encoded SHA-256 of the uploaded bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_hash: Option<String>,
    /// URI to reference the file in generation requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<Url>,
    #[serde(default)]
    pub state: FileState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FileStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesResponse {
    #[serde(default)]
    pub files: Vec<File>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}
