use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::OffsetDateTime;

use crate::Content;

/// Expiration of cached content, sent on creation and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheExpirationRequest {
    /// Time to live, formatted as seconds with an `s` suffix, e.g. `"3600s"`
    Ttl { ttl: String },
    /// Absolute expiration time
    ExpireTime {
        #[serde(rename = "expireTime", with = "time::serde::rfc3339")]
        expire_time: OffsetDateTime,
    },
}

impl CacheExpirationRequest {
    pub fn from_ttl(ttl: Duration) -> Self {
        let ttl = if ttl.subsec_nanos() == 0 {
            format!("{}s", ttl.as_secs())
        } else {
            format!("{}.{:09}s", ttl.as_secs(), ttl.subsec_nanos())
        };
        Self::Ttl { ttl }
    }

    pub fn from_expire_time(expire_time: OffsetDateTime) -> Self {
        Self::ExpireTime { expire_time }
    }

    /// The `updateMask` naming the field this expiration sets.
    pub(crate) fn field_mask(&self) -> &'static str {
        match self {
            Self::Ttl { .. } => "ttl",
            Self::ExpireTime { .. } => "expireTime",
        }
    }
}

/// Expiration as reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheExpirationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "time::serde::rfc3339::option")]
    pub expire_time: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheUsageMetadata {
    /// Total number of tokens that the cached content consumes
    #[serde(default)]
    pub total_token_count: i32,
}

/// Cached content resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedContent {
    /// Resource name, e.g. `cachedContents/abc-123`
    pub name: String,
    /// The model the cache was created for, e.g. `models/gemini-1.5-flash-001`
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub create_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub update_time: OffsetDateTime,
    #[serde(flatten)]
    pub expiration: CacheExpirationResponse,
    #[serde(default)]
    pub usage_metadata: CacheUsageMetadata,
}

/// Request body for creating cached content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCachedContentRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<Vec<Content>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    /// When absent the service keeps the content for one hour
    #[serde(flatten)]
    pub expiration: Option<CacheExpirationRequest>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteCachedContentResponse {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCachedContentsResponse {
    #[serde(default)]
    pub cached_contents: Vec<CachedContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}
