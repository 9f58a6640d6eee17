use snafu::{ResultExt, Snafu};
use std::{result::Result, sync::Arc};
use tracing::instrument;

use crate::{
    cache::model::{CacheExpirationRequest, CachedContent, DeleteCachedContentResponse},
    client::{Error as ClientError, GeminiClient},
};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("client invocation error"))]
    Client { source: Box<ClientError> },

    #[snafu(display(
        "display name '{display_name}' has {chars} characters, at most 128 are allowed"
    ))]
    LongDisplayName { display_name: String, chars: usize },
}

/// Name of a cached content resource, bound to the client that manages it.
///
/// The handle holds no metadata of its own. [`get`](Self::get) fetches it.
#[derive(Debug)]
pub struct CachedContentHandle {
    /// Resource name, e.g. `cachedContents/a11`
    pub name: String,
    client: Arc<GeminiClient>,
}

impl CachedContentHandle {
    pub(crate) fn new(name: String, client: Arc<GeminiClient>) -> Self {
        Self { name, client }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fetches the current metadata, including expiration and token usage.
    #[instrument(skip_all, fields(cache.name = %self.name))]
    pub async fn get(&self) -> Result<CachedContent, Error> {
        self.client
            .get_cached_content(&self.name)
            .await
            .map_err(Box::new)
            .context(ClientSnafu)
    }

    /// Moves the expiration. Only the field named by `expiration` is changed.
    #[instrument(skip_all, fields(cache.name = %self.name))]
    pub async fn update(&self, expiration: CacheExpirationRequest) -> Result<CachedContent, Error> {
        self.client
            .update_cached_content(&self.name, expiration)
            .await
            .map_err(Box::new)
            .context(ClientSnafu)
    }

    /// Deletes the cached content.
    ///
    /// On failure the handle comes back with the error so the caller can retry.
    #[instrument(skip_all, fields(cache.name = %self.name))]
    pub async fn delete(self) -> Result<DeleteCachedContentResponse, (Self, ClientError)> {
        match self.client.delete_cached_content(&self.name).await {
            Ok(response) => Ok(response),
            Err(e) => Err((self, e)),
        }
    }
}
