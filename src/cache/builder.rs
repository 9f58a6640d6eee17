use snafu::{ensure, ResultExt};
use std::{sync::Arc, time::Duration};
use tracing::instrument;

use crate::{
    cache::{
        handle::{CachedContentHandle, ClientSnafu, Error, LongDisplayNameSnafu},
        model::{CacheExpirationRequest, CreateCachedContentRequest},
    },
    client::{GeminiClient, Model},
    Content, Message,
};

const MAX_DISPLAY_NAME_CHARS: usize = 128;

/// Builder for creating cached content with a fluent API.
pub struct CacheBuilder {
    client: Arc<GeminiClient>,
    model: Option<Model>,
    display_name: Option<String>,
    contents: Vec<Content>,
    system_instruction: Option<Content>,
    expiration: Option<CacheExpirationRequest>,
}

impl CacheBuilder {
    /// Creates a new CacheBuilder instance.
    pub(crate) fn new(client: Arc<GeminiClient>) -> Self {
        Self {
            client,
            model: None,
            display_name: None,
            contents: Vec::new(),
            system_instruction: None,
            expiration: None,
        }
    }

    /// Set the model the content is cached for.
    ///
    /// Defaults to the client's model. Caching is only offered by some model
    /// versions, such as `gemini-1.5-flash-001`.
    pub fn with_model(mut self, model: impl Into<Model>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set a display name for the cached content.
    /// Maximum 128 Unicode characters.
    pub fn with_display_name<S: Into<String>>(mut self, display_name: S) -> Result<Self, Error> {
        let display_name = display_name.into();
        let chars = display_name.chars().count();
        ensure!(
            chars <= MAX_DISPLAY_NAME_CHARS,
            LongDisplayNameSnafu {
                display_name,
                chars
            }
        );
        self.display_name = Some(display_name);
        Ok(self)
    }

    /// Set the system instruction for the cached content.
    pub fn with_system_instruction<S: Into<String>>(mut self, instruction: S) -> Self {
        self.system_instruction = Some(Content::text(instruction.into()));
        self
    }

    /// Add a user message to the cached content.
    pub fn with_user_message<S: Into<String>>(mut self, message: S) -> Self {
        self.contents.push(Message::user(message.into()).content);
        self
    }

    /// Add a model message to the cached content.
    pub fn with_model_message<S: Into<String>>(mut self, message: S) -> Self {
        self.contents.push(Message::model(message.into()).content);
        self
    }

    /// Add content directly to the cached content.
    pub fn with_content(mut self, content: Content) -> Self {
        self.contents.push(content);
        self
    }

    /// Add multiple contents to the cached content.
    pub fn with_contents(mut self, contents: Vec<Content>) -> Self {
        self.contents.extend(contents);
        self
    }

    /// Set the TTL (Time To Live) for the cached content.
    /// The cache will automatically expire after this duration.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.expiration = Some(CacheExpirationRequest::from_ttl(ttl));
        self
    }

    /// Set an explicit expiration time for the cached content.
    pub fn with_expire_time(mut self, expire_time: time::OffsetDateTime) -> Self {
        self.expiration = Some(CacheExpirationRequest::from_expire_time(expire_time));
        self
    }

    fn build(&self) -> CreateCachedContentRequest {
        let model = self
            .model
            .clone()
            .unwrap_or_else(|| self.client.model.clone());
        CreateCachedContentRequest {
            model: model.to_string(),
            display_name: self.display_name.clone(),
            contents: if self.contents.is_empty() {
                None
            } else {
                Some(self.contents.clone())
            },
            system_instruction: self.system_instruction.clone(),
            expiration: self.expiration.clone(),
        }
    }

    /// Execute the cache creation request.
    #[instrument(skip_all, fields(
        messages.parts.count = self.contents.len(),
        system.instruction.present = self.system_instruction.is_some(),
        expiration.present = self.expiration.is_some(),
    ))]
    pub async fn execute(self) -> Result<CachedContentHandle, Error> {
        let request = self.build();

        let response = self
            .client
            .create_cached_content(request)
            .await
            .map_err(Box::new)
            .context(ClientSnafu)?;

        Ok(CachedContentHandle::new(response.name, self.client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;

    fn builder() -> CacheBuilder {
        let client = GeminiClient::new(ClientConfig::new("key")).unwrap();
        CacheBuilder::new(Arc::new(client))
    }

    #[test]
    fn long_display_name_is_rejected() {
        let name = "é".repeat(129);
        let error = builder().with_display_name(name).err().unwrap();
        assert!(matches!(error, Error::LongDisplayName { chars: 129, .. }));
        assert!(error.to_string().ends_with("has 129 characters, at most 128 are allowed"));
    }

    #[test]
    fn display_name_limit_counts_characters() {
        assert!(builder().with_display_name("é".repeat(128)).is_ok());
    }

    #[test]
    fn model_defaults_to_client_model() {
        let request = builder().with_user_message("hello").build();
        assert_eq!(request.model, "models/gemini-2.0-flash");
        assert_eq!(request.contents.map(|c| c.len()), Some(1));
        assert_eq!(request.expiration, None);
    }

    #[test]
    fn explicit_model_and_ttl() {
        let request = builder()
            .with_model(Model::Gemini15Flash001)
            .with_ttl(Duration::from_secs(300))
            .build();
        assert_eq!(request.model, "models/gemini-1.5-flash-001");
        assert_eq!(
            request.expiration,
            Some(CacheExpirationRequest::Ttl {
                ttl: "300s".to_string()
            })
        );
    }
}
