use std::sync::Arc;
use tracing::instrument;

#[cfg(feature = "cache")]
use crate::cache::CachedContentHandle;
#[cfg(feature = "files")]
use crate::files::{Error as FilesError, FileHandle};
use crate::{
    client::{Error as ClientError, GeminiClient, Model},
    generation::{
        CountTokensRequest, CountTokensResponse, GenerateContentRequest, GenerationConfig,
        GenerationResponse,
    },
    Blob, Content, Message, Part, Role,
};

/// Builder for content generation requests
#[derive(Clone)]
pub struct ContentBuilder {
    client: Arc<GeminiClient>,
    model: Option<Model>,
    pub contents: Vec<Content>,
    generation_config: Option<GenerationConfig>,
    system_instruction: Option<Content>,
    cached_content: Option<String>,
}

impl ContentBuilder {
    /// Creates a new `ContentBuilder`.
    pub(crate) fn new(client: Arc<GeminiClient>) -> Self {
        Self {
            client,
            model: None,
            contents: Vec::new(),
            generation_config: None,
            system_instruction: None,
            cached_content: None,
        }
    }

    /// Sends the request to a model other than the client's default.
    pub fn with_model(mut self, model: impl Into<Model>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the system instruction for the request.
    pub fn with_system_instruction(mut self, text: impl Into<String>) -> Self {
        self.system_instruction = Some(Content::text(text));
        self
    }

    /// Adds a user message to the conversation history.
    pub fn with_user_message(mut self, text: impl Into<String>) -> Self {
        let message = Message::user(text);
        self.contents.push(message.content);
        self
    }

    /// Adds a model message to the conversation history.
    pub fn with_model_message(mut self, text: impl Into<String>) -> Self {
        let message = Message::model(text);
        self.contents.push(message.content);
        self
    }

    /// Adds a user message, together with coordinates for a previously uploaded file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file metadata is incomplete (missing MIME type or URI).
    #[cfg(feature = "files")]
    pub fn with_user_message_and_file(
        mut self,
        text: impl Into<String>,
        file_handle: &FileHandle,
    ) -> Result<Self, FilesError> {
        let content = Content::text_with_file(text, file_handle)?.with_role(Role::User);
        self.contents.push(content);
        Ok(self)
    }

    /// Adds a reference to an uploaded file by MIME type and URI.
    pub fn with_file_data(
        mut self,
        mime_type: impl Into<String>,
        file_uri: impl Into<String>,
    ) -> Self {
        let content = Content::file_data(mime_type, file_uri).with_role(Role::User);
        self.contents.push(content);
        self
    }

    /// Adds inline data (e.g., an image) to the request.
    ///
    /// The data should be base64-encoded.
    pub fn with_inline_data(
        mut self,
        data: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        let content = Content::inline_data(mime_type, data).with_role(Role::User);
        self.contents.push(content);
        self
    }

    /// Adds raw bytes as inline data, encoding them as base64.
    pub fn with_inline_bytes(mut self, bytes: impl AsRef<[u8]>, mime_type: impl Into<String>) -> Self {
        let content = Content::from_parts(vec![Part::InlineData {
            inline_data: Blob::from_bytes(mime_type, bytes),
        }])
        .with_role(Role::User);
        self.contents.push(content);
        self
    }

    /// Adds a `Message` to the conversation history.
    pub fn with_message(mut self, message: Message) -> Self {
        let content = message.content.clone();
        let role = content.role.clone().unwrap_or(message.role);
        self.contents.push(content.with_role(role));
        self
    }

    /// Adds multiple messages to the conversation history.
    pub fn with_messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        for message in messages {
            self = self.with_message(message);
        }
        self
    }

    /// Adds a prepared content to the request.
    pub fn with_content(mut self, content: Content) -> Self {
        self.contents.push(content);
        self
    }

    /// Adds several prepared contents to the request.
    pub fn with_contents(mut self, contents: impl IntoIterator<Item = Content>) -> Self {
        self.contents.extend(contents);
        self
    }

    /// Uses cached content for this request.
    ///
    /// Generation requests against cached content must target the model the
    /// cache was created with.
    #[cfg(feature = "cache")]
    pub fn with_cached_content(mut self, cached_content: &CachedContentHandle) -> Self {
        self.cached_content = Some(cached_content.name().to_string());
        self
    }

    /// Sets the generation configuration for the request.
    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = Some(config);
        self
    }

    /// Sets the temperature for the request.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.generation_config
            .get_or_insert_with(Default::default)
            .temperature = Some(temperature);
        self
    }

    /// Sets the maximum number of output tokens for the request.
    pub fn with_max_output_tokens(mut self, max_output_tokens: i32) -> Self {
        self.generation_config
            .get_or_insert_with(Default::default)
            .max_output_tokens = Some(max_output_tokens);
        self
    }

    /// Sets the response MIME type for the request.
    pub fn with_response_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.generation_config
            .get_or_insert_with(Default::default)
            .response_mime_type = Some(mime_type.into());
        self
    }

    /// Builds the `GenerateContentRequest`.
    pub fn build(self) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: self.contents,
            generation_config: self.generation_config,
            system_instruction: self.system_instruction,
            cached_content: self.cached_content,
        }
    }

    fn split(self) -> (Arc<GeminiClient>, Model, GenerateContentRequest) {
        let client = self.client.clone();
        let model = self.model.clone().unwrap_or_else(|| client.model.clone());
        (client, model, self.build())
    }

    /// Executes the content generation request.
    #[instrument(skip_all, fields(
        messages.parts.count = self.contents.len(),
        system.instruction.present = self.system_instruction.is_some(),
        cached.content.present = self.cached_content.is_some(),
    ))]
    pub async fn execute(self) -> Result<GenerationResponse, ClientError> {
        let (client, model, request) = self.split();
        client.generate_content_raw(&model, request).await
    }

    /// Counts the number of tokens in the content generation request.
    #[instrument(skip_all, fields(
        messages.parts.count = self.contents.len(),
    ))]
    pub async fn count_tokens(self) -> Result<CountTokensResponse, ClientError> {
        let (client, model, request) = self.split();
        let request = CountTokensRequest::from_request(&model, request);
        client.count_tokens(&model, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;

    fn builder() -> ContentBuilder {
        let client = GeminiClient::new(ClientConfig::new("key")).unwrap();
        ContentBuilder::new(Arc::new(client))
    }

    #[test]
    fn messages_keep_their_roles() {
        let request = builder()
            .with_user_message("Hello there!")
            .with_model_message("Hello! What would you like to learn about today?")
            .with_message(Message::user("Explain relativity."))
            .build();

        let roles: Vec<_> = request.contents.iter().map(|c| c.role.clone()).collect();
        assert_eq!(
            roles,
            vec![Some(Role::User), Some(Role::Model), Some(Role::User)]
        );
        assert!(request.generation_config.is_none());
    }

    #[test]
    fn config_setters_share_one_generation_config() {
        let request = builder()
            .with_temperature(0.2)
            .with_max_output_tokens(64)
            .with_response_mime_type("application/json")
            .build();

        let config = request.generation_config.unwrap();
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.max_output_tokens, Some(64));
        assert_eq!(config.response_mime_type.as_deref(), Some("application/json"));
    }

    #[test]
    fn split_falls_back_to_client_model() {
        let (_, model, _) = builder().split();
        assert_eq!(model, Model::Gemini20Flash);

        let (_, model, _) = builder().with_model("gemini-2.5-pro").split();
        assert_eq!(model, Model::Gemini25Pro);
    }

    #[cfg(feature = "cache")]
    #[test]
    fn cached_content_is_referenced_by_name() {
        let client = Arc::new(GeminiClient::new(ClientConfig::new("key")).unwrap());
        let cache = CachedContentHandle::new("cachedContents/a11".to_string(), client.clone());
        let request = ContentBuilder::new(client)
            .with_user_message("Summarize")
            .with_cached_content(&cache)
            .build();
        assert_eq!(request.cached_content.as_deref(), Some("cachedContents/a11"));
    }
}
