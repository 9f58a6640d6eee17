use reqwest::{
    header::{HeaderMap, HeaderValue, InvalidHeaderValue, AUTHORIZATION},
    Client, ClientBuilder, RequestBuilder, Response,
};
use serde::{de::DeserializeOwned, Serialize};
use snafu::{OptionExt, ResultExt, Snafu};
use std::{
    fmt::{self, Display, Formatter},
    path::PathBuf,
    sync::{Arc, LazyLock},
    time::Duration,
};
use tracing::{debug, instrument};
use url::Url;

use crate::model_info::ModelInfo;

#[cfg(feature = "cache")]
use crate::cache::{
    CacheBuilder, CacheExpirationRequest, CachedContent, CachedContentHandle,
    CreateCachedContentRequest, DeleteCachedContentResponse, ListCachedContentsResponse,
};
#[cfg(feature = "chats")]
use crate::chats::ChatBuilder;
#[cfg(feature = "files")]
use crate::files::{File, FileBuilder, FileHandle, ListFilesResponse, StatusLookup};
#[cfg(feature = "generation")]
use crate::{
    generation::{
        ContentBuilder, CountTokensRequest, CountTokensResponse, GenerateContentRequest,
        GenerationResponse,
    },
    Content,
};

static DEFAULT_BASE_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://generativelanguage.googleapis.com/v1beta/")
        .expect("unreachable error: failed to parse default base URL")
});

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("failed to parse URL using '{suffix}' as suffix"))]
    ConstructUrl {
        source: url::ParseError,
        suffix: String,
    },

    #[snafu(display("failed to perform request to '{url}'"))]
    PerformRequest { source: reqwest::Error, url: Url },

    #[snafu(display(
        "bad response from server; code {code}; description: {}",
        description.as_deref().unwrap_or("none")
    ))]
    BadResponse {
        /// HTTP status code
        code: u16,
        /// HTTP error description
        description: Option<String>,
    },

    #[snafu(display("failed to decode JSON response"))]
    Decode { source: reqwest::Error },

    #[snafu(display("no API key found; set GEMINI_API_KEY or GOOGLE_API_KEY"))]
    MissingApiKey,

    #[snafu(display("API key contains characters that are not valid in a header"))]
    InvalidApiKey { source: InvalidHeaderValue },

    #[snafu(display("failed to build the HTTP client"))]
    BuildClient { source: reqwest::Error },

    #[snafu(display("response from '{url}' is missing the '{header}' header"))]
    MissingResponseHeader { url: Url, header: String },

    #[snafu(display("'{operation}' is not available on the {backend} backend"))]
    UnsupportedBackend {
        operation: String,
        backend: Backend,
    },

    #[snafu(display("failed to read local file '{}'", path.display()))]
    ReadFile {
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Gemini models known to this crate.
///
/// Any other model can be addressed with [`Model::Custom`], either with or
/// without the `models/` prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Model {
    #[default]
    Gemini20Flash,
    Gemini15Flash001,
    Gemini25Flash,
    Gemini25FlashLite,
    Gemini25Pro,
    Custom(String),
}

impl Model {
    /// Returns the resource name of the model, e.g. `models/gemini-2.0-flash`.
    pub fn as_str(&self) -> &str {
        match self {
            Model::Gemini20Flash => "models/gemini-2.0-flash",
            Model::Gemini15Flash001 => "models/gemini-1.5-flash-001",
            Model::Gemini25Flash => "models/gemini-2.5-flash",
            Model::Gemini25FlashLite => "models/gemini-2.5-flash-lite",
            Model::Gemini25Pro => "models/gemini-2.5-pro",
            Model::Custom(model) => model,
        }
    }
}

impl From<String> for Model {
    fn from(model: String) -> Self {
        let model = if model.starts_with("models/") {
            model
        } else {
            format!("models/{model}")
        };
        match model.as_str() {
            "models/gemini-2.0-flash" => Model::Gemini20Flash,
            "models/gemini-1.5-flash-001" => Model::Gemini15Flash001,
            "models/gemini-2.5-flash" => Model::Gemini25Flash,
            "models/gemini-2.5-flash-lite" => Model::Gemini25FlashLite,
            "models/gemini-2.5-pro" => Model::Gemini25Pro,
            _ => Model::Custom(model),
        }
    }
}

impl From<&str> for Model {
    fn from(model: &str) -> Self {
        Model::from(model.to_string())
    }
}

impl Display for Model {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The service a client talks to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Backend {
    /// The Gemini Developer API, authenticated with an API key.
    #[default]
    GeminiApi,
    /// Vertex AI, authenticated with an OAuth access token.
    ///
    /// Only model operations (metadata, token counting, generation) are routed
    /// to Vertex AI. The files and cached content APIs are not available.
    VertexAi { project: String, location: String },
}

impl Backend {
    fn default_base_url(&self) -> Result<Url, Error> {
        match self {
            Backend::GeminiApi => Ok(DEFAULT_BASE_URL.clone()),
            Backend::VertexAi { project, location } => {
                let url = format!(
                    "https://{location}-aiplatform.googleapis.com/v1/projects/{project}/locations/{location}/publishers/google/"
                );
                Url::parse(&url).context(ConstructUrlSnafu { suffix: url })
            }
        }
    }
}

impl Display for Backend {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Backend::GeminiApi => f.write_str("Gemini API"),
            Backend::VertexAi { .. } => f.write_str("Vertex AI"),
        }
    }
}

/// Settings used to construct a [`Gemini`] client.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// API key (Gemini API) or access token (Vertex AI).
    pub api_key: String,
    pub backend: Backend,
    /// Model used when a request does not name one.
    pub model: Model,
    /// Overrides the backend's base URL. Mostly useful for proxies and tests.
    pub base_url: Option<Url>,
    /// Total timeout applied to every HTTP request.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Reads the API key from `GEMINI_API_KEY`, falling back to `GOOGLE_API_KEY`.
    ///
    /// `GEMINI_BASE_URL` overrides the base URL when set.
    /// Empty variables count as unset.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let non_empty = |name: &str| var(name).filter(|value| !value.is_empty());

        let api_key = non_empty("GEMINI_API_KEY")
            .or_else(|| non_empty("GOOGLE_API_KEY"))
            .context(MissingApiKeySnafu)?;

        let base_url = match non_empty("GEMINI_BASE_URL") {
            Some(url) => Some(Url::parse(&url).context(ConstructUrlSnafu { suffix: url })?),
            None => None,
        };

        Ok(Self {
            api_key,
            base_url,
            ..Default::default()
        })
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_model(mut self, model: impl Into<Model>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Internal client for making requests to the Gemini API
#[derive(Debug)]
pub(crate) struct GeminiClient {
    http_client: Client,
    pub model: Model,
    base_url: Url,
    backend: Backend,
}

impl GeminiClient {
    pub(crate) fn new(config: ClientConfig) -> Result<Self, Error> {
        if config.api_key.is_empty() {
            return MissingApiKeySnafu.fail();
        }

        let mut headers = HeaderMap::new();
        match config.backend {
            Backend::GeminiApi => {
                let mut value =
                    HeaderValue::from_str(&config.api_key).context(InvalidApiKeySnafu)?;
                value.set_sensitive(true);
                headers.insert(API_KEY_HEADER, value);
            }
            Backend::VertexAi { .. } => {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                    .context(InvalidApiKeySnafu)?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
        }

        let mut builder = ClientBuilder::new().default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().context(BuildClientSnafu)?;

        let base_url = match config.base_url {
            Some(url) => normalize_base_url(url),
            None => config.backend.default_base_url()?,
        };

        Ok(Self {
            http_client,
            model: config.model,
            base_url,
            backend: config.backend,
        })
    }

    /// Fails unless the client talks to the Gemini Developer API.
    fn require_gemini_api(&self, operation: &str) -> Result<(), Error> {
        match self.backend {
            Backend::GeminiApi => Ok(()),
            _ => UnsupportedBackendSnafu {
                operation,
                backend: self.backend.clone(),
            }
            .fail(),
        }
    }

    /// Fetch metadata of a model
    #[instrument(skip_all, fields(model = %model))]
    pub(crate) async fn get_model_info(&self, model: &Model) -> Result<ModelInfo, Error> {
        let url = self.build_url(model.as_str())?;
        self.get_json(url).await
    }

    /// Count the tokens of a request
    #[cfg(feature = "generation")]
    #[instrument(skip_all, fields(model = %model))]
    pub(crate) async fn count_tokens(
        &self,
        model: &Model,
        request: CountTokensRequest,
    ) -> Result<CountTokensResponse, Error> {
        let url = self.build_model_url(model, "countTokens")?;
        self.post_json(url, &request).await
    }

    /// Generate content
    #[cfg(feature = "generation")]
    #[instrument(skip_all, fields(model = %model))]
    pub(crate) async fn generate_content_raw(
        &self,
        model: &Model,
        request: GenerateContentRequest,
    ) -> Result<GenerationResponse, Error> {
        let url = self.build_model_url(model, "generateContent")?;
        self.post_json(url, &request).await
    }

    /// Upload a file using the resumable upload protocol.
    #[cfg(feature = "files")]
    #[instrument(skip_all, fields(
        file.size = file_bytes.len(),
        mime.type = %mime_type,
        display_name = display_name.as_deref(),
    ))]
    pub(crate) async fn upload_file(
        &self,
        display_name: Option<String>,
        file_bytes: Vec<u8>,
        mime_type: mime::Mime,
    ) -> Result<File, Error> {
        self.require_gemini_api("file upload")?;

        #[derive(serde::Serialize)]
        #[serde(rename_all = "camelCase")]
        struct UploadMetadata {
            #[serde(skip_serializing_if = "Option::is_none")]
            display_name: Option<String>,
        }

        #[derive(serde::Serialize)]
        struct StartUpload {
            file: UploadMetadata,
        }

        #[derive(serde::Deserialize)]
        struct UploadResponse {
            file: File,
        }

        let start_url = self.build_upload_url()?;
        let start = self
            .http_client
            .post(start_url.clone())
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header(
                "X-Goog-Upload-Header-Content-Length",
                file_bytes.len().to_string(),
            )
            .header("X-Goog-Upload-Header-Content-Type", mime_type.to_string())
            .json(&StartUpload {
                file: UploadMetadata { display_name },
            });
        let response = self.perform(start, start_url.clone()).await?;

        let upload_url = response
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|value| value.to_str().ok())
            .context(MissingResponseHeaderSnafu {
                url: start_url,
                header: UPLOAD_URL_HEADER,
            })?;
        let upload_url = Url::parse(upload_url).context(ConstructUrlSnafu {
            suffix: upload_url.to_string(),
        })?;
        debug!("upload session started");

        let upload = self
            .http_client
            .post(upload_url.clone())
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header("X-Goog-Upload-Offset", "0")
            .body(file_bytes);
        let response = self.perform(upload, upload_url).await?;
        let uploaded: UploadResponse = response.json().await.context(DecodeSnafu)?;

        Ok(uploaded.file)
    }

    /// Get a file's metadata
    #[cfg(feature = "files")]
    #[instrument(skip_all, fields(file.name = name))]
    pub(crate) async fn get_file(&self, name: &str) -> Result<File, Error> {
        self.require_gemini_api("file lookup")?;
        let url = self.build_url(name)?;
        self.get_json(url).await
    }

    /// List files
    #[cfg(feature = "files")]
    #[instrument(skip_all, fields(page.size = page_size, page.token.present = page_token.is_some()))]
    pub(crate) async fn list_files(
        &self,
        page_size: Option<u32>,
        page_token: Option<String>,
    ) -> Result<ListFilesResponse, Error> {
        self.require_gemini_api("file listing")?;
        let url = self.build_paged_url("files", page_size, page_token)?;
        self.get_json(url).await
    }

    /// Delete a file
    #[cfg(feature = "files")]
    #[instrument(skip_all, fields(file.name = name))]
    pub(crate) async fn delete_file(&self, name: &str) -> Result<(), Error> {
        self.require_gemini_api("file deletion")?;
        let url = self.build_url(name)?;
        self.perform(self.http_client.delete(url.clone()), url)
            .await?;
        Ok(())
    }

    /// Create cached content
    #[cfg(feature = "cache")]
    #[instrument(skip_all, fields(model = %request.model))]
    pub(crate) async fn create_cached_content(
        &self,
        request: CreateCachedContentRequest,
    ) -> Result<CachedContent, Error> {
        self.require_gemini_api("cached content creation")?;
        let url = self.build_url("cachedContents")?;
        self.post_json(url, &request).await
    }

    /// Get cached content
    #[cfg(feature = "cache")]
    #[instrument(skip_all, fields(cache.name = name))]
    pub(crate) async fn get_cached_content(&self, name: &str) -> Result<CachedContent, Error> {
        self.require_gemini_api("cached content lookup")?;
        let url = self.build_url(name)?;
        self.get_json(url).await
    }

    /// Update the expiration of cached content
    #[cfg(feature = "cache")]
    #[instrument(skip_all, fields(cache.name = name, update.mask = expiration.field_mask()))]
    pub(crate) async fn update_cached_content(
        &self,
        name: &str,
        expiration: CacheExpirationRequest,
    ) -> Result<CachedContent, Error> {
        self.require_gemini_api("cached content update")?;
        let mut url = self.build_url(name)?;
        url.query_pairs_mut()
            .append_pair("updateMask", expiration.field_mask());

        let request = self.http_client.patch(url.clone()).json(&expiration);
        let response = self.perform(request, url).await?;
        response.json().await.context(DecodeSnafu)
    }

    /// Delete cached content
    #[cfg(feature = "cache")]
    #[instrument(skip_all, fields(cache.name = name))]
    pub(crate) async fn delete_cached_content(
        &self,
        name: &str,
    ) -> Result<DeleteCachedContentResponse, Error> {
        self.require_gemini_api("cached content deletion")?;
        let url = self.build_url(name)?;
        let response = self
            .perform(self.http_client.delete(url.clone()), url)
            .await?;
        response.json().await.context(DecodeSnafu)
    }

    /// List cached contents
    #[cfg(feature = "cache")]
    #[instrument(skip_all, fields(page.size = page_size, page.token.present = page_token.is_some()))]
    pub(crate) async fn list_cached_contents(
        &self,
        page_size: Option<u32>,
        page_token: Option<String>,
    ) -> Result<ListCachedContentsResponse, Error> {
        self.require_gemini_api("cached content listing")?;
        let url = self.build_paged_url("cachedContents", page_size, page_token)?;
        self.get_json(url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        let response = self.perform(self.http_client.get(url.clone()), url).await?;
        response.json().await.context(DecodeSnafu)
    }

    async fn post_json<Req: Serialize, T: DeserializeOwned>(
        &self,
        url: Url,
        request: &Req,
    ) -> Result<T, Error> {
        let builder = self.http_client.post(url.clone()).json(request);
        let response = self.perform(builder, url).await?;
        response.json().await.context(DecodeSnafu)
    }

    /// Send a request and turn non-success statuses into [`Error::BadResponse`].
    async fn perform(&self, request: RequestBuilder, url: Url) -> Result<Response, Error> {
        let response = request
            .send()
            .await
            .context(PerformRequestSnafu { url })?;
        check_response(response).await
    }

    fn build_url(&self, suffix: &str) -> Result<Url, Error> {
        self.base_url
            .join(suffix)
            .context(ConstructUrlSnafu { suffix })
    }

    #[cfg(feature = "generation")]
    fn build_model_url(&self, model: &Model, action: &str) -> Result<Url, Error> {
        self.build_url(&format!("{model}:{action}"))
    }

    #[cfg(any(feature = "files", feature = "cache"))]
    fn build_paged_url(
        &self,
        suffix: &str,
        page_size: Option<u32>,
        page_token: Option<String>,
    ) -> Result<Url, Error> {
        let mut url = self.build_url(suffix)?;
        if let Some(size) = page_size {
            url.query_pairs_mut()
                .append_pair("pageSize", &size.to_string());
        }
        if let Some(token) = page_token {
            url.query_pairs_mut().append_pair("pageToken", &token);
        }
        Ok(url)
    }

    /// The media upload endpoint lives under `/upload` next to the versioned API path.
    #[cfg(feature = "files")]
    fn build_upload_url(&self) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        let path = format!("/upload{}files", self.base_url.path());
        url.set_path(&path);
        Ok(url)
    }
}

#[cfg(feature = "files")]
#[async_trait::async_trait]
impl StatusLookup for GeminiClient {
    async fn lookup(&self, name: &str) -> Result<File, Error> {
        self.get_file(name).await
    }
}

/// `Url::join` drops the last path segment unless the base ends with a slash.
fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

async fn check_response(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if !status.is_success() {
        let description = response.text().await.ok().filter(|text| !text.is_empty());
        return BadResponseSnafu {
            code: status.as_u16(),
            description,
        }
        .fail();
    }
    Ok(response)
}

/// Client for the Gemini API
#[derive(Debug, Clone)]
pub struct Gemini {
    client: Arc<GeminiClient>,
}

impl Gemini {
    /// Create a new client with the specified API key
    pub fn new(api_key: impl Into<String>) -> Result<Self, Error> {
        Self::with_config(ClientConfig::new(api_key))
    }

    /// Create a new client from `GEMINI_API_KEY` / `GOOGLE_API_KEY`
    pub fn from_env() -> Result<Self, Error> {
        Self::with_config(ClientConfig::from_env()?)
    }

    /// Create a new client with the specified API key and model
    pub fn with_model(api_key: impl Into<String>, model: impl Into<Model>) -> Result<Self, Error> {
        Self::with_config(ClientConfig::new(api_key).with_model(model))
    }

    /// Create a new client with the specified API key, model, and base URL
    pub fn with_model_and_base_url(
        api_key: impl Into<String>,
        model: impl Into<Model>,
        base_url: Url,
    ) -> Result<Self, Error> {
        Self::with_config(
            ClientConfig::new(api_key)
                .with_model(model)
                .with_base_url(base_url),
        )
    }

    /// Create a new client from a full configuration
    pub fn with_config(config: ClientConfig) -> Result<Self, Error> {
        let client = GeminiClient::new(config)?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// The model used when a request does not name one.
    pub fn model(&self) -> &Model {
        &self.client.model
    }

    /// Look up model metadata, including its input and output token limits.
    pub async fn get_model(&self, model: impl Into<Model>) -> Result<ModelInfo, Error> {
        self.client.get_model_info(&model.into()).await
    }

    /// Count the tokens of a sequence of contents with the client's model.
    #[cfg(feature = "generation")]
    pub async fn count_tokens(
        &self,
        contents: impl Into<Vec<Content>>,
    ) -> Result<CountTokensResponse, Error> {
        let request = CountTokensRequest::from_contents(contents.into());
        self.client.count_tokens(&self.client.model, request).await
    }

    /// Start building a content generation request
    #[cfg(feature = "generation")]
    pub fn generate_content(&self) -> ContentBuilder {
        ContentBuilder::new(self.client.clone())
    }

    /// Start building a chat session
    #[cfg(feature = "chats")]
    pub fn create_chat(&self) -> ChatBuilder {
        ChatBuilder::new(self.client.clone())
    }

    /// Start building a file upload from in-memory bytes
    #[cfg(feature = "files")]
    pub fn create_file<B: Into<Vec<u8>>>(&self, bytes: B) -> FileBuilder {
        FileBuilder::new(self.client.clone(), bytes)
    }

    /// Start building a file upload from a local path
    ///
    /// The file is read when the upload executes. Unless a MIME type is set
    /// explicitly it is guessed from the path's extension.
    #[cfg(feature = "files")]
    pub fn upload_file_from_path(&self, path: impl Into<PathBuf>) -> FileBuilder {
        FileBuilder::from_path(self.client.clone(), path)
    }

    /// Get a handle to a file by its name.
    #[cfg(feature = "files")]
    pub async fn get_file(&self, name: &str) -> Result<FileHandle, Error> {
        let file = self.client.get_file(name).await?;
        Ok(FileHandle::new(self.client.clone(), file))
    }

    /// Lists files.
    ///
    /// This method returns a stream that handles pagination automatically.
    #[cfg(feature = "files")]
    pub fn list_files(
        &self,
        page_size: impl Into<Option<u32>>,
    ) -> impl futures::Stream<Item = Result<FileHandle, Error>> + Send {
        let client = self.client.clone();
        let page_size = page_size.into();
        async_stream::try_stream! {
            let mut page_token: Option<String> = None;
            loop {
                let response = client.list_files(page_size, page_token.clone()).await?;

                for file in response.files {
                    yield FileHandle::new(client.clone(), file);
                }

                if let Some(next_page_token) = response.next_page_token {
                    page_token = Some(next_page_token);
                } else {
                    break;
                }
            }
        }
    }

    /// Start building cached content
    #[cfg(feature = "cache")]
    pub fn create_cache(&self) -> CacheBuilder {
        CacheBuilder::new(self.client.clone())
    }

    /// Get a handle to cached content by its name.
    #[cfg(feature = "cache")]
    pub fn get_cached_content(&self, name: &str) -> CachedContentHandle {
        CachedContentHandle::new(name.to_string(), self.client.clone())
    }

    /// Lists cached contents.
    ///
    /// This method returns a stream that handles pagination automatically.
    #[cfg(feature = "cache")]
    pub fn list_cached_contents(
        &self,
        page_size: impl Into<Option<u32>>,
    ) -> impl futures::Stream<Item = Result<CachedContent, Error>> + Send {
        let client = self.client.clone();
        let page_size = page_size.into();
        async_stream::try_stream! {
            let mut page_token: Option<String> = None;
            loop {
                let response = client
                    .list_cached_contents(page_size, page_token.clone())
                    .await?;

                for cached_content in response.cached_contents {
                    yield cached_content;
                }

                if let Some(next_page_token) = response.next_page_token {
                    page_token = Some(next_page_token);
                } else {
                    break;
                }
            }
        }
    }
}

#[cfg(feature = "files")]
#[async_trait::async_trait]
impl StatusLookup for Gemini {
    async fn lookup(&self, name: &str) -> Result<File, Error> {
        self.client.get_file(name).await
    }
}
