use mime::Mime;
use snafu::ResultExt;
use std::{path::PathBuf, sync::Arc};
use tracing::instrument;

use crate::{
    client::{Error as ClientError, GeminiClient, ReadFileSnafu},
    files::handle::FileHandle,
};

/// Where the bytes of an upload come from.
enum Source {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

/// A builder for creating a file resource.
pub struct FileBuilder {
    client: Arc<GeminiClient>,
    source: Source,
    display_name: Option<String>,
    mime_type: Option<Mime>,
}

impl FileBuilder {
    pub(crate) fn new<B: Into<Vec<u8>>>(client: Arc<GeminiClient>, file_bytes: B) -> Self {
        Self {
            client,
            source: Source::Bytes(file_bytes.into()),
            display_name: None,
            mime_type: None,
        }
    }

    pub(crate) fn from_path(client: Arc<GeminiClient>, path: impl Into<PathBuf>) -> Self {
        Self {
            client,
            source: Source::Path(path.into()),
            display_name: None,
            mime_type: None,
        }
    }

    /// The display name of the file.
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// The MIME type of the file.
    pub fn with_mime_type(mut self, mime_type: Mime) -> Self {
        self.mime_type = Some(mime_type);
        self
    }

    /// The MIME type to upload with: explicit, guessed from the path, or
    /// `application/octet-stream`.
    fn resolve_mime_type(&self) -> Mime {
        if let Some(mime_type) = &self.mime_type {
            return mime_type.clone();
        }
        match &self.source {
            Source::Path(path) => mime_guess::from_path(path).first_or_octet_stream(),
            Source::Bytes(_) => mime::APPLICATION_OCTET_STREAM,
        }
    }

    /// Upload the file.
    #[instrument(skip_all, fields(
        display_name = self.display_name.as_deref(),
        from.path = matches!(self.source, Source::Path(_)),
    ))]
    pub async fn upload(self) -> Result<FileHandle, ClientError> {
        let mime_type = self.resolve_mime_type();
        let (file_bytes, display_name) = match self.source {
            Source::Bytes(bytes) => (bytes, self.display_name),
            Source::Path(path) => {
                let bytes = tokio::fs::read(&path)
                    .await
                    .context(ReadFileSnafu { path: path.clone() })?;
                let display_name = self.display_name.or_else(|| {
                    path.file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                });
                (bytes, display_name)
            }
        };

        let file = self
            .client
            .upload_file(display_name, file_bytes, mime_type)
            .await?;

        Ok(FileHandle::new(self.client, file))
    }
}
