use snafu::{OptionExt, Snafu};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::{
    client::{Error as ClientError, GeminiClient},
    files::{
        model::{File, FileState},
        poller::{self, Error as PollError, PollPolicy},
    },
    Part,
};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("file '{name}' has no {field} and cannot be referenced in content"))]
    IncompleteMetadata { name: String, field: &'static str },
}

/// A handle to a file on the Gemini API.
///
/// The handle keeps the last known metadata of the file. It only changes when
/// [`refresh`](Self::refresh) or [`wait_until_active`](Self::wait_until_active)
/// fetch a newer copy from the service.
#[derive(Debug, Clone)]
pub struct FileHandle {
    client: Arc<GeminiClient>,
    file_meta: File,
}

impl FileHandle {
    pub(crate) fn new(client: Arc<GeminiClient>, file_meta: File) -> Self {
        Self { client, file_meta }
    }

    /// Returns the unique resource name of the file, e.g. `files/abc-123`.
    pub fn name(&self) -> &str {
        &self.file_meta.name
    }

    pub fn get_file_meta(&self) -> &File {
        &self.file_meta
    }

    pub fn state(&self) -> FileState {
        self.file_meta.state
    }

    /// Builds a `fileData` part pointing at this file.
    pub fn to_part(&self) -> Result<Part, Error> {
        let uri = self.file_meta.uri.as_ref().context(IncompleteMetadataSnafu {
            name: self.name(),
            field: "URI",
        })?;
        let mime_type = self
            .file_meta
            .mime_type
            .as_ref()
            .context(IncompleteMetadataSnafu {
                name: self.name(),
                field: "MIME type",
            })?;
        Ok(Part::file_data(mime_type.to_string(), uri.to_string()))
    }

    /// Fetches the latest metadata from the service.
    #[instrument(skip_all, fields(file.name = %self.file_meta.name))]
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        self.file_meta = self.client.get_file(&self.file_meta.name).await?;
        Ok(())
    }

    /// Waits until the service reports the file as `ACTIVE`.
    ///
    /// Files such as videos are processed asynchronously after upload and
    /// cannot be used in requests before they are active.
    pub async fn wait_until_active(&mut self, policy: &PollPolicy) -> Result<(), PollError> {
        self.wait(policy, None).await
    }

    /// Like [`wait_until_active`](Self::wait_until_active), but gives up with
    /// [`PollError::Cancelled`] as soon as `cancel` fires.
    pub async fn wait_until_active_or_cancelled(
        &mut self,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<(), PollError> {
        self.wait(policy, Some(cancel)).await
    }

    async fn wait(
        &mut self,
        policy: &PollPolicy,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), PollError> {
        let file =
            poller::wait_until_active(self.file_meta.clone(), self.client.as_ref(), policy, cancel)
                .await?;
        self.file_meta = file;
        Ok(())
    }

    /// Deletes the file from the service.
    ///
    /// On failure the handle is returned together with the error, so the
    /// deletion can be retried.
    #[instrument(skip_all, fields(file.name = %self.file_meta.name))]
    pub async fn delete(self) -> Result<(), (Self, ClientError)> {
        match self.client.delete_file(&self.file_meta.name).await {
            Ok(()) => Ok(()),
            Err(e) => Err((self, e)),
        }
    }
}
