//! # Core Gemini API Data Primitives
//!
//! This module defines the fundamental building blocks for constructing requests and
//! handling responses from the Gemini API. These data structures, such as `Content`,
//! `Part`, and `Role`, are shared by token counting, generation, chats and cached content.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// Role of a message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message from the user
    User,
    /// Message from the model
    Model,
}

/// Content part that can be included in a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Part {
    /// Text content
    Text {
        /// The text content
        text: String,
        /// Whether this is a thought summary
        #[serde(skip_serializing_if = "Option::is_none")]
        thought: Option<bool>,
    },
    /// Bytes sent along with the request
    InlineData {
        /// The blob data
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
    /// Reference to a file uploaded through the Files API
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
}

impl Part {
    /// Create a text part
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text {
            text: text.into(),
            thought: None,
        }
    }

    /// Create a part referencing an uploaded file by URI
    pub fn file_data(mime_type: impl Into<String>, file_uri: impl Into<String>) -> Self {
        Part::FileData {
            file_data: FileData {
                mime_type: mime_type.into(),
                file_uri: file_uri.into(),
            },
        }
    }

    /// Returns `true` for parts that carry nothing, like an empty text.
    pub(crate) fn is_empty(&self) -> bool {
        match self {
            Part::Text { text, .. } => text.is_empty(),
            Part::InlineData { inline_data } => inline_data.data.is_empty(),
            Part::FileData { file_data } => file_data.file_uri.is_empty(),
        }
    }
}

/// Blob for a message part
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    /// The MIME type of the data
    pub mime_type: String,
    /// Base64 encoded data
    pub data: String,
}

impl Blob {
    /// Create a new blob with mime type and data
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Create a new blob from raw bytes, encoding them as base64
    pub fn from_bytes(mime_type: impl Into<String>, bytes: impl AsRef<[u8]>) -> Self {
        Self::new(mime_type, STANDARD.encode(bytes))
    }
}

/// URI-based reference to uploaded data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    /// The MIME type of the referenced file
    pub mime_type: String,
    /// The URI returned by the Files API
    pub file_uri: String,
}

/// Content of a message
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    /// Parts of the content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parts: Option<Vec<Part>>,
    /// Role of the content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl Content {
    /// Create a new text content
    pub fn text(text: impl Into<String>) -> Self {
        Self::from_parts(vec![Part::text(text)])
    }

    /// Create a new content from several parts
    pub fn from_parts(parts: Vec<Part>) -> Self {
        Self {
            parts: Some(parts),
            role: None,
        }
    }

    /// Create a new content referencing an uploaded file
    pub fn file_data(mime_type: impl Into<String>, file_uri: impl Into<String>) -> Self {
        Self::from_parts(vec![Part::file_data(mime_type, file_uri)])
    }

    /// Create a new content with inline data (blob data)
    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::from_parts(vec![Part::InlineData {
            inline_data: Blob::new(mime_type, data),
        }])
    }

    /// Create a new content with a text prompt followed by an uploaded file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file metadata is incomplete (missing MIME type or URI).
    #[cfg(feature = "files")]
    pub fn text_with_file(
        text: impl Into<String>,
        file_handle: &crate::files::FileHandle,
    ) -> Result<Self, crate::files::Error> {
        let file_part = file_handle.to_part()?;
        Ok(Self::from_parts(vec![Part::text(text), file_part]))
    }

    /// Add a role to this content
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Concatenated text of all text parts, thoughts excluded.
    pub fn text_parts(&self) -> String {
        self.parts
            .iter()
            .flatten()
            .filter_map(|part| match part {
                Part::Text {
                    text,
                    thought: None | Some(false),
                } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// A content is usable in a curated history only if it has at least one
    /// part and none of its parts are empty.
    pub(crate) fn is_valid(&self) -> bool {
        match &self.parts {
            Some(parts) if !parts.is_empty() => parts.iter().all(|part| !part.is_empty()),
            _ => false,
        }
    }
}

/// Message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Content of the message
    pub content: Content,
    /// Role of the message
    pub role: Role,
}

impl Message {
    /// Create a new user message with text content
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            content: Content::text(text).with_role(Role::User),
            role: Role::User,
        }
    }

    /// Create a new model message with text content
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            content: Content::text(text).with_role(Role::Model),
            role: Role::Model,
        }
    }
}
