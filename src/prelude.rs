//! # Prelude
//!
//! Re-exports the types most programs need:
//!
//! ```rust,ignore
//! use gemini_tokens::prelude::*;
//! ```

#[cfg(feature = "cache")]
pub use crate::cache::{CacheBuilder, CachedContentHandle, Error as CacheError};
#[cfg(feature = "chats")]
pub use crate::chats::{ChatBuilder, ChatSession};
#[cfg(feature = "files")]
pub use crate::files::{FileBuilder, FileHandle, FileState, PollPolicy};
#[cfg(feature = "generation")]
pub use crate::generation::{ContentBuilder, GenerationConfig, GenerationResponse, UsageMetadata};

pub use crate::client::{ClientConfig, Error as ClientError, Gemini, Model};
pub use crate::models::{Content, Message, Part, Role};
