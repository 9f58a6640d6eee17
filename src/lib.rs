//! # gemini-tokens
//!
//! A Rust client for the token-related surface of Google's Gemini API:
//! counting tokens, reading them back from generation and chat responses,
//! uploading media through the Files API, and caching content.

mod client;
mod common;
mod model_info;
mod models;

#[cfg(feature = "cache")]
pub mod cache;
#[cfg(feature = "chats")]
pub mod chats;
#[cfg(feature = "files")]
pub mod files;
#[cfg(feature = "generation")]
pub mod generation;

pub mod prelude;

#[cfg(test)]
mod tests;

pub use client::{Backend, ClientConfig, Error as ClientError, Gemini, Model};
pub use model_info::ModelInfo;
pub use models::{Blob, Content, FileData, Message, Part, Role};

#[cfg(feature = "cache")]
pub use cache::{
    CacheBuilder, CacheExpirationRequest, CachedContent, CachedContentHandle, Error as CacheError,
};
#[cfg(feature = "chats")]
pub use chats::{ChatBuilder, ChatSession, Error as ChatError};
#[cfg(feature = "files")]
pub use files::{File, FileBuilder, FileHandle, FileState, PollError, PollPolicy, StatusLookup};
#[cfg(feature = "generation")]
pub use generation::{
    Candidate, ContentBuilder, CountTokensResponse, FinishReason, GenerationConfig,
    GenerationResponse, UsageMetadata,
};
