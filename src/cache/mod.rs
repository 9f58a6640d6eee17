//! Cached content: server-side bundles of content reused across requests.
//!
//! Cached content is created explicitly with [`CacheBuilder`], referenced from
//! generation requests with
//! [`ContentBuilder::with_cached_content`](crate::generation::ContentBuilder::with_cached_content),
//! and deleted explicitly through its [`CachedContentHandle`].

pub mod builder;
pub mod handle;
pub mod model;

pub use builder::CacheBuilder;
pub use handle::{CachedContentHandle, Error};
pub use model::{
    CacheExpirationRequest, CacheExpirationResponse, CacheUsageMetadata, CachedContent,
    CreateCachedContentRequest, DeleteCachedContentResponse, ListCachedContentsResponse,
};
