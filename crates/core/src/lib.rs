//! Core types and record resolution for thumbs.
//!
//! This crate provides:
//! - SQLite record store for source files, thumbnails and dimensions
//! - Cache client with memory and SQLite backends
//! - The cached record resolver
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod resolver;
pub mod storage;
pub mod store;

pub use cache::CacheClient;
pub use config::AppConfig;
pub use error::Error;
pub use models::{RecordKind, Source, Thumbnail, ThumbnailDimensions};
pub use resolver::{FileResolver, RecordEvent, RecordHook, ResolveOptions, ResolverSettings};
pub use storage::{FileSystemStorage, Storage, storage_hash};
pub use store::{RecordStore, ThumbsDb};
