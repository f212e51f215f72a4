//! Domain layer - core types, configuration and ports.
//!
//! This layer contains pure domain models and error types
//! without any external dependencies (DB, IO, etc.).

pub mod config;
pub mod error;
pub mod models;
pub mod publisher;

pub use config::{AppConfig, DedupePolicy, ExtractConfig, StoreOptions};
pub use error::{AppError, Result};
pub use models::{
    Conversation, ExtractionStats, Message, RawRecord, Role, SchemaVersion, UNTITLED,
};
pub use publisher::{PublishOutcome, Publisher};
