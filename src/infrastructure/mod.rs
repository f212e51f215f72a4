//! Infrastructure layer - external adapters (database, filesystem, processes).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod agent;
pub mod config;
pub mod cursor_paths;
pub mod git;
pub mod store_reader;

pub use agent::AgentPublisher;
pub use config::{ensure_config_exists, load_config, load_prompt_template};
pub use cursor_paths::default_store_path;
pub use store_reader::StoreReader;
