//! Shared types, error model, and configuration for ceofinder.
//!
//! This crate is the foundation depended on by all other ceofinder crates.
//! It provides:
//! - [`CeoFinderError`] — the unified error type
//! - Domain types ([`CompanyRecord`], [`EnrichmentResult`], [`RunState`])
//! - Configuration ([`AppConfig`], [`Credentials`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, Credentials, DefaultsConfig, ProviderKeysConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{CeoFinderError, Result};
pub use types::{
    Candidate, CompanyRecord, EnrichmentResult, EnrichmentStatus, ProgressEvent, RowOutcome,
    RunMode, RunPhase, RunState,
};
