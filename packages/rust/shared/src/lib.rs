//! Shared types, error model, and configuration for DeepCut.
//!
//! This crate is the foundation depended on by all other DeepCut crates.
//! It provides:
//! - [`DeepCutError`]: the unified error type
//! - Domain types ([`SectionKey`], [`SectionPayload`], [`ResearchPackage`], [`Idea`], [`IdeaId`])
//! - Typed section views read leniently from generated payloads ([`sections`])
//! - Configuration ([`AppConfig`], [`Secrets`], config loading)

pub mod config;
pub mod error;
pub mod sections;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CronConfig, EmailConfig, GenerationConfig, Secrets, ServerConfig, StorageConfig,
    config_dir, config_file_path, expand_home, init_config, load_config, load_config_from,
};
pub use error::{DeepCutError, Result};
pub use types::{
    FallbackPayload, GenerationRequest, Idea, IdeaId, ResearchPackage, SectionKey, SectionPayload,
    SectionResult,
};
