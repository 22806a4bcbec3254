//! # Transcriba Common Library
//!
//! Shared code for the Transcriba service including:
//! - Error type used by all domain operations
//! - Configuration loading and root folder resolution
//! - Credential helpers (password hashing, tokens)
//! - Revision content tree
//! - Domain models and database queries

pub mod config;
pub mod content;
pub mod credentials;
pub mod db;
pub mod error;
pub mod models;

pub use content::TeiElement;
pub use error::{Entity, Error, Result};
