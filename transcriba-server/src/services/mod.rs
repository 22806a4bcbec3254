//! Business logic behind the HTTP API
//!
//! Services take the pool (and configuration where needed) and return the
//! common `Result`; mapping to HTTP happens in `api`.

pub mod catalog;
pub mod images;
pub mod import;
pub mod markdown;
pub mod objects;
pub mod pages;
pub mod rbac;
pub mod users;
pub mod voting;
