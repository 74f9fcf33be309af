//! # icinga-core
//!
//! Core types and utilities for working with the Icinga 2 REST API.
//!
//! This crate provides the shared error taxonomy, configuration, authentication
//! context and response normalization used by the Icinga client crates.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy and classified API failures
//! - [`auth`] - Certificate or basic-auth credentials
//! - [`types`] - Host/service states and object types
//! - [`config`] - Client configuration, defaults and environment loading
//! - [`client`] - HTTP client settings, retry policy and the retry sleeper
//! - [`normalize`] - Response body decoding and `results` envelope handling
//! - [`query`] - URL query parameter builder

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod normalize;
pub mod query;
pub mod types;

// Re-export commonly used types
pub use auth::AuthContext;
pub use error::{Error, Failure, FailureKind, Result};
pub use normalize::Document;

/// Version of the client crates, fixed at build time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
