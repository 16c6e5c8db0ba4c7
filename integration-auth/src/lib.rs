//! # integration-auth
//!
//! Authentication and storage plumbing for CRM integrations:
//! - OAuth 2.0 infrastructure (anti-forgery state, provider trait, token types)
//! - OAuth provider implementations (HubSpot)
//! - Key-value cache with expiry (in-memory and Redis backends)
//! - Durable identity store (in-memory and JSON document backends)
//! - HTTP client building with middleware
//! - Webhook signature validation
//!
//! ## Architecture
//!
//! This crate knows nothing about the HTTP surface or the CRM object model:
//! - `domain` composes these pieces into the OAuth flow, item fetching and cache invalidation
//! - `service` picks the cache and store backends from configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use integration_auth::{
//!     cache::{Cache, MemoryCache},
//!     oauth::{Provider, StateManager, providers::hubspot},
//!     store::{IdentityStore, JsonFileStore},
//!     http::ProviderClientBuilder,
//! };
//! ```

pub mod cache;
pub mod error;
pub mod http;
pub mod oauth;
pub mod store;
pub mod webhook;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
