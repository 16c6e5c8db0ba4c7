//! OAuth provider implementations.

pub mod hubspot;
