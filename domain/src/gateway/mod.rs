//! HTTP clients for the external APIs the integrations read from.

pub mod hubspot;
