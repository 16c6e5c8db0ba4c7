//! Parameters for the HubSpot integration endpoints.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Identifies whose HubSpot connection a request is about.
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct UserOrgParams {
    /// Caller-side user identifier
    pub user_id: String,
    /// Caller-side organization identifier
    pub org_id: String,
}

/// Credentials previously returned by the credentials endpoint, as a JSON string.
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ItemsParams {
    pub credentials: String,
}
