use axum::extract::rejection::{FormRejection, QueryRejection};

use crate::error::{Error, WebErrorKind};

pub(crate) mod health_check_controller;
pub(crate) mod integration_controller;
pub(crate) mod oauth_controller;
pub(crate) mod webhook_controller;

/// Report malformed query strings and forms in the common `{"detail"}` shape.
pub(crate) fn query_error(rejection: QueryRejection) -> Error {
    Error::Web(WebErrorKind::Input(rejection.body_text()))
}

pub(crate) fn form_error(rejection: FormRejection) -> Error {
    Error::Web(WebErrorKind::Input(rejection.body_text()))
}
