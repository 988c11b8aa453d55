pub mod auth;
pub mod comments;
pub mod health;
pub mod tweets;

use uuid::Uuid;

use crate::error::ApiError;

/// Path ids are parsed explicitly so a malformed id becomes invalid input
/// in the standard envelope rather than a framework rejection.
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("invalid {what} id")))
}
