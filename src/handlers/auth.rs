use axum::Extension;

use crate::middleware::auth::CurrentUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::models::Identity;

/// GET /api/auth/whoami - Current authenticated user
///
/// Returns the identity resolved from the access token; secret account
/// fields are never part of this shape.
pub async fn whoami(Extension(CurrentUser(identity)): Extension<CurrentUser>) -> ApiResult<Identity> {
    Ok(ApiResponse::new(identity, "user fetched successfully"))
}
