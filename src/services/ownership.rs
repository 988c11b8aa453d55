use uuid::Uuid;

use crate::models::Identity;

use super::ServiceError;

/// Owner-only authorization: a direct id equality check, no roles and no
/// delegation. Call only after the target resource is known to exist, and
/// always before the mutating store call.
pub fn ensure_owner(
    actor: &Identity,
    owner_id: Uuid,
    resource: &str,
    action: &str,
) -> Result<(), ServiceError> {
    if actor.id == owner_id {
        return Ok(());
    }
    Err(ServiceError::Forbidden(format!(
        "only {resource} owner can {action} their {resource}"
    )))
}
