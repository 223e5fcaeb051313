use crate::{auth::AuthUser, errors::AppError, models::Role};

/// is_allowed
///
/// The single capability check behind every protected operation.
///
/// * An admin principal is always allowed.
/// * If `required_role` is `Admin`, nobody else is.
/// * Otherwise, when the resource has an owner, only that owner is allowed;
///   a resource without an owner (e.g. a listing scoped elsewhere) is open to
///   any authenticated principal.
pub fn is_allowed(principal: &AuthUser, resource_owner: Option<i64>, required_role: Role) -> bool {
    if principal.role == Role::Admin {
        return true;
    }
    if required_role == Role::Admin {
        return false;
    }
    match resource_owner {
        Some(owner_id) => owner_id == principal.id,
        None => true,
    }
}

/// Ownership rule: the creator or an admin.
pub fn ensure_owner_or_admin(principal: &AuthUser, owner_id: i64) -> Result<(), AppError> {
    if is_allowed(principal, Some(owner_id), Role::User) {
        Ok(())
    } else {
        tracing::debug!(
            principal = principal.id,
            owner = owner_id,
            "ownership check failed"
        );
        Err(AppError::access_denied())
    }
}

pub fn ensure_admin(principal: &AuthUser) -> Result<(), AppError> {
    if is_allowed(principal, None, Role::Admin) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin privileges required".to_string()))
    }
}

/// Owner scope for listings: admins see everything, everybody else only their own rows.
pub fn listing_scope(principal: &AuthUser) -> Option<i64> {
    match principal.role {
        Role::Admin => None,
        Role::User => Some(principal.id),
    }
}
