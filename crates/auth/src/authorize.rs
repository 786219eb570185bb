use thiserror::Error;

use warehouse_core::DomainError;

use crate::{ActorContext, Permission, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

impl From<AuthzError> for DomainError {
    fn from(value: AuthzError) -> Self {
        DomainError::unauthorized(value.to_string())
    }
}

/// Authorize an acting context for one permission.
///
/// Returns the authenticated principal on success so callers can record who
/// acted.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize<'a>(
    context: &'a ActorContext,
    required: &Permission,
) -> Result<&'a Principal, AuthzError> {
    let Some(principal) = context.principal() else {
        tracing::warn!(permission = %required, "rejected anonymous write");
        return Err(AuthzError::Unauthenticated);
    };

    let granted = principal
        .permissions
        .iter()
        .any(|p| p.is_wildcard() || p == required);

    if granted {
        Ok(principal)
    } else {
        tracing::warn!(
            actor = %principal.actor_id,
            permission = %required,
            "rejected write: missing permission"
        );
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}
