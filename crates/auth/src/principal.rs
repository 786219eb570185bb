use serde::{Deserialize, Serialize};

use warehouse_core::{DomainError, DomainResult};

use crate::{Permission, Role};

/// Identity of the acting user, as recorded in `recorded_by` on movements.
///
/// Never empty: an actor that cannot be named cannot be audited.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActorId(String);

impl ActorId {
    pub fn new(value: impl Into<String>) -> DomainResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("actor cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ActorId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ActorId> for String {
    fn from(value: ActorId) -> Self {
        value.0
    }
}

impl core::fmt::Display for ActorId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fully resolved principal for authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub actor_id: ActorId,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

impl Principal {
    /// Build a principal whose permissions are derived from its roles.
    pub fn with_roles(actor_id: ActorId, roles: Vec<Role>) -> Self {
        let mut permissions: Vec<Permission> = roles.iter().flat_map(Role::permissions).collect();
        permissions.dedup();
        Self {
            actor_id,
            roles,
            permissions,
        }
    }

    pub fn admin(actor_id: ActorId) -> Self {
        Self::with_roles(actor_id, vec![Role::ADMIN])
    }

    pub fn staff(actor_id: ActorId) -> Self {
        Self::with_roles(actor_id, vec![Role::STAFF])
    }
}

/// The acting context handed to every write operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActorContext {
    /// No authenticated session.
    Anonymous,
    Authenticated(Principal),
}

impl ActorContext {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            ActorContext::Anonymous => None,
            ActorContext::Authenticated(p) => Some(p),
        }
    }
}

impl From<Principal> for ActorContext {
    fn from(value: Principal) -> Self {
        ActorContext::Authenticated(value)
    }
}
