//! `warehouse-auth`: pure authorization boundary.
//!
//! Authentication and session storage live outside this workspace; callers hand
//! the domain an explicit [`ActorContext`] on every write instead of relying on
//! ambient process-wide state.

pub mod authorize;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{authorize, AuthzError};
pub use permissions::Permission;
pub use principal::{ActorContext, ActorId, Principal};
pub use roles::Role;
