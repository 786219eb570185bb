use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are opaque strings (e.g. "stock.out.record"). The wildcard
/// `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    /// Record incoming stock (stok masuk).
    pub const STOCK_IN_RECORD: Permission = Permission::from_static("stock.in.record");
    /// Record outgoing stock (stok keluar).
    pub const STOCK_OUT_RECORD: Permission = Permission::from_static("stock.out.record");
    /// Create and edit items, categories and suppliers.
    pub const REGISTRY_WRITE: Permission = Permission::from_static("registry.write");
    /// Soft-delete reference data.
    pub const REGISTRY_DEACTIVATE: Permission = Permission::from_static("registry.deactivate");
    pub const WILDCARD: Permission = Permission::from_static("*");

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
