use serde::{Deserialize, Serialize};

use warehouse_core::{DomainError, DomainResult, Entity, SupplierId};

/// Input for registering or editing a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSupplier {
    pub name: String,
    pub address: String,
    pub contact: String,
}

/// Vendor of incoming stock. Referenced only by stock-in events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    id: SupplierId,
    name: String,
    address: String,
    contact: String,
    active: bool,
}

impl Supplier {
    pub fn register(id: SupplierId, input: NewSupplier) -> DomainResult<Self> {
        let mut supplier = Self {
            id,
            name: String::new(),
            address: String::new(),
            contact: String::new(),
            active: true,
        };
        supplier.revise(input)?;
        Ok(supplier)
    }

    pub fn revise(&mut self, input: NewSupplier) -> DomainResult<()> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("supplier name cannot be empty"));
        }
        self.name = name.to_string();
        self.address = input.address.trim().to_string();
        self.contact = input.contact.trim().to_string();
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn id_typed(&self) -> SupplierId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn contact(&self) -> &str {
        &self.contact
    }
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
