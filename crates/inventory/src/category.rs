use serde::{Deserialize, Serialize};

use warehouse_core::{CategoryId, DomainError, DomainResult, Entity};

/// Input for registering or editing a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub description: String,
}

/// Grouping label for items (kategori). No behavioral invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    id: CategoryId,
    name: String,
    description: String,
    active: bool,
}

impl Category {
    pub fn register(id: CategoryId, input: NewCategory) -> DomainResult<Self> {
        let mut category = Self {
            id,
            name: String::new(),
            description: String::new(),
            active: true,
        };
        category.revise(input)?;
        Ok(category)
    }

    /// Replace name and description (validated like registration).
    pub fn revise(&mut self, input: NewCategory) -> DomainResult<()> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("category name cannot be empty"));
        }
        self.name = name.to_string();
        self.description = input.description.trim().to_string();
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn id_typed(&self) -> CategoryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
