use serde::{Deserialize, Serialize};

use warehouse_core::{CategoryId, DomainError, DomainResult, Entity, ItemId};

use crate::Unit;

/// Input for registering an item. Category resolution is the registry's job;
/// everything else is validated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub category_id: CategoryId,
    pub unit: String,
    pub reorder_threshold: i64,
}

/// An inventory-tracked good (barang).
///
/// `current_stock` is a cached projection of the item's movement stream. It is
/// zero at registration and afterwards only the stock ledger writes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ItemRecord")]
pub struct Item {
    id: ItemId,
    name: String,
    category_id: CategoryId,
    unit: Unit,
    current_stock: i64,
    reorder_threshold: i64,
    active: bool,
}

impl Item {
    pub fn register(id: ItemId, input: NewItem) -> DomainResult<Self> {
        let name = validate_name(&input.name)?;
        let unit: Unit = input.unit.parse()?;
        let reorder_threshold = validate_threshold(input.reorder_threshold)?;
        Ok(Self {
            id,
            name,
            category_id: input.category_id,
            unit,
            current_stock: 0,
            reorder_threshold,
            active: true,
        })
    }

    /// Edit descriptive fields. Stock and threshold are untouched.
    pub fn revise_details(&mut self, name: &str, category_id: CategoryId, unit: &str) -> DomainResult<()> {
        let name = validate_name(name)?;
        let unit: Unit = unit.parse()?;
        self.name = name;
        self.category_id = category_id;
        self.unit = unit;
        Ok(())
    }

    pub fn set_reorder_threshold(&mut self, threshold: i64) -> DomainResult<()> {
        self.reorder_threshold = validate_threshold(threshold)?;
        Ok(())
    }

    /// Overwrite the cached stock level with a value committed by the ledger.
    pub fn record_stock_level(&mut self, level: i64) -> DomainResult<()> {
        if level < 0 {
            return Err(DomainError::invariant("stock cannot go negative"));
        }
        self.current_stock = level;
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn id_typed(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category_id(&self) -> CategoryId {
        self.category_id
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn current_stock(&self) -> i64 {
        self.current_stock
    }

    pub fn reorder_threshold(&self) -> i64 {
        self.reorder_threshold
    }

    /// At or below the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.reorder_threshold
    }

    /// `current_stock - reorder_threshold`; lower is more critical.
    pub fn stock_margin(&self) -> i64 {
        self.current_stock - self.reorder_threshold
    }
}

/// Unchecked wire shape of [`Item`].
#[derive(Deserialize)]
struct ItemRecord {
    id: ItemId,
    name: String,
    category_id: CategoryId,
    unit: Unit,
    current_stock: i64,
    reorder_threshold: i64,
    active: bool,
}

impl TryFrom<ItemRecord> for Item {
    type Error = DomainError;

    fn try_from(record: ItemRecord) -> Result<Self, Self::Error> {
        if record.current_stock < 0 {
            return Err(DomainError::validation(format!(
                "current stock cannot be negative (got {})",
                record.current_stock
            )));
        }
        Ok(Self {
            id: record.id,
            name: validate_name(&record.name)?,
            category_id: record.category_id,
            unit: record.unit,
            current_stock: record.current_stock,
            reorder_threshold: validate_threshold(record.reorder_threshold)?,
            active: record.active,
        })
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

fn validate_name(name: &str) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn validate_threshold(threshold: i64) -> DomainResult<i64> {
    if threshold < 0 {
        return Err(DomainError::validation(format!(
            "reorder threshold cannot be negative (got {threshold})"
        )));
    }
    Ok(threshold)
}

/// Search criteria for item listings (the console's search box).
///
/// Substring matches are case-insensitive. Deactivated items are skipped unless
/// `include_inactive` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFilter {
    pub name_contains: Option<String>,
    pub category_contains: Option<String>,
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub include_inactive: bool,
}

impl ItemFilter {
    pub fn by_name(fragment: impl Into<String>) -> Self {
        Self {
            name_contains: Some(fragment.into()),
            ..Self::default()
        }
    }

    pub fn by_category_name(fragment: impl Into<String>) -> Self {
        Self {
            category_contains: Some(fragment.into()),
            ..Self::default()
        }
    }

    /// `category_name` is the resolved name of the item's category, if known.
    pub fn matches(&self, item: &Item, category_name: Option<&str>) -> bool {
        if !self.include_inactive && !item.is_active() {
            return false;
        }
        if let Some(category_id) = self.category_id {
            if item.category_id() != category_id {
                return false;
            }
        }
        if let Some(fragment) = &self.name_contains {
            if !contains_ignore_case(item.name(), fragment) {
                return false;
            }
        }
        if let Some(fragment) = &self.category_contains {
            match category_name {
                Some(name) if contains_ignore_case(name, fragment) => {}
                _ => return false,
            }
        }
        true
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_item(name: &str, unit: &str, threshold: i64) -> NewItem {
        NewItem {
            name: name.to_string(),
            category_id: CategoryId::new(),
            unit: unit.to_string(),
            reorder_threshold: threshold,
        }
    }

    #[test]
    fn registration_starts_with_zero_stock() {
        let item = Item::register(ItemId::new(), new_item("Beras", "kg", 10)).unwrap();
        assert_eq!(item.current_stock(), 0);
        assert_eq!(item.unit(), Unit::Kg);
        assert!(item.is_low_stock());
    }

    #[test]
    fn registration_rejects_bad_input() {
        assert!(matches!(
            Item::register(ItemId::new(), new_item(" ", "kg", 1)),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            Item::register(ItemId::new(), new_item("Gula", "ton", 1)),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            Item::register(ItemId::new(), new_item("Gula", "kg", -1)),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn threshold_update_leaves_stock_alone() {
        let mut item = Item::register(ItemId::new(), new_item("Minyak", "liter", 5)).unwrap();
        item.record_stock_level(12).unwrap();
        item.set_reorder_threshold(20).unwrap();
        assert_eq!(item.current_stock(), 12);
        assert_eq!(item.stock_margin(), -8);
        assert!(item.set_reorder_threshold(-3).is_err());
        assert_eq!(item.reorder_threshold(), 20);
    }

    #[test]
    fn deserialization_revalidates() {
        let mut item = Item::register(ItemId::new(), new_item("Beras", "kg", 10)).unwrap();
        item.record_stock_level(7).unwrap();
        let json = serde_json::to_value(&item).unwrap();
        let back: Item = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back, item);

        let mut negative = json.clone();
        negative["current_stock"] = serde_json::json!(-1);
        assert!(serde_json::from_value::<Item>(negative).is_err());

        let mut blank = json.clone();
        blank["name"] = serde_json::json!("  ");
        assert!(serde_json::from_value::<Item>(blank).is_err());

        let mut threshold = json;
        threshold["reorder_threshold"] = serde_json::json!(-5);
        assert!(serde_json::from_value::<Item>(threshold).is_err());
    }

    #[test]
    fn filter_matches_name_and_category_substrings() {
        let item = Item::register(ItemId::new(), new_item("Beras Pandan Wangi", "kg", 10)).unwrap();
        assert!(ItemFilter::by_name("pandan").matches(&item, Some("Sembako")));
        assert!(!ItemFilter::by_name("gula").matches(&item, Some("Sembako")));
        assert!(ItemFilter::by_category_name("semb").matches(&item, Some("Sembako")));
        assert!(!ItemFilter::by_category_name("semb").matches(&item, None));
    }

    #[test]
    fn inactive_items_are_hidden_by_default() {
        let mut item = Item::register(ItemId::new(), new_item("Kardus", "box", 0)).unwrap();
        item.deactivate();
        assert!(!ItemFilter::default().matches(&item, None));
        let all = ItemFilter {
            include_inactive: true,
            ..ItemFilter::default()
        };
        assert!(all.matches(&item, None));
    }
}
