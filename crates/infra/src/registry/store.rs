use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use warehouse_core::{CategoryId, DomainError, DomainResult, Entity, ItemId, SupplierId};
use warehouse_inventory::{Category, Item, Supplier};

/// Storage for registry records.
///
/// `modify_*` runs the closure against the stored record under the store's
/// write lock, so concurrent edits to different fields of the same record
/// (e.g. a threshold edit and a stock-level commit) never overwrite each other.
/// If the closure fails the stored record is left unchanged.
pub trait RegistryStore: Send + Sync {
    /// Insert a new item; `Conflict` if the id is already taken.
    fn insert_item(&self, item: Item) -> DomainResult<()>;
    fn item(&self, id: ItemId) -> DomainResult<Option<Item>>;
    fn items(&self) -> DomainResult<Vec<Item>>;
    fn modify_item(&self, id: ItemId, f: &mut dyn FnMut(&mut Item) -> DomainResult<()>) -> DomainResult<Item>;

    fn insert_category(&self, category: Category) -> DomainResult<()>;
    fn category(&self, id: CategoryId) -> DomainResult<Option<Category>>;
    fn categories(&self) -> DomainResult<Vec<Category>>;
    fn modify_category(
        &self,
        id: CategoryId,
        f: &mut dyn FnMut(&mut Category) -> DomainResult<()>,
    ) -> DomainResult<Category>;

    fn insert_supplier(&self, supplier: Supplier) -> DomainResult<()>;
    fn supplier(&self, id: SupplierId) -> DomainResult<Option<Supplier>>;
    fn suppliers(&self) -> DomainResult<Vec<Supplier>>;
    fn modify_supplier(
        &self,
        id: SupplierId,
        f: &mut dyn FnMut(&mut Supplier) -> DomainResult<()>,
    ) -> DomainResult<Supplier>;
}

impl<S> RegistryStore for Arc<S>
where
    S: RegistryStore + ?Sized,
{
    fn insert_item(&self, item: Item) -> DomainResult<()> {
        (**self).insert_item(item)
    }

    fn item(&self, id: ItemId) -> DomainResult<Option<Item>> {
        (**self).item(id)
    }

    fn items(&self) -> DomainResult<Vec<Item>> {
        (**self).items()
    }

    fn modify_item(&self, id: ItemId, f: &mut dyn FnMut(&mut Item) -> DomainResult<()>) -> DomainResult<Item> {
        (**self).modify_item(id, f)
    }

    fn insert_category(&self, category: Category) -> DomainResult<()> {
        (**self).insert_category(category)
    }

    fn category(&self, id: CategoryId) -> DomainResult<Option<Category>> {
        (**self).category(id)
    }

    fn categories(&self) -> DomainResult<Vec<Category>> {
        (**self).categories()
    }

    fn modify_category(
        &self,
        id: CategoryId,
        f: &mut dyn FnMut(&mut Category) -> DomainResult<()>,
    ) -> DomainResult<Category> {
        (**self).modify_category(id, f)
    }

    fn insert_supplier(&self, supplier: Supplier) -> DomainResult<()> {
        (**self).insert_supplier(supplier)
    }

    fn supplier(&self, id: SupplierId) -> DomainResult<Option<Supplier>> {
        (**self).supplier(id)
    }

    fn suppliers(&self) -> DomainResult<Vec<Supplier>> {
        (**self).suppliers()
    }

    fn modify_supplier(
        &self,
        id: SupplierId,
        f: &mut dyn FnMut(&mut Supplier) -> DomainResult<()>,
    ) -> DomainResult<Supplier> {
        (**self).modify_supplier(id, f)
    }
}

/// One keyed table of entities.
#[derive(Debug)]
struct Table<K, V> {
    label: &'static str,
    rows: RwLock<HashMap<K, V>>,
}

impl<K, V> Table<K, V>
where
    K: Copy + Eq + Hash + core::fmt::Display,
    V: Clone + Entity<Id = K>,
{
    fn new(label: &'static str) -> Self {
        Self {
            label,
            rows: RwLock::new(HashMap::new()),
        }
    }

    fn poisoned(&self) -> DomainError {
        DomainError::invariant(format!("{} table lock poisoned", self.label))
    }

    fn insert(&self, value: V) -> DomainResult<()> {
        let mut rows = self.rows.write().map_err(|_| self.poisoned())?;
        let key = *value.id();
        if rows.contains_key(&key) {
            return Err(DomainError::conflict(format!("{} {key} already exists", self.label)));
        }
        rows.insert(key, value);
        Ok(())
    }

    fn get(&self, key: K) -> DomainResult<Option<V>> {
        let rows = self.rows.read().map_err(|_| self.poisoned())?;
        Ok(rows.get(&key).cloned())
    }

    fn all(&self) -> DomainResult<Vec<V>> {
        let rows = self.rows.read().map_err(|_| self.poisoned())?;
        Ok(rows.values().cloned().collect())
    }

    fn modify(&self, key: K, f: &mut dyn FnMut(&mut V) -> DomainResult<()>) -> DomainResult<V> {
        let mut rows = self.rows.write().map_err(|_| self.poisoned())?;
        let current = rows
            .get(&key)
            .ok_or_else(|| DomainError::not_found(format!("{} {key}", self.label)))?;

        // Work on a copy so a failing closure leaves the stored row intact.
        let mut draft = current.clone();
        f(&mut draft)?;
        rows.insert(key, draft.clone());
        Ok(draft)
    }
}

/// In-memory registry store for tests/dev.
#[derive(Debug)]
pub struct InMemoryRegistryStore {
    items: Table<ItemId, Item>,
    categories: Table<CategoryId, Category>,
    suppliers: Table<SupplierId, Supplier>,
}

impl InMemoryRegistryStore {
    pub fn new() -> Self {
        Self {
            items: Table::new("item"),
            categories: Table::new("category"),
            suppliers: Table::new("supplier"),
        }
    }
}

impl Default for InMemoryRegistryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryStore for InMemoryRegistryStore {
    fn insert_item(&self, item: Item) -> DomainResult<()> {
        self.items.insert(item)
    }

    fn item(&self, id: ItemId) -> DomainResult<Option<Item>> {
        self.items.get(id)
    }

    fn items(&self) -> DomainResult<Vec<Item>> {
        self.items.all()
    }

    fn modify_item(&self, id: ItemId, f: &mut dyn FnMut(&mut Item) -> DomainResult<()>) -> DomainResult<Item> {
        self.items.modify(id, f)
    }

    fn insert_category(&self, category: Category) -> DomainResult<()> {
        self.categories.insert(category)
    }

    fn category(&self, id: CategoryId) -> DomainResult<Option<Category>> {
        self.categories.get(id)
    }

    fn categories(&self) -> DomainResult<Vec<Category>> {
        self.categories.all()
    }

    fn modify_category(
        &self,
        id: CategoryId,
        f: &mut dyn FnMut(&mut Category) -> DomainResult<()>,
    ) -> DomainResult<Category> {
        self.categories.modify(id, f)
    }

    fn insert_supplier(&self, supplier: Supplier) -> DomainResult<()> {
        self.suppliers.insert(supplier)
    }

    fn supplier(&self, id: SupplierId) -> DomainResult<Option<Supplier>> {
        self.suppliers.get(id)
    }

    fn suppliers(&self) -> DomainResult<Vec<Supplier>> {
        self.suppliers.all()
    }

    fn modify_supplier(
        &self,
        id: SupplierId,
        f: &mut dyn FnMut(&mut Supplier) -> DomainResult<()>,
    ) -> DomainResult<Supplier> {
        self.suppliers.modify(id, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warehouse_inventory::NewCategory;

    fn category(name: &str) -> Category {
        Category::register(
            CategoryId::new(),
            NewCategory {
                name: name.to_string(),
                description: String::new(),
            },
        )
        .unwrap()
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let store = InMemoryRegistryStore::new();
        let c = category("Sembako");
        store.insert_category(c.clone()).unwrap();
        assert!(matches!(store.insert_category(c), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn failed_modification_leaves_record_unchanged() {
        let store = InMemoryRegistryStore::new();
        let c = category("Sembako");
        let id = c.id_typed();
        store.insert_category(c).unwrap();

        let result = store.modify_category(id, &mut |c| {
            c.deactivate();
            Err(DomainError::validation("nope"))
        });
        assert!(result.is_err());
        assert!(store.category(id).unwrap().unwrap().is_active());
    }

    #[test]
    fn modifying_a_missing_record_is_not_found() {
        let store = InMemoryRegistryStore::new();
        let err = store.modify_item(ItemId::new(), &mut |_| Ok(())).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }
}
