use std::collections::HashMap;

use tracing::{debug, info};

use warehouse_auth::{authorize, ActorContext, Permission};
use warehouse_core::{CategoryId, DomainError, DomainResult, Entity, ItemId, SupplierId};
use warehouse_inventory::{Category, Item, ItemFilter, NewCategory, NewItem, NewSupplier, Supplier};

use super::store::RegistryStore;

/// Reference-data service: items, categories, suppliers.
///
/// Every write takes an explicit [`ActorContext`]. There is no
/// public way to set an item's stock level; only the ledger commits it.
#[derive(Debug, Clone)]
pub struct ItemRegistry<R> {
    store: R,
}

impl<R: RegistryStore> ItemRegistry<R> {
    pub fn new(store: R) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &R {
        &self.store
    }

    // ---- items ----

    pub fn create_item(&self, ctx: &ActorContext, input: NewItem) -> DomainResult<Item> {
        let principal = authorize(ctx, &Permission::REGISTRY_WRITE)?;
        self.require_assignable_category(input.category_id)?;

        let item = Item::register(ItemId::new(), input)?;
        self.store.insert_item(item.clone())?;

        info!(
            item_id = %item.id_typed(),
            name = item.name(),
            actor = %principal.actor_id,
            "item registered"
        );
        Ok(item)
    }

    /// Look up an item by id. Deactivated items still resolve.
    pub fn get_item(&self, id: ItemId) -> DomainResult<Item> {
        self.store
            .item(id)?
            .ok_or_else(|| DomainError::not_found(format!("item {id}")))
    }

    /// Snapshot of the item table, iterated lazily through `filter`.
    pub fn list_items(&self, filter: &ItemFilter) -> DomainResult<ItemListing> {
        let mut items = self.store.items()?;
        items.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.id_typed().cmp(&b.id_typed())));

        let category_names = self
            .store
            .categories()?
            .into_iter()
            .map(|c| (c.id_typed(), c.name().to_string()))
            .collect();

        debug!(total = items.len(), "item listing snapshot taken");
        Ok(ItemListing {
            items,
            category_names,
            filter: filter.clone(),
        })
    }

    pub fn update_threshold(&self, ctx: &ActorContext, id: ItemId, threshold: i64) -> DomainResult<Item> {
        let principal = authorize(ctx, &Permission::REGISTRY_WRITE)?;
        let item = self
            .store
            .modify_item(id, &mut |item| item.set_reorder_threshold(threshold))?;

        info!(item_id = %id, threshold, actor = %principal.actor_id, "reorder threshold updated");
        Ok(item)
    }

    /// Edit name, category and unit. Stock and threshold are left alone.
    pub fn update_item_details(
        &self,
        ctx: &ActorContext,
        id: ItemId,
        name: &str,
        category_id: CategoryId,
        unit: &str,
    ) -> DomainResult<Item> {
        let principal = authorize(ctx, &Permission::REGISTRY_WRITE)?;
        let current = self.get_item(id)?;
        if current.category_id() != category_id {
            self.require_assignable_category(category_id)?;
        }

        let item = self
            .store
            .modify_item(id, &mut |item| item.revise_details(name, category_id, unit))?;

        info!(item_id = %id, actor = %principal.actor_id, "item details updated");
        Ok(item)
    }

    pub fn deactivate_item(&self, ctx: &ActorContext, id: ItemId) -> DomainResult<Item> {
        let principal = authorize(ctx, &Permission::REGISTRY_DEACTIVATE)?;
        let item = self.store.modify_item(id, &mut |item| {
            item.deactivate();
            Ok(())
        })?;

        info!(item_id = %id, actor = %principal.actor_id, "item deactivated");
        Ok(item)
    }

    /// Commit a stock level computed by the ledger from the item's stream.
    pub(crate) fn commit_stock_level(&self, id: ItemId, level: i64) -> DomainResult<Item> {
        self.store.modify_item(id, &mut |item| item.record_stock_level(level))
    }

    // ---- categories ----

    pub fn create_category(&self, ctx: &ActorContext, input: NewCategory) -> DomainResult<Category> {
        let principal = authorize(ctx, &Permission::REGISTRY_WRITE)?;
        let category = Category::register(CategoryId::new(), input)?;
        self.store.insert_category(category.clone())?;

        info!(
            category_id = %category.id_typed(),
            name = category.name(),
            actor = %principal.actor_id,
            "category registered"
        );
        Ok(category)
    }

    pub fn update_category(&self, ctx: &ActorContext, id: CategoryId, input: NewCategory) -> DomainResult<Category> {
        let principal = authorize(ctx, &Permission::REGISTRY_WRITE)?;
        let category = self
            .store
            .modify_category(id, &mut |category| category.revise(input.clone()))?;

        info!(category_id = %id, actor = %principal.actor_id, "category updated");
        Ok(category)
    }

    /// Rejected while any active item still belongs to the category.
    pub fn deactivate_category(&self, ctx: &ActorContext, id: CategoryId) -> DomainResult<Category> {
        let principal = authorize(ctx, &Permission::REGISTRY_DEACTIVATE)?;

        let in_use = self
            .store
            .items()?
            .iter()
            .filter(|item| item.is_active() && item.category_id() == id)
            .count();
        if in_use > 0 {
            return Err(DomainError::validation(format!(
                "category {id} is still used by {in_use} active item(s)"
            )));
        }

        let category = self.store.modify_category(id, &mut |category| {
            category.deactivate();
            Ok(())
        })?;

        info!(category_id = %id, actor = %principal.actor_id, "category deactivated");
        Ok(category)
    }

    /// Active categories ordered by name.
    pub fn list_categories(&self) -> DomainResult<Vec<Category>> {
        let mut categories: Vec<Category> = self
            .store
            .categories()?
            .into_iter()
            .filter(|record| record.is_active())
            .collect();
        categories.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.id_typed().cmp(&b.id_typed())));
        Ok(categories)
    }

    pub fn resolve_category(&self, id: CategoryId) -> DomainResult<Category> {
        self.store
            .category(id)?
            .ok_or_else(|| DomainError::not_found(format!("category {id}")))
    }

    // ---- suppliers ----

    pub fn create_supplier(&self, ctx: &ActorContext, input: NewSupplier) -> DomainResult<Supplier> {
        let principal = authorize(ctx, &Permission::REGISTRY_WRITE)?;
        let supplier = Supplier::register(SupplierId::new(), input)?;
        self.store.insert_supplier(supplier.clone())?;

        info!(
            supplier_id = %supplier.id_typed(),
            name = supplier.name(),
            actor = %principal.actor_id,
            "supplier registered"
        );
        Ok(supplier)
    }

    pub fn update_supplier(&self, ctx: &ActorContext, id: SupplierId, input: NewSupplier) -> DomainResult<Supplier> {
        let principal = authorize(ctx, &Permission::REGISTRY_WRITE)?;
        let supplier = self
            .store
            .modify_supplier(id, &mut |supplier| supplier.revise(input.clone()))?;

        info!(supplier_id = %id, actor = %principal.actor_id, "supplier updated");
        Ok(supplier)
    }

    pub fn deactivate_supplier(&self, ctx: &ActorContext, id: SupplierId) -> DomainResult<Supplier> {
        let principal = authorize(ctx, &Permission::REGISTRY_DEACTIVATE)?;
        let supplier = self.store.modify_supplier(id, &mut |supplier| {
            supplier.deactivate();
            Ok(())
        })?;

        info!(supplier_id = %id, actor = %principal.actor_id, "supplier deactivated");
        Ok(supplier)
    }

    /// Active suppliers ordered by name.
    pub fn list_suppliers(&self) -> DomainResult<Vec<Supplier>> {
        let mut suppliers: Vec<Supplier> = self
            .store
            .suppliers()?
            .into_iter()
            .filter(|record| record.is_active())
            .collect();
        suppliers.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.id_typed().cmp(&b.id_typed())));
        Ok(suppliers)
    }

    pub fn resolve_supplier(&self, id: SupplierId) -> DomainResult<Supplier> {
        self.store
            .supplier(id)?
            .ok_or_else(|| DomainError::not_found(format!("supplier {id}")))
    }

    /// A category new or edited items may point at: it must exist and be active.
    fn require_assignable_category(&self, id: CategoryId) -> DomainResult<()> {
        match self.store.category(id)? {
            Some(category) if category.is_active() => Ok(()),
            Some(_) => Err(DomainError::validation(format!("category {id} is deactivated"))),
            None => Err(DomainError::validation(format!("category {id} does not exist"))),
        }
    }
}

/// Point-in-time item listing.
///
/// Iteration is lazy and can be restarted any number of times; every pass sees
/// the same snapshot, ordered by name.
#[derive(Debug, Clone)]
pub struct ItemListing {
    items: Vec<Item>,
    category_names: HashMap<CategoryId, String>,
    filter: ItemFilter,
}

impl ItemListing {
    pub fn iter(&self) -> impl Iterator<Item = &Item> + '_ {
        self.items.iter().filter(move |item| {
            let category = self.category_names.get(&item.category_id()).map(String::as_str);
            self.filter.matches(item, category)
        })
    }

    pub fn category_name(&self, id: CategoryId) -> Option<&str> {
        self.category_names.get(&id).map(String::as_str)
    }
}

impl<'a> IntoIterator for &'a ItemListing {
    type Item = &'a Item;
    type IntoIter = Box<dyn Iterator<Item = &'a Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
