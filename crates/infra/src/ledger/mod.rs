//! Stock movement ledger: the only writer of item stock.
//!
//! Every stock-in/stock-out runs the same pipeline:
//!
//! ```text
//! request
//!   ↓ authorize actor, validate quantity
//!   ↓ normalize occurred_at to the reporting offset
//!   ↓ reserve the request id (if any); a committed replay returns here
//!   ↓ require an active item (and supplier)
//!   ↓ take the item lock
//!   ↓ load stream → rehydrate StockItem → handle → append(Exact(version))
//!   ↓ commit the new stock level to the registry
//! event
//! ```
//!
//! The item lock makes check-and-decrement indivisible within this process;
//! the store's expected-version check catches any writer outside it. Version
//! conflicts are retried a bounded number of times, then surface as `Conflict`.

mod history;
mod idempotency;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use warehouse_auth::{authorize, ActorContext, Permission, Principal};
use warehouse_core::{
    AggregateRoot, DomainError, DomainResult, Entity, EventId, ExpectedVersion, ItemId, RequestId,
    SupplierId,
};
use warehouse_events::{execute, Command};
use warehouse_inventory::{
    DateRange, IssueStock, LocalInstant, Quantity, ReceiveStock, StockCommand, StockInEvent, StockItem,
    StockMovementEvent, StockOutEvent, TimestampNormalizer, STOCK_AGGREGATE_TYPE,
};

use crate::event_store::{EventFilter, EventStore, StoredEvent, UncommittedEvent};
use crate::registry::{ItemRegistry, RegistryStore};

pub use history::MovementHistory;
use idempotency::{Fingerprint, ReceiptBook, Reservation};

/// Default number of re-attempts after a version conflict.
pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;

/// Stock-in submission (stok masuk).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockInRequest {
    pub item_id: ItemId,
    pub supplier_id: SupplierId,
    pub quantity: i64,
    pub occurred_at: LocalInstant,
    #[serde(default)]
    pub request_id: Option<RequestId>,
}

/// Stock-out submission (stok keluar).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockOutRequest {
    pub item_id: ItemId,
    pub destination: String,
    pub quantity: i64,
    pub occurred_at: LocalInstant,
    #[serde(default)]
    pub request_id: Option<RequestId>,
}

/// One mutex per item, created on first use.
#[derive(Debug, Default)]
struct ItemLocks {
    locks: Mutex<HashMap<ItemId, Arc<Mutex<()>>>>,
}

impl ItemLocks {
    fn for_item(&self, item_id: ItemId) -> DomainResult<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| DomainError::invariant("item lock table poisoned"))?;
        Ok(Arc::clone(locks.entry(item_id).or_default()))
    }
}

#[derive(Debug)]
pub struct StockLedger<S, R> {
    store: S,
    registry: ItemRegistry<R>,
    normalizer: TimestampNormalizer,
    max_conflict_retries: u32,
    locks: ItemLocks,
    receipts: ReceiptBook,
}

impl<S, R> StockLedger<S, R>
where
    S: EventStore,
    R: RegistryStore,
{
    /// Build a ledger over an existing store.
    ///
    /// Request ids already present in the store are loaded so replays stay
    /// idempotent across restarts.
    pub fn new(
        store: S,
        registry: ItemRegistry<R>,
        normalizer: TimestampNormalizer,
        max_conflict_retries: u32,
    ) -> DomainResult<Self> {
        let ledger = Self {
            store,
            registry,
            normalizer,
            max_conflict_retries,
            locks: ItemLocks::default(),
            receipts: ReceiptBook::new(),
        };

        let filter = EventFilter {
            aggregate_type: Some(STOCK_AGGREGATE_TYPE.to_string()),
            ..EventFilter::default()
        };
        for stored in ledger.store.query(&filter)? {
            let event = decode(&stored)?;
            if let Some(request_id) = event.request_id() {
                ledger.receipts.record(request_id, event)?;
            }
        }
        debug!(receipts = ledger.receipts.len()?, "stock ledger ready");

        Ok(ledger)
    }

    pub fn registry(&self) -> &ItemRegistry<R> {
        &self.registry
    }

    pub fn normalizer(&self) -> &TimestampNormalizer {
        &self.normalizer
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    #[tracing::instrument(
        skip(self, ctx, request),
        fields(item_id = %request.item_id, quantity = request.quantity)
    )]
    pub fn record_stock_in(&self, ctx: &ActorContext, request: StockInRequest) -> DomainResult<StockInEvent> {
        let principal = authorize(ctx, &Permission::STOCK_IN_RECORD)?;
        let quantity = Quantity::new(request.quantity)?;
        let occurred_at = self.normalizer.normalize(&request.occurred_at)?;
        let (item_id, supplier_id) = (request.item_id, request.supplier_id);

        let command = StockCommand::ReceiveStock(ReceiveStock {
            event_id: EventId::new(),
            item_id,
            supplier_id,
            quantity,
            occurred_at,
            recorded_by: principal.actor_id.clone(),
            request_id: request.request_id,
        });

        let precheck = || {
            self.require_active_item(item_id)?;
            self.require_active_supplier(supplier_id)
        };
        match self.commit(principal, request.request_id, command, precheck)? {
            StockMovementEvent::StockIn(event) => Ok(event),
            StockMovementEvent::StockOut(event) => Err(DomainError::invariant(format!(
                "stock-in produced stock-out event {}",
                event.id
            ))),
        }
    }

    #[tracing::instrument(
        skip(self, ctx, request),
        fields(item_id = %request.item_id, quantity = request.quantity)
    )]
    pub fn record_stock_out(&self, ctx: &ActorContext, request: StockOutRequest) -> DomainResult<StockOutEvent> {
        let principal = authorize(ctx, &Permission::STOCK_OUT_RECORD)?;
        let quantity = Quantity::new(request.quantity)?;
        let occurred_at = self.normalizer.normalize(&request.occurred_at)?;
        let item_id = request.item_id;

        let command = StockCommand::IssueStock(IssueStock {
            event_id: EventId::new(),
            item_id,
            destination: request.destination,
            quantity,
            occurred_at,
            recorded_by: principal.actor_id.clone(),
            request_id: request.request_id,
        });

        let precheck = || self.require_active_item(item_id);
        let committed = self
            .commit(principal, request.request_id, command, precheck)
            .inspect_err(|err| {
                if let DomainError::InsufficientStock {
                    requested, available, ..
                } = err
                {
                    warn!(requested, available, "stock-out rejected: insufficient stock");
                }
            })?;

        match committed {
            StockMovementEvent::StockOut(event) => Ok(event),
            StockMovementEvent::StockIn(event) => Err(DomainError::invariant(format!(
                "stock-out produced stock-in event {}",
                event.id
            ))),
        }
    }

    /// Events of one item, optionally limited to an inclusive time window.
    pub fn get_history(&self, item_id: ItemId, range: Option<DateRange>) -> DomainResult<MovementHistory> {
        self.registry.get_item(item_id)?;

        let filter = EventFilter {
            aggregate_id: Some(item_id),
            aggregate_type: Some(STOCK_AGGREGATE_TYPE.to_string()),
            occurred_from: range.as_ref().map(DateRange::start),
            occurred_until: range.as_ref().map(DateRange::end),
            ..EventFilter::default()
        };
        let events = self
            .store
            .query(&filter)?
            .iter()
            .map(decode)
            .collect::<DomainResult<Vec<_>>>()?;

        debug!(item_id = %item_id, events = events.len(), "history loaded");
        Ok(MovementHistory::new(item_id, range, events))
    }

    /// Stock level derived from the item's committed stream.
    pub fn current_stock(&self, item_id: ItemId) -> DomainResult<i64> {
        self.registry.get_item(item_id)?;
        let history = self.store.load_stream(item_id)?;
        Ok(rehydrate(item_id, &history)?.stock())
    }

    /// Rewrite every item's cached stock level from its stream.
    ///
    /// Returns how many items had drifted. Normally zero; a non-zero result
    /// means a commit was interrupted between the append and the cache write.
    pub fn resync_stock_levels(&self) -> DomainResult<usize> {
        let mut corrected = 0;
        for item in self.registry.store().items()? {
            let item_id = item.id_typed();
            let lock = self.locks.for_item(item_id)?;
            let _serialized = lock
                .lock()
                .map_err(|_| DomainError::invariant(format!("lock for item {item_id} poisoned")))?;

            let level = rehydrate(item_id, &self.store.load_stream(item_id)?)?.stock();
            let cached = self.registry.get_item(item_id)?.current_stock();
            if cached != level {
                warn!(item_id = %item_id, cached, level, "stock cache drifted; resyncing");
                self.registry.commit_stock_level(item_id, level)?;
                corrected += 1;
            }
        }
        Ok(corrected)
    }

    fn require_active_item(&self, item_id: ItemId) -> DomainResult<()> {
        let item = self.registry.get_item(item_id)?;
        if !item.is_active() {
            return Err(DomainError::validation(format!("item {item_id} is deactivated")));
        }
        Ok(())
    }

    fn require_active_supplier(&self, supplier_id: SupplierId) -> DomainResult<()> {
        let supplier = self.registry.resolve_supplier(supplier_id)?;
        if !supplier.is_active() {
            return Err(DomainError::validation(format!("supplier {supplier_id} is deactivated")));
        }
        Ok(())
    }

    /// Reserve the request id, then run `precheck` and the append.
    ///
    /// A replay of a committed request id returns the original event without
    /// running `precheck`, so it still succeeds after the item is deactivated.
    fn commit(
        &self,
        principal: &Principal,
        request_id: Option<RequestId>,
        command: StockCommand,
        precheck: impl FnOnce() -> DomainResult<()>,
    ) -> DomainResult<StockMovementEvent> {
        let reservation = match request_id {
            Some(id) => match self.receipts.reserve(id, Fingerprint::of_command(&command))? {
                Reservation::Replay(event) => {
                    info!(request_id = %id, event_id = %event.id(), "replayed idempotent submission");
                    return Ok(event);
                }
                Reservation::Fresh(guard) => Some(guard),
            },
            None => None,
        };
        precheck()?;

        let item_id = command.target_aggregate_id();
        let lock = self.locks.for_item(item_id)?;
        let _serialized = lock
            .lock()
            .map_err(|_| DomainError::invariant(format!("lock for item {item_id} poisoned")))?;

        let (event, level) = self.append_with_retry(item_id, &command)?;

        if let Some(guard) = reservation {
            guard.complete(event.clone())?;
        }

        info!(
            item_id = %item_id,
            event_id = %event.id(),
            direction = %event.direction(),
            quantity = event.quantity().get(),
            stock = level,
            actor = %principal.actor_id,
            "stock movement committed"
        );
        Ok(event)
    }

    fn append_with_retry(&self, item_id: ItemId, command: &StockCommand) -> DomainResult<(StockMovementEvent, i64)> {
        let mut attempt = 0;
        loop {
            match self.try_append(item_id, command) {
                Err(err) if err.is_retryable() => {
                    if attempt >= self.max_conflict_retries {
                        warn!(item_id = %item_id, attempts = attempt + 1, "giving up after version conflicts");
                        return Err(err);
                    }
                    attempt += 1;
                    warn!(item_id = %item_id, attempt, error = %err, "version conflict; retrying");
                }
                other => return other,
            }
        }
    }

    /// One optimistic attempt: decide against the current stream, append at its version.
    fn try_append(&self, item_id: ItemId, command: &StockCommand) -> DomainResult<(StockMovementEvent, i64)> {
        let history = self.store.load_stream(item_id)?;
        let mut stock = rehydrate(item_id, &history)?;
        let expected = ExpectedVersion::Exact(stock.version());

        let decided = execute(&mut stock, command)?;
        let uncommitted = decided
            .iter()
            .map(|e| UncommittedEvent::from_typed(item_id, STOCK_AGGREGATE_TYPE, e.id(), e))
            .collect::<Result<Vec<_>, _>>()?;
        self.store.append(uncommitted, expected)?;

        let level = stock.stock();
        self.registry.commit_stock_level(item_id, level)?;

        let event = decided
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::invariant("stock command decided no events"))?;
        Ok((event, level))
    }
}

pub(crate) fn decode(stored: &StoredEvent) -> DomainResult<StockMovementEvent> {
    Ok(stored.decode::<StockMovementEvent>()?.into_payload())
}

/// Rebuild the stock aggregate from its stream, checking the stream is intact.
fn rehydrate(item_id: ItemId, history: &[StoredEvent]) -> DomainResult<StockItem> {
    let mut stock = StockItem::empty(item_id);
    for stored in history {
        if stored.aggregate_id != item_id || stored.aggregate_type != STOCK_AGGREGATE_TYPE {
            return Err(DomainError::invariant(format!(
                "event {} does not belong to stock stream {item_id}",
                stored.event_id
            )));
        }
        if stored.sequence_number != stock.version() + 1 {
            return Err(DomainError::invariant(format!(
                "stock stream {item_id} has a gap before sequence {}",
                stored.sequence_number
            )));
        }
        let event = decode(stored)?;
        warehouse_core::Aggregate::apply(&mut stock, &event);
    }
    Ok(stock)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Barrier;

    use super::*;
    use crate::event_store::{EventStoreError, InMemoryEventStore};
    use crate::registry::InMemoryRegistryStore;
    use proptest::prelude::*;
    use warehouse_auth::ActorId;
    use warehouse_inventory::{NewCategory, NewItem, NewSupplier};

    /// Fails the first `failures` appends with a version conflict.
    struct FlakyStore {
        inner: InMemoryEventStore,
        failures: AtomicU32,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                inner: InMemoryEventStore::new(),
                failures: AtomicU32::new(failures),
            }
        }
    }

    impl EventStore for FlakyStore {
        fn append(
            &self,
            events: Vec<UncommittedEvent>,
            expected_version: ExpectedVersion,
        ) -> Result<Vec<StoredEvent>, EventStoreError> {
            let injected = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if injected {
                return Err(EventStoreError::Concurrency("injected".into()));
            }
            self.inner.append(events, expected_version)
        }

        fn load_stream(&self, aggregate_id: ItemId) -> Result<Vec<StoredEvent>, EventStoreError> {
            self.inner.load_stream(aggregate_id)
        }

        fn query(&self, filter: &EventFilter) -> Result<Vec<StoredEvent>, EventStoreError> {
            self.inner.query(filter)
        }
    }

    struct Fixture<S> {
        ledger: StockLedger<S, Arc<InMemoryRegistryStore>>,
        item_id: ItemId,
        supplier_id: SupplierId,
    }

    fn staff() -> ActorContext {
        Principal::staff(ActorId::new("petugas-1").unwrap()).into()
    }

    fn admin() -> ActorContext {
        Principal::admin(ActorId::new("admin").unwrap()).into()
    }

    fn fixture<S: EventStore>(store: S) -> Fixture<S> {
        let registry = ItemRegistry::new(Arc::new(InMemoryRegistryStore::new()));
        let category = registry
            .create_category(
                &admin(),
                NewCategory {
                    name: "Sembako".into(),
                    description: String::new(),
                },
            )
            .unwrap();
        let supplier = registry
            .create_supplier(
                &admin(),
                NewSupplier {
                    name: "PT Sumber Pangan".into(),
                    address: "Jakarta".into(),
                    contact: "021-555".into(),
                },
            )
            .unwrap();
        let item = registry
            .create_item(
                &admin(),
                NewItem {
                    name: "Beras".into(),
                    category_id: category.id_typed(),
                    unit: "kg".into(),
                    reorder_threshold: 10,
                },
            )
            .unwrap();

        let ledger = StockLedger::new(store, registry, TimestampNormalizer::default(), DEFAULT_MAX_CONFLICT_RETRIES).unwrap();
        Fixture {
            ledger,
            item_id: item.id_typed(),
            supplier_id: supplier.id_typed(),
        }
    }

    fn stock_in(f: &Fixture<impl EventStore>, qty: i64, at: &str) -> StockInRequest {
        StockInRequest {
            item_id: f.item_id,
            supplier_id: f.supplier_id,
            quantity: qty,
            occurred_at: LocalInstant::wall_clock(at),
            request_id: None,
        }
    }

    fn stock_out(f: &Fixture<impl EventStore>, qty: i64, at: &str) -> StockOutRequest {
        StockOutRequest {
            item_id: f.item_id,
            destination: "Cabang Kemayoran".into(),
            quantity: qty,
            occurred_at: LocalInstant::wall_clock(at),
            request_id: None,
        }
    }

    fn cached_stock(f: &Fixture<impl EventStore>) -> i64 {
        f.ledger.registry().get_item(f.item_id).unwrap().current_stock()
    }

    #[test]
    fn stock_in_and_out_update_cache_and_stream() {
        let f = fixture(InMemoryEventStore::new());
        let event = f.ledger.record_stock_in(&staff(), stock_in(&f, 50, "2024-01-15 08:00")).unwrap();
        assert_eq!(event.recorded_by.as_str(), "petugas-1");
        assert_eq!(event.occurred_at.offset().local_minus_utc(), 7 * 3600);

        f.ledger.record_stock_out(&staff(), stock_out(&f, 20, "2024-01-15 09:00")).unwrap();
        assert_eq!(cached_stock(&f), 30);
        assert_eq!(f.ledger.current_stock(f.item_id).unwrap(), 30);
    }

    #[test]
    fn overdraw_is_rejected_without_side_effects() {
        let f = fixture(InMemoryEventStore::new());
        f.ledger.record_stock_in(&staff(), stock_in(&f, 30, "2024-01-15 08:00")).unwrap();

        let err = f
            .ledger
            .record_stock_out(&staff(), stock_out(&f, 35, "2024-01-15 09:00"))
            .unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock(f.item_id, 35, 30));
        assert_eq!(cached_stock(&f), 30);
        assert_eq!(f.ledger.get_history(f.item_id, None).unwrap().len(), 1);
    }

    #[test]
    fn invalid_requests_are_rejected_before_touching_the_store() {
        let f = fixture(InMemoryEventStore::new());

        let zero = f.ledger.record_stock_in(&staff(), stock_in(&f, 0, "2024-01-15 08:00"));
        assert!(matches!(zero, Err(DomainError::Validation(_))));

        let bad_time = f.ledger.record_stock_in(&staff(), stock_in(&f, 5, "kemarin sore"));
        assert!(matches!(bad_time, Err(DomainError::Validation(_))));

        let mut unknown_item = stock_in(&f, 5, "2024-01-15 08:00");
        unknown_item.item_id = ItemId::new();
        assert!(matches!(
            f.ledger.record_stock_in(&staff(), unknown_item),
            Err(DomainError::NotFound(_))
        ));

        let mut unknown_supplier = stock_in(&f, 5, "2024-01-15 08:00");
        unknown_supplier.supplier_id = SupplierId::new();
        assert!(matches!(
            f.ledger.record_stock_in(&staff(), unknown_supplier),
            Err(DomainError::NotFound(_))
        ));

        let anonymous = f
            .ledger
            .record_stock_in(&ActorContext::Anonymous, stock_in(&f, 5, "2024-01-15 08:00"));
        assert!(matches!(anonymous, Err(DomainError::Unauthorized(_))));

        let mut blank = stock_out(&f, 1, "2024-01-15 08:00");
        blank.destination = "   ".into();
        assert!(matches!(
            f.ledger.record_stock_out(&staff(), blank),
            Err(DomainError::Validation(_))
        ));

        assert!(f.ledger.get_history(f.item_id, None).unwrap().is_empty());
        assert_eq!(cached_stock(&f), 0);
    }

    #[test]
    fn deactivated_item_cannot_receive_movements() {
        let f = fixture(InMemoryEventStore::new());
        f.ledger.registry().deactivate_item(&admin(), f.item_id).unwrap();
        let err = f
            .ledger
            .record_stock_in(&staff(), stock_in(&f, 5, "2024-01-15 08:00"))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn conflicts_are_retried_then_surface() {
        let f = fixture(FlakyStore::new(2));
        f.ledger.record_stock_in(&staff(), stock_in(&f, 5, "2024-01-15 08:00")).unwrap();
        assert_eq!(cached_stock(&f), 5);

        let f = fixture(FlakyStore::new(DEFAULT_MAX_CONFLICT_RETRIES + 1));
        let err = f
            .ledger
            .record_stock_in(&staff(), stock_in(&f, 5, "2024-01-15 08:00"))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(cached_stock(&f), 0);
        assert!(f.ledger.get_history(f.item_id, None).unwrap().is_empty());
    }

    #[test]
    fn history_is_inclusive_ordered_and_restartable() {
        let f = fixture(InMemoryEventStore::new());
        f.ledger.record_stock_in(&staff(), stock_in(&f, 10, "2024-01-15 10:00")).unwrap();
        f.ledger.record_stock_in(&staff(), stock_in(&f, 20, "2024-01-15 08:00")).unwrap();
        f.ledger.record_stock_out(&staff(), stock_out(&f, 5, "2024-01-16 08:00")).unwrap();

        let range = DateRange::new(
            f.ledger.normalizer().normalize(&LocalInstant::wall_clock("2024-01-15 08:00")).unwrap(),
            f.ledger.normalizer().normalize(&LocalInstant::wall_clock("2024-01-15 10:00")).unwrap(),
        )
        .unwrap();
        let history = f.ledger.get_history(f.item_id, Some(range)).unwrap();

        let quantities: Vec<i64> = history.iter().map(|e| e.quantity().get()).collect();
        assert_eq!(quantities, vec![20, 10]);
        let restarted: Vec<i64> = (&history).into_iter().map(|e| e.quantity().get()).collect();
        assert_eq!(restarted, quantities);
        assert!(history.iter().all(|e| e.item_id() == f.item_id));

        let missing = f.ledger.get_history(ItemId::new(), None).unwrap_err();
        assert!(matches!(missing, DomainError::NotFound(_)));
    }

    #[test]
    fn request_ids_apply_at_most_once() {
        let f = fixture(InMemoryEventStore::new());
        let request_id = RequestId::new();
        let mut request = stock_in(&f, 50, "2024-01-15 08:00");
        request.request_id = Some(request_id);

        let first = f.ledger.record_stock_in(&staff(), request.clone()).unwrap();
        let replay = f.ledger.record_stock_in(&staff(), request.clone()).unwrap();
        assert_eq!(first, replay);
        assert_eq!(cached_stock(&f), 50);
        assert_eq!(f.ledger.get_history(f.item_id, None).unwrap().len(), 1);

        request.quantity = 51;
        let err = f.ledger.record_stock_in(&staff(), request).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn replay_succeeds_after_the_item_is_deactivated() {
        let f = fixture(InMemoryEventStore::new());
        let mut request = stock_in(&f, 9, "2024-01-15 08:00");
        request.request_id = Some(RequestId::new());
        let first = f.ledger.record_stock_in(&staff(), request.clone()).unwrap();

        f.ledger.registry().deactivate_item(&admin(), f.item_id).unwrap();

        let replay = f.ledger.record_stock_in(&staff(), request).unwrap();
        assert_eq!(first, replay);

        let mut fresh = stock_in(&f, 9, "2024-01-15 08:00");
        fresh.request_id = Some(RequestId::new());
        let err = f.ledger.record_stock_in(&staff(), fresh).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(f.ledger.get_history(f.item_id, None).unwrap().len(), 1);
    }

    #[test]
    fn extreme_quantities_leave_the_item_usable() {
        let f = fixture(InMemoryEventStore::new());
        f.ledger.record_stock_in(&staff(), stock_in(&f, i64::MAX, "2024-01-15 08:00")).unwrap();
        f.ledger.record_stock_out(&staff(), stock_out(&f, i64::MAX, "2024-01-15 09:00")).unwrap();
        f.ledger.record_stock_in(&staff(), stock_in(&f, 1, "2024-01-15 10:00")).unwrap();
        f.ledger.record_stock_in(&staff(), stock_in(&f, 2, "2024-01-15 11:00")).unwrap();
        assert_eq!(cached_stock(&f), 3);

        f.ledger.record_stock_in(&staff(), stock_in(&f, i64::MAX - 3, "2024-01-15 12:00")).unwrap();
        let err = f
            .ledger
            .record_stock_in(&staff(), stock_in(&f, 1, "2024-01-15 13:00"))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(f.ledger.current_stock(f.item_id).unwrap(), i64::MAX);
        f.ledger.record_stock_out(&staff(), stock_out(&f, 5, "2024-01-15 14:00")).unwrap();
        assert_eq!(cached_stock(&f), i64::MAX - 5);
    }

    #[test]
    fn rejected_request_id_can_be_retried() {
        let f = fixture(InMemoryEventStore::new());
        let mut request = stock_out(&f, 5, "2024-01-15 09:00");
        request.request_id = Some(RequestId::new());

        let err = f.ledger.record_stock_out(&staff(), request.clone()).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));

        f.ledger.record_stock_in(&staff(), stock_in(&f, 5, "2024-01-15 08:00")).unwrap();
        f.ledger.record_stock_out(&staff(), request).unwrap();
        assert_eq!(cached_stock(&f), 0);
    }

    #[test]
    fn receipts_survive_a_ledger_rebuild() {
        let store = Arc::new(InMemoryEventStore::new());
        let f = fixture(Arc::clone(&store));
        let mut request = stock_in(&f, 7, "2024-01-15 08:00");
        request.request_id = Some(RequestId::new());
        let first = f.ledger.record_stock_in(&staff(), request.clone()).unwrap();

        let registry = f.ledger.registry().clone();
        let rebuilt = StockLedger::new(store, registry, TimestampNormalizer::default(), 0).unwrap();
        let replay = rebuilt.record_stock_in(&staff(), request).unwrap();
        assert_eq!(first, replay);
        assert_eq!(rebuilt.current_stock(f.item_id).unwrap(), 7);
    }

    #[test]
    fn resync_repairs_a_drifted_cache() {
        let f = fixture(InMemoryEventStore::new());
        f.ledger.record_stock_in(&staff(), stock_in(&f, 12, "2024-01-15 08:00")).unwrap();
        f.ledger.registry().commit_stock_level(f.item_id, 3).unwrap();

        assert_eq!(f.ledger.resync_stock_levels().unwrap(), 1);
        assert_eq!(cached_stock(&f), 12);
        assert_eq!(f.ledger.resync_stock_levels().unwrap(), 0);
    }

    #[test]
    fn exactly_one_of_two_overdrawing_stock_outs_succeeds() {
        let f = fixture(InMemoryEventStore::new());
        f.ledger.record_stock_in(&staff(), stock_in(&f, 30, "2024-01-15 08:00")).unwrap();

        let barrier = Barrier::new(2);
        let results: Vec<DomainResult<StockOutEvent>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        f.ledger.record_stock_out(&staff(), stock_out(&f, 20, "2024-01-15 09:00"))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(DomainError::InsufficientStock { available: 10, .. }))));
        assert_eq!(cached_stock(&f), 10);
    }

    #[test]
    fn concurrent_stock_ins_lose_no_updates() {
        let f = fixture(InMemoryEventStore::new());
        let barrier = Barrier::new(8);
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    barrier.wait();
                    for _ in 0..10 {
                        f.ledger.record_stock_in(&staff(), stock_in(&f, 1, "2024-01-15 08:00")).unwrap();
                    }
                });
            }
        });
        assert_eq!(cached_stock(&f), 80);
        assert_eq!(f.ledger.current_stock(f.item_id).unwrap(), 80);
    }

    proptest! {
        #[test]
        fn stock_never_negative_and_conserved(ops in prop::collection::vec((any::<bool>(), 1i64..40), 1..40)) {
            let f = fixture(InMemoryEventStore::new());
            let (mut received, mut issued) = (0i64, 0i64);

            for (is_in, qty) in ops {
                if is_in {
                    f.ledger.record_stock_in(&staff(), stock_in(&f, qty, "2024-01-15 08:00")).unwrap();
                    received += qty;
                } else {
                    match f.ledger.record_stock_out(&staff(), stock_out(&f, qty, "2024-01-15 09:00")) {
                        Ok(_) => issued += qty,
                        Err(DomainError::InsufficientStock { available, .. }) => {
                            prop_assert!(qty > available);
                        }
                        Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
                    }
                }
                let stock = cached_stock(&f);
                prop_assert!(stock >= 0);
                prop_assert_eq!(stock, received - issued);
            }

            let history = f.ledger.get_history(f.item_id, None).unwrap();
            prop_assert_eq!(history.net_quantity(), i128::from(received - issued));
        }
    }
}
