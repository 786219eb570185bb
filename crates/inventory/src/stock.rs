use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use warehouse_auth::ActorId;
use warehouse_core::{
    Aggregate, AggregateRoot, DomainError, EventId, ItemId, RequestId, SupplierId,
};
use warehouse_events::{Command, Event};

use crate::Quantity;

/// Stream type tag for item stock streams in the event store.
pub const STOCK_AGGREGATE_TYPE: &str = "inventory.stock";

/// Direction of a stock movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementDirection {
    /// Stok masuk.
    In,
    /// Stok keluar.
    Out,
}

impl MovementDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementDirection::In => "in",
            MovementDirection::Out => "out",
        }
    }
}

impl core::str::FromStr for MovementDirection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in" | "masuk" => Ok(MovementDirection::In),
            "out" | "keluar" => Ok(MovementDirection::Out),
            other => Err(DomainError::validation(format!("unknown movement direction '{other}'"))),
        }
    }
}

impl core::fmt::Display for MovementDirection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate root: the stock stream of one item.
///
/// State is derived purely from the item's movement events, so
/// `stock == received - issued` holds by construction. Lifetime totals are
/// `i128`: they keep growing after stock leaves, unlike `stock`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockItem {
    id: ItemId,
    stock: i64,
    received: i128,
    issued: i128,
    version: u64,
}

impl StockItem {
    /// Create an empty stream instance for rehydration (stock 0, version 0).
    pub fn empty(id: ItemId) -> Self {
        Self {
            id,
            stock: 0,
            received: 0,
            issued: 0,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> ItemId {
        self.id
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn total_received(&self) -> i128 {
        self.received
    }

    pub fn total_issued(&self) -> i128 {
        self.issued
    }
}

impl AggregateRoot for StockItem {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: ReceiveStock (stok masuk).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveStock {
    pub event_id: EventId,
    pub item_id: ItemId,
    pub supplier_id: SupplierId,
    pub quantity: Quantity,
    pub occurred_at: DateTime<FixedOffset>,
    pub recorded_by: ActorId,
    pub request_id: Option<RequestId>,
}

/// Command: IssueStock (stok keluar).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStock {
    pub event_id: EventId,
    pub item_id: ItemId,
    pub destination: String,
    pub quantity: Quantity,
    pub occurred_at: DateTime<FixedOffset>,
    pub recorded_by: ActorId,
    pub request_id: Option<RequestId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockCommand {
    ReceiveStock(ReceiveStock),
    IssueStock(IssueStock),
}

impl Command for StockCommand {
    fn target_aggregate_id(&self) -> ItemId {
        match self {
            StockCommand::ReceiveStock(c) => c.item_id,
            StockCommand::IssueStock(c) => c.item_id,
        }
    }
}

/// Event: stock received from a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockInEvent {
    pub id: EventId,
    pub item_id: ItemId,
    pub supplier_id: SupplierId,
    pub quantity: Quantity,
    pub occurred_at: DateTime<FixedOffset>,
    pub recorded_by: ActorId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
}

/// Event: stock issued to a destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockOutEvent {
    pub id: EventId,
    pub item_id: ItemId,
    pub destination: String,
    pub quantity: Quantity,
    pub occurred_at: DateTime<FixedOffset>,
    pub recorded_by: ActorId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockMovementEvent {
    StockIn(StockInEvent),
    StockOut(StockOutEvent),
}

impl StockMovementEvent {
    pub fn id(&self) -> EventId {
        match self {
            StockMovementEvent::StockIn(e) => e.id,
            StockMovementEvent::StockOut(e) => e.id,
        }
    }

    pub fn item_id(&self) -> ItemId {
        match self {
            StockMovementEvent::StockIn(e) => e.item_id,
            StockMovementEvent::StockOut(e) => e.item_id,
        }
    }

    pub fn direction(&self) -> MovementDirection {
        match self {
            StockMovementEvent::StockIn(_) => MovementDirection::In,
            StockMovementEvent::StockOut(_) => MovementDirection::Out,
        }
    }

    pub fn quantity(&self) -> Quantity {
        match self {
            StockMovementEvent::StockIn(e) => e.quantity,
            StockMovementEvent::StockOut(e) => e.quantity,
        }
    }

    /// Effect on the item's stock level (positive for in, negative for out).
    pub fn signed_quantity(&self) -> i64 {
        match self {
            StockMovementEvent::StockIn(e) => e.quantity.get(),
            StockMovementEvent::StockOut(e) => -e.quantity.get(),
        }
    }

    pub fn recorded_by(&self) -> &ActorId {
        match self {
            StockMovementEvent::StockIn(e) => &e.recorded_by,
            StockMovementEvent::StockOut(e) => &e.recorded_by,
        }
    }

    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            StockMovementEvent::StockIn(e) => e.request_id,
            StockMovementEvent::StockOut(e) => e.request_id,
        }
    }
}

impl Event for StockMovementEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockMovementEvent::StockIn(_) => "inventory.stock.received",
            StockMovementEvent::StockOut(_) => "inventory.stock.issued",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<FixedOffset> {
        match self {
            StockMovementEvent::StockIn(e) => e.occurred_at,
            StockMovementEvent::StockOut(e) => e.occurred_at,
        }
    }
}

impl Aggregate for StockItem {
    type Command = StockCommand;
    type Event = StockMovementEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StockMovementEvent::StockIn(e) => {
                self.received = self.received.saturating_add(i128::from(e.quantity.get()));
            }
            StockMovementEvent::StockOut(e) => {
                self.issued = self.issued.saturating_add(i128::from(e.quantity.get()));
            }
        }
        // `handle` rejects anything that would leave i64; replayed streams
        // were accepted by it.
        self.stock = self.stock.saturating_add(event.signed_quantity());

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StockCommand::ReceiveStock(cmd) => self.handle_receive(cmd),
            StockCommand::IssueStock(cmd) => self.handle_issue(cmd),
        }
    }
}

impl StockItem {
    fn ensure_item_id(&self, item_id: ItemId) -> Result<(), DomainError> {
        if self.id != item_id {
            return Err(DomainError::invariant("item_id mismatch"));
        }
        Ok(())
    }

    fn handle_receive(&self, cmd: &ReceiveStock) -> Result<Vec<StockMovementEvent>, DomainError> {
        self.ensure_item_id(cmd.item_id)?;

        if self.stock.checked_add(cmd.quantity.get()).is_none() {
            return Err(DomainError::validation("quantity overflows the stock counter"));
        }

        Ok(vec![StockMovementEvent::StockIn(StockInEvent {
            id: cmd.event_id,
            item_id: cmd.item_id,
            supplier_id: cmd.supplier_id,
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
            recorded_by: cmd.recorded_by.clone(),
            request_id: cmd.request_id,
        })])
    }

    fn handle_issue(&self, cmd: &IssueStock) -> Result<Vec<StockMovementEvent>, DomainError> {
        self.ensure_item_id(cmd.item_id)?;

        let destination = cmd.destination.trim();
        if destination.is_empty() {
            return Err(DomainError::validation("destination cannot be empty"));
        }

        let requested = cmd.quantity.get();
        if requested > self.stock {
            return Err(DomainError::insufficient_stock(cmd.item_id, requested, self.stock));
        }

        Ok(vec![StockMovementEvent::StockOut(StockOutEvent {
            id: cmd.event_id,
            item_id: cmd.item_id,
            destination: destination.to_string(),
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
            recorded_by: cmd.recorded_by.clone(),
            request_id: cmd.request_id,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use warehouse_events::execute;

    fn test_time() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 15, 10, 30, 0)
            .unwrap()
    }

    fn actor() -> ActorId {
        ActorId::new("petugas-1").unwrap()
    }

    fn receive(item_id: ItemId, qty: i64) -> StockCommand {
        StockCommand::ReceiveStock(ReceiveStock {
            event_id: EventId::new(),
            item_id,
            supplier_id: SupplierId::new(),
            quantity: Quantity::new(qty).unwrap(),
            occurred_at: test_time(),
            recorded_by: actor(),
            request_id: None,
        })
    }

    fn issue(item_id: ItemId, qty: i64, destination: &str) -> StockCommand {
        StockCommand::IssueStock(IssueStock {
            event_id: EventId::new(),
            item_id,
            destination: destination.to_string(),
            quantity: Quantity::new(qty).unwrap(),
            occurred_at: test_time(),
            recorded_by: actor(),
            request_id: None,
        })
    }

    #[test]
    fn receive_then_issue_tracks_stock() {
        let item_id = ItemId::new();
        let mut stock = StockItem::empty(item_id);

        execute(&mut stock, &receive(item_id, 50)).unwrap();
        execute(&mut stock, &issue(item_id, 20, "Cabang Kemayoran")).unwrap();

        assert_eq!(stock.stock(), 30);
        assert_eq!(stock.total_received(), 50);
        assert_eq!(stock.total_issued(), 20);
        assert_eq!(stock.version(), 2);
    }

    #[test]
    fn overdraw_is_rejected_without_state_change() {
        let item_id = ItemId::new();
        let mut stock = StockItem::empty(item_id);
        execute(&mut stock, &receive(item_id, 30)).unwrap();
        let before = stock.clone();

        let err = execute(&mut stock, &issue(item_id, 35, "Cabang Kemayoran")).unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock(item_id, 35, 30));
        assert_eq!(stock, before);
    }

    #[test]
    fn issuing_exactly_the_available_stock_is_allowed() {
        let item_id = ItemId::new();
        let mut stock = StockItem::empty(item_id);
        execute(&mut stock, &receive(item_id, 5)).unwrap();
        execute(&mut stock, &issue(item_id, 5, "Gudang B")).unwrap();
        assert_eq!(stock.stock(), 0);
    }

    #[test]
    fn blank_destination_is_a_validation_error() {
        let item_id = ItemId::new();
        let mut stock = StockItem::empty(item_id);
        execute(&mut stock, &receive(item_id, 5)).unwrap();
        let err = stock.handle(&issue(item_id, 1, "   ")).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn commands_for_another_item_are_refused() {
        let stock = StockItem::empty(ItemId::new());
        let err = stock.handle(&receive(ItemId::new(), 1)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn events_survive_a_json_round_trip() {
        let item_id = ItemId::new();
        let events = StockItem::empty(item_id).handle(&receive(item_id, 3)).unwrap();
        let json = serde_json::to_value(&events[0]).unwrap();
        let back: StockMovementEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, events[0]);
        assert_eq!(back.event_type(), "inventory.stock.received");
    }

    #[test]
    fn counters_survive_extreme_quantities() {
        let item_id = ItemId::new();
        let mut stock = StockItem::empty(item_id);

        execute(&mut stock, &receive(item_id, i64::MAX)).unwrap();
        execute(&mut stock, &issue(item_id, i64::MAX, "Gudang B")).unwrap();
        execute(&mut stock, &receive(item_id, 1)).unwrap();

        assert_eq!(stock.stock(), 1);
        assert_eq!(stock.total_received(), i128::from(i64::MAX) + 1);
        assert_eq!(stock.total_issued(), i128::from(i64::MAX));
        assert_eq!(stock.version(), 3);
    }

    #[test]
    fn receiving_past_the_stock_ceiling_is_a_validation_error() {
        let item_id = ItemId::new();
        let mut stock = StockItem::empty(item_id);
        execute(&mut stock, &receive(item_id, i64::MAX)).unwrap();
        let before = stock.clone();

        let err = execute(&mut stock, &receive(item_id, 1)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(stock, before);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: for any sequence of movements, stock never goes negative and
        /// always equals received minus issued.
        #[test]
        fn stock_is_conserved_and_non_negative(
            moves in prop::collection::vec((any::<bool>(), 1i64..100), 1..60)
        ) {
            let item_id = ItemId::new();
            let mut stock = StockItem::empty(item_id);
            let mut accepted: Vec<StockMovementEvent> = Vec::new();

            for (inbound, qty) in moves {
                let cmd = if inbound { receive(item_id, qty) } else { issue(item_id, qty, "Gudang B") };
                let before = stock.stock();
                match execute(&mut stock, &cmd) {
                    Ok(events) => accepted.extend(events),
                    Err(DomainError::InsufficientStock { available, .. }) => {
                        prop_assert!(!inbound);
                        prop_assert_eq!(available, before);
                        prop_assert_eq!(stock.stock(), before);
                    }
                    Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
                }
                prop_assert!(stock.stock() >= 0);
            }

            let net: i64 = accepted.iter().map(StockMovementEvent::signed_quantity).sum();
            prop_assert_eq!(stock.stock(), net);
            prop_assert_eq!(i128::from(stock.stock()), stock.total_received() - stock.total_issued());
            prop_assert_eq!(stock.version(), accepted.len() as u64);
        }
    }
}
