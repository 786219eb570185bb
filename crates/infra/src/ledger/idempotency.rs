//! At-most-once application of movements carrying a caller `RequestId`.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, FixedOffset};

use warehouse_core::{DomainError, DomainResult, ItemId, RequestId};
use warehouse_inventory::{MovementDirection, StockCommand, StockMovementEvent};

/// The parts of a movement that must match for a replay to count as the same
/// submission. Event id and actor are not part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Fingerprint {
    direction: MovementDirection,
    item_id: ItemId,
    counterparty: String,
    quantity: i64,
    occurred_at: DateTime<FixedOffset>,
}

impl Fingerprint {
    pub(crate) fn of_command(command: &StockCommand) -> Self {
        match command {
            StockCommand::ReceiveStock(c) => Self {
                direction: MovementDirection::In,
                item_id: c.item_id,
                counterparty: c.supplier_id.to_string(),
                quantity: c.quantity.get(),
                occurred_at: c.occurred_at,
            },
            StockCommand::IssueStock(c) => Self {
                direction: MovementDirection::Out,
                item_id: c.item_id,
                counterparty: c.destination.trim().to_string(),
                quantity: c.quantity.get(),
                occurred_at: c.occurred_at,
            },
        }
    }

    pub(crate) fn of_event(event: &StockMovementEvent) -> Self {
        match event {
            StockMovementEvent::StockIn(e) => Self {
                direction: MovementDirection::In,
                item_id: e.item_id,
                counterparty: e.supplier_id.to_string(),
                quantity: e.quantity.get(),
                occurred_at: e.occurred_at,
            },
            StockMovementEvent::StockOut(e) => Self {
                direction: MovementDirection::Out,
                item_id: e.item_id,
                counterparty: e.destination.clone(),
                quantity: e.quantity.get(),
                occurred_at: e.occurred_at,
            },
        }
    }
}

#[derive(Debug, Clone)]
enum Receipt {
    /// Reserved by a submission that has not finished yet.
    Pending(Fingerprint),
    Committed {
        fingerprint: Fingerprint,
        event: StockMovementEvent,
    },
}

/// Outcome of reserving a request id.
#[derive(Debug)]
pub(crate) enum Reservation<'a> {
    /// First time this id is seen; the caller must commit or drop the guard.
    Fresh(ReservationGuard<'a>),
    /// Already applied with an identical payload.
    Replay(StockMovementEvent),
}

/// Request id → outcome of the submission that first used it.
#[derive(Debug, Default)]
pub(crate) struct ReceiptBook {
    entries: Mutex<HashMap<RequestId, Receipt>>,
}

impl ReceiptBook {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> DomainError {
        DomainError::invariant("receipt book lock poisoned")
    }

    /// Remember an already-committed movement (used when rebuilding from the store).
    pub(crate) fn record(&self, request_id: RequestId, event: StockMovementEvent) -> DomainResult<()> {
        let mut entries = self.entries.lock().map_err(|_| Self::poisoned())?;
        entries.insert(
            request_id,
            Receipt::Committed {
                fingerprint: Fingerprint::of_event(&event),
                event,
            },
        );
        Ok(())
    }

    pub(crate) fn reserve(&self, request_id: RequestId, fingerprint: Fingerprint) -> DomainResult<Reservation<'_>> {
        let mut entries = self.entries.lock().map_err(|_| Self::poisoned())?;
        match entries.get(&request_id) {
            None => {
                entries.insert(request_id, Receipt::Pending(fingerprint));
                Ok(Reservation::Fresh(ReservationGuard {
                    book: self,
                    request_id,
                    completed: false,
                }))
            }
            Some(Receipt::Committed { fingerprint: seen, event }) if *seen == fingerprint => {
                Ok(Reservation::Replay(event.clone()))
            }
            Some(Receipt::Pending(seen)) if *seen == fingerprint => Err(DomainError::conflict(format!(
                "request {request_id} is already being processed"
            ))),
            Some(_) => Err(DomainError::validation(format!(
                "request {request_id} was already used for a different movement"
            ))),
        }
    }

    pub(crate) fn len(&self) -> DomainResult<usize> {
        let entries = self.entries.lock().map_err(|_| Self::poisoned())?;
        Ok(entries.len())
    }
}

/// Holds a pending request id. Dropping it without [`complete`](Self::complete)
/// releases the id so a later retry can run.
#[derive(Debug)]
pub(crate) struct ReservationGuard<'a> {
    book: &'a ReceiptBook,
    request_id: RequestId,
    completed: bool,
}

impl ReservationGuard<'_> {
    pub(crate) fn complete(mut self, event: StockMovementEvent) -> DomainResult<()> {
        self.completed = true;
        self.book.record(self.request_id, event)
    }
}

impl Drop for ReservationGuard<'_> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        if let Ok(mut entries) = self.book.entries.lock() {
            if matches!(entries.get(&self.request_id), Some(Receipt::Pending(_))) {
                entries.remove(&self.request_id);
            }
        }
    }
}
