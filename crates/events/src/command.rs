use warehouse_core::ItemId;

/// A command targets a specific item stream.
///
/// Commands represent **intent** ("take 20 units out to Cabang Kemayoran").
/// They are transient and either rejected or turned into events, which are
/// persisted. Each command operates on exactly one item, which is also the
/// unit of serialization for concurrent writers.
pub trait Command: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn target_aggregate_id(&self) -> ItemId;
}
