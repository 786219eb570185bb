//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Registry records (items, categories, suppliers) are entities: two records
/// with the same id are the same record even if their fields differ.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Whether the record is still live (not soft-deleted).
    fn is_active(&self) -> bool {
        true
    }
}
