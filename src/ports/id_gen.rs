//! ID generator port for tagging generation calls.

/// Generates unique identifiers.
///
/// Each generation call is tagged with one of these so its log lines can
/// be correlated; replay substitutes a recorded sequence.
pub trait IdGenerator: Send + Sync {
    /// Generates a new unique identifier string.
    fn generate_id(&self) -> String;
}
