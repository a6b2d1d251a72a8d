//! Identifier policy and in-memory record store.

/// Lowest-free-slot id assignment.
pub mod slots;
/// Non-durable record store.
pub mod store;
