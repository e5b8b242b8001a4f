//! Domain model for variable definitions and their owning scopes.
//!
//! # Responsibility
//! - Define the value objects staged, compared and committed by the edit
//!   workflow.
//! - Keep the wire shape (`{"kind": ..., "spec": ...}`) aligned with the
//!   dashboard API so lists round-trip untouched through the UI layer.
//!
//! # Invariants
//! - Variable definitions are immutable values; edits replace them wholesale.
//! - Equality is structural and order-sensitive at the list level.

pub mod scope;
pub mod variable;
