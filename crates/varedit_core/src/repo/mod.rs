//! Committed-state storage and persistence collaborator contracts.
//!
//! # Responsibility
//! - Hold the committed variable list for one scope.
//! - Define the remote save boundary consumed by the edit workflow.
//!
//! # Invariants
//! - The committed list only changes through whole-list replacement.
//! - A failed remote save never reaches the committed list.

pub mod definition_store;
pub mod persistence;
