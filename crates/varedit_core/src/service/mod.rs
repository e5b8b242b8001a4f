//! Use-case services consumed by UI bridges.
//!
//! # Responsibility
//! - Compose store, edit state, gate and persistence into the editor
//!   workflow.
//! - Keep UI/FFI layers free of state-machine rules.

pub mod workflow;
