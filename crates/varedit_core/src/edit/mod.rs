//! Editor-session building blocks.
//!
//! # Responsibility
//! - Stage uncommitted edits next to the committed snapshot.
//! - Run the discard-confirmation protocol against the modal surface.
//! - Guard the one-session-per-scope rule across workflows.
//!
//! # See also
//! - `service::workflow` for the state machine composing these parts.

pub mod gate;
pub mod session;
pub mod transient;
