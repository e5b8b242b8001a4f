//! Core of the dashboard variable editor.
//! This crate owns the edit/cancel/commit rules for variable definitions.

pub mod config;
pub mod edit;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{CancelPolicy, ConfigError, PersistencePolicy, WorkflowConfig, DEFAULT_DISCARD_PROMPT};
pub use edit::gate::{
    ConfirmationSurface, Decision, DecisionResponder, DiscardConfirmationGate, DiscardPrompt,
    GateError, GateState, PendingDecision,
};
pub use edit::session::{SessionConflict, SessionId, SessionLease, SessionRegistry};
pub use edit::transient::TransientEditState;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::scope::{Scope, ScopeError};
pub use model::variable::{
    DefaultValue, ListVariableSpec, TextVariableSpec, VariableDefinition, VariableDefinitionList,
    VariableDisplay, VariableKind, VariablePlugin, VariableSort, VariableValidationError,
};
pub use repo::definition_store::VariableDefinitionStore;
pub use repo::persistence::{PersistenceError, PersistenceResult, VariablePersistence};
pub use service::workflow::{
    CancelOutcome, SubmitRequest, UsageError, VariableEditWorkflow, VariableEditWorkflowBuilder,
    WorkflowError, WorkflowOperation, WorkflowState,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
