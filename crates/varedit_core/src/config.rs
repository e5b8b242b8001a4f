//! Workflow configuration supplied by the host application.
//!
//! # Invariants
//! - Defaults reproduce the dashboard editor behavior: confirm discards of
//!   dirty sessions, persist remotely only for project scopes.
//! - A confirming policy always carries a non-blank prompt.

use crate::model::scope::Scope;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Modal text shown before discarding unapplied variable edits.
pub const DEFAULT_DISCARD_PROMPT: &str =
    "You have unapplied changes. Are you sure you want to discard these changes? Changes cannot be recovered.";

/// What `cancel` does with a dirty session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelPolicy {
    /// Ask through the confirmation surface before discarding.
    #[default]
    ConfirmWhenDirty,
    /// Discard without asking. Matches the project-level editor, which never
    /// wired the confirmation modal.
    AlwaysDiscard,
}

/// When `submit` goes through the remote save collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistencePolicy {
    /// Remote for project scopes, local commit for dashboard scopes.
    #[default]
    ByScope,
    Always,
    Never,
}

impl PersistencePolicy {
    pub fn uses_remote(self, scope: &Scope) -> bool {
        match self {
            Self::ByScope => scope.requires_remote_persistence(),
            Self::Always => true,
            Self::Never => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub discard_prompt: String,
    pub cancel_policy: CancelPolicy,
    pub persistence_policy: PersistencePolicy,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            discard_prompt: DEFAULT_DISCARD_PROMPT.to_string(),
            cancel_policy: CancelPolicy::default(),
            persistence_policy: PersistencePolicy::default(),
        }
    }
}

impl WorkflowConfig {
    /// Parses host JSON; missing fields keep their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cancel_policy == CancelPolicy::ConfirmWhenDirty
            && self.discard_prompt.trim().is_empty()
        {
            return Err(ConfigError::EmptyDiscardPrompt);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    EmptyDiscardPrompt,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "invalid workflow config: {message}"),
            Self::EmptyDiscardPrompt => write!(
                f,
                "discard_prompt must not be empty when cancel_policy is confirm_when_dirty"
            ),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::{
        CancelPolicy, ConfigError, PersistencePolicy, WorkflowConfig, DEFAULT_DISCARD_PROMPT,
    };
    use crate::model::scope::Scope;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = WorkflowConfig::from_json_str(r#"{"cancel_policy":"always_discard"}"#)
            .expect("config should parse");
        assert_eq!(config.cancel_policy, CancelPolicy::AlwaysDiscard);
        assert_eq!(config.persistence_policy, PersistencePolicy::ByScope);
        assert_eq!(config.discard_prompt, DEFAULT_DISCARD_PROMPT);
    }

    #[test]
    fn rejects_blank_prompt_for_confirming_policy() {
        let err = WorkflowConfig::from_json_str(r#"{"discard_prompt":"  "}"#)
            .expect_err("blank prompt must be rejected");
        assert_eq!(err, ConfigError::EmptyDiscardPrompt);

        assert!(WorkflowConfig::from_json_str(
            r#"{"discard_prompt":"","cancel_policy":"always_discard"}"#
        )
        .is_ok());
    }

    #[test]
    fn persistence_policy_by_scope_follows_scope_kind() {
        let project = Scope::project("perses").expect("scope");
        let dashboard = Scope::dashboard("perses", "demo").expect("scope");

        assert!(PersistencePolicy::ByScope.uses_remote(&project));
        assert!(!PersistencePolicy::ByScope.uses_remote(&dashboard));
        assert!(PersistencePolicy::Always.uses_remote(&dashboard));
        assert!(!PersistencePolicy::Never.uses_remote(&project));
    }
}
