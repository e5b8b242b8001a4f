//! Owning scope of a variable definition list.
//!
//! # Invariants
//! - A scope always carries non-blank identifiers; unresolved scope context
//!   never produces a `Scope` value.
//! - Project scopes are persisted remotely; dashboard scopes are committed
//!   to the in-memory dashboard state.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Dashboard or project owning a set of variable definitions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    Project { project: String },
    Dashboard { project: String, dashboard: String },
}

impl Scope {
    pub fn project(project: &str) -> Result<Self, ScopeError> {
        Ok(Self::Project {
            project: normalize_identifier(Some(project)).ok_or(ScopeError::MissingProject)?,
        })
    }

    pub fn dashboard(project: &str, dashboard: &str) -> Result<Self, ScopeError> {
        Self::resolve(Some(project), Some(dashboard))
    }

    /// Resolves a scope from optional route/context identifiers.
    ///
    /// - no project -> `MissingProject`
    /// - project only -> project scope
    /// - project + dashboard -> dashboard scope
    /// - blank dashboard -> `MissingDashboard`
    pub fn resolve(project: Option<&str>, dashboard: Option<&str>) -> Result<Self, ScopeError> {
        let project = normalize_identifier(project).ok_or(ScopeError::MissingProject)?;
        match dashboard {
            None => Ok(Self::Project { project }),
            Some(raw) => {
                let dashboard =
                    normalize_identifier(Some(raw)).ok_or(ScopeError::MissingDashboard)?;
                Ok(Self::Dashboard { project, dashboard })
            }
        }
    }

    pub fn project_name(&self) -> &str {
        match self {
            Self::Project { project } => project.as_str(),
            Self::Dashboard { project, .. } => project.as_str(),
        }
    }

    pub fn dashboard_name(&self) -> Option<&str> {
        match self {
            Self::Project { .. } => None,
            Self::Dashboard { dashboard, .. } => Some(dashboard.as_str()),
        }
    }

    /// Whether committed lists must go through the remote save service.
    pub fn requires_remote_persistence(&self) -> bool {
        matches!(self, Self::Project { .. })
    }

    /// Stable label used in log events.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Project { .. } => "project",
            Self::Dashboard { .. } => "dashboard",
        }
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Project { project } => write!(f, "projects/{project}"),
            Self::Dashboard { project, dashboard } => {
                write!(f, "projects/{project}/dashboards/{dashboard}")
            }
        }
    }
}

fn normalize_identifier(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

/// Unresolved scope context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeError {
    MissingProject,
    MissingDashboard,
}

impl Display for ScopeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingProject => write!(f, "scope context is missing a project identifier"),
            Self::MissingDashboard => {
                write!(f, "scope context is missing a dashboard identifier")
            }
        }
    }
}

impl Error for ScopeError {}

#[cfg(test)]
mod tests {
    use super::{Scope, ScopeError};

    #[test]
    fn resolves_project_and_dashboard_scopes() {
        let project = Scope::resolve(Some(" perses "), None).expect("project scope");
        assert_eq!(
            project,
            Scope::Project {
                project: "perses".to_string()
            }
        );
        assert!(project.requires_remote_persistence());

        let dashboard = Scope::resolve(Some("perses"), Some("node-exporter")).expect("dashboard");
        assert_eq!(dashboard.dashboard_name(), Some("node-exporter"));
        assert_eq!(dashboard.project_name(), "perses");
        assert!(!dashboard.requires_remote_persistence());
        assert_eq!(
            dashboard.to_string(),
            "projects/perses/dashboards/node-exporter"
        );
    }

    #[test]
    fn rejects_missing_identifiers() {
        assert_eq!(Scope::resolve(None, None), Err(ScopeError::MissingProject));
        assert_eq!(Scope::project("  "), Err(ScopeError::MissingProject));
        assert_eq!(
            Scope::dashboard("perses", ""),
            Err(ScopeError::MissingDashboard)
        );
    }
}
