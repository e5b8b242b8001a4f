//! Remote save boundary for variable definition lists.

use crate::model::scope::Scope;
use crate::model::variable::VariableDefinitionList;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Failure reported by the save collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// The service answered and refused the list (validation, conflict, auth).
    Rejected(String),
    /// The service could not be reached or did not answer.
    Unavailable(String),
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(message) => write!(f, "variable save rejected: {message}"),
            Self::Unavailable(message) => write!(f, "variable save unavailable: {message}"),
        }
    }
}

impl Error for PersistenceError {}

/// Save service for scopes whose variables live server-side.
///
/// On success the service returns the list as stored; that list, not the
/// submitted one, becomes the committed snapshot.
#[async_trait]
pub trait VariablePersistence: Send + Sync {
    async fn save(
        &self,
        scope: &Scope,
        definitions: &VariableDefinitionList,
    ) -> PersistenceResult<VariableDefinitionList>;
}
