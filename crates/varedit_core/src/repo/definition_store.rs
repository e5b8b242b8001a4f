//! Committed variable definitions of one scope.
//!
//! # Responsibility
//! - Own the committed snapshot read by editor sessions.
//! - Replace it atomically when a session submits.
//!
//! # Invariants
//! - `commit` replaces the whole list; there is no element-level mutation.
//! - `revision` grows by exactly one per commit.

use crate::model::scope::Scope;
use crate::model::variable::VariableDefinitionList;
use log::info;

/// Committed variable definition list for one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDefinitionStore {
    scope: Scope,
    committed: VariableDefinitionList,
    revision: u64,
}

impl VariableDefinitionStore {
    /// Creates a store holding `initial` as revision 0.
    pub fn new(scope: Scope, initial: VariableDefinitionList) -> Self {
        Self {
            scope,
            committed: initial,
            revision: 0,
        }
    }

    /// Current committed snapshot.
    pub fn get(&self) -> &VariableDefinitionList {
        &self.committed
    }

    /// Replaces the committed snapshot with `definitions`.
    pub fn commit(&mut self, definitions: VariableDefinitionList) {
        self.committed = definitions;
        self.revision += 1;
        info!(
            "event=variables_commit module=store status=ok scope_kind={} revision={} count={}",
            self.scope.kind_label(),
            self.revision,
            self.committed.len()
        );
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::VariableDefinitionStore;
    use crate::model::scope::Scope;
    use crate::model::variable::{VariableDefinition, VariableDefinitionList};

    #[test]
    fn commit_replaces_whole_list_and_bumps_revision() {
        let scope = Scope::dashboard("perses", "demo").expect("scope");
        let mut store = VariableDefinitionStore::new(
            scope,
            VariableDefinitionList::new(vec![
                VariableDefinition::text("a", ""),
                VariableDefinition::text("b", ""),
            ]),
        );
        assert_eq!(store.revision(), 0);

        store.commit(VariableDefinitionList::new(vec![VariableDefinition::text(
            "c", "",
        )]));

        assert_eq!(store.get().names(), vec!["c"]);
        assert_eq!(store.revision(), 1);
    }
}
