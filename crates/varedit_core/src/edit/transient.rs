//! Uncommitted working copy of a variable definition list.
//!
//! # Invariants
//! - The working copy never shares storage with the list it was seeded from.
//! - Dirty means "differs by value, order included" from a given base.

use crate::model::variable::VariableDefinitionList;

/// Working copy owned by one open editor session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransientEditState {
    working: VariableDefinitionList,
}

impl TransientEditState {
    /// Seeds a working copy from `base`.
    pub fn seed(base: &VariableDefinitionList) -> Self {
        Self {
            working: base.clone(),
        }
    }

    /// Replaces the working copy wholesale.
    pub fn update(&mut self, next: VariableDefinitionList) {
        self.working = next;
    }

    /// Returns whether the working copy differs from `base`.
    pub fn is_dirty(&self, base: &VariableDefinitionList) -> bool {
        self.working != *base
    }

    pub fn current(&self) -> &VariableDefinitionList {
        &self.working
    }

    pub fn into_inner(self) -> VariableDefinitionList {
        self.working
    }
}
