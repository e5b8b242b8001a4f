//! Variable definition model.
//!
//! # Responsibility
//! - Define the typed `TextVariable` / `ListVariable` definitions.
//! - Provide display-name helpers used by list and editor views.
//! - Provide opt-in name validation for callers decoding untrusted input.
//!
//! # Invariants
//! - A definition is identified by its name, unique within one scope.
//! - Plugin payloads are opaque JSON; their equality ignores object key order.
//! - `VariableDefinitionList` order is display order and part of its value.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

static VARIABLE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("valid variable name regex"));

/// Kind discriminator of a variable definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    /// Free text value, optionally constant.
    Text,
    /// Value chosen from options produced by a plugin.
    List,
}

impl VariableKind {
    /// Wire name used in the `kind` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "TextVariable",
            Self::List => "ListVariable",
        }
    }
}

/// Presentation metadata shared by all variable kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDisplay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextVariableSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<VariableDisplay>,
    #[serde(default)]
    pub value: String,
    /// Constant text variables are not editable from the dashboard toolbar.
    #[serde(default)]
    pub constant: bool,
}

/// Default selection of a list variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Single(String),
    Multiple(Vec<String>),
}

/// Option ordering applied by list variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableSort {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "alphabetical-asc")]
    AlphabeticalAsc,
    #[serde(rename = "alphabetical-desc")]
    AlphabeticalDesc,
    #[serde(rename = "numerical-asc")]
    NumericalAsc,
    #[serde(rename = "numerical-desc")]
    NumericalDesc,
    #[serde(rename = "alphabetical-ci-asc")]
    AlphabeticalCiAsc,
    #[serde(rename = "alphabetical-ci-desc")]
    AlphabeticalCiDesc,
}

/// Plugin reference producing list variable options.
///
/// `spec` is owned by the plugin and never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariablePlugin {
    pub kind: String,
    #[serde(default)]
    pub spec: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVariableSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<VariableDisplay>,
    #[serde(default)]
    pub allow_multiple: bool,
    #[serde(default)]
    pub allow_all_value: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<DefaultValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_all_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capturing_regexp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<VariableSort>,
    pub plugin: VariablePlugin,
}

/// One variable definition of a dashboard or project.
///
/// Serialized as `{"kind": "TextVariable" | "ListVariable", "spec": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "spec")]
pub enum VariableDefinition {
    TextVariable(TextVariableSpec),
    ListVariable(ListVariableSpec),
}

impl VariableDefinition {
    /// Creates a non-constant text variable without display metadata.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::TextVariable(TextVariableSpec {
            name: name.into(),
            display: None,
            value: value.into(),
            constant: false,
        })
    }

    /// Creates a single-value list variable backed by `plugin`.
    pub fn list(name: impl Into<String>, plugin: VariablePlugin) -> Self {
        Self::ListVariable(ListVariableSpec {
            name: name.into(),
            display: None,
            allow_multiple: false,
            allow_all_value: false,
            default_value: None,
            custom_all_value: None,
            capturing_regexp: None,
            sort: None,
            plugin,
        })
    }

    /// Returns a copy carrying `display_name` as its display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        let display = match &mut self {
            Self::TextVariable(spec) => &mut spec.display,
            Self::ListVariable(spec) => &mut spec.display,
        };
        display.get_or_insert_with(VariableDisplay::default).name = Some(display_name.into());
        self
    }

    pub fn kind(&self) -> VariableKind {
        match self {
            Self::TextVariable(_) => VariableKind::Text,
            Self::ListVariable(_) => VariableKind::List,
        }
    }

    /// Identity of the definition within its scope.
    pub fn name(&self) -> &str {
        match self {
            Self::TextVariable(spec) => spec.name.as_str(),
            Self::ListVariable(spec) => spec.name.as_str(),
        }
    }

    pub fn display(&self) -> Option<&VariableDisplay> {
        match self {
            Self::TextVariable(spec) => spec.display.as_ref(),
            Self::ListVariable(spec) => spec.display.as_ref(),
        }
    }

    /// Display name when set, variable name otherwise.
    pub fn display_name(&self) -> &str {
        self.display()
            .and_then(|display| display.name.as_deref())
            .unwrap_or_else(|| self.name())
    }

    /// `"<display name> (ID: <name>)"` when a display name is set.
    pub fn extended_display_name(&self) -> String {
        match self.display().and_then(|display| display.name.as_deref()) {
            Some(display_name) => format!("{display_name} (ID: {})", self.name()),
            None => self.name().to_string(),
        }
    }
}

/// Ordered list of variable definitions for one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableDefinitionList(Vec<VariableDefinition>);

impl VariableDefinitionList {
    pub fn new(definitions: Vec<VariableDefinition>) -> Self {
        Self(definitions)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VariableDefinition> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[VariableDefinition] {
        self.0.as_slice()
    }

    /// Variable names in display order.
    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(VariableDefinition::name).collect()
    }

    pub fn find(&self, name: &str) -> Option<&VariableDefinition> {
        self.0.iter().find(|definition| definition.name() == name)
    }

    /// Checks name syntax and per-scope name uniqueness.
    ///
    /// The edit workflow never calls this; it is meant for decode paths that
    /// receive lists from outside the process.
    pub fn validate(&self) -> Result<(), VariableValidationError> {
        let mut seen = HashSet::with_capacity(self.0.len());
        for definition in &self.0 {
            let name = definition.name();
            if !VARIABLE_NAME_RE.is_match(name) {
                return Err(VariableValidationError::InvalidName(name.to_string()));
            }
            if !seen.insert(name) {
                return Err(VariableValidationError::DuplicateName(name.to_string()));
            }
        }
        Ok(())
    }

    pub fn into_vec(self) -> Vec<VariableDefinition> {
        self.0
    }
}

impl From<Vec<VariableDefinition>> for VariableDefinitionList {
    fn from(value: Vec<VariableDefinition>) -> Self {
        Self(value)
    }
}

impl FromIterator<VariableDefinition> for VariableDefinitionList {
    fn from_iter<T: IntoIterator<Item = VariableDefinition>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a VariableDefinitionList {
    type Item = &'a VariableDefinition;
    type IntoIter = std::slice::Iter<'a, VariableDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Name validation failures for variable definition lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableValidationError {
    InvalidName(String),
    DuplicateName(String),
}

impl Display for VariableValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(name) => write!(
                f,
                "variable name `{name}` is invalid; expected letters, digits, `_` or `-`"
            ),
            Self::DuplicateName(name) => write!(f, "variable name `{name}` is used more than once"),
        }
    }
}

impl Error for VariableValidationError {}
