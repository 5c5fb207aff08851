use serde::{Deserialize, Serialize};

use super::types::TypeRef;
use crate::diagnostics::Warning;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dao {
    pub name: String,
    /// Converter classes visible to this DAO's methods only.
    #[serde(default)]
    pub converters: Vec<String>,
    #[serde(default)]
    pub suppress_warnings: Vec<String>,
    #[serde(default)]
    pub methods: Vec<DaoMethod>,
}

impl Dao {
    /// Name of the generated implementation type.
    pub fn impl_name(&self) -> String {
        format!("{}Impl", self.name)
    }

    pub fn suppressed(&self) -> Vec<Warning> {
        parse_suppressed(&self.suppress_warnings)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    #[default]
    Query,
    Transaction,
    /// Inserts the entity parameters.
    Insert,
    /// Updates the entity parameters by primary key.
    Update,
    /// Deletes the entity parameters by primary key.
    Delete,
}

/// SQLite conflict resolution for shortcut inserts and updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnConflict {
    #[default]
    Abort,
    Replace,
    Ignore,
    Fail,
    Rollback,
}

impl OnConflict {
    /// The keyword used in `INSERT OR <x>` and `UPDATE OR <x>`.
    pub fn sql(self) -> &'static str {
        match self {
            OnConflict::Abort => "ABORT",
            OnConflict::Replace => "REPLACE",
            OnConflict::Ignore => "IGNORE",
            OnConflict::Fail => "FAIL",
            OnConflict::Rollback => "ROLLBACK",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoMethod {
    pub name: String,
    #[serde(default)]
    pub kind: MethodKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(default = "TypeRef::unit")]
    pub returns: TypeRef,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub suspend: bool,
    #[serde(default)]
    pub skip_verification: bool,
    /// Run the query inside a transaction.
    #[serde(default)]
    pub transaction: bool,
    /// Trait method a transaction method wraps; defaults to `<name>_body`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegate: Option<String>,
    /// Conflict strategy of insert and update methods.
    #[serde(default)]
    pub on_conflict: OnConflict,
    #[serde(default)]
    pub suppress_warnings: Vec<String>,
}

impl DaoMethod {
    pub fn delegate_name(&self) -> String {
        self.delegate
            .clone()
            .unwrap_or_else(|| format!("{}_body", self.name))
    }

    pub fn suppressed(&self) -> Vec<Warning> {
        parse_suppressed(&self.suppress_warnings)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    /// Name used by `:name` placeholders; defaults to the parameter name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_name: Option<String>,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            sql_name: None,
        }
    }

    pub fn sql_name(&self) -> &str {
        self.sql_name.as_deref().unwrap_or(&self.name)
    }
}

// Unknown keys are ignored, matching how suppression attributes behave.
fn parse_suppressed(keys: &[String]) -> Vec<Warning> {
    keys.iter().filter_map(|k| k.parse().ok()).collect()
}
