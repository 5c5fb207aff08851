use serde::{Deserialize, Serialize};

use super::types::TypeRef;

/// How generated code reaches a converter class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConverterKind {
    /// Associated functions, called as `Class::method(value)`.
    #[default]
    Static,
    /// Methods on a `Default`-constructed instance owned by the DAO.
    Instance,
    /// Methods on an instance supplied to the database at runtime.
    Provided,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterClass {
    pub name: String,
    #[serde(default)]
    pub kind: ConverterKind,
    #[serde(default)]
    pub methods: Vec<ConverterMethod>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterMethod {
    pub name: String,
    pub from: TypeRef,
    pub to: TypeRef,
}

/// One validated conversion method together with its owning class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomTypeConverter {
    pub class_name: String,
    pub kind: ConverterKind,
    pub method_name: String,
    pub from: TypeRef,
    pub to: TypeRef,
}

impl CustomTypeConverter {
    pub fn new(class: &ConverterClass, method: &ConverterMethod) -> Self {
        Self {
            class_name: class.name.clone(),
            kind: class.kind,
            method_name: method.name.clone(),
            from: method.from.clone(),
            to: method.to.clone(),
        }
    }

    /// `Class::method`, used in diagnostics.
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.class_name, self.method_name)
    }
}
