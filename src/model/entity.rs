use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::{Primitive, TypeRef};

/// SQLite column type affinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Affinity {
    Text,
    Integer,
    Real,
    Blob,
}

impl Affinity {
    pub fn name(self) -> &'static str {
        match self {
            Affinity::Text => "TEXT",
            Affinity::Integer => "INTEGER",
            Affinity::Real => "REAL",
            Affinity::Blob => "BLOB",
        }
    }

    /// Applies SQLite's affinity rules to a declared column type.
    ///
    /// Returns `None` for an empty declaration and for NUMERIC affinity,
    /// which has no column adapter of its own.
    pub fn from_decl_type(decl: &str) -> Option<Affinity> {
        let upper = decl.to_ascii_uppercase();
        if upper.trim().is_empty() {
            return None;
        }
        if upper.contains("INT") {
            Some(Affinity::Integer)
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            Some(Affinity::Text)
        } else if upper.contains("BLOB") {
            Some(Affinity::Blob)
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            Some(Affinity::Real)
        } else {
            None
        }
    }

    /// The affinity a built-in type is stored with, if it has one.
    pub fn for_type(ty: &TypeRef) -> Option<Affinity> {
        let ty = ty.non_null();
        if let Some(p) = ty.primitive() {
            return Some(match p {
                Primitive::F32 | Primitive::F64 => Affinity::Real,
                _ => Affinity::Integer,
            });
        }
        if ty.is(super::types::STRING) {
            Some(Affinity::Text)
        } else if ty.is_byte_vec() || ty.is(super::types::BYTES) {
            Some(Affinity::Blob)
        } else {
            None
        }
    }
}

impl fmt::Display for Affinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A field that maps to one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    /// Column name; defaults to the field name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<Affinity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            column: None,
            affinity: None,
            default_value: None,
        }
    }

    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }

    pub fn non_null(&self) -> bool {
        !self.ty.is_nullable()
    }

    /// Declared affinity, falling back to the one implied by the type.
    pub fn effective_affinity(&self) -> Option<Affinity> {
        self.affinity.or_else(|| Affinity::for_type(&self.ty))
    }

    /// Identity of the column as it appears in the schema.
    pub fn schema_identity(&self) -> String {
        let affinity = self.effective_affinity().unwrap_or(Affinity::Text);
        let mut id = format!("{}-{}-{}", self.column_name(), affinity, self.non_null());
        if let Some(default) = &self.default_value {
            id.push_str("-defaultValue=");
            id.push_str(default);
        }
        id
    }

    /// Column definition used in generated `CREATE TABLE` statements.
    pub fn database_definition(&self) -> String {
        let affinity = self.effective_affinity().unwrap_or(Affinity::Text);
        let mut def = format!("`{}` {}", self.column_name(), affinity);
        if self.non_null() {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default_value {
            def.push_str(" DEFAULT ");
            def.push_str(default);
        }
        def
    }

    /// The same field read from a prefixed column, as inside an embedded pojo.
    pub fn with_prefix(&self, prefix: &str) -> Field {
        let mut field = self.clone();
        if !prefix.is_empty() {
            field.column = Some(format!("{prefix}{}", self.column_name()));
        }
        field
    }
}

/// A nested pojo whose fields are read from the same row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embedded {
    pub field: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    /// Prepended to every column name of the embedded pojo.
    #[serde(default)]
    pub prefix: String,
}

/// A field filled by a second query keyed on a parent column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub field: String,
    /// `Vec<T>` for one-to-many, `Option<T>` or `T` for one-to-one.
    #[serde(rename = "type")]
    pub ty: TypeRef,
    /// The entity holding the related rows.
    pub entity: String,
    pub parent_column: String,
    pub entity_column: String,
    /// Column of the related entity to read when the element is not the entity itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection: Option<String>,
}

impl Relation {
    pub fn is_collection(&self) -> bool {
        self.ty.is_vec() && !self.ty.is_byte_vec()
    }

    /// The element type stored per related row.
    pub fn element_type(&self) -> TypeRef {
        if self.is_collection() || self.ty.is_option() {
            self.ty.args()[0].clone()
        } else {
            self.ty.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pojo {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub embedded: Vec<Embedded>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl Pojo {
    pub fn type_ref(&self) -> TypeRef {
        TypeRef::simple(self.name.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(flatten)]
    pub pojo: Pojo,
    /// Table name; defaults to the entity name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    /// Exact DDL replayed into the reference database, when given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ddl: Option<String>,
}

impl Entity {
    pub fn name(&self) -> &str {
        &self.pojo.name
    }

    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.pojo.name)
    }

    /// `CREATE TABLE IF NOT EXISTS` for the entity's own (non-embedded) fields
    /// followed by the given embedded columns.
    pub fn create_table_query(&self, columns: &[Field]) -> String {
        let mut defs: Vec<String> = columns.iter().map(Field::database_definition).collect();
        if !self.primary_key.is_empty() {
            let keys: Vec<String> = self.primary_key.iter().map(|k| format!("`{k}`")).collect();
            defs.push(format!("PRIMARY KEY({})", keys.join(", ")));
        }
        format!(
            "CREATE TABLE IF NOT EXISTS `{}` ({})",
            self.table_name(),
            defs.join(", ")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    #[serde(flatten)]
    pub pojo: Pojo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    pub query: String,
}

impl View {
    pub fn view_name(&self) -> &str {
        self.view.as_deref().unwrap_or(&self.pojo.name)
    }

    pub fn create_view_query(&self) -> String {
        format!("CREATE VIEW `{}` AS {}", self.view_name(), self.query)
    }
}
