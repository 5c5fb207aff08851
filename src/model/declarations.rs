use std::path::Path;

use serde::{Deserialize, Serialize};

use super::converter::ConverterClass;
use super::dao::Dao;
use super::entity::{Entity, Pojo, View};
use super::shape::{EmbeddedShape, PojoShape};
use super::types::TypeRef;
use crate::diagnostics::messages;
use crate::error::{DaocError, Result};

// Embedding deeper than this is treated as a cycle.
const MAX_EMBED_DEPTH: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseDecl {
    /// Converter classes visible to every DAO.
    #[serde(default)]
    pub converters: Vec<String>,
}

/// Everything a round compiles, as read from a declarations file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Declarations {
    pub database: DatabaseDecl,
    pub entities: Vec<Entity>,
    pub views: Vec<View>,
    pub pojos: Vec<Pojo>,
    pub converters: Vec<ConverterClass>,
    pub daos: Vec<Dao>,
}

impl Declarations {
    /// Reads a `.toml` or `.json` declarations file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| DaocError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content, path),
            Some("json") => serde_json::from_str(&content).map_err(|source| DaocError::Json {
                path: path.to_path_buf(),
                source,
            }),
            other => Err(DaocError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|source| DaocError::Toml {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name() == name)
    }

    pub fn converter_class(&self, name: &str) -> Option<&ConverterClass> {
        self.converters.iter().find(|c| c.name == name)
    }

    /// Looks up an entity, view or plain pojo declaration by type name.
    pub fn pojo(&self, name: &str) -> Option<&Pojo> {
        self.entities
            .iter()
            .map(|e| &e.pojo)
            .chain(self.views.iter().map(|v| &v.pojo))
            .chain(self.pojos.iter())
            .find(|p| p.name == name)
    }

    pub fn is_pojo_type(&self, ty: &TypeRef) -> bool {
        ty.args().is_empty() && self.pojo(ty.name()).is_some()
    }

    /// Resolves a pojo-like type into its full column shape.
    ///
    /// Errors are diagnostic messages naming the unresolvable part.
    pub fn resolve_shape(&self, ty: &TypeRef) -> std::result::Result<PojoShape, String> {
        self.resolve_with_prefix(ty, "", 0)
    }

    fn resolve_with_prefix(
        &self,
        ty: &TypeRef,
        prefix: &str,
        depth: usize,
    ) -> std::result::Result<PojoShape, String> {
        if depth > MAX_EMBED_DEPTH {
            return Err(messages::unknown_pojo_type(&ty.to_string()));
        }
        let pojo = self
            .pojo(ty.name())
            .filter(|_| ty.args().is_empty())
            .ok_or_else(|| messages::unknown_pojo_type(&ty.to_string()))?;
        let mut embedded = Vec::with_capacity(pojo.embedded.len());
        for e in &pojo.embedded {
            if e.ty.is_option() {
                return Err(messages::EMBEDDED_OPTIONAL_NOT_SUPPORTED.to_string());
            }
            let inner_prefix = format!("{prefix}{}", e.prefix);
            let shape = self.resolve_with_prefix(&e.ty, &inner_prefix, depth + 1)?;
            embedded.push(EmbeddedShape {
                field: e.field.clone(),
                shape,
            });
        }
        Ok(PojoShape {
            type_ref: pojo.type_ref(),
            fields: pojo.fields.iter().map(|f| f.with_prefix(prefix)).collect(),
            embedded,
            relations: pojo.relations.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECLS: &str = r#"
        [[entities]]
        name = "User"
        table = "user"
        primary_key = ["id"]
        fields = [
            { name = "id", type = "i64" },
            { name = "name", type = "Option<String>" },
        ]
        embedded = [{ field = "address", type = "Address", prefix = "home_" }]

        [[pojos]]
        name = "Address"
        fields = [{ name = "street", type = "String" }, { name = "city", type = "String" }]
        embedded = [{ field = "geo", type = "Geo", prefix = "geo_" }]

        [[pojos]]
        name = "Geo"
        fields = [{ name = "lat", type = "f64" }]

        [[pojos]]
        name = "Loop"
        embedded = [{ field = "again", type = "Loop" }]

        [[daos]]
        name = "UserDao"

        [[daos.methods]]
        name = "load_all"
        sql = "SELECT * FROM user"
        returns = "Vec<User>"
    "#;

    fn decls() -> Declarations {
        Declarations::from_toml_str(DECLS, Path::new("decls.toml")).unwrap()
    }

    #[test]
    fn test_parse_declarations() {
        let d = decls();
        assert_eq!(d.entities.len(), 1);
        assert_eq!(d.entities[0].table_name(), "user");
        assert_eq!(d.daos[0].methods[0].returns.to_string(), "Vec<User>");
        assert!(d.daos[0].methods[0].params.is_empty());
        assert!(d.daos[0].methods[0].returns.is_vec());
    }

    #[test]
    fn test_resolve_shape_applies_nested_prefixes() {
        let d = decls();
        let shape = d.resolve_shape(&TypeRef::simple("User")).unwrap();
        let columns: Vec<String> = shape
            .all_fields()
            .iter()
            .map(|f| f.field.column_name().to_string())
            .collect();
        assert_eq!(columns, vec!["id", "name", "home_street", "home_city", "home_geo_lat"]);
    }

    #[test]
    fn test_resolve_shape_unknown_and_cyclic() {
        let d = decls();
        assert!(d.resolve_shape(&TypeRef::simple("Nope")).is_err());
        assert!(d.resolve_shape(&TypeRef::simple("Loop")).is_err());
    }

    #[test]
    fn test_load_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decls.json");
        std::fs::write(&path, r#"{"pojos": [{"name": "P", "fields": [{"name": "x", "type": "i32"}]}]}"#)
            .unwrap();
        let d = Declarations::load(&path).unwrap();
        assert!(d.is_pojo_type(&TypeRef::simple("P")));
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decls.yaml");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            Declarations::load(&path),
            Err(DaocError::UnsupportedFormat(_))
        ));
    }
}
