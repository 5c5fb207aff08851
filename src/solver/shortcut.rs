/// Entity parameters of insert, update and delete methods.
use crate::diagnostics::{messages, Logger};
use crate::model::{Param, TypeRef};

use super::store::TypeAdapterStore;
use super::types::StatementValueBinder;

/// A column of the entity and how its field is bound.
#[derive(Clone)]
pub struct ShortcutColumn {
    /// Field names from the entity root.
    pub path: Vec<String>,
    pub column: String,
    pub binder: StatementValueBinder,
}

impl ShortcutColumn {
    /// `owner.a.b` for a field reached through embedded pojos.
    pub fn value(&self, owner: &str) -> String {
        format!("{owner}.{}", self.path.join("."))
    }
}

/// An entity (or `Vec` of entities) written by a shortcut method.
#[derive(Clone)]
pub struct ShortcutParameter {
    pub name: String,
    pub ty: TypeRef,
    pub multiple: bool,
    pub entity: String,
    pub table: String,
    /// Every column-backed field, depth first.
    pub columns: Vec<ShortcutColumn>,
    /// Primary key columns, in key order.
    pub primary_key: Vec<String>,
}

impl ShortcutParameter {
    /// Resolves `param` against the declared entities; logs why it cannot be
    /// written when it is not an entity or one of its fields cannot be bound.
    pub fn resolve(store: &TypeAdapterStore<'_>, param: &Param, logger: &mut Logger) -> Option<Self> {
        let multiple = param.ty.is_vec();
        let element = if multiple { &param.ty.args()[0] } else { &param.ty };
        let entity = element
            .args()
            .is_empty()
            .then(|| store.decls().entity(element.name()))
            .flatten();
        let Some(entity) = entity else {
            logger.e(messages::shortcut_parameter_not_an_entity(&param.name, &param.ty.to_string()));
            return None;
        };
        let shape = match store.decls().resolve_shape(&entity.pojo.type_ref()) {
            Ok(shape) => shape,
            Err(message) => {
                logger.e(message);
                return None;
            }
        };

        let mut failed = false;
        let mut columns = Vec::new();
        for path in shape.all_fields() {
            match store.find_column_binder(&path.field.ty, path.field.effective_affinity()) {
                Some(binder) => columns.push(ShortcutColumn {
                    path: path.path.iter().map(|s| s.to_string()).collect(),
                    column: path.field.column_name().to_string(),
                    binder,
                }),
                None => {
                    logger.e(messages::cannot_bind_field(
                        entity.name(),
                        &path.display_path(),
                        &path.field.ty.to_string(),
                    ));
                    failed = true;
                }
            }
        }
        let mut primary_key = Vec::with_capacity(entity.primary_key.len());
        for key in &entity.primary_key {
            match shape.find_by_column(key) {
                Some(path) => primary_key.push(path.field.column_name().to_string()),
                None => {
                    logger.e(messages::primary_key_column_not_found(entity.name(), key));
                    failed = true;
                }
            }
        }
        if failed {
            return None;
        }
        Some(Self {
            name: param.name.clone(),
            ty: param.ty.clone(),
            multiple,
            entity: entity.name().to_string(),
            table: entity.table_name().to_string(),
            columns,
            primary_key,
        })
    }

    pub fn key_columns(&self) -> impl Iterator<Item = &ShortcutColumn> {
        self.primary_key
            .iter()
            .filter_map(|key| self.columns.iter().find(|c| &c.column == key))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::model::Declarations;

    fn decls() -> Declarations {
        Declarations::from_toml_str(
            r#"
            [[entities]]
            name = "User"
            table = "user"
            primary_key = ["user_id"]
            fields = [
                { name = "id", type = "i64", column = "user_id" },
                { name = "name", type = "String" },
            ]
            embedded = [{ field = "address", type = "Address", prefix = "home_" }]

            [[entities]]
            name = "Visit"
            fields = [{ name = "at", type = "Instant" }]

            [[pojos]]
            name = "Address"
            fields = [{ name = "street", type = "String" }]
            "#,
            Path::new("t.toml"),
        )
        .unwrap()
    }

    fn resolve(decls: &Declarations, ty: &str) -> (Option<ShortcutParameter>, Logger) {
        let store = TypeAdapterStore::create(decls, 2, &[]);
        let mut logger = Logger::default();
        let param = Param::new("value", TypeRef::parse(ty).unwrap());
        (ShortcutParameter::resolve(&store, &param, &mut logger), logger)
    }

    #[test]
    fn test_columns_follow_embedded_paths() {
        let d = decls();
        let (param, logger) = resolve(&d, "Vec<User>");
        assert!(!logger.log().has_errors());
        let param = param.unwrap();
        assert!(param.multiple);
        assert_eq!(param.table, "user");
        let columns: Vec<&str> = param.columns.iter().map(|c| c.column.as_str()).collect();
        assert_eq!(columns, vec!["user_id", "name", "home_street"]);
        assert_eq!(param.columns[2].value("_item"), "_item.address.street");
        let keys: Vec<&str> = param.key_columns().map(|c| c.path[0].as_str()).collect();
        assert_eq!(keys, vec!["id"]);
    }

    #[test]
    fn test_non_entity_rejected() {
        let d = decls();
        let (param, logger) = resolve(&d, "Option<User>");
        assert!(param.is_none());
        let log = logger.into_log();
        assert_eq!(
            log.iter().next().unwrap().message,
            messages::shortcut_parameter_not_an_entity("value", "Option<User>")
        );
    }

    #[test]
    fn test_unbindable_field_reported() {
        let d = decls();
        let (param, logger) = resolve(&d, "Visit");
        assert!(param.is_none());
        let log = logger.into_log();
        assert_eq!(
            log.iter().next().unwrap().message,
            messages::cannot_bind_field("Visit", "at", "Instant")
        );
    }
}
