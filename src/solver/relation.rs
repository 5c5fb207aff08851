use crate::diagnostics::{messages, Logger};
use crate::model::{PojoShape, Relation, TypeRef};
use crate::writer::{CodeGenScope, RelationFetcher};

use super::row::{EntityRowAdapter, RowState};
use super::store::TypeAdapterStore;
use super::types::{CursorValueReader, StatementValueBinder};

/// What each related row becomes.
pub enum RelationElement {
    Entity(EntityRowAdapter),
    Column { column: String, reader: CursorValueReader },
}

/// Collects parent keys before the row loop, fetches every related row in
/// one query, then hands each parent its slice.
pub struct RelationCollector {
    relation: Relation,
    path: Vec<String>,
    entity_table: String,
    parent_reader: CursorValueReader,
    parent_nullable: bool,
    key_ty: TypeRef,
    key_reader: CursorValueReader,
    key_binder: StatementValueBinder,
    element_ty: TypeRef,
    element: RelationElement,
}

impl RelationCollector {
    pub fn new(
        store: &TypeAdapterStore<'_>,
        shape: &PojoShape,
        path: Vec<String>,
        relation: &Relation,
        logger: &mut Logger,
    ) -> Option<Self> {
        let decls = store.decls();
        let Some(entity) = decls.entity(&relation.entity) else {
            logger.e(messages::unknown_relation_entity(&relation.entity));
            return None;
        };
        let Some(parent) = shape.find_by_column(&relation.parent_column) else {
            logger.e(messages::relation_column_missing(&shape.type_name(), &relation.parent_column));
            return None;
        };
        if !relation.is_collection() && !relation.ty.is_option() {
            logger.e(messages::relation_element_unsupported(&relation.ty.to_string()));
            return None;
        }
        let entity_shape = match decls.resolve_shape(&entity.pojo.type_ref()) {
            Ok(shape) => shape,
            Err(message) => {
                logger.e(message);
                return None;
            }
        };
        if entity_shape.find_by_column(&relation.entity_column).is_none() {
            logger.e(messages::relation_column_missing(entity.name(), &relation.entity_column));
            return None;
        }

        let key_ty = parent.field.ty.non_null();
        let parent_reader = store.find_cursor_reader(&parent.field.ty, parent.field.effective_affinity());
        let key_reader = store.find_cursor_reader(&key_ty, parent.field.effective_affinity());
        let key_binder = store.find_statement_binder(&key_ty);
        let (Some(parent_reader), Some(key_reader), Some(key_binder)) = (parent_reader, key_reader, key_binder)
        else {
            logger.e(messages::cannot_read_field(
                &shape.type_name(),
                &parent.display_path(),
                &parent.field.ty.to_string(),
            ));
            return None;
        };

        let element_ty = relation.element_type();
        let element = match &relation.projection {
            Some(column) => {
                let Some(field) = entity_shape.find_by_column(column) else {
                    logger.e(messages::relation_column_missing(entity.name(), column));
                    return None;
                };
                let Some(reader) = store.find_cursor_reader(&element_ty, field.field.effective_affinity()) else {
                    logger.e(messages::relation_element_unsupported(&element_ty.to_string()));
                    return None;
                };
                RelationElement::Column {
                    column: column.clone(),
                    reader,
                }
            }
            None if element_ty == entity.pojo.type_ref() => {
                RelationElement::Entity(EntityRowAdapter::new(store, entity.name(), logger)?)
            }
            None => {
                logger.e(messages::relation_element_unsupported(&element_ty.to_string()));
                return None;
            }
        };

        Some(Self {
            relation: relation.clone(),
            path,
            entity_table: entity.table_name().to_string(),
            parent_reader,
            parent_nullable: parent.field.ty.is_nullable(),
            key_ty,
            key_reader,
            key_binder,
            element_ty,
            element,
        })
    }

    pub fn entity_table(&self) -> &str {
        &self.entity_table
    }

    pub fn parent_column(&self) -> &str {
        &self.relation.parent_column
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn relation(&self) -> &Relation {
        &self.relation
    }

    pub fn key_type(&self) -> &TypeRef {
        &self.key_ty
    }

    pub fn key_reader(&self) -> &CursorValueReader {
        &self.key_reader
    }

    pub fn key_binder(&self) -> &StatementValueBinder {
        &self.key_binder
    }

    pub fn element_type(&self) -> &TypeRef {
        &self.element_ty
    }

    pub fn element(&self) -> &RelationElement {
        &self.element
    }

    /// `SELECT .. FROM table WHERE key IN (` up to the placeholder list.
    pub fn query_prefix(&self) -> String {
        let projection = match &self.element {
            RelationElement::Entity(_) => "*".to_string(),
            RelationElement::Column { column, .. } => {
                format!("`{column}`,`{}`", self.relation.entity_column)
            }
        };
        format!(
            "SELECT {projection} FROM `{}` WHERE `{}` IN (",
            self.entity_table, self.relation.entity_column
        )
    }

    fn map_type(&self) -> String {
        format!("HashMap<{}, Vec<{}>>", self.key_ty, self.element_ty)
    }

    /// Reads the parent key of the current row; `None`-able when the parent column is.
    fn write_parent_key(&self, cursor: &str, state: &RowState, scope: &mut CodeGenScope<'_>) -> String {
        let key = scope.tmp_var("tmp_key");
        let index = state
            .known_index(&self.relation.parent_column)
            .unwrap_or("0")
            .to_string();
        let ty = self.parent_reader.type_ref().to_string();
        scope.builder().add_statement(format!("let {key}: {ty}"));
        self.parent_reader.read_from_cursor(&key, cursor, &index, scope);
        key
    }

    /// Declares the key map, fills its keys and fetches the related rows.
    pub fn write_prefetch(&self, cursor: &str, state: &RowState, scope: &mut CodeGenScope<'_>) -> String {
        let map = scope.tmp_var(&format!("collection_{}", self.path.join("_")));
        let map_ty = self.map_type();
        scope
            .builder()
            .add_statement(format!("let mut {map}: {map_ty} = HashMap::new()"));
        let body = scope.fork(|child| {
            let key = self.write_parent_key(cursor, state, child);
            if self.parent_nullable {
                child
                    .builder()
                    .begin_control_flow(format!("if let Some(_key) = {key}"))
                    .add_statement(format!("{map}.entry(_key).or_default()"))
                    .end_control_flow();
            } else {
                child
                    .builder()
                    .add_statement(format!("{map}.entry({key}).or_default()"));
            }
        });
        let fetch = scope.writer().get_or_create_method(&RelationFetcher(self));
        let receiver = scope.receiver().to_string();
        scope
            .builder()
            .begin_control_flow(format!("while {cursor}.move_to_next()"))
            .add_code(&body)
            .end_control_flow()
            .add_statement(format!("{cursor}.move_to_position(-1)"))
            .add_statement(format!("{receiver}.{fetch}(&mut {map})?"));
        map
    }

    /// Declares the relation field's value for the current row.
    pub fn write_lookup(&self, map: &str, cursor: &str, state: &RowState, scope: &mut CodeGenScope<'_>) -> String {
        let key = self.write_parent_key(cursor, state, scope);
        let var = scope.tmp_var(&format!("tmp_{}", self.path.join("_")));
        let lookup = if self.parent_nullable {
            format!("{key}.as_ref().and_then(|_k| {map}.get(_k))")
        } else {
            format!("{map}.get(&{key})")
        };
        let value = if self.relation.is_collection() {
            format!("{lookup}.cloned().unwrap_or_default()")
        } else {
            format!("{lookup}.and_then(|_items| _items.first().cloned())")
        };
        scope
            .builder()
            .add_statement(format!("let {var}: {} = {value}", self.relation.ty));
        var
    }
}
