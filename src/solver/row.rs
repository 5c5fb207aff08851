/// Row adapters: how one cursor row becomes one value.
///
/// Code generation is split in two phases. `on_cursor_ready` runs once
/// before the row loop and declares column indices and relation maps;
/// `convert` runs per row and assigns the value to an already declared
/// output variable.
use std::collections::{BTreeSet, HashMap};

use crate::diagnostics::{messages, Logger, Warning};
use crate::model::{Affinity, PojoShape, TypeRef};
use crate::sql::QueryResultInfo;
use crate::writer::{string_literal, CodeGenScope, EntityCursorConverter};

use super::relation::RelationCollector;
use super::store::TypeAdapterStore;
use super::types::CursorValueReader;

pub enum RowAdapter {
    SingleColumn(SingleColumnRowAdapter),
    Entity(EntityRowAdapter),
    Pojo(PojoRowAdapter),
}

/// Column index variables and relation maps declared by `on_cursor_ready`.
#[derive(Debug, Default)]
pub struct RowState {
    indices: HashMap<String, IndexVar>,
    collections: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) enum IndexVar {
    /// A `usize` known to be valid.
    Known(String),
    /// An `Option<usize>`; the column may be absent at runtime.
    Optional(String),
}

impl RowState {
    pub(crate) fn known_index(&self, column: &str) -> Option<&str> {
        match self.indices.get(column) {
            Some(IndexVar::Known(var)) => Some(var),
            _ => None,
        }
    }
}

impl RowAdapter {
    pub fn out_type(&self) -> &TypeRef {
        match self {
            RowAdapter::SingleColumn(a) => a.reader.type_ref(),
            RowAdapter::Entity(a) => &a.shape.type_ref,
            RowAdapter::Pojo(a) => &a.shape.type_ref,
        }
    }

    pub fn as_pojo(&self) -> Option<&PojoRowAdapter> {
        match self {
            RowAdapter::Pojo(a) => Some(a),
            _ => None,
        }
    }

    /// Tables the produced values are read from, beyond the query's own.
    pub fn accessed_tables(&self) -> BTreeSet<String> {
        match self {
            RowAdapter::SingleColumn(_) => BTreeSet::new(),
            RowAdapter::Entity(a) => BTreeSet::from([a.table.clone()]),
            RowAdapter::Pojo(a) => a
                .relations
                .iter()
                .map(|r| r.entity_table().to_string())
                .collect(),
        }
    }

    pub fn has_relations(&self) -> bool {
        matches!(self, RowAdapter::Pojo(a) if !a.relations.is_empty())
    }

    pub fn on_cursor_ready(&self, cursor: &str, scope: &mut CodeGenScope<'_>) -> RowState {
        match self {
            RowAdapter::Pojo(a) => a.on_cursor_ready(cursor, scope),
            _ => RowState::default(),
        }
    }

    pub fn convert(&self, out: &str, cursor: &str, state: &RowState, scope: &mut CodeGenScope<'_>) {
        match self {
            RowAdapter::SingleColumn(a) => a.reader.read_from_cursor(out, cursor, "0", scope),
            RowAdapter::Entity(a) => a.convert(out, cursor, scope),
            RowAdapter::Pojo(a) => a.convert(out, cursor, state, scope),
        }
    }
}

pub struct SingleColumnRowAdapter {
    pub reader: CursorValueReader,
}

/// A column-backed field with the reader for its declared type.
#[derive(Clone)]
pub(crate) struct FieldBinding {
    pub(crate) path: Vec<String>,
    pub(crate) column: String,
    pub(crate) ty: TypeRef,
    pub(crate) reader: CursorValueReader,
}

impl FieldBinding {
    fn display_path(&self) -> String {
        self.path.join(".")
    }

    fn var_fragment(&self) -> String {
        self.path.join("_")
    }
}

/// Readers for every field of `shape`; logs one error per unreadable field.
pub(crate) fn bind_fields(
    store: &TypeAdapterStore<'_>,
    shape: &PojoShape,
    logger: &mut Logger,
) -> Option<Vec<FieldBinding>> {
    let mut bindings = Vec::new();
    let mut failed = false;
    for path in shape.all_fields() {
        match store.find_cursor_reader(&path.field.ty, path.field.effective_affinity()) {
            Some(reader) => bindings.push(FieldBinding {
                path: path.path.iter().map(|s| s.to_string()).collect(),
                column: path.field.column_name().to_string(),
                ty: path.field.ty.clone(),
                reader,
            }),
            None => {
                logger.e(messages::cannot_read_field(
                    &shape.type_name(),
                    &path.display_path(),
                    &path.field.ty.to_string(),
                ));
                failed = true;
            }
        }
    }
    (!failed).then_some(bindings)
}

/// Declares and reads `binding` into a fresh variable, returning its name.
pub(crate) fn write_field_read(
    binding: &FieldBinding,
    index: Option<&IndexVar>,
    cursor: &str,
    scope: &mut CodeGenScope<'_>,
) -> String {
    let var = scope.tmp_var(&format!("tmp_{}", binding.var_fragment()));
    scope
        .builder()
        .add_statement(format!("let {var}: {}", binding.ty));
    match index {
        Some(IndexVar::Known(index)) => binding.reader.read_from_cursor(&var, cursor, index, scope),
        Some(IndexVar::Optional(index)) => {
            let present = scope.tmp_var("index");
            let read = scope.fork(|child| binding.reader.read_from_cursor(&var, cursor, &present, child));
            scope
                .builder()
                .begin_control_flow(format!("if let Some({present}) = {index}"))
                .add_code(&read)
                .next_control_flow("else")
                .add_statement(format!("{var} = None"))
                .end_control_flow();
        }
        None => {
            scope.builder().add_statement(format!("{var} = None"));
        }
    }
    var
}

/// `index = db_util::column_index_or_throw(..)?` or the optional lookup.
pub(crate) fn declare_index(
    column: &str,
    fragment: &str,
    required: bool,
    cursor: &str,
    scope: &mut CodeGenScope<'_>,
) -> IndexVar {
    let var = scope.tmp_var(&format!("cursor_index_of_{fragment}"));
    let column = string_literal(column);
    if required {
        scope.builder().add_statement(format!(
            "let {var} = db_util::column_index_or_throw(&{cursor}, {column})?"
        ));
        IndexVar::Known(var)
    } else {
        scope
            .builder()
            .add_statement(format!("let {var} = db_util::column_index(&{cursor}, {column})"));
        IndexVar::Optional(var)
    }
}

/// `Type { field: var, nested: Nested { .. }, .. }` from per-path values.
pub(crate) fn struct_literal(shape: &PojoShape, prefix: &[String], values: &HashMap<String, String>) -> String {
    let mut parts = Vec::new();
    let key = |name: &str| {
        let mut path = prefix.to_vec();
        path.push(name.to_string());
        path.join(".")
    };
    for field in &shape.fields {
        if let Some(value) = values.get(&key(&field.name)) {
            parts.push(format!("{}: {value}", field.name));
        }
    }
    for embedded in &shape.embedded {
        let mut path = prefix.to_vec();
        path.push(embedded.field.clone());
        parts.push(format!(
            "{}: {}",
            embedded.field,
            struct_literal(&embedded.shape, &path, values)
        ));
    }
    for relation in &shape.relations {
        if let Some(value) = values.get(&key(&relation.field)) {
            parts.push(format!("{}: {value}", relation.field));
        }
    }
    format!("{} {{ {} }}", shape.type_ref, parts.join(", "))
}

/// An entity read through a shared per-row converter method.
pub struct EntityRowAdapter {
    pub(crate) entity: String,
    pub(crate) table: String,
    pub(crate) shape: PojoShape,
    pub(crate) fields: Vec<FieldBinding>,
}

impl EntityRowAdapter {
    pub fn new(store: &TypeAdapterStore<'_>, entity: &str, logger: &mut Logger) -> Option<Self> {
        let decl = store.decls().entity(entity)?;
        let shape = match store.decls().resolve_shape(&decl.pojo.type_ref()) {
            Ok(shape) => shape,
            Err(message) => {
                logger.e(message);
                return None;
            }
        };
        let fields = bind_fields(store, &shape, logger)?;
        Some(Self {
            entity: decl.name().to_string(),
            table: decl.table_name().to_string(),
            shape,
            fields,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Emits `out = receiver.__entity_cursor_converter_x(&cursor)?`.
    pub fn convert(&self, out: &str, cursor: &str, scope: &mut CodeGenScope<'_>) {
        let method = scope.writer().get_or_create_method(&EntityCursorConverter(self));
        let receiver = scope.receiver().to_string();
        scope
            .builder()
            .add_statement(format!("{out} = {receiver}.{method}(&{cursor})?"));
    }

    /// Body of the converter method: one row of `_cursor` into the entity.
    pub(crate) fn write_row(&self, cursor: &str, scope: &mut CodeGenScope<'_>) -> String {
        let mut indices = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let required = !field.ty.is_nullable();
            indices.push(declare_index(&field.column, &field.var_fragment(), required, cursor, scope));
        }
        let mut values = HashMap::new();
        for (field, index) in self.fields.iter().zip(&indices) {
            let var = write_field_read(field, Some(index), cursor, scope);
            values.insert(field.display_path(), var);
        }
        let out = scope.tmp_var("entity");
        let literal = struct_literal(&self.shape, &[], &values);
        scope.builder().add_statement(format!("let {out} = {literal}"));
        out
    }
}

/// Which result columns feed which pojo fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PojoMapping {
    /// Matched columns in result order.
    pub used_columns: Vec<String>,
    pub unused_columns: Vec<String>,
    pub unused_fields: Vec<String>,
}

/// A pojo filled column by column, with embedded pojos and relations.
pub struct PojoRowAdapter {
    pub(crate) shape: PojoShape,
    pub(crate) fields: Vec<FieldBinding>,
    pub(crate) relations: Vec<RelationCollector>,
    mapping: PojoMapping,
    has_info: bool,
}

impl PojoRowAdapter {
    pub fn new(
        store: &TypeAdapterStore<'_>,
        shape: PojoShape,
        info: Option<&QueryResultInfo>,
        logger: &mut Logger,
    ) -> Option<Self> {
        let type_name = shape.type_name();
        let fields = bind_fields(store, &shape, logger)?;
        let mut ok = true;

        let mapping = match info {
            Some(info) => {
                if info.has_duplicate_columns() {
                    logger.w(
                        Warning::DuplicateResultColumns,
                        messages::duplicate_result_columns(&info.duplicate_columns()),
                    );
                }
                let mut used_columns = Vec::new();
                let mut unused_columns = Vec::new();
                for column in &info.columns {
                    if used_columns.contains(&column.name) || unused_columns.contains(&column.name) {
                        continue;
                    }
                    if fields.iter().any(|f| f.column == column.name) {
                        used_columns.push(column.name.clone());
                    } else {
                        unused_columns.push(column.name.clone());
                    }
                }
                let unmatched: Vec<&FieldBinding> = fields
                    .iter()
                    .filter(|f| !used_columns.contains(&f.column))
                    .collect();
                let all_columns = info.column_names();
                if used_columns.is_empty() && !fields.is_empty() {
                    logger.e(messages::cannot_find_query_result_adapter(&type_name));
                    ok = false;
                } else {
                    let missing_non_null: Vec<String> = unmatched
                        .iter()
                        .filter(|f| !f.ty.is_nullable())
                        .map(|f| f.display_path())
                        .collect();
                    if !missing_non_null.is_empty() {
                        logger.e(messages::pojo_missing_non_null(&type_name, &missing_non_null, &all_columns));
                        ok = false;
                    }
                }
                let unused_fields: Vec<String> = unmatched.iter().map(|f| f.display_path()).collect();
                if ok && (!unused_columns.is_empty() || !unused_fields.is_empty()) {
                    let all_fields: Vec<String> = fields.iter().map(|f| f.display_path()).collect();
                    logger.w(
                        Warning::CursorMismatch,
                        messages::cursor_pojo_mismatch(
                            &type_name,
                            &unused_columns,
                            &all_columns,
                            &unused_fields,
                            &all_fields,
                        ),
                    );
                }
                PojoMapping {
                    used_columns,
                    unused_columns,
                    unused_fields,
                }
            }
            None => PojoMapping {
                used_columns: fields.iter().map(|f| f.column.clone()).collect(),
                ..Default::default()
            },
        };

        let mut relations = Vec::new();
        for (path, relation) in shape.all_relations() {
            let path: Vec<String> = path.iter().map(|s| s.to_string()).collect();
            match RelationCollector::new(store, &shape, path, relation, logger) {
                Some(collector) => relations.push(collector),
                None => ok = false,
            }
        }

        ok.then_some(Self {
            shape,
            fields,
            relations,
            mapping,
            has_info: info.is_some(),
        })
    }

    pub fn mapping(&self) -> &PojoMapping {
        &self.mapping
    }

    pub fn relations(&self) -> &[RelationCollector] {
        &self.relations
    }

    fn is_relation_parent(&self, column: &str) -> bool {
        self.relations.iter().any(|r| r.parent_column() == column)
    }

    fn on_cursor_ready(&self, cursor: &str, scope: &mut CodeGenScope<'_>) -> RowState {
        let mut state = RowState::default();
        for field in &self.fields {
            if !self.mapping.used_columns.contains(&field.column) {
                continue;
            }
            let required =
                self.has_info || !field.ty.is_nullable() || self.is_relation_parent(&field.column);
            let index = declare_index(&field.column, &field.var_fragment(), required, cursor, scope);
            state.indices.insert(field.column.clone(), index);
        }
        for collector in &self.relations {
            let map = collector.write_prefetch(cursor, &state, scope);
            state.collections.push(map);
        }
        state
    }

    fn convert(&self, out: &str, cursor: &str, state: &RowState, scope: &mut CodeGenScope<'_>) {
        let mut values = HashMap::new();
        for field in &self.fields {
            let var = write_field_read(field, state.indices.get(&field.column), cursor, scope);
            values.insert(field.display_path(), var);
        }
        for (collector, map) in self.relations.iter().zip(&state.collections) {
            let var = collector.write_lookup(map, cursor, state, scope);
            values.insert(collector.path().join("."), var);
        }
        let literal = struct_literal(&self.shape, &[], &values);
        scope.builder().add_statement(format!("{out} = {literal}"));
    }
}

/// The affinity of the first result column, used to pick a single-column reader.
pub(crate) fn first_column_affinity(info: Option<&QueryResultInfo>) -> Option<Affinity> {
    info.and_then(|i| i.columns.first()).and_then(|c| c.affinity)
}
