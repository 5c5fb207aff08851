/// Type adapter store: resolves types to column adapters, converters, row
/// adapters and result adapters.
///
/// Lookups that fail return `None`; the caller reports the failure once at
/// its own call site. Structural mismatches found while building a pojo
/// adapter are logged through the logger passed in.
use std::collections::HashSet;
use std::rc::Rc;

use tracing::trace;

use crate::abi;
use crate::diagnostics::Logger;
use crate::model::{Affinity, CustomTypeConverter, Declarations, TypeRef};
use crate::sql::{ParsedQuery, QueryResultInfo};

use super::parameter::QueryParameterAdapter;
use super::prepared::{PreparedQueryResultAdapter, WriteTarget};
use super::result::{EmptyResult, QueryResultAdapter};
use super::row::{first_column_affinity, EntityRowAdapter, PojoRowAdapter, RowAdapter, SingleColumnRowAdapter};
use super::types::{
    BlobColumnTypeAdapter, BoxedBooleanToBoxedIntConverter, ColumnTypeAdapter, CompositeAdapter,
    CompositeTypeConverter, CursorValueReader, CustomTypeConverterWrapper, NoOpConverter,
    NullSafeTypeConverter, PrimitiveBooleanToIntConverter, PrimitiveColumnTypeAdapter,
    StatementValueBinder, StringColumnTypeAdapter, TypeConverter,
};

pub struct TypeAdapterStore<'a> {
    decls: &'a Declarations,
    max_hops: usize,
    column_adapters: Vec<Rc<dyn ColumnTypeAdapter>>,
    /// Conversion edges in preference order: user converters, their
    /// null-safe lifts, then built-ins.
    converters: Vec<Rc<dyn TypeConverter>>,
}

impl<'a> TypeAdapterStore<'a> {
    /// `custom` lists user converters innermost scope first.
    pub fn create(decls: &'a Declarations, max_hops: usize, custom: &[CustomTypeConverter]) -> Self {
        let mut column_adapters = PrimitiveColumnTypeAdapter::create_all();
        column_adapters.extend(StringColumnTypeAdapter::create_all());
        column_adapters.extend(BlobColumnTypeAdapter::create_all());

        let wrapped: Vec<Rc<dyn TypeConverter>> = custom
            .iter()
            .map(|c| Rc::new(CustomTypeConverterWrapper::new(c.clone())) as Rc<dyn TypeConverter>)
            .collect();
        let mut converters = wrapped.clone();
        for converter in wrapped {
            if let Some(lifted) = NullSafeTypeConverter::lift(converter) {
                converters.push(Rc::new(lifted));
            }
        }
        converters.extend(PrimitiveBooleanToIntConverter::pair());
        converters.extend(BoxedBooleanToBoxedIntConverter::pair());

        Self {
            decls,
            max_hops: max_hops.max(1),
            column_adapters,
            converters,
        }
    }

    pub fn decls(&self) -> &'a Declarations {
        self.decls
    }

    fn built_in(&self, ty: &TypeRef) -> Option<Rc<dyn ColumnTypeAdapter>> {
        self.column_adapters
            .iter()
            .find(|a| a.out_type() == ty)
            .cloned()
    }

    fn is_built_in(&self, ty: &TypeRef, affinity: Option<Affinity>) -> bool {
        self.built_in(ty)
            .is_some_and(|a| affinity.map_or(true, |affinity| a.affinity() == affinity))
    }

    /// Breadth-first search over conversion edges starting at any of `from`.
    ///
    /// Returns the shortest chain whose output satisfies `accept`, preferring
    /// earlier edges among chains of equal length.
    fn find_type_converter(
        &self,
        from: &[TypeRef],
        accept: impl Fn(&TypeRef) -> bool,
    ) -> Option<Rc<dyn TypeConverter>> {
        let mut visited: HashSet<TypeRef> = from.iter().cloned().collect();
        let mut frontier: Vec<Rc<dyn TypeConverter>> = self
            .converters
            .iter()
            .filter(|c| from.contains(c.from()) && !visited.contains(c.to()))
            .cloned()
            .collect();
        for depth in 1..=self.max_hops {
            if let Some(found) = frontier.iter().find(|c| accept(c.to())) {
                trace!(converter = %found.describe(), depth, "found type converter");
                return Some(found.clone());
            }
            if depth == self.max_hops {
                break;
            }
            for chain in &frontier {
                visited.insert(chain.to().clone());
            }
            let mut next = Vec::new();
            for chain in &frontier {
                for edge in self.converters.iter() {
                    if edge.from() == chain.to() && !visited.contains(edge.to()) {
                        next.push(Rc::new(CompositeTypeConverter::new(chain.clone(), edge.clone()))
                            as Rc<dyn TypeConverter>);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        None
    }

    pub fn find_converter(&self, from: &TypeRef, to: &TypeRef) -> Option<Rc<dyn TypeConverter>> {
        if from == to {
            return Some(Rc::new(NoOpConverter::new(from.clone())));
        }
        self.find_type_converter(std::slice::from_ref(from), |t| t == to)
    }

    /// A converter from `ty` into some built-in column type, preferring `affinity`.
    fn find_converter_into_column(&self, ty: &TypeRef, affinity: Option<Affinity>) -> Option<Rc<dyn TypeConverter>> {
        let from = std::slice::from_ref(ty);
        if affinity.is_some() {
            if let Some(found) = self.find_type_converter(from, |t| self.is_built_in(t, affinity)) {
                return Some(found);
            }
        }
        self.find_type_converter(from, |t| self.is_built_in(t, None))
    }

    /// A converter from some built-in column type into `ty`, preferring `affinity`.
    fn find_converter_from_column(&self, ty: &TypeRef, affinity: Option<Affinity>) -> Option<Rc<dyn TypeConverter>> {
        let sources = |affinity: Option<Affinity>| -> Vec<TypeRef> {
            self.column_adapters
                .iter()
                .filter(|a| affinity.map_or(true, |affinity| a.affinity() == affinity))
                .map(|a| a.out_type().clone())
                .collect()
        };
        if affinity.is_some() {
            if let Some(found) = self.find_type_converter(&sources(affinity), |t| t == ty) {
                return Some(found);
            }
        }
        self.find_type_converter(&sources(None), |t| t == ty)
    }

    /// Full two-way adapter for `ty`.
    pub fn find_column_adapter(&self, ty: &TypeRef, affinity: Option<Affinity>) -> Option<Rc<dyn ColumnTypeAdapter>> {
        if let Some(adapter) = self.built_in(ty) {
            return Some(adapter);
        }
        let into_statement = self.find_converter_into_column(ty, affinity)?;
        let column_ty = into_statement.to().clone();
        let adapter = self.built_in(&column_ty)?;
        let from_cursor = self.find_converter(&column_ty, ty)?;
        Some(Rc::new(CompositeAdapter::new(
            ty.clone(),
            adapter,
            Some(into_statement),
            Some(from_cursor),
        )))
    }

    pub fn find_statement_binder(&self, ty: &TypeRef) -> Option<StatementValueBinder> {
        self.find_column_binder(ty, None)
    }

    /// Binder for a column-backed field, preferring its declared affinity.
    pub fn find_column_binder(&self, ty: &TypeRef, affinity: Option<Affinity>) -> Option<StatementValueBinder> {
        if let Some(adapter) = self.built_in(ty) {
            return Some(StatementValueBinder::new(ty.clone(), adapter, None));
        }
        let converter = self.find_converter_into_column(ty, affinity)?;
        let adapter = self.built_in(converter.to())?;
        Some(StatementValueBinder::new(ty.clone(), adapter, Some(converter)))
    }

    pub fn find_cursor_reader(&self, ty: &TypeRef, affinity: Option<Affinity>) -> Option<CursorValueReader> {
        if let Some(adapter) = self.built_in(ty) {
            return Some(CursorValueReader::new(ty.clone(), adapter, None));
        }
        let converter = self.find_converter_from_column(ty, affinity)?;
        let adapter = self.built_in(converter.from())?;
        Some(CursorValueReader::new(ty.clone(), adapter, Some(converter)))
    }

    /// Verification output, when present and successful.
    fn result_info(query: &ParsedQuery) -> Option<&QueryResultInfo> {
        query.result_info.as_ref().filter(|info| info.error.is_none())
    }

    pub fn find_row_adapter(&self, ty: &TypeRef, query: &ParsedQuery, logger: &mut Logger) -> Option<RowAdapter> {
        let info = Self::result_info(query);
        if self.decls.is_pojo_type(ty) {
            if let Some(entity) = self.decls.entity(ty.name()) {
                if info.is_none() && entity.pojo.relations.is_empty() {
                    return EntityRowAdapter::new(self, entity.name(), logger).map(RowAdapter::Entity);
                }
            }
            let shape = match self.decls.resolve_shape(ty) {
                Ok(shape) => shape,
                Err(message) => {
                    logger.e(message);
                    return None;
                }
            };
            return PojoRowAdapter::new(self, shape, info, logger).map(RowAdapter::Pojo);
        }
        let reader = self.find_cursor_reader(ty, first_column_affinity(info))?;
        Some(RowAdapter::SingleColumn(SingleColumnRowAdapter { reader }))
    }

    pub fn find_query_result_adapter(
        &self,
        ty: &TypeRef,
        query: &ParsedQuery,
        logger: &mut Logger,
    ) -> Option<QueryResultAdapter> {
        if ty.is_unit() {
            return None;
        }
        if ty.is_vec() && !ty.is_byte_vec() {
            let row = self.find_row_adapter(&ty.args()[0], query, logger)?;
            return Some(QueryResultAdapter::List { row });
        }
        if abi::is_framework_optional(ty) {
            let inner = ty.single_arg()?;
            let row = self.find_row_adapter(inner, query, logger)?;
            return Some(QueryResultAdapter::FrameworkOptional { row });
        }
        if let Some(inner) = ty.option_inner() {
            if self.decls.is_pojo_type(inner) {
                let row = self.find_row_adapter(inner, query, logger)?;
                return Some(QueryResultAdapter::Optional { row });
            }
        }
        let row = self.find_row_adapter(ty, query, logger)?;
        let empty = match ty.empty_literal() {
            Some(literal) => EmptyResult::Literal(literal),
            None => EmptyResult::Error,
        };
        Some(QueryResultAdapter::Single { row, empty })
    }

    pub fn find_query_parameter_adapter(&self, ty: &TypeRef) -> Option<QueryParameterAdapter> {
        if ty.is_vec() && !ty.is_byte_vec() {
            let binder = self.find_statement_binder(&ty.args()[0])?;
            return Some(QueryParameterAdapter::Collection { binder });
        }
        let binder = self.find_statement_binder(ty)?;
        Some(QueryParameterAdapter::Basic { binder })
    }

    pub fn find_prepared_query_result_adapter(
        &self,
        ty: &TypeRef,
        target: WriteTarget,
    ) -> Option<PreparedQueryResultAdapter> {
        PreparedQueryResultAdapter::create(ty, target)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::model::ConverterKind;
    use crate::sql;
    use crate::writer::{ClassWriter, CodeGenScope};

    fn ty(s: &str) -> TypeRef {
        TypeRef::parse(s).unwrap()
    }

    fn conv(class: &str, method: &str, from: &str, to: &str) -> CustomTypeConverter {
        CustomTypeConverter {
            class_name: class.into(),
            kind: ConverterKind::Static,
            method_name: method.into(),
            from: ty(from),
            to: ty(to),
        }
    }

    fn decls() -> Declarations {
        Declarations::from_toml_str(
            r#"
            [[entities]]
            name = "User"
            table = "user"
            primary_key = ["id"]
            fields = [{ name = "id", type = "i64" }, { name = "name", type = "String" }]

            [[pojos]]
            name = "NameOnly"
            fields = [{ name = "name", type = "String" }]
            "#,
            Path::new("t.toml"),
        )
        .unwrap()
    }

    fn read_code(reader: &CursorValueReader) -> String {
        let mut writer = ClassWriter::new("Dao");
        let mut scope = CodeGenScope::new(&mut writer);
        reader.read_from_cursor("_out", "_cursor", "0", &mut scope);
        scope.generate().to_string()
    }

    #[test]
    fn test_built_in_wins_over_converters() {
        let d = decls();
        let store = TypeAdapterStore::create(&d, 2, &[conv("C", "odd", "i64", "String")]);
        let reader = store.find_cursor_reader(&ty("i64"), None).unwrap();
        assert_eq!(read_code(&reader), "_out = _cursor.get_long(0);\n");
    }

    #[test]
    fn test_exact_user_converter() {
        let d = decls();
        let store = TypeAdapterStore::create(
            &d,
            2,
            &[conv("Dates", "to_millis", "Date", "i64"), conv("Dates", "from_millis", "i64", "Date")],
        );
        let adapter = store.find_column_adapter(&ty("Date"), None).unwrap();
        assert_eq!(adapter.affinity(), Affinity::Integer);
        let reader = store.find_cursor_reader(&ty("Date"), None).unwrap();
        assert_eq!(
            read_code(&reader),
            "let _tmp: i64;\n_tmp = _cursor.get_long(0);\n_out = Dates::from_millis(_tmp.clone());\n"
        );
    }

    #[test]
    fn test_bool_resolves_through_int() {
        let d = decls();
        let store = TypeAdapterStore::create(&d, 2, &[]);
        let binder = store.find_statement_binder(&ty("bool")).unwrap();
        let mut writer = ClassWriter::new("Dao");
        let mut scope = CodeGenScope::new(&mut writer);
        binder.bind_to_stmt("_stmt", "1", "flag", &mut scope);
        assert_eq!(
            scope.generate().to_string(),
            "let _tmp: i32;\n_tmp = if flag { 1 } else { 0 };\n_stmt.bind_long(1, _tmp as i64);\n"
        );
        assert!(store.find_cursor_reader(&ty("Option<bool>"), None).is_some());
    }

    #[test]
    fn test_composite_bounded_by_hops() {
        let d = decls();
        let chain = [
            conv("A", "a_to_b", "A", "B"),
            conv("B", "b_to_c", "B", "C"),
            conv("C", "c_to_i", "C", "i64"),
        ];
        let two = TypeAdapterStore::create(&d, 2, &chain);
        assert!(two.find_converter(&ty("A"), &ty("C")).is_some());
        assert!(two.find_statement_binder(&ty("A")).is_none());
        let three = TypeAdapterStore::create(&d, 3, &chain);
        let found = three.find_converter(&ty("A"), &ty("i64")).unwrap();
        assert_eq!(found.hops(), 3);
        assert!(three.find_statement_binder(&ty("A")).is_some());
    }

    #[test]
    fn test_fewest_hops_then_declaration_order() {
        let d = decls();
        let store = TypeAdapterStore::create(
            &d,
            2,
            &[
                conv("Long", "via_b", "A", "B"),
                conv("Long", "b_to_text", "B", "String"),
                conv("Short", "direct_text", "A", "String"),
                conv("Short", "direct_long", "A", "i64"),
            ],
        );
        let found = store.find_converter_into_column(&ty("A"), None).unwrap();
        assert_eq!(found.hops(), 1);
        assert_eq!(found.to(), &ty("String"));
    }

    #[test]
    fn test_null_safe_lift() {
        let d = decls();
        let store = TypeAdapterStore::create(&d, 2, &[conv("Dates", "to_millis", "Date", "i64")]);
        let binder = store.find_statement_binder(&ty("Option<Date>")).unwrap();
        assert_eq!(binder.type_ref(), &ty("Option<Date>"));
    }

    #[test]
    fn test_column_binder_prefers_affinity() {
        let d = decls();
        let converters = [conv("Dates", "to_text", "Date", "String"), conv("Dates", "to_millis", "Date", "i64")];
        let store = TypeAdapterStore::create(&d, 2, &converters);
        let bind = |affinity| {
            let binder = store.find_column_binder(&ty("Date"), affinity).unwrap();
            let mut writer = ClassWriter::new("Dao");
            let mut scope = CodeGenScope::new(&mut writer);
            binder.bind_to_stmt("_stmt", "1", "user.born", &mut scope);
            scope.generate().to_string()
        };
        assert!(bind(Some(Affinity::Integer)).contains("Dates::to_millis(user.born.clone())"));
        assert!(bind(None).contains("Dates::to_text(user.born.clone())"));
    }

    #[test]
    fn test_result_adapter_shapes() {
        let d = decls();
        let store = TypeAdapterStore::create(&d, 2, &[]);
        let query = sql::parse("SELECT * FROM user");
        let mut logger = Logger::new([]);
        assert!(matches!(
            store.find_query_result_adapter(&ty("Vec<User>"), &query, &mut logger),
            Some(QueryResultAdapter::List { row: RowAdapter::Entity(_) })
        ));
        assert!(matches!(
            store.find_query_result_adapter(&ty("Option<User>"), &query, &mut logger),
            Some(QueryResultAdapter::Optional { .. })
        ));
        assert!(matches!(
            store.find_query_result_adapter(&ty("Optional<User>"), &query, &mut logger),
            Some(QueryResultAdapter::FrameworkOptional { .. })
        ));
        assert!(matches!(
            store.find_query_result_adapter(&ty("User"), &query, &mut logger),
            Some(QueryResultAdapter::Single { empty: EmptyResult::Error, .. })
        ));
        assert!(matches!(
            store.find_query_result_adapter(&ty("Option<i64>"), &query, &mut logger),
            Some(QueryResultAdapter::Single { empty: EmptyResult::Literal("None"), .. })
        ));
        assert!(store.find_query_result_adapter(&ty("()"), &query, &mut logger).is_none());
        assert!(store.find_query_result_adapter(&ty("Unknown"), &query, &mut logger).is_none());
        assert!(!logger.log().has_errors());
    }

    #[test]
    fn test_pojo_reports_unused_columns() {
        let d = decls();
        let store = TypeAdapterStore::create(&d, 2, &[]);
        let mut query = sql::parse("SELECT * FROM user");
        query.result_info = Some(QueryResultInfo {
            columns: vec![
                sql::ColumnInfo { name: "id".into(), affinity: Some(Affinity::Integer) },
                sql::ColumnInfo { name: "name".into(), affinity: Some(Affinity::Text) },
            ],
            error: None,
        });
        let mut logger = Logger::new([]);
        let row = store.find_row_adapter(&ty("NameOnly"), &query, &mut logger).unwrap();
        let mapping = row.as_pojo().unwrap().mapping();
        assert_eq!(mapping.used_columns, vec!["name"]);
        assert_eq!(mapping.unused_columns, vec!["id"]);
        assert_eq!(logger.log().warning_count(), 1);
        assert!(!logger.log().has_errors());
    }

    #[test]
    fn test_collection_parameter() {
        let d = decls();
        let store = TypeAdapterStore::create(&d, 2, &[]);
        assert!(matches!(
            store.find_query_parameter_adapter(&ty("Vec<i64>")),
            Some(QueryParameterAdapter::Collection { .. })
        ));
        assert!(matches!(
            store.find_query_parameter_adapter(&ty("Vec<u8>")),
            Some(QueryParameterAdapter::Basic { .. })
        ));
        assert!(store.find_query_parameter_adapter(&ty("User")).is_none());
    }
}
