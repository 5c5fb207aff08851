use crate::abi;
use crate::solver::{PreparedStatementSource, QueryParameter, QueryParameterAdapter};
use crate::sql::{BindTarget, ParsedQuery, Section};

use super::class_writer::{ClassWriter, CodeGenScope, SharedFieldSpec};
use super::code::{snake_case, string_literal};

/// One placeholder and the parameter it reads, if any.
pub struct SectionBinding<'q> {
    pub section: &'q Section,
    pub target: BindTarget,
    pub param: Option<&'q QueryParameter>,
}

impl SectionBinding<'_> {
    /// How the placeholder is named in diagnostics.
    pub fn display_name(&self) -> String {
        match &self.target {
            BindTarget::Named(name) => name.clone(),
            BindTarget::Index(_) => self.section.text().to_string(),
        }
    }
}

/// Writes the SQL text and statement binding for a query method.
///
/// Every placeholder becomes `?` and is bound left to right. A collection
/// parameter expands to one `?` per element, which makes the text and the
/// argument count runtime values.
pub struct QueryWriter<'q> {
    query: &'q ParsedQuery,
    params: &'q [QueryParameter],
}

impl<'q> QueryWriter<'q> {
    pub fn new(query: &'q ParsedQuery, params: &'q [QueryParameter]) -> Self {
        Self { query, params }
    }

    /// Pairs every placeholder with its parameter: `:name` by SQL name,
    /// `?N` by one-based position.
    pub fn section_bindings(&self) -> Vec<SectionBinding<'q>> {
        let params = self.params;
        self.query
            .bind_sections()
            .zip(self.query.bind_targets())
            .map(|(section, target)| {
                let param = match &target {
                    BindTarget::Named(name) => params.iter().find(|p| &p.sql_name == name),
                    BindTarget::Index(index) => params.get(index - 1),
                };
                SectionBinding { section, target, param }
            })
            .collect()
    }

    /// Placeholders with no matching parameter.
    pub fn missing_params(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for binding in self.section_bindings() {
            let name = binding.display_name();
            if binding.param.is_none() && !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Parameters no placeholder reads.
    pub fn unused_params(&self) -> Vec<String> {
        let bindings = self.section_bindings();
        self.params
            .iter()
            .filter(|p| !bindings.iter().any(|b| b.param.is_some_and(|bp| bp.name == p.name)))
            .map(|p| p.sql_name.clone())
            .collect()
    }

    fn bound(&self) -> Vec<(&'q str, &'q QueryParameterAdapter)> {
        self.section_bindings()
            .into_iter()
            .filter_map(|b| {
                let param = b.param?;
                Some((param.name.as_str(), param.adapter.as_ref()?))
            })
            .collect()
    }

    pub fn has_collections(&self) -> bool {
        self.bound().iter().any(|(_, adapter)| adapter.is_multiple())
    }

    /// Writes the statement for a read query and returns its variable.
    pub fn prepare_read_query(&self, scope: &mut CodeGenScope<'_>) -> String {
        let statement = scope.tmp_var("statement");
        let sql = self.write_sql(scope);
        let bound = self.bound();
        let binding = if bound.is_empty() { "let" } else { "let mut" };
        scope.builder().add_statement(format!(
            "{binding} {statement} = {}::acquire({}, {})",
            abi::SQL_QUERY,
            sql.text,
            sql.arg_count
        ));
        self.bind_all(&statement, scope);
        statement
    }

    /// Writes the statement for a write query. Without collections the
    /// statement is a shared field reused across calls; `acquire` returns a
    /// guard that releases it on drop.
    pub fn prepare_write_query(&self, method_name: &str, scope: &mut CodeGenScope<'_>) -> PreparedStatementSource {
        let receiver = scope.receiver().to_string();
        let statement = scope.tmp_var("stmt");
        let binding = if self.bound().is_empty() { "let" } else { "let mut" };
        if self.has_collections() {
            let sql = self.write_sql(scope);
            let db = scope.db();
            scope
                .builder()
                .add_statement(format!("{binding} {statement} = {db}.compile_statement({})", sql.text));
            self.bind_all(&statement, scope);
            return PreparedStatementSource::Statement(statement);
        }
        let field = scope.writer().get_or_create_field(&PreparedStatementField::new(
            format!("prepared_stmt_of_{}", snake_case(method_name)),
            self.query.query_with_replaced_bind_params(),
        ));
        scope
            .builder()
            .add_statement(format!("{binding} {statement} = {receiver}.{field}.acquire()"));
        self.bind_all(&statement, scope);
        PreparedStatementSource::Statement(statement)
    }

    fn bind_all(&self, statement: &str, scope: &mut CodeGenScope<'_>) {
        let bound = self.bound();
        if self.has_collections() {
            let index = scope.tmp_var("arg_index");
            if !bound.is_empty() {
                scope
                    .builder()
                    .add_statement(format!("let mut {index}: usize = 1"));
            }
            for (name, adapter) in bound {
                adapter.bind_running(statement, &index, name, scope);
            }
        } else {
            for (position, (name, adapter)) in bound.into_iter().enumerate() {
                adapter.bind_at(statement, position + 1, name, scope);
            }
        }
    }

    /// Declares `_sql` and reports how to pass it and the argument count.
    fn write_sql(&self, scope: &mut CodeGenScope<'_>) -> SqlText {
        let sql = scope.tmp_var("sql");
        if !self.has_collections() {
            let count = self.query.bind_sections().count();
            scope.builder().add_statement(format!(
                "let {sql} = {}",
                string_literal(&self.query.query_with_replaced_bind_params())
            ));
            return SqlText {
                text: sql,
                arg_count: count.to_string(),
            };
        }

        let builder = scope.tmp_var("string_builder");
        scope
            .builder()
            .add_statement(format!("let mut {builder} = String::new()"));
        let bindings = self.section_bindings();
        let mut binds = bindings.iter();
        let mut pending = String::new();
        let mut fixed = 0usize;
        let mut sizes = Vec::new();
        for section in &self.query.sections {
            let Section::BindVar { .. } = section else {
                pending.push_str(section.text());
                continue;
            };
            let adapter = binds
                .next()
                .and_then(|b| b.param)
                .and_then(|p| p.adapter.as_ref().map(|a| (p.name.as_str(), a)));
            match adapter {
                Some((name, adapter)) if adapter.is_multiple() => {
                    flush(&builder, &mut pending, scope);
                    let size = scope.tmp_var("input_size");
                    scope
                        .builder()
                        .add_statement(format!("let {size} = {}", adapter.size_expr(name)))
                        .add_statement(format!("string_util::append_placeholders(&mut {builder}, {size})"));
                    sizes.push(size);
                }
                _ => {
                    pending.push('?');
                    fixed += 1;
                }
            }
        }
        flush(&builder, &mut pending, scope);

        let arg_count = scope.tmp_var("arg_count");
        let mut terms = Vec::new();
        if fixed > 0 {
            terms.push(fixed.to_string());
        }
        terms.extend(sizes);
        scope
            .builder()
            .add_statement(format!("let {sql} = {builder}"))
            .add_statement(format!("let {arg_count} = {}", terms.join(" + ")));
        SqlText {
            text: format!("&{sql}"),
            arg_count,
        }
    }
}

struct SqlText {
    text: String,
    arg_count: String,
}

fn flush(builder: &str, pending: &mut String, scope: &mut CodeGenScope<'_>) {
    if pending.is_empty() {
        return;
    }
    let text = std::mem::take(pending);
    scope
        .builder()
        .add_statement(format!("{builder}.push_str({})", string_literal(&text)));
}

/// A write statement compiled once per DAO and reused. Fields are shared
/// by SQL text; `base` only names the first one.
pub(crate) struct PreparedStatementField {
    base: String,
    sql: String,
}

impl PreparedStatementField {
    pub(crate) fn new(base: String, sql: String) -> Self {
        Self { base, sql }
    }
}

impl SharedFieldSpec for PreparedStatementField {
    fn base_name(&self) -> String {
        self.base.clone()
    }

    fn unique_key(&self) -> String {
        format!("prepared_stmt:{}", self.sql)
    }

    fn prepare(&self, _writer: &mut ClassWriter) -> (String, String) {
        (
            abi::SHARED_STATEMENT.to_string(),
            format!("{}::new(db.clone(), {})", abi::SHARED_STATEMENT, string_literal(&self.sql)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Declarations, TypeRef};
    use crate::solver::TypeAdapterStore;
    use crate::sql;

    fn params(decls: &Declarations, spec: &[(&str, &str)]) -> Vec<QueryParameter> {
        let store = TypeAdapterStore::create(decls, 2, &[]);
        spec.iter()
            .map(|(name, ty)| {
                let ty = TypeRef::parse(ty).unwrap();
                QueryParameter {
                    name: name.to_string(),
                    sql_name: name.to_string(),
                    adapter: store.find_query_parameter_adapter(&ty),
                    ty,
                }
            })
            .collect()
    }

    #[test]
    fn test_named_and_positional_bindings() {
        let d = Declarations::default();
        let p = params(&d, &[("id", "i64"), ("name", "String")]);
        let q = sql::parse("SELECT * FROM user WHERE name = :name AND id = ?1 AND x = :other");
        let writer = QueryWriter::new(&q, &p);
        let bound: Vec<Option<&str>> = writer
            .section_bindings()
            .iter()
            .map(|b| b.param.map(|p| p.name.as_str()))
            .collect();
        assert_eq!(bound, vec![Some("name"), Some("id"), None]);
        assert_eq!(writer.missing_params(), vec!["other".to_string()]);
        assert!(writer.unused_params().is_empty());
    }

    #[test]
    fn test_unused_params() {
        let d = Declarations::default();
        let p = params(&d, &[("id", "i64"), ("limit", "i32")]);
        let q = sql::parse("SELECT * FROM user WHERE id = :id");
        assert_eq!(QueryWriter::new(&q, &p).unused_params(), vec!["limit".to_string()]);
    }

    #[test]
    fn test_constant_sql() {
        let d = Declarations::default();
        let p = params(&d, &[("id", "i64")]);
        let q = sql::parse("SELECT * FROM user WHERE id = :id");
        let mut writer = ClassWriter::new("Dao");
        let mut scope = CodeGenScope::new(&mut writer);
        let statement = QueryWriter::new(&q, &p).prepare_read_query(&mut scope);
        assert_eq!(statement, "_statement");
        assert_eq!(
            scope.generate().to_string(),
            "let _sql = \"SELECT * FROM user WHERE id = ?\";\n\
             let mut _statement = SqlQuery::acquire(_sql, 1);\n\
             _statement.bind_long(1, id as i64);\n"
        );
    }

    #[test]
    fn test_collection_expands_placeholders() {
        let d = Declarations::default();
        let p = params(&d, &[("ids", "Vec<i64>"), ("name", "String")]);
        let q = sql::parse("SELECT * FROM user WHERE id IN (:ids) AND name = :name");
        let mut writer = ClassWriter::new("Dao");
        let mut scope = CodeGenScope::new(&mut writer);
        QueryWriter::new(&q, &p).prepare_read_query(&mut scope);
        let code = scope.generate().to_string();
        assert!(code.starts_with(
            "let mut _string_builder = String::new();\n\
             _string_builder.push_str(\"SELECT * FROM user WHERE id IN (\");\n\
             let _input_size = ids.len();\n\
             string_util::append_placeholders(&mut _string_builder, _input_size);\n\
             _string_builder.push_str(\") AND name = ?\");\n\
             let _sql = _string_builder;\n\
             let _arg_count = 1 + _input_size;\n\
             let mut _statement = SqlQuery::acquire(&_sql, _arg_count);\n\
             let mut _arg_index: usize = 1;\n"
        ));
        assert!(code.contains("for _item in ids.iter().cloned() {"));
        assert!(code.ends_with("_statement.bind_string(_arg_index, &name);\n_arg_index += 1;\n"));
    }

    #[test]
    fn test_write_uses_shared_statement() {
        let d = Declarations::default();
        let p = params(&d, &[("id", "i64")]);
        let q = sql::parse("DELETE FROM user WHERE id = :id");
        let mut writer = ClassWriter::new("Dao");
        let mut scope = CodeGenScope::new(&mut writer);
        let source = QueryWriter::new(&q, &p).prepare_write_query("deleteById", &mut scope);
        assert_eq!(source, PreparedStatementSource::Statement("_stmt".into()));
        assert_eq!(
            scope.generate().to_string(),
            "let mut _stmt = self.__prepared_stmt_of_delete_by_id.acquire();\n_stmt.bind_long(1, id as i64);\n"
        );
        let field = &writer.fields()[0];
        assert_eq!(field.ty, "SharedSqlStatement");
        assert_eq!(field.init, "SharedSqlStatement::new(db.clone(), \"DELETE FROM user WHERE id = ?\")");
    }

    #[test]
    fn test_write_with_collection_compiles_each_call() {
        let d = Declarations::default();
        let p = params(&d, &[("ids", "Vec<i64>")]);
        let q = sql::parse("DELETE FROM user WHERE id IN (:ids)");
        let mut writer = ClassWriter::new("Dao");
        let mut scope = CodeGenScope::new(&mut writer);
        let source = QueryWriter::new(&q, &p).prepare_write_query("delete_all", &mut scope);
        assert_eq!(source, PreparedStatementSource::Statement("_stmt".into()));
        assert!(scope
            .generate()
            .to_string()
            .contains("let mut _stmt = self.db.compile_statement(&_sql);\n"));
        assert!(writer.fields().is_empty());
    }
}
