use crate::model::{Primitive, TypeRef};
use crate::sql::QueryType;
use crate::writer::CodeGenScope;

use super::binder::{begin_transaction, EntityStatement, PreparedStatementSource};

/// How many entities a shortcut method writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityParams {
    /// A single entity parameter.
    One,
    /// A single `Vec` of entities.
    OneCollection,
    /// More than one entity parameter.
    Several,
}

/// What a write method runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    /// Declared SQL of this kind.
    Query(QueryType),
    /// Insert, update or delete of the method's entity parameters.
    Entities { kind: QueryType, params: EntityParams },
}

impl WriteTarget {
    pub fn kind(self) -> QueryType {
        match self {
            WriteTarget::Query(kind) | WriteTarget::Entities { kind, .. } => kind,
        }
    }
}

/// Runs a write statement and returns what the method declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedQueryResultAdapter {
    target: WriteTarget,
    returns: TypeRef,
}

impl PreparedQueryResultAdapter {
    /// `()` for any write; `i64` (the new row id) for INSERT; `i32` (rows
    /// changed) for UPDATE and DELETE. An insert of one `Vec` of entities
    /// may return `Vec<i64>`; an insert of several parameters returns `()`.
    pub fn create(ty: &TypeRef, target: WriteTarget) -> Option<Self> {
        let kind = target.kind();
        let row_ids = || ty.is_vec() && ty.args()[0].primitive() == Some(Primitive::I64);
        let accepted = ty.is_unit()
            || match (kind, target) {
                (QueryType::Insert, WriteTarget::Query(_)) => ty.primitive() == Some(Primitive::I64),
                (QueryType::Insert, WriteTarget::Entities { params, .. }) => match params {
                    EntityParams::One => ty.primitive() == Some(Primitive::I64),
                    EntityParams::OneCollection => row_ids(),
                    EntityParams::Several => false,
                },
                (QueryType::Update | QueryType::Delete, _) => ty.primitive() == Some(Primitive::I32),
                (QueryType::Select | QueryType::Unknown, _) => false,
            };
        (accepted && kind.is_write()).then(|| Self {
            target,
            returns: ty.clone(),
        })
    }

    pub fn kind(&self) -> QueryType {
        self.target.kind()
    }

    pub fn returns(&self) -> &TypeRef {
        &self.returns
    }

    fn execute_call(&self, stmt: &str) -> String {
        if self.returns.is_unit() {
            return format!("{stmt}.execute()?");
        }
        match self.kind() {
            QueryType::Insert => format!("{stmt}.execute_insert()?"),
            _ => format!("{stmt}.execute_update_delete()?"),
        }
    }

    /// Executes `source` inside a transaction; the last line is the
    /// `Result` tail expression.
    pub fn execute_and_return(&self, source: &PreparedStatementSource, scope: &mut CodeGenScope<'_>) {
        let db = scope.db();
        begin_transaction(&db, scope);
        match source {
            PreparedStatementSource::Statement(stmt) => self.execute_statement(stmt, &db, scope),
            PreparedStatementSource::Entities(entities) => self.execute_entities(entities, &db, scope),
        }
    }

    fn execute_statement(&self, stmt: &str, db: &str, scope: &mut CodeGenScope<'_>) {
        let result = scope.tmp_var("result");
        let call = self.execute_call(stmt);
        let builder = scope.builder();
        if self.returns.is_unit() {
            builder
                .add_statement(call)
                .add_statement(format!("{db}.set_transaction_successful()"))
                .add_line("Ok(())");
        } else {
            builder
                .add_statement(format!("let {result} = {call}"))
                .add_statement(format!("{db}.set_transaction_successful()"))
                .add_line(format!("Ok({result})"));
        }
    }

    fn execute_entities(&self, entities: &[EntityStatement], db: &str, scope: &mut CodeGenScope<'_>) {
        let result = if self.returns.is_unit() {
            None
        } else {
            Some(scope.tmp_var(if self.kind() == QueryType::Insert { "result" } else { "total" }))
        };
        match (&result, entities) {
            (None, _) => {
                for entity in entities {
                    let call = self.execute_call(&entity.statement);
                    write_each(entity, &call, scope);
                }
            }
            (Some(result), [entity]) if self.kind() == QueryType::Insert && entity.item.is_none() => {
                let call = self.execute_call(&entity.statement);
                scope.builder().add_code(&entity.bind);
                scope.builder().add_statement(format!("let {result} = {call}"));
            }
            (Some(result), [entity]) if self.kind() == QueryType::Insert => {
                let call = self.execute_call(&entity.statement);
                scope.builder().add_statement(format!(
                    "let mut {result} = Vec::with_capacity({}.len())",
                    entity.param
                ));
                write_each(entity, &format!("{result}.push({call})"), scope);
            }
            (Some(total), _) => {
                scope.builder().add_statement(format!("let mut {total}: i32 = 0"));
                for entity in entities {
                    let call = self.execute_call(&entity.statement);
                    write_each(entity, &format!("{total} += {call}"), scope);
                }
            }
        }
        scope
            .builder()
            .add_statement(format!("{db}.set_transaction_successful()"))
            .add_line(format!("Ok({})", result.as_deref().unwrap_or("()")));
    }
}

/// Binds and runs `line` once per entity of `entity.param`.
fn write_each(entity: &EntityStatement, line: &str, scope: &mut CodeGenScope<'_>) {
    let builder = scope.builder();
    match &entity.item {
        Some(item) => {
            builder
                .begin_control_flow(format!("for {item} in &{}", entity.param))
                .add_code(&entity.bind)
                .add_statement(line)
                .end_control_flow();
        }
        None => {
            builder.add_code(&entity.bind).add_statement(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{ClassWriter, CodeBlock};

    fn ty(s: &str) -> TypeRef {
        TypeRef::parse(s).unwrap()
    }

    fn entities(kind: QueryType, params: EntityParams) -> WriteTarget {
        WriteTarget::Entities { kind, params }
    }

    fn entity(param: &str, item: Option<&str>) -> EntityStatement {
        let owner = item.unwrap_or(param);
        let mut bind = CodeBlock::new();
        bind.add_statement(format!("_stmt.bind_long(1, {owner}.id as i64)"));
        EntityStatement {
            statement: "_stmt".into(),
            param: param.into(),
            item: item.map(str::to_string),
            bind,
        }
    }

    fn write(adapter: &PreparedQueryResultAdapter, source: PreparedStatementSource) -> String {
        let mut writer = ClassWriter::new("Dao");
        let mut scope = CodeGenScope::new(&mut writer);
        adapter.execute_and_return(&source, &mut scope);
        scope.generate().to_string()
    }

    #[test]
    fn test_accepted_return_types() {
        let query = WriteTarget::Query;
        assert!(PreparedQueryResultAdapter::create(&ty("()"), query(QueryType::Delete)).is_some());
        assert!(PreparedQueryResultAdapter::create(&ty("i64"), query(QueryType::Insert)).is_some());
        assert!(PreparedQueryResultAdapter::create(&ty("i32"), query(QueryType::Update)).is_some());
        assert!(PreparedQueryResultAdapter::create(&ty("i32"), query(QueryType::Insert)).is_none());
        assert!(PreparedQueryResultAdapter::create(&ty("i64"), query(QueryType::Delete)).is_none());
        assert!(PreparedQueryResultAdapter::create(&ty("()"), query(QueryType::Select)).is_none());
        assert!(PreparedQueryResultAdapter::create(&ty("Vec<i64>"), query(QueryType::Insert)).is_none());
    }

    #[test]
    fn test_entity_insert_return_types_follow_params() {
        let insert = |params| entities(QueryType::Insert, params);
        assert!(PreparedQueryResultAdapter::create(&ty("i64"), insert(EntityParams::One)).is_some());
        assert!(PreparedQueryResultAdapter::create(&ty("Vec<i64>"), insert(EntityParams::One)).is_none());
        assert!(PreparedQueryResultAdapter::create(&ty("Vec<i64>"), insert(EntityParams::OneCollection)).is_some());
        assert!(PreparedQueryResultAdapter::create(&ty("i64"), insert(EntityParams::OneCollection)).is_none());
        assert!(PreparedQueryResultAdapter::create(&ty("()"), insert(EntityParams::Several)).is_some());
        assert!(PreparedQueryResultAdapter::create(&ty("i64"), insert(EntityParams::Several)).is_none());
        let delete = entities(QueryType::Delete, EntityParams::Several);
        assert!(PreparedQueryResultAdapter::create(&ty("i32"), delete).is_some());
    }

    #[test]
    fn test_insert_returns_row_id_in_transaction() {
        let adapter = PreparedQueryResultAdapter::create(&ty("i64"), WriteTarget::Query(QueryType::Insert)).unwrap();
        assert_eq!(
            write(&adapter, PreparedStatementSource::Statement("_stmt".into())),
            "let _transaction = TransactionGuard::begin(&self.db);\n\
             let _result = _stmt.execute_insert()?;\n\
             self.db.set_transaction_successful();\n\
             Ok(_result)\n"
        );
    }

    #[test]
    fn test_entity_insert_collects_row_ids() {
        let target = entities(QueryType::Insert, EntityParams::OneCollection);
        let adapter = PreparedQueryResultAdapter::create(&ty("Vec<i64>"), target).unwrap();
        let source = PreparedStatementSource::Entities(vec![entity("users", Some("_item"))]);
        assert_eq!(
            write(&adapter, source),
            "let _transaction = TransactionGuard::begin(&self.db);\n\
             let mut _result = Vec::with_capacity(users.len());\n\
             for _item in &users {\n    \
                 _stmt.bind_long(1, _item.id as i64);\n    \
                 _result.push(_stmt.execute_insert()?);\n\
             }\n\
             self.db.set_transaction_successful();\n\
             Ok(_result)\n"
        );
    }

    #[test]
    fn test_entity_delete_sums_affected_rows() {
        let target = entities(QueryType::Delete, EntityParams::Several);
        let adapter = PreparedQueryResultAdapter::create(&ty("i32"), target).unwrap();
        let source = PreparedStatementSource::Entities(vec![entity("user", None), entity("others", Some("_item"))]);
        let code = write(&adapter, source);
        assert!(code.contains("let mut _total: i32 = 0;\n_stmt.bind_long(1, user.id as i64);\n_total += _stmt.execute_update_delete()?;\n"));
        assert!(code.contains("for _item in &others {\n    _stmt.bind_long(1, _item.id as i64);\n    _total += _stmt.execute_update_delete()?;\n}\n"));
        assert!(code.ends_with("self.db.set_transaction_successful();\nOk(_total)\n"));
    }

    #[test]
    fn test_entity_update_without_result() {
        let target = entities(QueryType::Update, EntityParams::One);
        let adapter = PreparedQueryResultAdapter::create(&ty("()"), target).unwrap();
        let code = write(&adapter, PreparedStatementSource::Entities(vec![entity("user", None)]));
        assert!(code.contains("_stmt.bind_long(1, user.id as i64);\n_stmt.execute()?;\n"));
        assert!(code.ends_with("Ok(())\n"));
    }
}
