use crate::model::OnConflict;
use crate::solver::{EntityStatement, PreparedStatementSource, ShortcutColumn, ShortcutParameter};
use crate::sql::QueryType;

use super::class_writer::CodeGenScope;
use super::code::snake_case;
use super::query_writer::PreparedStatementField;

/// Writes the statements of an insert, update or delete method: one shared
/// statement per entity and kind, bound column by column from each entity.
pub struct ShortcutWriter<'a> {
    kind: QueryType,
    on_conflict: OnConflict,
    params: &'a [ShortcutParameter],
}

impl<'a> ShortcutWriter<'a> {
    pub fn new(kind: QueryType, on_conflict: OnConflict, params: &'a [ShortcutParameter]) -> Self {
        Self {
            kind,
            on_conflict,
            params,
        }
    }

    /// The statement run once per entity of `param`.
    pub fn sql(&self, param: &ShortcutParameter) -> String {
        let assign = |c: &ShortcutColumn| format!("`{}` = ?", c.column);
        let key_match = || param.key_columns().map(assign).collect::<Vec<_>>().join(" AND ");
        match self.kind {
            QueryType::Insert => {
                let columns: Vec<String> = param.columns.iter().map(|c| format!("`{}`", c.column)).collect();
                let values = vec!["?"; columns.len()];
                format!(
                    "INSERT OR {} INTO `{}` ({}) VALUES ({})",
                    self.on_conflict.sql(),
                    param.table,
                    columns.join(","),
                    values.join(",")
                )
            }
            QueryType::Update => {
                let set: Vec<String> = param.columns.iter().map(assign).collect();
                format!(
                    "UPDATE OR {} `{}` SET {} WHERE {}",
                    self.on_conflict.sql(),
                    param.table,
                    set.join(","),
                    key_match()
                )
            }
            _ => format!("DELETE FROM `{}` WHERE {}", param.table, key_match()),
        }
    }

    /// Columns in placeholder order.
    fn bound_columns<'p>(&self, param: &'p ShortcutParameter) -> Vec<&'p ShortcutColumn> {
        match self.kind {
            QueryType::Insert => param.columns.iter().collect(),
            QueryType::Update => param.columns.iter().chain(param.key_columns()).collect(),
            _ => param.key_columns().collect(),
        }
    }

    /// Acquires the statements; binding happens per entity when they run.
    pub fn prepare(&self, scope: &mut CodeGenScope<'_>) -> PreparedStatementSource {
        let receiver = scope.receiver().to_string();
        let mut acquired: Vec<(String, String)> = Vec::new();
        let mut entities = Vec::with_capacity(self.params.len());
        for param in self.params {
            let sql = self.sql(param);
            let statement = match acquired.iter().find(|(text, _)| *text == sql) {
                Some((_, statement)) => statement.clone(),
                None => {
                    let field = scope.writer().get_or_create_field(&PreparedStatementField::new(
                        format!("{}_stmt_of_{}", self.kind.name().to_lowercase(), snake_case(&param.entity)),
                        sql.clone(),
                    ));
                    let statement = scope.tmp_var("stmt");
                    scope
                        .builder()
                        .add_statement(format!("let mut {statement} = {receiver}.{field}.acquire()"));
                    acquired.push((sql, statement.clone()));
                    statement
                }
            };
            let item = param.multiple.then(|| scope.tmp_var("item"));
            let owner = item.clone().unwrap_or_else(|| param.name.clone());
            let columns = self.bound_columns(param);
            let bind = scope.fork(|child| {
                for (index, column) in columns.iter().enumerate() {
                    let index = (index + 1).to_string();
                    column.binder.bind_to_stmt(&statement, &index, &column.value(&owner), child);
                }
            });
            entities.push(EntityStatement {
                statement,
                param: param.name.clone(),
                item,
                bind,
            });
        }
        PreparedStatementSource::Entities(entities)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::diagnostics::Logger;
    use crate::model::{Declarations, Param, TypeRef};
    use crate::solver::TypeAdapterStore;
    use crate::writer::ClassWriter;

    fn params(spec: &[(&str, &str)]) -> Vec<ShortcutParameter> {
        let decls = Declarations::from_toml_str(
            r#"
            [[entities]]
            name = "User"
            table = "user"
            primary_key = ["id"]
            fields = [{ name = "id", type = "i64" }, { name = "name", type = "Option<String>" }]
            "#,
            Path::new("t.toml"),
        )
        .unwrap();
        let store = TypeAdapterStore::create(&decls, 2, &[]);
        let mut logger = Logger::default();
        spec.iter()
            .map(|(name, ty)| {
                let param = Param::new(*name, TypeRef::parse(ty).unwrap());
                ShortcutParameter::resolve(&store, &param, &mut logger).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_statement_text_per_kind() {
        let p = params(&[("user", "User")]);
        let insert = ShortcutWriter::new(QueryType::Insert, OnConflict::Replace, &p);
        assert_eq!(insert.sql(&p[0]), "INSERT OR REPLACE INTO `user` (`id`,`name`) VALUES (?,?)");
        let update = ShortcutWriter::new(QueryType::Update, OnConflict::Abort, &p);
        assert_eq!(update.sql(&p[0]), "UPDATE OR ABORT `user` SET `id` = ?,`name` = ? WHERE `id` = ?");
        let delete = ShortcutWriter::new(QueryType::Delete, OnConflict::Abort, &p);
        assert_eq!(delete.sql(&p[0]), "DELETE FROM `user` WHERE `id` = ?");
    }

    #[test]
    fn test_update_binds_key_after_columns() {
        let p = params(&[("user", "User")]);
        let mut writer = ClassWriter::new("Dao");
        let mut scope = CodeGenScope::new(&mut writer);
        let source = ShortcutWriter::new(QueryType::Update, OnConflict::Abort, &p).prepare(&mut scope);
        assert_eq!(
            scope.generate().to_string(),
            "let mut _stmt = self.__update_stmt_of_user.acquire();\n"
        );
        let PreparedStatementSource::Entities(entities) = source else {
            panic!("expected entity statements");
        };
        assert_eq!(entities[0].item, None);
        assert_eq!(
            entities[0].bind.to_string(),
            "_stmt.bind_long(1, user.id as i64);\n\
             match &user.name {\n    \
                 None => _stmt.bind_null(2),\n    \
                 Some(_value) => _stmt.bind_string(2, _value),\n\
             }\n\
             _stmt.bind_long(3, user.id as i64);\n"
        );
    }

    #[test]
    fn test_same_statement_acquired_once() {
        let p = params(&[("user", "User"), ("others", "Vec<User>")]);
        let mut writer = ClassWriter::new("Dao");
        let mut scope = CodeGenScope::new(&mut writer);
        let source = ShortcutWriter::new(QueryType::Delete, OnConflict::Abort, &p).prepare(&mut scope);
        assert_eq!(
            scope.generate().to_string(),
            "let mut _stmt = self.__delete_stmt_of_user.acquire();\n"
        );
        let PreparedStatementSource::Entities(entities) = source else {
            panic!("expected entity statements");
        };
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[1].statement, "_stmt");
        assert_eq!(entities[1].item.as_deref(), Some("_item"));
        assert_eq!(entities[1].bind.to_string(), "_stmt.bind_long(1, _item.id as i64);\n");
        assert_eq!(writer.fields().len(), 1);
        assert_eq!(
            writer.fields()[0].init,
            "SharedSqlStatement::new(db.clone(), \"DELETE FROM `user` WHERE `id` = ?\")"
        );
    }
}
