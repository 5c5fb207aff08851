use std::collections::BTreeSet;

use crate::abi;
use crate::model::TypeRef;
use crate::writer::CodeGenScope;

use super::super::result::QueryResultAdapter;
use super::{empty_policy, write_deferred_query, BinderStrategy, QueryResultBinder};

/// `LiveData<T>` re-running the query whenever an observed table changes.
pub struct LiveDataQueryResultBinder {
    tables: BTreeSet<String>,
    adapter: Option<QueryResultAdapter>,
}

impl LiveDataQueryResultBinder {
    pub fn new(tables: BTreeSet<String>, adapter: Option<QueryResultAdapter>) -> Self {
        Self { tables, adapter }
    }
}

impl QueryResultBinder for LiveDataQueryResultBinder {
    fn adapter(&self) -> Option<&QueryResultAdapter> {
        self.adapter.as_ref()
    }

    fn strategy(&self) -> BinderStrategy {
        BinderStrategy::observing(self.tables.clone(), empty_policy(self.adapter.as_ref()))
    }

    fn return_type(&self, declared: &TypeRef) -> String {
        declared.to_string()
    }

    fn convert_and_return(&self, statement: &str, in_transaction: bool, scope: &mut CodeGenScope<'_>) {
        let Some(adapter) = &self.adapter else {
            return;
        };
        if self.tables.is_empty() {
            return;
        }
        let db = scope.db();
        let prefix = format!(
            "{db}.invalidation_tracker().create_live_data({}, {in_transaction}, ",
            abi::table_array(&self.tables)
        );
        write_deferred_query(&prefix, ")", adapter, statement, None, in_transaction, scope);
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{adapter_for, user_decls};
    use super::*;
    use crate::writer::ClassWriter;

    #[test]
    fn test_registers_observed_tables() {
        let d = user_decls();
        let binder = LiveDataQueryResultBinder::new(
            BTreeSet::from(["user".to_string(), "pet".to_string()]),
            Some(adapter_for(&d, "Vec<User>", "SELECT * FROM user")),
        );
        let mut writer = ClassWriter::new("Dao");
        let mut scope = CodeGenScope::new(&mut writer);
        binder.convert_and_return("_statement", false, &mut scope);
        let code = scope.generate().to_string();
        assert!(code.contains(
            "self.db.invalidation_tracker().create_live_data(&[\"pet\", \"user\"], false, move || -> daoc_runtime::Result<Vec<User>> {"
        ));
        assert!(binder.strategy().is_deferred());
    }

    #[test]
    fn test_nothing_observed_writes_no_registration() {
        let d = user_decls();
        let binder = LiveDataQueryResultBinder::new(
            BTreeSet::new(),
            Some(adapter_for(&d, "i64", "SELECT 1")),
        );
        let mut writer = ClassWriter::new("Dao");
        let mut scope = CodeGenScope::new(&mut writer);
        binder.convert_and_return("_statement", false, &mut scope);
        assert!(scope.generate().is_empty());
    }
}
