use std::collections::BTreeSet;

use crate::abi;
use crate::model::TypeRef;
use crate::writer::CodeGenScope;

use super::super::result::QueryResultAdapter;
use super::super::rx_types::RxType;
use super::{empty_policy, write_deferred_query, BinderStrategy, QueryResultBinder};

/// Rx `Flowable`/`Observable` re-emitting on table invalidation.
pub struct RxQueryResultBinder {
    rx_type: RxType,
    tables: BTreeSet<String>,
    adapter: Option<QueryResultAdapter>,
}

impl RxQueryResultBinder {
    pub fn new(rx_type: RxType, tables: BTreeSet<String>, adapter: Option<QueryResultAdapter>) -> Self {
        Self {
            rx_type,
            tables,
            adapter,
        }
    }
}

impl QueryResultBinder for RxQueryResultBinder {
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
            "{}({db}.clone(), {in_transaction}, {}, ",
            self.rx_type.factory(),
            abi::table_array(&self.tables)
        );
        write_deferred_query(&prefix, ")", adapter, statement, None, in_transaction, scope);
    }
}

/// Rx `Single`/`Maybe` running the query once per subscription.
///
/// `Single` fails with `EmptyResultSet` on an empty cursor; `Maybe`
/// completes empty.
pub struct RxCallableQueryResultBinder {
    rx_type: RxType,
    adapter: Option<QueryResultAdapter>,
}

impl RxCallableQueryResultBinder {
    pub fn new(rx_type: RxType, adapter: Option<QueryResultAdapter>) -> Self {
        let adapter = if rx_type.is_single() {
            adapter.map(QueryResultAdapter::with_empty_error)
        } else {
            adapter
        };
        Self { rx_type, adapter }
    }
}

impl QueryResultBinder for RxCallableQueryResultBinder {
    fn adapter(&self) -> Option<&QueryResultAdapter> {
        self.adapter.as_ref()
    }

    fn strategy(&self) -> BinderStrategy {
        BinderStrategy::deferred(empty_policy(self.adapter.as_ref()))
    }

    fn return_type(&self, declared: &TypeRef) -> String {
        declared.to_string()
    }

    fn convert_and_return(&self, statement: &str, in_transaction: bool, scope: &mut CodeGenScope<'_>) {
        let Some(adapter) = &self.adapter else {
            return;
        };
        let prefix = format!("{}(", self.rx_type.factory());
        write_deferred_query(&prefix, ")", adapter, statement, None, in_transaction, scope);
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{adapter_for, user_decls};
    use super::*;
    use crate::solver::result::EmptyResultPolicy;
    use crate::solver::rx_types::{RxKind, RxVersion};
    use crate::writer::ClassWriter;

    #[test]
    fn test_flowable_passes_tables_and_closure() {
        let d = user_decls();
        let binder = RxQueryResultBinder::new(
            RxType::new(RxVersion::Three, RxKind::Flowable),
            BTreeSet::from(["user".to_string()]),
            Some(adapter_for(&d, "Vec<User>", "SELECT * FROM user")),
        );
        let mut writer = ClassWriter::new("Dao");
        let mut scope = CodeGenScope::new(&mut writer);
        binder.convert_and_return("_statement", false, &mut scope);
        let code = scope.generate().to_string();
        assert!(code.contains(
            "daoc_runtime::rx3::RxDaoc::create_flowable(self.db.clone(), false, &[\"user\"], move || -> daoc_runtime::Result<Vec<User>> {"
        ));
    }

    #[test]
    fn test_single_fails_on_empty_even_for_scalars() {
        let d = user_decls();
        let binder = RxCallableQueryResultBinder::new(
            RxType::new(RxVersion::Two, RxKind::Single),
            Some(adapter_for(&d, "i64", "SELECT count(*) FROM user")),
        );
        assert_eq!(binder.strategy().empty_result, EmptyResultPolicy::Error);
        let mut writer = ClassWriter::new("Dao");
        let mut scope = CodeGenScope::new(&mut writer);
        binder.convert_and_return("_statement", false, &mut scope);
        let code = scope.generate().to_string();
        assert!(code.contains("daoc_runtime::rx2::RxDaoc::create_single(move ||"));
        assert!(code.contains("return Err(Error::EmptyResultSet);"));
    }
}
