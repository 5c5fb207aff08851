use std::collections::BTreeSet;

use crate::abi;
use crate::model::TypeRef;
use crate::writer::CodeGenScope;

use super::super::result::QueryResultAdapter;
use super::{create_cancellation_signal, empty_policy, write_deferred_query, BinderStrategy, QueryResultBinder};

/// Body of an `async fn`: the query runs off the caller's task and the
/// method awaits it. Dropping the future cancels the query.
pub struct CoroutineResultBinder {
    adapter: Option<QueryResultAdapter>,
}

impl CoroutineResultBinder {
    pub fn new(adapter: Option<QueryResultAdapter>) -> Self {
        Self { adapter }
    }
}

impl QueryResultBinder for CoroutineResultBinder {
    fn adapter(&self) -> Option<&QueryResultAdapter> {
        self.adapter.as_ref()
    }

    fn strategy(&self) -> BinderStrategy {
        BinderStrategy::deferred(empty_policy(self.adapter.as_ref())).cancellable()
    }

    fn is_async(&self) -> bool {
        true
    }

    fn convert_and_return(&self, statement: &str, in_transaction: bool, scope: &mut CodeGenScope<'_>) {
        let Some(adapter) = &self.adapter else {
            return;
        };
        let signal = create_cancellation_signal(scope);
        let db = scope.db();
        let prefix = format!(
            "{}::execute({db}.clone(), {in_transaction}, {signal}.clone(), ",
            abi::coroutines::COROUTINES_DAOC
        );
        write_deferred_query(&prefix, ").await", adapter, statement, Some(&signal), in_transaction, scope);
    }
}

/// `Flow<T>` re-emitting whenever an observed table changes.
pub struct CoroutineFlowResultBinder {
    tables: BTreeSet<String>,
    adapter: Option<QueryResultAdapter>,
}

impl CoroutineFlowResultBinder {
    pub fn new(tables: BTreeSet<String>, adapter: Option<QueryResultAdapter>) -> Self {
        Self { tables, adapter }
    }
}

impl QueryResultBinder for CoroutineFlowResultBinder {
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
            "{}::create_flow({db}.clone(), {in_transaction}, {}, ",
            abi::coroutines::COROUTINES_DAOC,
            abi::table_array(&self.tables)
        );
        write_deferred_query(&prefix, ")", adapter, statement, None, in_transaction, scope);
    }
}
