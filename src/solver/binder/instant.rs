use crate::writer::CodeGenScope;

use super::super::result::QueryResultAdapter;
use super::{empty_policy, write_query_and_convert, BinderStrategy, QueryResultBinder};

/// Runs the query inside the generated method and returns the value.
pub struct InstantQueryResultBinder {
    adapter: Option<QueryResultAdapter>,
}

impl InstantQueryResultBinder {
    pub fn new(adapter: Option<QueryResultAdapter>) -> Self {
        Self { adapter }
    }
}

impl QueryResultBinder for InstantQueryResultBinder {
    fn adapter(&self) -> Option<&QueryResultAdapter> {
        self.adapter.as_ref()
    }

    fn strategy(&self) -> BinderStrategy {
        BinderStrategy::immediate(empty_policy(self.adapter.as_ref()))
    }

    fn convert_and_return(&self, statement: &str, in_transaction: bool, scope: &mut CodeGenScope<'_>) {
        let Some(adapter) = &self.adapter else {
            return;
        };
        write_query_and_convert(adapter, statement, None, in_transaction, scope);
    }
}
