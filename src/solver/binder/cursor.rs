use crate::abi;
use crate::model::TypeRef;
use crate::writer::CodeGenScope;

use super::super::result::{EmptyResultPolicy, QueryResultAdapter};
use super::{BinderStrategy, QueryResultBinder};

/// Hands the raw cursor to the caller, who owns closing it.
pub struct CursorQueryResultBinder;

impl QueryResultBinder for CursorQueryResultBinder {
    fn adapter(&self) -> Option<&QueryResultAdapter> {
        None
    }

    fn strategy(&self) -> BinderStrategy {
        BinderStrategy::immediate(EmptyResultPolicy::EmptyCollection)
    }

    fn requires_adapter(&self) -> bool {
        false
    }

    fn return_type(&self, _declared: &TypeRef) -> String {
        format!("{}<{}>", abi::RESULT, abi::CURSOR)
    }

    fn convert_and_return(&self, statement: &str, _in_transaction: bool, scope: &mut CodeGenScope<'_>) {
        let db = scope.db();
        scope
            .builder()
            .add_line(format!("db_util::query(&{db}, &{statement}, false, None)"));
    }
}
