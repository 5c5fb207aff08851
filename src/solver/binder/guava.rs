use crate::abi;
use crate::model::TypeRef;
use crate::writer::CodeGenScope;

use super::super::result::QueryResultAdapter;
use super::{create_cancellation_signal, empty_policy, write_deferred_query, BinderStrategy, QueryResultBinder};

/// `ListenableFuture<T>` whose cancellation interrupts the running query.
pub struct GuavaListenableFutureQueryResultBinder {
    adapter: Option<QueryResultAdapter>,
}

impl GuavaListenableFutureQueryResultBinder {
    pub fn new(adapter: Option<QueryResultAdapter>) -> Self {
        Self { adapter }
    }
}

impl QueryResultBinder for GuavaListenableFutureQueryResultBinder {
    fn adapter(&self) -> Option<&QueryResultAdapter> {
        self.adapter.as_ref()
    }

    fn strategy(&self) -> BinderStrategy {
        BinderStrategy::deferred(empty_policy(self.adapter.as_ref())).cancellable()
    }

    fn return_type(&self, declared: &TypeRef) -> String {
        declared.to_string()
    }

    fn convert_and_return(&self, statement: &str, in_transaction: bool, scope: &mut CodeGenScope<'_>) {
        let Some(adapter) = &self.adapter else {
            return;
        };
        let signal = create_cancellation_signal(scope);
        let db = scope.db();
        let prefix = format!(
            "{}::create_listenable_future({db}.clone(), {in_transaction}, {signal}.clone(), ",
            abi::guava::GUAVA_DAOC
        );
        write_deferred_query(&prefix, ")", adapter, statement, Some(&signal), in_transaction, scope);
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{adapter_for, user_decls};
    use super::*;
    use crate::writer::ClassWriter;

    #[test]
    fn test_query_receives_cancellation_signal() {
        let d = user_decls();
        let binder =
            GuavaListenableFutureQueryResultBinder::new(Some(adapter_for(&d, "Vec<User>", "SELECT * FROM user")));
        assert!(binder.strategy().cancellable);
        let mut writer = ClassWriter::new("Dao");
        let mut scope = CodeGenScope::new(&mut writer);
        binder.convert_and_return("_statement", false, &mut scope);
        let code = scope.generate().to_string();
        assert!(code.starts_with("let _cancellation_signal = db_util::create_cancellation_signal();\n"));
        assert!(code.contains("create_listenable_future(self.db.clone(), false, _cancellation_signal.clone(), move ||"));
        assert!(code.contains("db_util::query(&_this.db, &_statement, false, Some(&_cancellation_signal))?"));
    }
}
