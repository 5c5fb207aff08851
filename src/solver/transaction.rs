use crate::abi;
use crate::model::TypeRef;
use crate::writer::CodeGenScope;

use super::binder::begin_transaction;
use super::rx_types::RxType;

/// Library types whose value does its work after the method returns.
const DEFERRED_TYPES: &[&str] = &[
    abi::lifecycle::LIVE_DATA,
    abi::guava::LISTENABLE_FUTURE,
    abi::coroutines::FLOW,
    abi::paging::POSITIONAL_DATA_SOURCE,
    abi::paging::DATA_SOURCE,
    abi::paging::DATA_SOURCE_FACTORY,
    abi::paging::PAGING_SOURCE,
];

/// Whether a value of `ty` would run its queries outside the method call.
pub fn is_deferred_type(ty: &TypeRef) -> bool {
    DEFERRED_TYPES.iter().any(|path| abi::matches_path(ty, path))
        || RxType::OBSERVABLES
            .iter()
            .chain(RxType::PREPARED.iter())
            .any(|rx| rx.matches(ty))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMethodBinder {
    Instant,
    /// `async fn`, awaiting the delegate inside a suspending transaction.
    Coroutine,
}

/// Calls the DAO trait's default body for a method inside a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionMethodAdapter {
    dao: String,
    delegate: String,
    params: Vec<String>,
    binder: TransactionMethodBinder,
}

impl TransactionMethodAdapter {
    pub fn new(dao: &str, delegate: &str, params: Vec<String>, binder: TransactionMethodBinder) -> Self {
        Self {
            dao: dao.to_string(),
            delegate: delegate.to_string(),
            params,
            binder,
        }
    }

    pub fn is_async(&self) -> bool {
        self.binder == TransactionMethodBinder::Coroutine
    }

    pub fn return_type(&self, returns: &TypeRef) -> String {
        format!("{}<{returns}>", abi::RESULT)
    }

    fn delegate_call(&self, receiver: &str) -> String {
        let mut args = vec![receiver.to_string()];
        args.extend(self.params.iter().cloned());
        format!("{}::{}({})", self.dao, self.delegate, args.join(", "))
    }

    /// Writes the method body; the last line is the tail expression.
    pub fn write(&self, scope: &mut CodeGenScope<'_>) {
        let db = scope.db();
        let call = self.delegate_call(scope.receiver());
        match self.binder {
            TransactionMethodBinder::Instant => {
                begin_transaction(&db, scope);
                let result = scope.tmp_var("result");
                scope
                    .builder()
                    .add_statement(format!("let {result} = {call}?"))
                    .add_statement(format!("{db}.set_transaction_successful()"))
                    .add_line(format!("Ok({result})"));
            }
            TransactionMethodBinder::Coroutine => {
                scope
                    .builder()
                    .begin_control_flow(format!(
                        "{}::with_transaction(&{db}, async move",
                        abi::coroutines::COROUTINES_DAOC
                    ))
                    .add_line(format!("{call}.await"))
                    .end_control_flow_with(").await");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::ClassWriter;

    fn ty(s: &str) -> TypeRef {
        TypeRef::parse(s).unwrap()
    }

    #[test]
    fn test_deferred_types() {
        assert!(is_deferred_type(&ty("LiveData<User>")));
        assert!(is_deferred_type(&ty("rx3::Completable")));
        assert!(is_deferred_type(&ty("ListenableFuture<i64>")));
        assert!(!is_deferred_type(&ty("Vec<User>")));
        assert!(!is_deferred_type(&ty("()")));
    }

    #[test]
    fn test_instant_wraps_delegate() {
        let adapter = TransactionMethodAdapter::new(
            "UserDao",
            "replace_all_body",
            vec!["users".into()],
            TransactionMethodBinder::Instant,
        );
        let mut writer = ClassWriter::new("UserDaoImpl");
        let mut scope = CodeGenScope::new(&mut writer);
        adapter.write(&mut scope);
        assert_eq!(
            scope.generate().to_string(),
            "let _transaction = TransactionGuard::begin(&self.db);\n\
             let _result = UserDao::replace_all_body(self, users)?;\n\
             self.db.set_transaction_successful();\n\
             Ok(_result)\n"
        );
    }

    #[test]
    fn test_coroutine_awaits_delegate() {
        let adapter =
            TransactionMethodAdapter::new("UserDao", "sync_body", Vec::new(), TransactionMethodBinder::Coroutine);
        assert!(adapter.is_async());
        let mut writer = ClassWriter::new("UserDaoImpl");
        let mut scope = CodeGenScope::new(&mut writer);
        adapter.write(&mut scope);
        assert_eq!(
            scope.generate().to_string(),
            "daoc_runtime::coroutines::CoroutinesDaoc::with_transaction(&self.db, async move {\n    UserDao::sync_body(self).await\n}).await\n"
        );
    }
}
