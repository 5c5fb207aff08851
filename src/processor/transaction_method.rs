use crate::config::Artifact;
use crate::context::Context;
use crate::diagnostics::messages;
use crate::model::{Dao, DaoMethod, TypeRef};
use crate::solver::{is_deferred_type, TransactionMethodAdapter, TransactionMethodBinder};
use crate::writer::{CodeGenScope, DaoWriter, MethodSpec};

use super::query_method::signature;

/// A transaction method: runs the trait's default body inside a transaction.
pub struct TransactionMethod {
    pub name: String,
    pub params: Vec<(String, TypeRef)>,
    pub returns: TypeRef,
    pub adapter: TransactionMethodAdapter,
}

pub fn process_transaction_method(ctx: &mut Context<'_>, dao: &Dao, method: &DaoMethod) -> Option<TransactionMethod> {
    let errors_before = ctx.logger.error_count();
    if method.sql.is_some() {
        ctx.logger.e(messages::QUERY_IN_TRANSACTION_METHOD);
    }
    if is_deferred_type(&method.returns) {
        ctx.logger
            .e(messages::transaction_method_async(&method.returns.to_string()));
    }
    let binder = if method.suspend {
        if !ctx.environment().has_artifact(Artifact::Coroutines) {
            ctx.logger.e(messages::MISSING_COROUTINES_ARTIFACT);
        }
        TransactionMethodBinder::Coroutine
    } else {
        TransactionMethodBinder::Instant
    };
    if ctx.logger.error_count() > errors_before {
        return None;
    }

    let params: Vec<(String, TypeRef)> = method
        .params
        .iter()
        .map(|p| (p.name.clone(), p.ty.clone()))
        .collect();
    let adapter = TransactionMethodAdapter::new(
        &dao.name,
        &method.delegate_name(),
        params.iter().map(|(name, _)| name.clone()).collect(),
        binder,
    );
    Some(TransactionMethod {
        name: method.name.clone(),
        params,
        returns: method.returns.clone(),
        adapter,
    })
}

impl TransactionMethod {
    pub fn write(&self, dao: &mut DaoWriter) {
        let mut scope = CodeGenScope::new(dao.class_writer());
        self.adapter.write(&mut scope);
        let body = scope.generate();
        dao.add_method(MethodSpec {
            name: self.name.clone(),
            signature: signature(&self.params, &self.adapter.return_type(&self.returns)),
            body,
            is_async: self.adapter.is_async(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CompilerConfig, Environment};
    use crate::diagnostics::Logger;
    use crate::model::{Declarations, MethodKind, OnConflict, Param};
    use crate::solver::{ProviderRegistry, TypeAdapterStore};

    fn dao() -> Dao {
        Dao {
            name: "UserDao".into(),
            converters: Vec::new(),
            suppress_warnings: Vec::new(),
            methods: Vec::new(),
        }
    }

    fn method(returns: &str, suspend: bool) -> DaoMethod {
        DaoMethod {
            name: "replace_all".into(),
            kind: MethodKind::Transaction,
            sql: None,
            returns: TypeRef::parse(returns).unwrap(),
            params: vec![Param::new("users", TypeRef::parse("Vec<User>").unwrap())],
            suspend,
            skip_verification: false,
            transaction: false,
            delegate: None,
            on_conflict: OnConflict::default(),
            suppress_warnings: Vec::new(),
        }
    }

    fn run(config: &CompilerConfig, method: &DaoMethod) -> (Option<TransactionMethod>, Logger) {
        let decls = Declarations::default();
        let providers = ProviderRegistry::with_defaults();
        let store = TypeAdapterStore::create(&decls, 2, &[]);
        let mut ctx = Context::new(&decls, config, store, &providers, None, Logger::default());
        let out = process_transaction_method(&mut ctx, &dao(), method);
        (out, ctx.logger)
    }

    #[test]
    fn test_writes_delegate_call() {
        let (resolved, logger) = run(&CompilerConfig::default(), &method("()", false));
        assert!(logger.log().is_empty());
        let mut writer = DaoWriter::new(&dao());
        resolved.unwrap().write(&mut writer);
        let source = writer.finish().source;
        assert!(source.contains("    fn replace_all(&self, users: Vec<User>) -> daoc_runtime::Result<()> {\n"));
        assert!(source.contains("let _result = UserDao::replace_all_body(self, users)?;"));
    }

    #[test]
    fn test_deferred_return_rejected() {
        let (resolved, logger) = run(&CompilerConfig::default(), &method("LiveData<Vec<User>>", false));
        assert!(resolved.is_none());
        assert!(logger.log().iter().next().unwrap().message.contains("LiveData<Vec<User>>"));
    }

    #[test]
    fn test_sql_rejected() {
        let mut m = method("()", false);
        m.sql = Some("DELETE FROM user".into());
        let (resolved, logger) = run(&CompilerConfig::default(), &m);
        assert!(resolved.is_none());
        assert_eq!(logger.log().iter().next().unwrap().message, messages::QUERY_IN_TRANSACTION_METHOD);
    }

    #[test]
    fn test_suspend_is_async() {
        let (resolved, _) = run(&CompilerConfig::default(), &method("i64", true));
        assert!(resolved.unwrap().adapter.is_async());

        let config = CompilerConfig {
            environment: Environment::bare(),
            ..CompilerConfig::default()
        };
        let (resolved, logger) = run(&config, &method("i64", true));
        assert!(resolved.is_none());
        assert_eq!(logger.error_count(), 1);
    }
}
