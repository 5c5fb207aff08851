use crate::config::{CompilerConfig, Environment};
use crate::diagnostics::{DiagnosticLog, Logger};
use crate::model::{Declarations, TypeRef};
use crate::solver::{ProviderRegistry, QueryResultAdapter, TypeAdapterStore};
use crate::sql::ParsedQuery;
use crate::verifier::DatabaseVerifier;

/// Everything a processing step needs: declarations, settings, the type
/// adapter store for the current scope and the logger for the current
/// declaration.
pub struct Context<'a> {
    pub decls: &'a Declarations,
    pub config: &'a CompilerConfig,
    pub store: TypeAdapterStore<'a>,
    pub providers: &'a ProviderRegistry,
    pub verifier: Option<&'a DatabaseVerifier>,
    pub logger: Logger,
}

impl<'a> Context<'a> {
    pub fn new(
        decls: &'a Declarations,
        config: &'a CompilerConfig,
        store: TypeAdapterStore<'a>,
        providers: &'a ProviderRegistry,
        verifier: Option<&'a DatabaseVerifier>,
        logger: Logger,
    ) -> Self {
        Self {
            decls,
            config,
            store,
            providers,
            verifier,
            logger,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.config.environment
    }

    /// Runs `f` against a fresh logger and returns what it logged instead
    /// of recording it. The caller decides whether to replay or drop it.
    pub fn collect_logs<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> (T, DiagnosticLog) {
        let forked = self.logger.fork();
        let parent = std::mem::replace(&mut self.logger, forked);
        let value = f(self);
        let child = std::mem::replace(&mut self.logger, parent);
        (value, child.into_log())
    }

    pub fn find_query_result_adapter(&mut self, ty: &TypeRef, query: &ParsedQuery) -> Option<QueryResultAdapter> {
        self.store.find_query_result_adapter(ty, query, &mut self.logger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_logs_buffers() {
        let decls = Declarations::default();
        let config = CompilerConfig::default();
        let providers = ProviderRegistry::with_defaults();
        let store = TypeAdapterStore::create(&decls, 2, &[]);
        let mut ctx = Context::new(&decls, &config, store, &providers, None, Logger::default());
        ctx.logger.set_anchor(Some("UserDao::load".into()));
        let (value, log) = ctx.collect_logs(|ctx| {
            ctx.logger.e("speculative");
            7
        });
        assert_eq!(value, 7);
        assert_eq!(log.error_count(), 1);
        assert_eq!(log.iter().next().unwrap().anchor.as_deref(), Some("UserDao::load"));
        assert!(ctx.logger.log().is_empty());
    }
}
