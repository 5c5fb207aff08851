/// Binder providers: each recognises one family of declared return types
/// and builds the binder for it.
///
/// Providers are tried in priority order and the first match wins, so the
/// order below is part of the contract: a catch-all instant provider runs
/// last and claims anything the specific ones did not.
mod observable;
mod paging;
mod prepared;
mod simple;

use std::fmt;

use tracing::debug;

use crate::config::Artifact;
use crate::context::Context;
use crate::diagnostics::messages;
use crate::model::TypeRef;
use crate::sql::ParsedQuery;

use super::binder::{
    InstantPreparedQueryResultBinder, InstantQueryResultBinder, PreparedQueryResultBinder, QueryResultBinder,
};
use super::prepared::WriteTarget;
use super::rx_types::RxType;

pub use observable::{FlowQueryResultBinderProvider, LiveDataQueryResultBinderProvider, RxQueryResultBinderProvider};
pub use paging::{DataSourceFactoryQueryResultBinderProvider, DataSourceQueryResultBinderProvider, PagingSourceQueryResultBinderProvider};
pub use prepared::{
    GuavaPreparedQueryResultBinderProvider, InstantPreparedQueryResultBinderProvider, RxPreparedQueryResultBinderProvider,
};
pub use simple::{
    CursorQueryResultBinderProvider, GuavaListenableFutureQueryResultBinderProvider,
    InstantQueryResultBinderProvider, RxCallableQueryResultBinderProvider,
};

/// Lower runs first. Ties keep registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProviderPriority(pub u16);

impl ProviderPriority {
    pub const CURSOR: Self = Self(100);
    pub const LIVE_DATA: Self = Self(200);
    pub const GUAVA: Self = Self(300);
    pub const RX_OBSERVABLE: Self = Self(400);
    pub const RX_CALLABLE: Self = Self(500);
    pub const DATA_SOURCE: Self = Self(600);
    pub const DATA_SOURCE_FACTORY: Self = Self(700);
    pub const PAGING_SOURCE: Self = Self(800);
    pub const FLOW: Self = Self(900);
    pub const RX_PREPARED: Self = Self(400);
    pub const GUAVA_PREPARED: Self = Self(600);
    pub const INSTANT: Self = Self(u16::MAX);

    /// The priority `offset` steps after `self`, for families of providers.
    pub const fn plus(self, offset: u16) -> Self {
        Self(self.0 + offset)
    }
}

impl fmt::Display for ProviderPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub trait QueryResultBinderProvider {
    fn name(&self) -> &str;

    fn priority(&self) -> ProviderPriority;

    /// Whether this provider claims `ty`. May log when `ty` is recognised
    /// but unusable.
    fn matches(&self, ty: &TypeRef, ctx: &mut Context<'_>) -> bool;

    fn provide(&self, ty: &TypeRef, query: &ParsedQuery, ctx: &mut Context<'_>) -> Box<dyn QueryResultBinder>;
}

pub trait PreparedQueryResultBinderProvider {
    fn name(&self) -> &str;

    fn priority(&self) -> ProviderPriority;

    fn matches(&self, ty: &TypeRef, ctx: &mut Context<'_>) -> bool;

    fn provide(&self, ty: &TypeRef, target: WriteTarget, ctx: &mut Context<'_>) -> Box<dyn PreparedQueryResultBinder>;
}

/// Wraps a provider whose generated code needs a companion artifact.
///
/// A match without the artifact still claims the type and builds the
/// binder, but logs `message` so the round fails with a useful error.
pub struct RequireArtifact<P> {
    inner: P,
    artifact: Artifact,
    message: &'static str,
}

impl<P> RequireArtifact<P> {
    pub fn new(inner: P, artifact: Artifact, message: &'static str) -> Self {
        Self {
            inner,
            artifact,
            message,
        }
    }

    fn check(&self, ctx: &mut Context<'_>) {
        if !ctx.environment().has_artifact(self.artifact) {
            ctx.logger.e(self.message);
        }
    }
}

impl<P: QueryResultBinderProvider> QueryResultBinderProvider for RequireArtifact<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn priority(&self) -> ProviderPriority {
        self.inner.priority()
    }

    fn matches(&self, ty: &TypeRef, ctx: &mut Context<'_>) -> bool {
        self.inner.matches(ty, ctx)
    }

    fn provide(&self, ty: &TypeRef, query: &ParsedQuery, ctx: &mut Context<'_>) -> Box<dyn QueryResultBinder> {
        self.check(ctx);
        self.inner.provide(ty, query, ctx)
    }
}

impl<P: PreparedQueryResultBinderProvider> PreparedQueryResultBinderProvider for RequireArtifact<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn priority(&self) -> ProviderPriority {
        self.inner.priority()
    }

    fn matches(&self, ty: &TypeRef, ctx: &mut Context<'_>) -> bool {
        self.inner.matches(ty, ctx)
    }

    fn provide(&self, ty: &TypeRef, target: WriteTarget, ctx: &mut Context<'_>) -> Box<dyn PreparedQueryResultBinder> {
        self.check(ctx);
        self.inner.provide(ty, target, ctx)
    }
}

/// The ordered provider chains for read and write queries.
#[derive(Default)]
pub struct ProviderRegistry {
    query: Vec<Box<dyn QueryResultBinderProvider>>,
    prepared: Vec<Box<dyn PreparedQueryResultBinderProvider>>,
}

impl ProviderRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every built-in provider.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(CursorQueryResultBinderProvider));
        registry.register(Box::new(LiveDataQueryResultBinderProvider));
        registry.register(Box::new(RequireArtifact::new(
            GuavaListenableFutureQueryResultBinderProvider,
            Artifact::Guava,
            messages::MISSING_GUAVA_ARTIFACT,
        )));
        for (offset, rx_type) in RxType::OBSERVABLES.into_iter().enumerate() {
            registry.register(Box::new(RequireArtifact::new(
                RxQueryResultBinderProvider::new(rx_type, ProviderPriority::RX_OBSERVABLE.plus(offset as u16)),
                rx_type.version.artifact(),
                rx_type.version.missing_artifact_message(),
            )));
        }
        for (offset, rx_type) in RxType::CALLABLES.into_iter().enumerate() {
            registry.register(Box::new(RequireArtifact::new(
                RxCallableQueryResultBinderProvider::new(rx_type, ProviderPriority::RX_CALLABLE.plus(offset as u16)),
                rx_type.version.artifact(),
                rx_type.version.missing_artifact_message(),
            )));
        }
        registry.register(Box::new(DataSourceQueryResultBinderProvider));
        registry.register(Box::new(DataSourceFactoryQueryResultBinderProvider));
        registry.register(Box::new(PagingSourceQueryResultBinderProvider));
        registry.register(Box::new(RequireArtifact::new(
            FlowQueryResultBinderProvider,
            Artifact::Coroutines,
            messages::MISSING_COROUTINES_ARTIFACT,
        )));
        registry.register(Box::new(InstantQueryResultBinderProvider));

        for (offset, rx_type) in RxType::PREPARED.into_iter().enumerate() {
            registry.register_prepared(Box::new(RequireArtifact::new(
                RxPreparedQueryResultBinderProvider::new(rx_type, ProviderPriority::RX_PREPARED.plus(offset as u16)),
                rx_type.version.artifact(),
                rx_type.version.missing_artifact_message(),
            )));
        }
        registry.register_prepared(Box::new(RequireArtifact::new(
            GuavaPreparedQueryResultBinderProvider,
            Artifact::Guava,
            messages::MISSING_GUAVA_ARTIFACT,
        )));
        registry.register_prepared(Box::new(InstantPreparedQueryResultBinderProvider));
        registry
    }

    pub fn register(&mut self, provider: Box<dyn QueryResultBinderProvider>) {
        self.query.push(provider);
        self.query.sort_by_key(|p| p.priority());
    }

    pub fn register_prepared(&mut self, provider: Box<dyn PreparedQueryResultBinderProvider>) {
        self.prepared.push(provider);
        self.prepared.sort_by_key(|p| p.priority());
    }

    pub fn query_provider_names(&self) -> Vec<&str> {
        self.query.iter().map(|p| p.name()).collect()
    }

    pub fn prepared_provider_names(&self) -> Vec<&str> {
        self.prepared.iter().map(|p| p.name()).collect()
    }

    pub fn find_query_result_binder(
        &self,
        ty: &TypeRef,
        query: &ParsedQuery,
        ctx: &mut Context<'_>,
    ) -> Box<dyn QueryResultBinder> {
        for provider in &self.query {
            if provider.matches(ty, ctx) {
                debug!(provider = provider.name(), ty = %ty, "query result binder");
                return provider.provide(ty, query, ctx);
            }
        }
        let adapter = ctx.find_query_result_adapter(ty, query);
        Box::new(InstantQueryResultBinder::new(adapter))
    }

    pub fn find_prepared_query_result_binder(
        &self,
        ty: &TypeRef,
        target: WriteTarget,
        ctx: &mut Context<'_>,
    ) -> Box<dyn PreparedQueryResultBinder> {
        for provider in &self.prepared {
            if provider.matches(ty, ctx) {
                debug!(provider = provider.name(), ty = %ty, "prepared query result binder");
                return provider.provide(ty, target, ctx);
            }
        }
        let adapter = ctx.store.find_prepared_query_result_adapter(ty, target);
        Box::new(InstantPreparedQueryResultBinder::new(adapter))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::config::CompilerConfig;
    use crate::diagnostics::{DiagnosticLog, Logger};
    use crate::model::Declarations;
    use crate::solver::binder::Timing;
    use crate::solver::TypeAdapterStore;

    const USER: &str = r#"
        [[entities]]
        name = "User"
        table = "user"
        primary_key = ["id"]
        fields = [{ name = "id", type = "i64" }, { name = "name", type = "String" }]
    "#;

    /// Claims `LiveData<T>` but runs the query in place.
    struct InstantLiveData(ProviderPriority);

    impl QueryResultBinderProvider for InstantLiveData {
        fn name(&self) -> &str {
            "InstantLiveData"
        }

        fn priority(&self) -> ProviderPriority {
            self.0
        }

        fn matches(&self, ty: &TypeRef, _ctx: &mut Context<'_>) -> bool {
            ty.simple_name() == "LiveData" && ty.args().len() == 1
        }

        fn provide(&self, ty: &TypeRef, query: &ParsedQuery, ctx: &mut Context<'_>) -> Box<dyn QueryResultBinder> {
            let adapter = ty
                .single_arg()
                .and_then(|inner| ctx.find_query_result_adapter(inner, query));
            Box::new(InstantQueryResultBinder::new(adapter))
        }
    }

    fn resolve(
        registry: &ProviderRegistry,
        config: &CompilerConfig,
        ty: &str,
        sql: &str,
    ) -> (Box<dyn QueryResultBinder>, DiagnosticLog) {
        let decls = Declarations::from_toml_str(USER, Path::new("t.toml")).unwrap();
        let store = TypeAdapterStore::create(&decls, config.max_converter_hops, &[]);
        let mut ctx = Context::new(&decls, config, store, registry, None, Logger::default());
        let query = crate::sql::parse(sql);
        let binder = registry.find_query_result_binder(&TypeRef::parse(ty).unwrap(), &query, &mut ctx);
        (binder, ctx.logger.into_log())
    }

    fn resolve_prepared(
        registry: &ProviderRegistry,
        config: &CompilerConfig,
        ty: &str,
        sql: &str,
    ) -> (Box<dyn PreparedQueryResultBinder>, DiagnosticLog) {
        let decls = Declarations::from_toml_str(USER, Path::new("t.toml")).unwrap();
        let store = TypeAdapterStore::create(&decls, config.max_converter_hops, &[]);
        let mut ctx = Context::new(&decls, config, store, registry, None, Logger::default());
        let target = WriteTarget::Query(crate::sql::parse(sql).kind);
        let binder = registry.find_prepared_query_result_binder(&TypeRef::parse(ty).unwrap(), target, &mut ctx);
        (binder, ctx.logger.into_log())
    }

    #[test]
    fn test_default_order() {
        let registry = ProviderRegistry::with_defaults();
        assert_eq!(
            registry.query_provider_names(),
            vec![
                "Cursor",
                "LiveData",
                "ListenableFuture",
                "rx2::Flowable",
                "rx2::Observable",
                "rx3::Flowable",
                "rx3::Observable",
                "rx2::Single",
                "rx2::Maybe",
                "rx3::Single",
                "rx3::Maybe",
                "DataSource",
                "DataSourceFactory",
                "PagingSource",
                "Flow",
                "instant",
            ]
        );
        assert_eq!(registry.prepared_provider_names().last(), Some(&"instant"));
    }

    #[test]
    fn test_register_keeps_ties_in_order() {
        let mut registry = ProviderRegistry::empty();
        registry.register(Box::new(InstantQueryResultBinderProvider));
        registry.register(Box::new(CursorQueryResultBinderProvider));
        assert_eq!(registry.query_provider_names(), vec!["Cursor", "instant"]);
    }

    #[test]
    fn test_higher_priority_provider_wins() {
        let config = CompilerConfig::default();

        let mut registry = ProviderRegistry::with_defaults();
        registry.register(Box::new(InstantLiveData(ProviderPriority(ProviderPriority::LIVE_DATA.0 - 1))));
        let (binder, log) = resolve(&registry, &config, "LiveData<Vec<User>>", "SELECT * FROM user");
        assert!(log.is_empty(), "{log:?}");
        assert_eq!(binder.strategy().timing, Timing::Immediate);
        assert!(binder.strategy().observed_tables.is_none());

        let mut registry = ProviderRegistry::with_defaults();
        registry.register(Box::new(InstantLiveData(ProviderPriority::LIVE_DATA.plus(1))));
        let (binder, log) = resolve(&registry, &config, "LiveData<Vec<User>>", "SELECT * FROM user");
        assert!(log.is_empty(), "{log:?}");
        assert_eq!(binder.strategy().timing, Timing::Deferred);
        let observed = binder.strategy().observed_tables.unwrap();
        assert_eq!(observed.into_iter().collect::<Vec<_>>(), vec!["user".to_string()]);
    }

    #[test]
    fn test_missing_artifact_still_claims_type() {
        let config = CompilerConfig {
            environment: crate::config::Environment::default().without_artifact(Artifact::RxJava2),
            ..CompilerConfig::default()
        };
        let registry = ProviderRegistry::with_defaults();
        let (binder, log) = resolve(&registry, &config, "rx2::Flowable<Vec<User>>", "SELECT * FROM user");
        let logged: Vec<&str> = log.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(logged, vec![messages::MISSING_RXJAVA2_ARTIFACT]);
        assert!(binder.strategy().is_deferred());
        assert!(binder.adapter().is_some());

        let (_, log) = resolve(&registry, &config, "rx3::Flowable<Vec<User>>", "SELECT * FROM user");
        assert!(log.is_empty(), "{log:?}");
    }

    #[test]
    fn test_missing_artifact_on_prepared_chain() {
        let config = CompilerConfig {
            environment: crate::config::Environment::default().without_artifact(Artifact::Guava),
            ..CompilerConfig::default()
        };
        let registry = ProviderRegistry::with_defaults();
        let (binder, log) = resolve_prepared(
            &registry,
            &config,
            "ListenableFuture<i32>",
            "DELETE FROM user WHERE id = ?",
        );
        let logged: Vec<&str> = log.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(logged, vec![messages::MISSING_GUAVA_ARTIFACT]);
        assert!(binder.adapter().is_some());
    }
}
