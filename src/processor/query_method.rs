/// Query method processing: the two-pass resolve, rewrite, re-resolve loop
/// and the final checks between placeholders and parameters.
use tracing::{debug, trace};

use crate::config::Artifact;
use crate::context::Context;
use crate::diagnostics::{messages, Warning};
use crate::model::{DaoMethod, Param, TypeRef};
use crate::solver::binder::{CoroutinePreparedQueryResultBinder, CoroutineResultBinder, PrepareStatement};
use crate::solver::{PreparedQueryResultBinder, QueryParameter, QueryResultAdapter, QueryResultBinder, WriteTarget};
use crate::sql::{self, ParsedQuery, RewritePipeline};
use crate::writer::{CodeGenScope, DaoWriter, MethodSpec, QueryWriter};

pub enum MethodBinder {
    Read(Box<dyn QueryResultBinder>),
    Write(Box<dyn PreparedQueryResultBinder>),
}

impl MethodBinder {
    fn read_adapter(&self) -> Option<&QueryResultAdapter> {
        match self {
            MethodBinder::Read(binder) => binder.adapter(),
            MethodBinder::Write(_) => None,
        }
    }
}

/// A query method that resolved without errors, ready to be written.
pub struct QueryMethod {
    pub name: String,
    pub returns: TypeRef,
    pub params: Vec<QueryParameter>,
    pub query: ParsedQuery,
    pub in_transaction: bool,
    pub binder: MethodBinder,
}

struct Resolution {
    query: ParsedQuery,
    binder: MethodBinder,
}

/// Resolves `method`, logging every problem. Returns `None` when anything
/// was reported as an error.
pub fn process_query_method(
    ctx: &mut Context<'_>,
    rewriters: &RewritePipeline,
    method: &DaoMethod,
) -> Option<QueryMethod> {
    let errors_before = ctx.logger.error_count();

    let Some(sql_text) = method.sql.as_deref() else {
        ctx.logger.e(messages::MISSING_QUERY_SQL);
        return None;
    };
    let query = sql::parse(sql_text);
    let params = resolve_params(ctx, &method.params);
    if query.has_errors() {
        for error in &query.errors {
            ctx.logger.e(error.clone());
        }
        return None;
    }

    let (first, log) = ctx.collect_logs(|ctx| resolve(ctx, method, query));
    let rewritten = match first.binder.read_adapter() {
        Some(adapter) if ctx.config.rewrite_unused_columns => {
            Some(rewriters.rewrite(first.query.clone(), adapter.row()))
        }
        _ => None,
    };
    let resolution = match rewritten {
        Some(query) if query.original != first.query.original => {
            debug!(method = %method.name, sql = %query.original, "re-resolving rewritten query");
            drop(log);
            resolve(ctx, method, query)
        }
        _ => {
            log.write_to(&mut ctx.logger);
            first
        }
    };

    validate(ctx, method, &resolution, &params);

    if ctx.logger.error_count() > errors_before {
        debug!(method = %method.name, "query method has errors, not emitted");
        return None;
    }
    Some(QueryMethod {
        name: method.name.clone(),
        returns: method.returns.clone(),
        params,
        query: resolution.query,
        in_transaction: method.transaction,
        binder: resolution.binder,
    })
}

fn resolve_params(ctx: &mut Context<'_>, params: &[Param]) -> Vec<QueryParameter> {
    params
        .iter()
        .map(|param| {
            let adapter = ctx.store.find_query_parameter_adapter(&param.ty);
            if adapter.is_none() {
                ctx.logger
                    .e(messages::cannot_bind_query_parameter(&param.name, &param.ty.to_string()));
            }
            QueryParameter {
                name: param.name.clone(),
                sql_name: param.sql_name().to_string(),
                ty: param.ty.clone(),
                adapter,
            }
        })
        .collect()
}

/// One resolution pass: verify, then pick the binder for the return type.
fn resolve(ctx: &mut Context<'_>, method: &DaoMethod, mut query: ParsedQuery) -> Resolution {
    let verifier = ctx
        .verifier
        .filter(|_| ctx.config.verify_queries && !method.skip_verification);
    if let Some(verifier) = verifier {
        let info = verifier.analyze(&query.original);
        if let Some(error) = &info.error {
            ctx.logger.e(messages::cannot_verify_query(error));
        }
        trace!(columns = ?info.column_names(), "verified query");
        query.result_info = Some(info);
    }

    let binder = if query.kind.is_write() {
        MethodBinder::Write(resolve_prepared_binder(ctx, method, WriteTarget::Query(query.kind)))
    } else {
        MethodBinder::Read(resolve_query_binder(ctx, method, &query))
    };
    Resolution { query, binder }
}

fn require_coroutines(ctx: &mut Context<'_>) {
    if !ctx.environment().has_artifact(Artifact::Coroutines) {
        ctx.logger.e(messages::MISSING_COROUTINES_ARTIFACT);
    }
}

fn resolve_query_binder(ctx: &mut Context<'_>, method: &DaoMethod, query: &ParsedQuery) -> Box<dyn QueryResultBinder> {
    if method.suspend {
        require_coroutines(ctx);
        let adapter = ctx.find_query_result_adapter(&method.returns, query);
        return Box::new(CoroutineResultBinder::new(adapter));
    }
    let providers = ctx.providers;
    providers.find_query_result_binder(&method.returns, query, ctx)
}

pub(crate) fn resolve_prepared_binder(
    ctx: &mut Context<'_>,
    method: &DaoMethod,
    target: WriteTarget,
) -> Box<dyn PreparedQueryResultBinder> {
    if method.suspend {
        require_coroutines(ctx);
        let adapter = ctx.store.find_prepared_query_result_adapter(&method.returns, target);
        return Box::new(CoroutinePreparedQueryResultBinder::new(adapter));
    }
    let providers = ctx.providers;
    providers.find_prepared_query_result_binder(&method.returns, target, ctx)
}

fn validate(ctx: &mut Context<'_>, method: &DaoMethod, resolution: &Resolution, params: &[QueryParameter]) {
    let declared = method.returns.to_string();
    match &resolution.binder {
        MethodBinder::Read(binder) => match binder.adapter() {
            None if binder.requires_adapter() => {
                ctx.logger.e(messages::cannot_find_query_result_adapter(&declared));
            }
            Some(adapter) if adapter.row().has_relations() && !method.transaction => {
                ctx.logger.w(
                    Warning::RelationQueryWithoutTransaction,
                    messages::RELATION_QUERY_WITHOUT_TRANSACTION,
                );
            }
            _ => {}
        },
        MethodBinder::Write(binder) => {
            if binder.adapter().is_none() {
                ctx.logger.e(messages::cannot_find_prepared_query_result_adapter(
                    &declared,
                    resolution.query.kind.name(),
                ));
            }
        }
    }

    let writer = QueryWriter::new(&resolution.query, params);
    let missing = writer.missing_params();
    if !missing.is_empty() {
        ctx.logger.e(messages::missing_parameter_for_bind_variable(&missing));
    }
    let unused = writer.unused_params();
    if !unused.is_empty() {
        ctx.logger.e(messages::unused_query_method_parameter(&unused));
    }
}

pub(crate) fn signature(params: &[(String, TypeRef)], returns: &str) -> String {
    let mut parts = vec!["&self".to_string()];
    parts.extend(params.iter().map(|(name, ty)| format!("{name}: {ty}")));
    format!("({}) -> {returns}", parts.join(", "))
}

impl QueryMethod {
    pub fn write(&self, dao: &mut DaoWriter) {
        let query_writer = QueryWriter::new(&self.query, &self.params);
        let mut scope = CodeGenScope::new(dao.class_writer());
        let (returns, is_async) = match &self.binder {
            MethodBinder::Read(binder) => {
                let statement = query_writer.prepare_read_query(&mut scope);
                binder.convert_and_return(&statement, self.in_transaction, &mut scope);
                (binder.return_type(&self.returns), binder.is_async())
            }
            MethodBinder::Write(binder) => {
                let prepare: &PrepareStatement<'_> = &|scope| query_writer.prepare_write_query(&self.name, scope);
                binder.execute_and_return(prepare, &mut scope);
                (binder.return_type(&self.returns), binder.is_async())
            }
        };
        let body = scope.generate();
        let params: Vec<(String, TypeRef)> = self.params.iter().map(|p| (p.name.clone(), p.ty.clone())).collect();
        dao.add_method(MethodSpec {
            name: self.name.clone(),
            signature: signature(&params, &returns),
            body,
            is_async,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CompilerConfig, Environment};
    use crate::diagnostics::Logger;
    use crate::model::{Dao, Declarations, MethodKind, OnConflict};
    use crate::solver::{ProviderRegistry, TypeAdapterStore};
    use crate::verifier::DatabaseVerifier;
    use std::path::Path;

    fn decls() -> Declarations {
        Declarations::from_toml_str(
            r#"
            [[entities]]
            name = "User"
            table = "user"
            primary_key = ["id"]
            fields = [
                { name = "id", type = "i64" },
                { name = "name", type = "String" },
                { name = "age", type = "i32" },
            ]

            [[pojos]]
            name = "UserName"
            fields = [{ name = "id", type = "i64" }, { name = "name", type = "String" }]
            "#,
            Path::new("t.toml"),
        )
        .unwrap()
    }

    fn method(sql: Option<&str>, returns: &str, params: &[(&str, &str)]) -> DaoMethod {
        DaoMethod {
            name: "load".into(),
            kind: MethodKind::Query,
            sql: sql.map(str::to_string),
            returns: TypeRef::parse(returns).unwrap(),
            params: params
                .iter()
                .map(|(n, t)| Param::new(*n, TypeRef::parse(t).unwrap()))
                .collect(),
            suspend: false,
            skip_verification: false,
            transaction: false,
            delegate: None,
            on_conflict: OnConflict::default(),
            suppress_warnings: Vec::new(),
        }
    }

    struct Fixture {
        decls: Declarations,
        config: CompilerConfig,
        providers: ProviderRegistry,
        verifier: Option<DatabaseVerifier>,
    }

    impl Fixture {
        fn new(config: CompilerConfig) -> Self {
            let decls = decls();
            let verifier = DatabaseVerifier::create(&decls).ok();
            Self {
                decls,
                config,
                providers: ProviderRegistry::with_defaults(),
                verifier,
            }
        }

        fn run(&self, method: &DaoMethod) -> (Option<QueryMethod>, Logger) {
            let store = TypeAdapterStore::create(&self.decls, self.config.max_converter_hops, &[]);
            let mut ctx = Context::new(
                &self.decls,
                &self.config,
                store,
                &self.providers,
                self.verifier.as_ref(),
                Logger::default(),
            );
            let resolved = process_query_method(&mut ctx, &RewritePipeline::with_defaults(), method);
            (resolved, ctx.logger)
        }
    }

    fn messages_of(logger: &Logger) -> Vec<String> {
        logger.log().iter().map(|d| d.message.clone()).collect()
    }

    #[test]
    fn test_missing_sql() {
        let fx = Fixture::new(CompilerConfig::default());
        let (resolved, logger) = fx.run(&method(None, "Vec<User>", &[]));
        assert!(resolved.is_none());
        assert_eq!(messages_of(&logger), vec![messages::MISSING_QUERY_SQL.to_string()]);
    }

    #[test]
    fn test_missing_and_unused_params_reported_once_each() {
        let fx = Fixture::new(CompilerConfig::default());
        let m = method(
            Some("SELECT * FROM user WHERE id = :id AND name = :name AND age = :age"),
            "Vec<User>",
            &[("id", "i64"), ("limit", "i32"), ("offset", "i32")],
        );
        let (resolved, logger) = fx.run(&m);
        assert!(resolved.is_none());
        let messages = messages_of(&logger);
        assert!(messages.contains(&"missing parameter for bind variable `name, age`".to_string()));
        assert!(messages.contains(&"unused parameter `limit, offset`".to_string()));
        assert_eq!(logger.error_count(), 2);
    }

    #[test]
    fn test_rewrite_drops_speculative_warnings() {
        let fx = Fixture::new(CompilerConfig::default());
        let m = method(Some("SELECT * FROM user WHERE id = :id"), "UserName", &[("id", "i64")]);
        let (resolved, logger) = fx.run(&m);
        let resolved = resolved.unwrap();
        assert!(logger.log().is_empty(), "{:?}", messages_of(&logger));
        assert_eq!(
            resolved.query.original,
            "SELECT `id`, `name` FROM (SELECT * FROM user WHERE id = :id)"
        );
        assert_eq!(resolved.query.rewritten_from.as_deref(), Some("SELECT * FROM user WHERE id = :id"));
    }

    #[test]
    fn test_without_rewrite_warning_is_replayed() {
        let config = CompilerConfig {
            rewrite_unused_columns: false,
            ..CompilerConfig::default()
        };
        let fx = Fixture::new(config);
        let m = method(Some("SELECT * FROM user WHERE id = :id"), "UserName", &[("id", "i64")]);
        let (resolved, logger) = fx.run(&m);
        assert_eq!(resolved.unwrap().query.original, "SELECT * FROM user WHERE id = :id");
        let log = logger.log();
        assert_eq!(log.warning_count(), 1);
        assert_eq!(log.iter().next().unwrap().key, Some(Warning::CursorMismatch.key()));
    }

    #[test]
    fn test_verification_error() {
        let fx = Fixture::new(CompilerConfig::default());
        let m = method(Some("SELECT nope FROM user"), "Vec<i64>", &[]);
        let (resolved, logger) = fx.run(&m);
        assert!(resolved.is_none());
        assert!(messages_of(&logger)[0].starts_with("There is a problem with the query:"));
    }

    #[test]
    fn test_skip_verification() {
        let fx = Fixture::new(CompilerConfig::default());
        let mut m = method(Some("SELECT nope FROM user"), "Vec<i64>", &[]);
        m.skip_verification = true;
        let (resolved, logger) = fx.run(&m);
        assert!(resolved.is_some());
        assert!(logger.log().is_empty());
    }

    #[test]
    fn test_write_query_return_types() {
        let fx = Fixture::new(CompilerConfig::default());
        let ok = method(Some("DELETE FROM user WHERE id = :id"), "i32", &[("id", "i64")]);
        assert!(fx.run(&ok).0.is_some());
        let bad = method(Some("DELETE FROM user WHERE id = :id"), "String", &[("id", "i64")]);
        let (resolved, logger) = fx.run(&bad);
        assert!(resolved.is_none());
        assert!(messages_of(&logger)[0].contains("DELETE"));
    }

    #[test]
    fn test_unknown_statement_rejected() {
        let fx = Fixture::new(CompilerConfig::default());
        let (resolved, logger) = fx.run(&method(Some("PRAGMA user_version"), "i32", &[]));
        assert!(resolved.is_none());
        assert!(messages_of(&logger)
            .iter()
            .any(|m| m.contains("PRAGMA query type is not supported")));
    }

    #[test]
    fn test_suspend_needs_coroutines_artifact() {
        let config = CompilerConfig {
            environment: Environment::default().without_artifact(Artifact::Coroutines),
            ..CompilerConfig::default()
        };
        let fx = Fixture::new(config);
        let mut m = method(Some("SELECT * FROM user"), "Vec<User>", &[]);
        m.suspend = true;
        let (resolved, logger) = fx.run(&m);
        assert!(resolved.is_none());
        assert_eq!(messages_of(&logger), vec![messages::MISSING_COROUTINES_ARTIFACT.to_string()]);
    }

    #[test]
    fn test_write_renders_method() {
        let fx = Fixture::new(CompilerConfig::default());
        let m = method(Some("SELECT * FROM user WHERE id = :id"), "Option<User>", &[("id", "i64")]);
        let resolved = fx.run(&m).0.unwrap();
        let dao = Dao {
            name: "UserDao".into(),
            converters: Vec::new(),
            suppress_warnings: Vec::new(),
            methods: vec![m],
        };
        let mut writer = DaoWriter::new(&dao);
        resolved.write(&mut writer);
        let generated = writer.finish();
        assert!(generated
            .source
            .contains("    fn load(&self, id: i64) -> daoc_runtime::Result<Option<User>> {\n"));
        assert!(generated.source.contains("let mut _statement = SqlQuery::acquire(_sql, 1);"));
    }
}
