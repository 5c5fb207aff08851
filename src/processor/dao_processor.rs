use tracing::{debug, debug_span};

use crate::config::CompilerConfig;
use crate::context::Context;
use crate::diagnostics::Logger;
use crate::model::{CustomTypeConverter, Dao, Declarations, MethodKind};
use crate::solver::{ProviderRegistry, TypeAdapterStore};
use crate::sql::RewritePipeline;
use crate::verifier::DatabaseVerifier;
use crate::writer::{DaoWriter, GeneratedDao};

use super::converter_processor::process_converters;
use super::query_method::process_query_method;
use super::shortcut_method::process_shortcut_method;
use super::transaction_method::process_transaction_method;

/// What every DAO in a round shares.
pub struct DaoEnv<'a> {
    pub decls: &'a Declarations,
    pub config: &'a CompilerConfig,
    pub providers: &'a ProviderRegistry,
    pub rewriters: &'a RewritePipeline,
    pub verifier: Option<&'a DatabaseVerifier>,
    /// Database-wide converters, already validated.
    pub database_converters: &'a [CustomTypeConverter],
}

/// Resolves and writes one DAO. Methods with errors are left out of the
/// generated implementation; everything found is logged to `logger`.
pub fn process_dao(env: &DaoEnv<'_>, dao: &Dao, logger: &mut Logger) -> GeneratedDao {
    let _span = debug_span!("dao", name = %dao.name).entered();
    let previous_anchor = logger.set_anchor(Some(dao.name.clone()));
    let previous_suppressed = logger.suppress(dao.suppressed());

    // DAO converters take precedence over database ones.
    let mut custom = process_converters(env.decls, &dao.converters, logger);
    custom.extend(env.database_converters.iter().cloned());
    let store = TypeAdapterStore::create(env.decls, env.config.max_converter_hops, &custom);
    let mut ctx = Context::new(env.decls, env.config, store, env.providers, env.verifier, logger.fork());

    let mut writer = DaoWriter::new(dao);
    for method in &dao.methods {
        ctx.logger.set_anchor(Some(format!("{}::{}", dao.name, method.name)));
        let previous = ctx.logger.suppress(method.suppressed());
        match method.kind {
            MethodKind::Query => {
                if let Some(resolved) = process_query_method(&mut ctx, env.rewriters, method) {
                    resolved.write(&mut writer);
                }
            }
            MethodKind::Transaction => {
                if let Some(resolved) = process_transaction_method(&mut ctx, dao, method) {
                    resolved.write(&mut writer);
                }
            }
            MethodKind::Insert | MethodKind::Update | MethodKind::Delete => {
                if let Some(resolved) = process_shortcut_method(&mut ctx, method) {
                    resolved.write(&mut writer);
                }
            }
        }
        ctx.logger.restore_suppressed(previous);
    }
    debug!(
        emitted = writer.method_count(),
        declared = dao.methods.len(),
        "processed dao"
    );

    ctx.logger.into_log().write_to(logger);
    logger.restore_suppressed(previous_suppressed);
    logger.set_anchor(previous_anchor);
    writer.finish()
}
