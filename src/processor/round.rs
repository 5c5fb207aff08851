use serde::Serialize;
use tracing::{info, info_span, warn};

use crate::config::CompilerConfig;
use crate::diagnostics::{messages, DiagnosticLog, Logger, Warning};
use crate::error::Result;
use crate::model::Declarations;
use crate::plugin::PluginRegistry;
use crate::verifier::DatabaseVerifier;
use crate::writer::GeneratedDao;

use super::converter_processor::process_converters;
use super::dao_processor::{process_dao, DaoEnv};

/// Everything one round produced.
#[derive(Debug, Serialize)]
pub struct RoundOutput {
    pub daos: Vec<GeneratedDao>,
    pub diagnostics: DiagnosticLog,
}

impl RoundOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

/// Processes every DAO in `decls`.
///
/// Only configuration problems fail the round itself. Problems with the
/// declarations end up in [`RoundOutput::diagnostics`].
pub fn run_round(decls: &Declarations, config: &CompilerConfig, plugins: &PluginRegistry) -> Result<RoundOutput> {
    let _span = info_span!("round", daos = decls.daos.len()).entered();
    let mut decls = decls.clone();
    for class in plugins.converters() {
        if decls.converter_class(&class.name).is_none() {
            decls.converters.push(class.clone());
        }
        if !decls.database.converters.contains(&class.name) {
            decls.database.converters.push(class.name.clone());
        }
    }

    let mut logger = Logger::new(config.suppressed()?);
    let verifier = if config.verify_queries {
        match DatabaseVerifier::create(&decls) {
            Ok(verifier) => Some(verifier),
            Err(e) => {
                warn!(error = %e, "query verification disabled");
                logger.w(
                    Warning::CannotCreateVerificationDatabase,
                    messages::cannot_create_verification_database(&e.to_string()),
                );
                None
            }
        }
    } else {
        None
    };

    let previous = logger.set_anchor(Some("database".to_string()));
    let database_converters = process_converters(&decls, &decls.database.converters, &mut logger);
    logger.set_anchor(previous);

    let env = DaoEnv {
        decls: &decls,
        config,
        providers: plugins.providers(),
        rewriters: plugins.rewriters(),
        verifier: verifier.as_ref(),
        database_converters: &database_converters,
    };
    let daos: Vec<GeneratedDao> = decls
        .daos
        .iter()
        .map(|dao| process_dao(&env, dao, &mut logger))
        .collect();

    let diagnostics = logger.into_log();
    info!(
        daos = daos.len(),
        errors = diagnostics.error_count(),
        warnings = diagnostics.warning_count(),
        "round finished"
    );
    Ok(RoundOutput { daos, diagnostics })
}
