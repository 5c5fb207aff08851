/// Insert, update and delete methods: statements derived from the entity
/// parameters instead of declared SQL.
use tracing::debug;

use crate::context::Context;
use crate::diagnostics::messages;
use crate::model::{DaoMethod, MethodKind, OnConflict, TypeRef};
use crate::solver::binder::PrepareStatement;
use crate::solver::{EntityParams, PreparedQueryResultBinder, ShortcutParameter, WriteTarget};
use crate::sql::QueryType;
use crate::writer::{CodeGenScope, DaoWriter, MethodSpec, ShortcutWriter};

use super::query_method::{resolve_prepared_binder, signature};

pub struct ShortcutMethod {
    pub name: String,
    pub kind: QueryType,
    pub on_conflict: OnConflict,
    pub returns: TypeRef,
    pub params: Vec<ShortcutParameter>,
    pub binder: Box<dyn PreparedQueryResultBinder>,
}

/// Resolves a shortcut method, logging every problem. Returns `None` when
/// anything was reported as an error.
pub fn process_shortcut_method(ctx: &mut Context<'_>, method: &DaoMethod) -> Option<ShortcutMethod> {
    let kind = match method.kind {
        MethodKind::Insert => QueryType::Insert,
        MethodKind::Update => QueryType::Update,
        MethodKind::Delete => QueryType::Delete,
        MethodKind::Query | MethodKind::Transaction => return None,
    };
    let errors_before = ctx.logger.error_count();

    if method.sql.is_some() {
        ctx.logger.e(messages::SHORTCUT_METHOD_WITH_SQL);
    }
    if kind == QueryType::Delete && method.on_conflict != OnConflict::default() {
        ctx.logger.e(messages::DELETE_METHOD_ON_CONFLICT);
    }
    if method.params.is_empty() {
        ctx.logger.e(messages::SHORTCUT_METHOD_MISSING_PARAMS);
    }
    let params: Vec<ShortcutParameter> = method
        .params
        .iter()
        .filter_map(|param| ShortcutParameter::resolve(&ctx.store, param, &mut ctx.logger))
        .collect();
    if kind != QueryType::Insert {
        for param in params.iter().filter(|p| p.primary_key.is_empty()) {
            ctx.logger
                .e(messages::shortcut_entity_without_primary_key(&param.entity, kind.name()));
        }
    }

    let entity_params = match method.params.as_slice() {
        [only] if only.ty.is_vec() => EntityParams::OneCollection,
        [_] => EntityParams::One,
        _ => EntityParams::Several,
    };
    let binder = resolve_prepared_binder(
        ctx,
        method,
        WriteTarget::Entities {
            kind,
            params: entity_params,
        },
    );
    if binder.adapter().is_none() {
        ctx.logger.e(messages::cannot_find_shortcut_result_adapter(
            &method.returns.to_string(),
            kind.name(),
        ));
    }

    if ctx.logger.error_count() > errors_before {
        debug!(method = %method.name, "shortcut method has errors, not emitted");
        return None;
    }
    Some(ShortcutMethod {
        name: method.name.clone(),
        kind,
        on_conflict: method.on_conflict,
        returns: method.returns.clone(),
        params,
        binder,
    })
}

impl ShortcutMethod {
    pub fn write(&self, dao: &mut DaoWriter) {
        let writer = ShortcutWriter::new(self.kind, self.on_conflict, &self.params);
        let mut scope = CodeGenScope::new(dao.class_writer());
        let prepare: &PrepareStatement<'_> = &|scope| writer.prepare(scope);
        self.binder.execute_and_return(prepare, &mut scope);
        let body = scope.generate();
        let params: Vec<(String, TypeRef)> = self.params.iter().map(|p| (p.name.clone(), p.ty.clone())).collect();
        dao.add_method(MethodSpec {
            name: self.name.clone(),
            signature: signature(&params, &self.binder.return_type(&self.returns)),
            body,
            is_async: self.binder.is_async(),
        });
    }
}
