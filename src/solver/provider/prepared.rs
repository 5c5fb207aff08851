use crate::abi;
use crate::config::Library;
use crate::context::Context;
use crate::model::TypeRef;

use super::super::binder::{
    GuavaPreparedQueryResultBinder, InstantPreparedQueryResultBinder, PreparedQueryResultBinder,
    RxPreparedQueryResultBinder,
};
use super::super::prepared::WriteTarget;
use super::super::rx_types::{RxKind, RxType};
use super::{PreparedQueryResultBinderProvider, ProviderPriority};

/// Rx `Single<T>`, `Maybe<T>` and `Completable` for write queries.
pub struct RxPreparedQueryResultBinderProvider {
    rx_type: RxType,
    priority: ProviderPriority,
    name: String,
}

impl RxPreparedQueryResultBinderProvider {
    pub fn new(rx_type: RxType, priority: ProviderPriority) -> Self {
        let name = rx_type.path().trim_start_matches("daoc_runtime::").to_string();
        Self {
            rx_type,
            priority,
            name,
        }
    }
}

impl PreparedQueryResultBinderProvider for RxPreparedQueryResultBinderProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> ProviderPriority {
        self.priority
    }

    fn matches(&self, ty: &TypeRef, ctx: &mut Context<'_>) -> bool {
        ctx.environment().has_library(self.rx_type.version.library()) && self.rx_type.matches(ty)
    }

    fn provide(&self, ty: &TypeRef, target: WriteTarget, ctx: &mut Context<'_>) -> Box<dyn PreparedQueryResultBinder> {
        let value = match self.rx_type.kind {
            RxKind::Completable => TypeRef::unit(),
            _ => ty.single_arg().cloned().unwrap_or_else(TypeRef::unit),
        };
        let adapter = ctx.store.find_prepared_query_result_adapter(&value, target);
        Box::new(RxPreparedQueryResultBinder::new(self.rx_type, adapter))
    }
}

pub struct GuavaPreparedQueryResultBinderProvider;

impl PreparedQueryResultBinderProvider for GuavaPreparedQueryResultBinderProvider {
    fn name(&self) -> &str {
        "ListenableFuture"
    }

    fn priority(&self) -> ProviderPriority {
        ProviderPriority::GUAVA_PREPARED
    }

    fn matches(&self, ty: &TypeRef, ctx: &mut Context<'_>) -> bool {
        ctx.environment().has_library(Library::Guava)
            && ty.args().len() == 1
            && abi::matches_path(ty, abi::guava::LISTENABLE_FUTURE)
    }

    fn provide(&self, ty: &TypeRef, target: WriteTarget, ctx: &mut Context<'_>) -> Box<dyn PreparedQueryResultBinder> {
        let adapter = ty
            .single_arg()
            .and_then(|inner| ctx.store.find_prepared_query_result_adapter(inner, target));
        Box::new(GuavaPreparedQueryResultBinder::new(adapter))
    }
}

pub struct InstantPreparedQueryResultBinderProvider;

impl PreparedQueryResultBinderProvider for InstantPreparedQueryResultBinderProvider {
    fn name(&self) -> &str {
        "instant"
    }

    fn priority(&self) -> ProviderPriority {
        ProviderPriority::INSTANT
    }

    fn matches(&self, _ty: &TypeRef, _ctx: &mut Context<'_>) -> bool {
        true
    }

    fn provide(&self, ty: &TypeRef, target: WriteTarget, ctx: &mut Context<'_>) -> Box<dyn PreparedQueryResultBinder> {
        let adapter = ctx.store.find_prepared_query_result_adapter(ty, target);
        Box::new(InstantPreparedQueryResultBinder::new(adapter))
    }
}
