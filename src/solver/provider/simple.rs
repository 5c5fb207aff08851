use crate::abi;
use crate::config::Library;
use crate::context::Context;
use crate::model::TypeRef;
use crate::sql::ParsedQuery;

use super::super::binder::{
    CursorQueryResultBinder, GuavaListenableFutureQueryResultBinder, InstantQueryResultBinder, QueryResultBinder,
    RxCallableQueryResultBinder,
};
use super::super::rx_types::{RxKind, RxType};
use super::{ProviderPriority, QueryResultBinderProvider};

pub struct CursorQueryResultBinderProvider;

impl QueryResultBinderProvider for CursorQueryResultBinderProvider {
    fn name(&self) -> &str {
        "Cursor"
    }

    fn priority(&self) -> ProviderPriority {
        ProviderPriority::CURSOR
    }

    fn matches(&self, ty: &TypeRef, _ctx: &mut Context<'_>) -> bool {
        ty.args().is_empty() && abi::matches_path(ty, "daoc_runtime::Cursor")
    }

    fn provide(&self, _ty: &TypeRef, _query: &ParsedQuery, _ctx: &mut Context<'_>) -> Box<dyn QueryResultBinder> {
        Box::new(CursorQueryResultBinder)
    }
}

pub struct GuavaListenableFutureQueryResultBinderProvider;

impl QueryResultBinderProvider for GuavaListenableFutureQueryResultBinderProvider {
    fn name(&self) -> &str {
        "ListenableFuture"
    }

    fn priority(&self) -> ProviderPriority {
        ProviderPriority::GUAVA
    }

    fn matches(&self, ty: &TypeRef, ctx: &mut Context<'_>) -> bool {
        ctx.environment().has_library(Library::Guava)
            && ty.args().len() == 1
            && abi::matches_path(ty, abi::guava::LISTENABLE_FUTURE)
    }

    fn provide(&self, ty: &TypeRef, query: &ParsedQuery, ctx: &mut Context<'_>) -> Box<dyn QueryResultBinder> {
        let adapter = ty
            .single_arg()
            .and_then(|inner| ctx.find_query_result_adapter(inner, query));
        Box::new(GuavaListenableFutureQueryResultBinder::new(adapter))
    }
}

/// Rx `Single<T>` and `Maybe<T>`; `Maybe` reads `Option<T>` so an empty
/// cursor completes without a value.
pub struct RxCallableQueryResultBinderProvider {
    rx_type: RxType,
    priority: ProviderPriority,
    name: String,
}

impl RxCallableQueryResultBinderProvider {
    pub fn new(rx_type: RxType, priority: ProviderPriority) -> Self {
        let name = rx_type.path().trim_start_matches("daoc_runtime::").to_string();
        Self {
            rx_type,
            priority,
            name,
        }
    }
}

impl QueryResultBinderProvider for RxCallableQueryResultBinderProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> ProviderPriority {
        self.priority
    }

    fn matches(&self, ty: &TypeRef, ctx: &mut Context<'_>) -> bool {
        ctx.environment().has_library(self.rx_type.version.library()) && self.rx_type.matches(ty)
    }

    fn provide(&self, ty: &TypeRef, query: &ParsedQuery, ctx: &mut Context<'_>) -> Box<dyn QueryResultBinder> {
        let adapter = ty.single_arg().and_then(|inner| {
            let read = if self.rx_type.kind == RxKind::Maybe {
                inner.nullable()
            } else {
                inner.clone()
            };
            ctx.find_query_result_adapter(&read, query)
        });
        Box::new(RxCallableQueryResultBinder::new(self.rx_type, adapter))
    }
}

/// Catch-all: the query runs in the method and returns the value itself.
pub struct InstantQueryResultBinderProvider;

impl QueryResultBinderProvider for InstantQueryResultBinderProvider {
    fn name(&self) -> &str {
        "instant"
    }

    fn priority(&self) -> ProviderPriority {
        ProviderPriority::INSTANT
    }

    fn matches(&self, _ty: &TypeRef, _ctx: &mut Context<'_>) -> bool {
        true
    }

    fn provide(&self, ty: &TypeRef, query: &ParsedQuery, ctx: &mut Context<'_>) -> Box<dyn QueryResultBinder> {
        let adapter = ctx.find_query_result_adapter(ty, query);
        Box::new(InstantQueryResultBinder::new(adapter))
    }
}
