use std::collections::BTreeSet;

use crate::abi;
use crate::config::Library;
use crate::context::Context;
use crate::diagnostics::messages;
use crate::model::TypeRef;
use crate::sql::ParsedQuery;

use super::super::binder::{CoroutineFlowResultBinder, LiveDataQueryResultBinder, QueryResultBinder, RxQueryResultBinder};
use super::super::result::QueryResultAdapter;
use super::super::rx_types::RxType;
use super::{ProviderPriority, QueryResultBinderProvider};

/// Tables an observing binder registers: those the rows are read from plus
/// those the query names. Logs once when there is nothing to observe.
pub(crate) fn observed_tables(
    adapter: Option<&QueryResultAdapter>,
    query: &ParsedQuery,
    ctx: &mut Context<'_>,
) -> BTreeSet<String> {
    let mut tables = adapter.map(QueryResultAdapter::accessed_tables).unwrap_or_default();
    tables.extend(query.table_names());
    if tables.is_empty() {
        ctx.logger.e(messages::OBSERVABLE_QUERY_NOTHING_TO_OBSERVE);
    }
    tables
}

/// The adapter for the single type argument of an observable, and the
/// tables it observes.
fn resolve_observed(
    ty: &TypeRef,
    query: &ParsedQuery,
    ctx: &mut Context<'_>,
) -> (Option<QueryResultAdapter>, BTreeSet<String>) {
    let adapter = ty
        .single_arg()
        .and_then(|inner| ctx.find_query_result_adapter(inner, query));
    let tables = observed_tables(adapter.as_ref(), query, ctx);
    (adapter, tables)
}

pub struct LiveDataQueryResultBinderProvider;

impl QueryResultBinderProvider for LiveDataQueryResultBinderProvider {
    fn name(&self) -> &str {
        "LiveData"
    }

    fn priority(&self) -> ProviderPriority {
        ProviderPriority::LIVE_DATA
    }

    fn matches(&self, ty: &TypeRef, ctx: &mut Context<'_>) -> bool {
        ctx.environment().has_library(Library::Lifecycle)
            && ty.args().len() == 1
            && abi::matches_path(ty, abi::lifecycle::LIVE_DATA)
    }

    fn provide(&self, ty: &TypeRef, query: &ParsedQuery, ctx: &mut Context<'_>) -> Box<dyn QueryResultBinder> {
        let (adapter, tables) = resolve_observed(ty, query, ctx);
        Box::new(LiveDataQueryResultBinder::new(tables, adapter))
    }
}

pub struct RxQueryResultBinderProvider {
    rx_type: RxType,
    priority: ProviderPriority,
    name: String,
}

impl RxQueryResultBinderProvider {
    pub fn new(rx_type: RxType, priority: ProviderPriority) -> Self {
        let name = rx_type.path().trim_start_matches("daoc_runtime::").to_string();
        Self {
            rx_type,
            priority,
            name,
        }
    }
}

impl QueryResultBinderProvider for RxQueryResultBinderProvider {
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
        let (adapter, tables) = resolve_observed(ty, query, ctx);
        Box::new(RxQueryResultBinder::new(self.rx_type, tables, adapter))
    }
}

/// `Flow<T>`. Channel types are recognised only to be rejected.
pub struct FlowQueryResultBinderProvider;

impl QueryResultBinderProvider for FlowQueryResultBinderProvider {
    fn name(&self) -> &str {
        "Flow"
    }

    fn priority(&self) -> ProviderPriority {
        ProviderPriority::FLOW
    }

    fn matches(&self, ty: &TypeRef, ctx: &mut Context<'_>) -> bool {
        if !ctx.environment().has_library(Library::Coroutines) || ty.args().len() != 1 {
            return false;
        }
        if abi::coroutines::CHANNEL_TYPES.contains(&ty.simple_name()) {
            ctx.logger.e(messages::invalid_channel_type(ty.name()));
            return false;
        }
        abi::matches_path(ty, abi::coroutines::FLOW)
    }

    fn provide(&self, ty: &TypeRef, query: &ParsedQuery, ctx: &mut Context<'_>) -> Box<dyn QueryResultBinder> {
        let (adapter, tables) = resolve_observed(ty, query, ctx);
        Box::new(CoroutineFlowResultBinder::new(tables, adapter))
    }
}
