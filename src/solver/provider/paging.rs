use crate::abi;
use crate::config::Library;
use crate::context::Context;
use crate::diagnostics::messages;
use crate::model::{Primitive, TypeRef};
use crate::sql::ParsedQuery;

use super::super::binder::{PagingKind, PagingQueryResultBinder, QueryResultBinder};
use super::observable::observed_tables;
use super::{ProviderPriority, QueryResultBinderProvider};

fn is_i32(ty: &TypeRef) -> bool {
    ty.primitive() == Some(Primitive::I32)
}

/// Resolves a list adapter for `value` and builds the paging binder.
fn provide_paging(
    kind: PagingKind,
    value: Option<&TypeRef>,
    query: &ParsedQuery,
    ctx: &mut Context<'_>,
) -> Box<dyn QueryResultBinder> {
    let adapter = value.and_then(|value| ctx.find_query_result_adapter(&TypeRef::vec_of(value.clone()), query));
    let tables = observed_tables(adapter.as_ref(), query, ctx);
    Box::new(PagingQueryResultBinder::new(kind, tables, adapter))
}

/// `PositionalDataSource<T>` and `DataSource<i32, T>`.
pub struct DataSourceQueryResultBinderProvider;

impl QueryResultBinderProvider for DataSourceQueryResultBinderProvider {
    fn name(&self) -> &str {
        "DataSource"
    }

    fn priority(&self) -> ProviderPriority {
        ProviderPriority::DATA_SOURCE
    }

    fn matches(&self, ty: &TypeRef, ctx: &mut Context<'_>) -> bool {
        if !ctx.environment().has_library(Library::Paging) {
            return false;
        }
        if ty.args().len() == 1 && abi::matches_path(ty, abi::paging::POSITIONAL_DATA_SOURCE) {
            return true;
        }
        if ty.args().len() == 2 && abi::matches_path(ty, abi::paging::DATA_SOURCE) {
            if !is_i32(&ty.args()[0]) {
                ctx.logger.e(messages::PAGING_SPECIFY_DATA_SOURCE_TYPE);
            }
            return true;
        }
        false
    }

    fn provide(&self, ty: &TypeRef, query: &ParsedQuery, ctx: &mut Context<'_>) -> Box<dyn QueryResultBinder> {
        provide_paging(PagingKind::DataSource, ty.args().last(), query, ctx)
    }
}

/// `DataSourceFactory<i32, T>`.
pub struct DataSourceFactoryQueryResultBinderProvider;

impl QueryResultBinderProvider for DataSourceFactoryQueryResultBinderProvider {
    fn name(&self) -> &str {
        "DataSourceFactory"
    }

    fn priority(&self) -> ProviderPriority {
        ProviderPriority::DATA_SOURCE_FACTORY
    }

    fn matches(&self, ty: &TypeRef, ctx: &mut Context<'_>) -> bool {
        if !ctx.environment().has_library(Library::Paging)
            || ty.args().len() != 2
            || !abi::matches_path(ty, abi::paging::DATA_SOURCE_FACTORY)
        {
            return false;
        }
        if !is_i32(&ty.args()[0]) {
            ctx.logger.e(messages::PAGING_SPECIFY_DATA_SOURCE_TYPE);
        }
        true
    }

    fn provide(&self, ty: &TypeRef, query: &ParsedQuery, ctx: &mut Context<'_>) -> Box<dyn QueryResultBinder> {
        provide_paging(PagingKind::DataSourceFactory, ty.args().last(), query, ctx)
    }
}

/// `PagingSource<i32, T>`.
pub struct PagingSourceQueryResultBinderProvider;

impl QueryResultBinderProvider for PagingSourceQueryResultBinderProvider {
    fn name(&self) -> &str {
        "PagingSource"
    }

    fn priority(&self) -> ProviderPriority {
        ProviderPriority::PAGING_SOURCE
    }

    fn matches(&self, ty: &TypeRef, ctx: &mut Context<'_>) -> bool {
        if !ctx.environment().has_library(Library::Paging)
            || ty.args().len() != 2
            || !abi::matches_path(ty, abi::paging::PAGING_SOURCE)
        {
            return false;
        }
        if !is_i32(&ty.args()[0]) {
            ctx.logger.e(messages::PAGING_SPECIFY_PAGING_SOURCE_TYPE);
        }
        true
    }

    fn provide(&self, ty: &TypeRef, query: &ParsedQuery, ctx: &mut Context<'_>) -> Box<dyn QueryResultBinder> {
        provide_paging(PagingKind::PagingSource, ty.args().last(), query, ctx)
    }
}
