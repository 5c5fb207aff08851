use std::collections::BTreeSet;

use crate::abi;
use crate::model::TypeRef;
use crate::writer::CodeGenScope;

use super::super::result::QueryResultAdapter;
use super::{capture_receiver, empty_policy, BinderStrategy, QueryResultBinder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingKind {
    /// `PositionalDataSource<T>` or `DataSource<i32, T>`.
    DataSource,
    /// `DataSourceFactory<i32, T>`, building a fresh data source per generation.
    DataSourceFactory,
    /// `PagingSource<i32, T>`.
    PagingSource,
}

/// Limit/offset paging over the query; each page is converted with a list
/// adapter for the element type.
pub struct PagingQueryResultBinder {
    kind: PagingKind,
    tables: BTreeSet<String>,
    adapter: Option<QueryResultAdapter>,
}

impl PagingQueryResultBinder {
    pub fn new(kind: PagingKind, tables: BTreeSet<String>, adapter: Option<QueryResultAdapter>) -> Self {
        Self { kind, tables, adapter }
    }

    /// `move |_cursor: &Cursor| -> Result<Vec<T>> { .. }`, converting one page.
    fn write_page_converter(
        &self,
        adapter: &QueryResultAdapter,
        header_prefix: &str,
        suffix: &str,
        receiver: &str,
        scope: &mut CodeGenScope<'_>,
    ) {
        let cursor = scope.tmp_var("cursor");
        let out_ty = adapter.out_type();
        let body = scope.fork_as(receiver, |child| {
            let result = child.tmp_var("result");
            adapter.convert(&result, &cursor, child);
            child.builder().add_line(format!("Ok({result})"));
        });
        scope
            .builder()
            .begin_control_flow(format!(
                "{header_prefix}move |{cursor}: &{}| -> {}<{out_ty}>",
                abi::CURSOR,
                abi::RESULT
            ))
            .add_code(&body)
            .end_control_flow_with(suffix);
    }
}

impl QueryResultBinder for PagingQueryResultBinder {
    fn adapter(&self) -> Option<&QueryResultAdapter> {
        self.adapter.as_ref()
    }

    fn strategy(&self) -> BinderStrategy {
        BinderStrategy::observing(self.tables.clone(), empty_policy(self.adapter.as_ref()))
    }

    fn return_type(&self, declared: &TypeRef) -> String {
        declared.to_string()
    }

    fn convert_and_return(&self, statement: &str, in_transaction: bool, scope: &mut CodeGenScope<'_>) {
        let Some(adapter) = &self.adapter else {
            return;
        };
        if self.tables.is_empty() {
            return;
        }
        let tables = abi::table_array(&self.tables);
        let this = capture_receiver(scope);
        let db = scope.db();
        match self.kind {
            PagingKind::DataSource => {
                let prefix = format!(
                    "{}::new({db}.clone(), {statement}, {in_transaction}, {tables}, ",
                    abi::paging::LIMIT_OFFSET_DATA_SOURCE
                );
                self.write_page_converter(adapter, &prefix, ").into()", &this, scope);
            }
            PagingKind::DataSourceFactory => {
                let source_this = scope.tmp_var("this");
                let inner = scope.fork(|child| {
                    child
                        .builder()
                        .add_statement(format!("let {source_this} = {this}.clone()"));
                    let prefix = format!(
                        "{}::new({this}.db.clone(), {statement}.clone(), {in_transaction}, {tables}, ",
                        abi::paging::LIMIT_OFFSET_DATA_SOURCE
                    );
                    self.write_page_converter(adapter, &prefix, ")", &source_this, child);
                });
                scope
                    .builder()
                    .begin_control_flow(format!("{}::new(move ||", abi::paging::DATA_SOURCE_FACTORY))
                    .add_code(&inner)
                    .end_control_flow_with(")");
            }
            PagingKind::PagingSource => {
                let prefix = format!(
                    "{}::new({statement}, {db}.clone(), {tables}, ",
                    abi::paging::LIMIT_OFFSET_PAGING_SOURCE
                );
                self.write_page_converter(adapter, &prefix, ").into()", &this, scope);
            }
        }
    }
}
