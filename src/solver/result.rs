/// Query result adapters: the shape of everything a cursor yields.
use std::collections::BTreeSet;

use crate::abi;
use crate::model::TypeRef;
use crate::writer::CodeGenScope;

use super::row::RowAdapter;

/// What a single-value query produces when the cursor is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyResult {
    /// Assign a literal such as `None` or `0`.
    Literal(&'static str),
    /// Fail with `Error::EmptyResultSet`.
    Error,
}

/// How a binder behaves when the query returns no rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyResultPolicy {
    EmptyCollection,
    Absent,
    Literal(&'static str),
    Error,
}

pub enum QueryResultAdapter {
    Single { row: RowAdapter, empty: EmptyResult },
    List { row: RowAdapter },
    Optional { row: RowAdapter },
    FrameworkOptional { row: RowAdapter },
}

impl QueryResultAdapter {
    pub fn row(&self) -> &RowAdapter {
        match self {
            QueryResultAdapter::Single { row, .. }
            | QueryResultAdapter::List { row }
            | QueryResultAdapter::Optional { row }
            | QueryResultAdapter::FrameworkOptional { row } => row,
        }
    }

    pub fn out_type(&self) -> TypeRef {
        let row = self.row().out_type().clone();
        match self {
            QueryResultAdapter::Single { .. } => row,
            QueryResultAdapter::List { .. } => TypeRef::vec_of(row),
            QueryResultAdapter::Optional { .. } => TypeRef::option_of(row),
            QueryResultAdapter::FrameworkOptional { .. } => TypeRef::generic(abi::OPTIONAL, vec![row]),
        }
    }

    pub fn accessed_tables(&self) -> BTreeSet<String> {
        self.row().accessed_tables()
    }

    pub fn empty_result_policy(&self) -> EmptyResultPolicy {
        match self {
            QueryResultAdapter::List { .. } => EmptyResultPolicy::EmptyCollection,
            QueryResultAdapter::Optional { .. } | QueryResultAdapter::FrameworkOptional { .. } => {
                EmptyResultPolicy::Absent
            }
            QueryResultAdapter::Single { empty: EmptyResult::Literal(literal), .. } => {
                EmptyResultPolicy::Literal(literal)
            }
            QueryResultAdapter::Single { empty: EmptyResult::Error, .. } => EmptyResultPolicy::Error,
        }
    }

    /// The same adapter, failing instead of defaulting on an empty cursor.
    pub fn with_empty_error(self) -> Self {
        match self {
            QueryResultAdapter::Single { row, .. } => QueryResultAdapter::Single {
                row,
                empty: EmptyResult::Error,
            },
            other => other,
        }
    }

    /// Declares `out` and fills it from every row of `cursor`.
    pub fn convert(&self, out: &str, cursor: &str, scope: &mut CodeGenScope<'_>) {
        let row = self.row();
        let row_ty = row.out_type().clone();
        match self {
            QueryResultAdapter::List { .. } => {
                scope.builder().add_statement(format!(
                    "let mut {out}: Vec<{row_ty}> = Vec::with_capacity({cursor}.count())"
                ));
                let state = row.on_cursor_ready(cursor, scope);
                let item = scope.tmp_var("item");
                scope
                    .builder()
                    .begin_control_flow(format!("while {cursor}.move_to_next()"))
                    .add_statement(format!("let {item}: {row_ty}"));
                row.convert(&item, cursor, &state, scope);
                scope
                    .builder()
                    .add_statement(format!("{out}.push({item})"))
                    .end_control_flow();
            }
            QueryResultAdapter::Single { empty, .. } => {
                scope.builder().add_statement(format!("let {out}: {row_ty}"));
                let state = row.on_cursor_ready(cursor, scope);
                scope
                    .builder()
                    .begin_control_flow(format!("if {cursor}.move_to_first()"));
                row.convert(out, cursor, &state, scope);
                scope.builder().next_control_flow("else");
                match empty {
                    EmptyResult::Literal(literal) => {
                        scope.builder().add_statement(format!("{out} = {literal}"));
                    }
                    EmptyResult::Error => {
                        scope
                            .builder()
                            .add_statement(format!("return Err({})", abi::EMPTY_RESULT_ERROR));
                    }
                }
                scope.builder().end_control_flow();
            }
            QueryResultAdapter::Optional { .. } | QueryResultAdapter::FrameworkOptional { .. } => {
                let (present, absent) = match self {
                    QueryResultAdapter::Optional { .. } => ("Some".to_string(), "None".to_string()),
                    _ => (
                        format!("{}::of", abi::OPTIONAL),
                        format!("{}::empty()", abi::OPTIONAL),
                    ),
                };
                let out_ty = self.out_type();
                scope.builder().add_statement(format!("let {out}: {out_ty}"));
                let state = row.on_cursor_ready(cursor, scope);
                let value = scope.tmp_var("value");
                scope
                    .builder()
                    .begin_control_flow(format!("if {cursor}.move_to_first()"))
                    .add_statement(format!("let {value}: {row_ty}"));
                row.convert(&value, cursor, &state, scope);
                scope
                    .builder()
                    .add_statement(format!("{out} = {present}({value})"))
                    .next_control_flow("else")
                    .add_statement(format!("{out} = {absent}"))
                    .end_control_flow();
            }
        }
    }
}
