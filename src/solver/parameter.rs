use crate::model::TypeRef;
use crate::writer::CodeGenScope;

use super::types::StatementValueBinder;

/// A method parameter with its resolved binding, if any.
#[derive(Clone)]
pub struct QueryParameter {
    pub name: String,
    /// Name used by `:name` placeholders.
    pub sql_name: String,
    pub ty: TypeRef,
    pub adapter: Option<QueryParameterAdapter>,
}

/// Binds one method parameter to one or more `?` placeholders.
#[derive(Clone)]
pub enum QueryParameterAdapter {
    Basic { binder: StatementValueBinder },
    /// A `Vec<T>` parameter, expanded to one placeholder per element.
    Collection { binder: StatementValueBinder },
}

impl QueryParameterAdapter {
    pub fn is_multiple(&self) -> bool {
        matches!(self, QueryParameterAdapter::Collection { .. })
    }

    pub fn element_type(&self) -> &TypeRef {
        match self {
            QueryParameterAdapter::Basic { binder } | QueryParameterAdapter::Collection { binder } => {
                binder.type_ref()
            }
        }
    }

    /// Number of placeholders `value` expands to.
    pub fn size_expr(&self, value: &str) -> String {
        match self {
            QueryParameterAdapter::Basic { .. } => "1".to_string(),
            QueryParameterAdapter::Collection { .. } => format!("{value}.len()"),
        }
    }

    /// Binds `value` at the constant placeholder `index`.
    pub fn bind_at(&self, statement: &str, index: usize, value: &str, scope: &mut CodeGenScope<'_>) {
        match self {
            QueryParameterAdapter::Basic { binder } => {
                binder.bind_to_stmt(statement, &index.to_string(), value, scope);
            }
            QueryParameterAdapter::Collection { .. } => {
                let counter = scope.tmp_var("arg_index");
                scope
                    .builder()
                    .add_statement(format!("let mut {counter}: usize = {index}"));
                self.bind_running(statement, &counter, value, scope);
            }
        }
    }

    /// Binds `value` starting at the mutable counter `index_var`, advancing it.
    pub fn bind_running(&self, statement: &str, index_var: &str, value: &str, scope: &mut CodeGenScope<'_>) {
        match self {
            QueryParameterAdapter::Basic { binder } => {
                binder.bind_to_stmt(statement, index_var, value, scope);
                scope.builder().add_statement(format!("{index_var} += 1"));
            }
            QueryParameterAdapter::Collection { binder } => {
                let item = scope.tmp_var("item");
                let body = scope.fork(|child| {
                    binder.bind_to_stmt(statement, index_var, &item, child);
                    child.builder().add_statement(format!("{index_var} += 1"));
                });
                scope
                    .builder()
                    .begin_control_flow(format!("for {item} in {value}.iter().cloned()"))
                    .add_code(&body)
                    .end_control_flow();
            }
        }
    }
}
