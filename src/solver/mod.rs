/// Type resolution for query methods: from a declared Rust type to the
/// adapters and binders that generate its code.
pub mod binder;
mod parameter;
mod prepared;
pub mod provider;
mod relation;
mod result;
mod row;
mod shortcut;
pub mod rx_types;
mod store;
mod transaction;
pub mod types;

pub use binder::{EntityStatement, PreparedQueryResultBinder, PreparedStatementSource, QueryResultBinder};
pub use parameter::{QueryParameter, QueryParameterAdapter};
pub use prepared::{EntityParams, PreparedQueryResultAdapter, WriteTarget};
pub use provider::{
    PreparedQueryResultBinderProvider, ProviderPriority, ProviderRegistry, QueryResultBinderProvider,
    RequireArtifact,
};
pub use relation::{RelationCollector, RelationElement};
pub use result::{EmptyResult, EmptyResultPolicy, QueryResultAdapter};
pub use row::{EntityRowAdapter, PojoRowAdapter, RowAdapter};
pub use shortcut::{ShortcutColumn, ShortcutParameter};
pub use store::TypeAdapterStore;
pub use transaction::{is_deferred_type, TransactionMethodAdapter, TransactionMethodBinder};
