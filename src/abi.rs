/// Names in the runtime crate that generated code links against.
///
/// Generated files import the core items once (see [`PRELUDE`]); library
/// helpers are referenced by full path so a DAO only depends on the
/// libraries it actually uses.

pub const PRELUDE: &[&str] = &[
    "use std::collections::HashMap;",
    "use std::sync::Arc;",
    "",
    "use daoc_runtime::prelude::*;",
    "use daoc_runtime::{db_util, string_util, Cursor, CursorGuard, Database, Error, SharedSqlStatement, SqlQuery, TransactionGuard};",
    "",
    "use super::*;",
];

pub const DATABASE: &str = "Database";
pub const RESULT: &str = "daoc_runtime::Result";
pub const CURSOR: &str = "Cursor";
pub const SQL_QUERY: &str = "SqlQuery";
pub const SHARED_STATEMENT: &str = "SharedSqlStatement";
/// Closes the wrapped cursor when dropped, including during unwinding.
pub const CURSOR_GUARD: &str = "CursorGuard";
/// `TransactionGuard::begin(&db)` begins a transaction; dropping the guard
/// ends it, committing only if `set_transaction_successful` ran first.
pub const TRANSACTION_GUARD: &str = "TransactionGuard";
pub const EMPTY_RESULT_ERROR: &str = "Error::EmptyResultSet";
pub const OPTIONAL: &str = "daoc_runtime::Optional";

pub mod lifecycle {
    pub const LIVE_DATA: &str = "daoc_runtime::lifecycle::LiveData";
}

pub mod paging {
    pub const POSITIONAL_DATA_SOURCE: &str = "daoc_runtime::paging::PositionalDataSource";
    pub const DATA_SOURCE: &str = "daoc_runtime::paging::DataSource";
    pub const DATA_SOURCE_FACTORY: &str = "daoc_runtime::paging::DataSourceFactory";
    pub const PAGING_SOURCE: &str = "daoc_runtime::paging::PagingSource";
    pub const LIMIT_OFFSET_DATA_SOURCE: &str = "daoc_runtime::paging::LimitOffsetDataSource";
    pub const LIMIT_OFFSET_PAGING_SOURCE: &str = "daoc_runtime::paging::LimitOffsetPagingSource";
}

pub mod guava {
    pub const LISTENABLE_FUTURE: &str = "daoc_runtime::guava::ListenableFuture";
    pub const GUAVA_DAOC: &str = "daoc_runtime::guava::GuavaDaoc";
}

pub mod coroutines {
    pub const FLOW: &str = "daoc_runtime::coroutines::Flow";
    pub const COROUTINES_DAOC: &str = "daoc_runtime::coroutines::CoroutinesDaoc";
    pub const CHANNEL_TYPES: &[&str] = &["Channel", "SendChannel", "ReceiveChannel"];
}

/// Rx helpers live in `daoc_runtime::rx2` and `daoc_runtime::rx3`.
pub mod rx {
    pub const RX_DAOC: &str = "RxDaoc";
}

/// Whether `ty` names the library type at `path`.
///
/// Declarations may spell a library type by its full path, by any suffix of
/// it (`rx2::Flowable`), or by its bare name.
pub fn matches_path(ty: &crate::model::TypeRef, path: &str) -> bool {
    let name = ty.name();
    name == path || path.ends_with(&format!("::{name}"))
}

/// `daoc_runtime::Optional<T>`, the runtime's own optional wrapper.
pub fn is_framework_optional(ty: &crate::model::TypeRef) -> bool {
    matches_path(ty, OPTIONAL) && ty.args().len() == 1
}

/// Quoted table names as a `&[..]` literal, e.g. `&["pet", "user"]`.
pub fn table_array<'a>(tables: impl IntoIterator<Item = &'a String>) -> String {
    let quoted: Vec<String> = tables
        .into_iter()
        .map(|t| crate::writer::string_literal(t))
        .collect();
    format!("&[{}]", quoted.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TypeRef;

    #[test]
    fn test_matches_path_suffixes() {
        let full = TypeRef::parse("daoc_runtime::rx2::Flowable<User>").unwrap();
        let short = TypeRef::parse("rx2::Flowable<User>").unwrap();
        let other = TypeRef::parse("rx3::Flowable<User>").unwrap();
        assert!(matches_path(&full, "daoc_runtime::rx2::Flowable"));
        assert!(matches_path(&short, "daoc_runtime::rx2::Flowable"));
        assert!(!matches_path(&other, "daoc_runtime::rx2::Flowable"));
    }

    #[test]
    fn test_framework_optional() {
        assert!(is_framework_optional(&TypeRef::parse("Optional<User>").unwrap()));
        assert!(!is_framework_optional(&TypeRef::parse("Option<User>").unwrap()));
    }
}
