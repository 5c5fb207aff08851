/// Query result binders: how a resolved query runs and hands back its value.
///
/// A binder fixes the four axes of a method: when the query runs (now or
/// on subscription), which tables it observes, what an empty result means,
/// and whether it can be cancelled. Every binder writes the rest of the
/// method body after the statement has been prepared and bound.
mod coroutine;
mod cursor;
mod guava;
mod instant;
mod live_data;
mod paging;
mod prepared;
mod rx;

use std::collections::BTreeSet;

pub use coroutine::{CoroutineFlowResultBinder, CoroutineResultBinder};
pub use cursor::CursorQueryResultBinder;
pub use guava::GuavaListenableFutureQueryResultBinder;
pub use instant::InstantQueryResultBinder;
pub use live_data::LiveDataQueryResultBinder;
pub use paging::{PagingKind, PagingQueryResultBinder};
pub use prepared::{
    CoroutinePreparedQueryResultBinder, GuavaPreparedQueryResultBinder,
    EntityStatement, InstantPreparedQueryResultBinder, PrepareStatement, PreparedQueryResultBinder, PreparedStatementSource,
    RxPreparedQueryResultBinder,
};
pub use rx::{RxCallableQueryResultBinder, RxQueryResultBinder};

use crate::abi;
use crate::model::TypeRef;
use crate::writer::CodeGenScope;

use super::result::{EmptyResultPolicy, QueryResultAdapter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timing {
    /// The query runs inside the generated method.
    Immediate,
    /// The method returns a value that runs the query later, possibly again.
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinderStrategy {
    pub timing: Timing,
    /// Tables registered with the invalidation tracker, for observing binders.
    pub observed_tables: Option<BTreeSet<String>>,
    pub empty_result: EmptyResultPolicy,
    pub cancellable: bool,
}

impl BinderStrategy {
    pub fn immediate(empty_result: EmptyResultPolicy) -> Self {
        Self {
            timing: Timing::Immediate,
            observed_tables: None,
            empty_result,
            cancellable: false,
        }
    }

    pub fn deferred(empty_result: EmptyResultPolicy) -> Self {
        Self {
            timing: Timing::Deferred,
            ..Self::immediate(empty_result)
        }
    }

    pub fn observing(tables: BTreeSet<String>, empty_result: EmptyResultPolicy) -> Self {
        Self {
            observed_tables: Some(tables),
            ..Self::deferred(empty_result)
        }
    }

    pub fn cancellable(mut self) -> Self {
        self.cancellable = true;
        self
    }

    pub fn is_deferred(&self) -> bool {
        self.timing == Timing::Deferred
    }
}

pub trait QueryResultBinder {
    fn adapter(&self) -> Option<&QueryResultAdapter>;

    fn strategy(&self) -> BinderStrategy;

    /// The generated method's return type for a declared return type.
    fn return_type(&self, declared: &TypeRef) -> String {
        format!("{}<{declared}>", abi::RESULT)
    }

    fn is_async(&self) -> bool {
        false
    }

    /// Whether a missing adapter means the return type is unsupported.
    fn requires_adapter(&self) -> bool {
        true
    }

    /// Writes everything after binding: runs `statement` and returns the
    /// value. The last line written is the method's tail expression.
    fn convert_and_return(&self, statement: &str, in_transaction: bool, scope: &mut CodeGenScope<'_>);
}

fn empty_policy(adapter: Option<&QueryResultAdapter>) -> EmptyResultPolicy {
    adapter.map_or(EmptyResultPolicy::Error, QueryResultAdapter::empty_result_policy)
}

/// Runs the query and converts the cursor; the last line is a
/// `Result<T>` tail expression.
///
/// The cursor sits in a [`abi::CURSOR_GUARD`] so it is closed on every exit
/// path. With `in_transaction` a [`abi::TRANSACTION_GUARD`] is taken first
/// and dropped last.
pub(crate) fn write_query_and_convert(
    adapter: &QueryResultAdapter,
    statement: &str,
    cancellation: Option<&str>,
    in_transaction: bool,
    scope: &mut CodeGenScope<'_>,
) {
    let db = scope.db();
    let signal = cancellation.map_or("None".to_string(), |s| format!("Some(&{s})"));
    if in_transaction {
        begin_transaction(&db, scope);
    }
    let cursor = scope.tmp_var("cursor");
    let result = scope.tmp_var("result");
    scope.builder().add_statement(format!(
        "let {cursor} = {}::new(db_util::query(&{db}, &{statement}, false, {signal})?)",
        abi::CURSOR_GUARD
    ));
    adapter.convert(&result, &cursor, scope);
    if in_transaction {
        scope
            .builder()
            .add_statement(format!("{db}.set_transaction_successful()"));
    }
    scope.builder().add_line(format!("Ok({result})"));
}

/// `let _transaction = TransactionGuard::begin(&db);`, ending the
/// transaction when the enclosing block exits.
pub(crate) fn begin_transaction(db: &str, scope: &mut CodeGenScope<'_>) -> String {
    let transaction = scope.tmp_var("transaction");
    scope.builder().add_statement(format!(
        "let {transaction} = {}::begin(&{db})",
        abi::TRANSACTION_GUARD
    ));
    transaction
}

/// `let _this = <receiver>.clone();` for code that outlives the method call.
pub(crate) fn capture_receiver(scope: &mut CodeGenScope<'_>) -> String {
    let this = scope.tmp_var("this");
    let receiver = scope.receiver().to_string();
    scope
        .builder()
        .add_statement(format!("let {this} = {receiver}.clone()"));
    this
}

/// Writes `<call_prefix>move || -> Result<T> { body }<suffix>`, where the
/// body runs the query through the captured receiver.
pub(crate) fn write_deferred_query(
    call_prefix: &str,
    suffix: &str,
    adapter: &QueryResultAdapter,
    statement: &str,
    cancellation: Option<&str>,
    in_transaction: bool,
    scope: &mut CodeGenScope<'_>,
) {
    let this = capture_receiver(scope);
    let out_ty = adapter.out_type();
    let body = scope.fork_as(&this, |child| {
        write_query_and_convert(adapter, statement, cancellation, in_transaction, child)
    });
    scope
        .builder()
        .begin_control_flow(format!("{call_prefix}move || -> {}<{out_ty}>", abi::RESULT))
        .add_code(&body)
        .end_control_flow_with(suffix);
}

/// `let _cancellation_signal = db_util::create_cancellation_signal();`
pub(crate) fn create_cancellation_signal(scope: &mut CodeGenScope<'_>) -> String {
    let signal = scope.tmp_var("cancellation_signal");
    scope
        .builder()
        .add_statement(format!("let {signal} = db_util::create_cancellation_signal()"));
    signal
}
