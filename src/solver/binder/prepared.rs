use crate::abi;
use crate::model::TypeRef;
use crate::writer::{CodeBlock, CodeGenScope};

use super::super::prepared::PreparedQueryResultAdapter;
use super::super::rx_types::{RxKind, RxType};
use super::capture_receiver;

/// What a write method executes. Shared statements are handed back to
/// their field when the acquired guard drops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreparedStatementSource {
    /// A statement already bound from the method parameters.
    Statement(String),
    /// One statement per entity parameter, bound per entity at execution.
    Entities(Vec<EntityStatement>),
}

/// Statement for one entity parameter of a shortcut method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityStatement {
    pub statement: String,
    pub param: String,
    /// Loop variable when `param` is a `Vec` of entities.
    pub item: Option<String>,
    /// Binds the entity's columns to `statement`.
    pub bind: CodeBlock,
}

/// Writes the statement preparation and binding against a scope.
pub type PrepareStatement<'a> = dyn Fn(&mut CodeGenScope<'_>) -> PreparedStatementSource + 'a;

pub trait PreparedQueryResultBinder {
    fn adapter(&self) -> Option<&PreparedQueryResultAdapter>;

    fn return_type(&self, declared: &TypeRef) -> String {
        format!("{}<{declared}>", abi::RESULT)
    }

    fn is_async(&self) -> bool {
        false
    }

    /// Prepares the statement through `prepare` where the binder runs it,
    /// executes it and returns. The last line is the tail expression.
    fn execute_and_return(&self, prepare: &PrepareStatement<'_>, scope: &mut CodeGenScope<'_>);
}

fn write_execute(adapter: &PreparedQueryResultAdapter, prepare: &PrepareStatement<'_>, scope: &mut CodeGenScope<'_>) {
    let source = prepare(scope);
    adapter.execute_and_return(&source, scope);
}

/// `<prefix>move || -> Result<T> { prepare; execute }<suffix>` through a
/// captured receiver.
fn write_deferred_execute(
    call_prefix: &str,
    suffix: &str,
    adapter: &PreparedQueryResultAdapter,
    prepare: &PrepareStatement<'_>,
    scope: &mut CodeGenScope<'_>,
) {
    let this = capture_receiver(scope);
    let body = scope.fork_as(&this, |child| write_execute(adapter, prepare, child));
    scope
        .builder()
        .begin_control_flow(format!("{call_prefix}move || -> {}<{}>", abi::RESULT, adapter.returns()))
        .add_code(&body)
        .end_control_flow_with(suffix);
}

pub struct InstantPreparedQueryResultBinder {
    adapter: Option<PreparedQueryResultAdapter>,
}

impl InstantPreparedQueryResultBinder {
    pub fn new(adapter: Option<PreparedQueryResultAdapter>) -> Self {
        Self { adapter }
    }
}

impl PreparedQueryResultBinder for InstantPreparedQueryResultBinder {
    fn adapter(&self) -> Option<&PreparedQueryResultAdapter> {
        self.adapter.as_ref()
    }

    fn execute_and_return(&self, prepare: &PrepareStatement<'_>, scope: &mut CodeGenScope<'_>) {
        if let Some(adapter) = &self.adapter {
            write_execute(adapter, prepare, scope);
        }
    }
}

/// Rx `Single`, `Maybe` or `Completable` running the write on subscription.
pub struct RxPreparedQueryResultBinder {
    rx_type: RxType,
    adapter: Option<PreparedQueryResultAdapter>,
}

impl RxPreparedQueryResultBinder {
    pub fn new(rx_type: RxType, adapter: Option<PreparedQueryResultAdapter>) -> Self {
        Self { rx_type, adapter }
    }
}

impl PreparedQueryResultBinder for RxPreparedQueryResultBinder {
    fn adapter(&self) -> Option<&PreparedQueryResultAdapter> {
        self.adapter.as_ref()
    }

    fn return_type(&self, declared: &TypeRef) -> String {
        declared.to_string()
    }

    fn execute_and_return(&self, prepare: &PrepareStatement<'_>, scope: &mut CodeGenScope<'_>) {
        let Some(adapter) = &self.adapter else {
            return;
        };
        let factory = self.rx_type.factory();
        if self.rx_type.kind != RxKind::Maybe {
            write_deferred_execute(&format!("{factory}("), ")", adapter, prepare, scope);
            return;
        }
        // Maybe completes empty on `None`; a write always produces a value.
        let this = capture_receiver(scope);
        let value = scope.tmp_var("value");
        let body = scope.fork_as(&this, |child| write_execute(adapter, prepare, child));
        let returns = adapter.returns();
        scope
            .builder()
            .begin_control_flow(format!("{factory}(move || -> {}<Option<{returns}>>", abi::RESULT))
            .begin_control_flow(format!("let {value} ="))
            .add_code(&body)
            .end_control_flow_with(";")
            .add_line(format!("{value}.map(Some)"))
            .end_control_flow_with(")");
    }
}

pub struct GuavaPreparedQueryResultBinder {
    adapter: Option<PreparedQueryResultAdapter>,
}

impl GuavaPreparedQueryResultBinder {
    pub fn new(adapter: Option<PreparedQueryResultAdapter>) -> Self {
        Self { adapter }
    }
}

impl PreparedQueryResultBinder for GuavaPreparedQueryResultBinder {
    fn adapter(&self) -> Option<&PreparedQueryResultAdapter> {
        self.adapter.as_ref()
    }

    fn return_type(&self, declared: &TypeRef) -> String {
        declared.to_string()
    }

    fn execute_and_return(&self, prepare: &PrepareStatement<'_>, scope: &mut CodeGenScope<'_>) {
        let Some(adapter) = &self.adapter else {
            return;
        };
        let db = scope.db();
        let prefix = format!("{}::create_listenable_future_callable({db}.clone(), ", abi::guava::GUAVA_DAOC);
        write_deferred_execute(&prefix, ")", adapter, prepare, scope);
    }
}

/// Body of an `async fn` awaiting the write.
pub struct CoroutinePreparedQueryResultBinder {
    adapter: Option<PreparedQueryResultAdapter>,
}

impl CoroutinePreparedQueryResultBinder {
    pub fn new(adapter: Option<PreparedQueryResultAdapter>) -> Self {
        Self { adapter }
    }
}

impl PreparedQueryResultBinder for CoroutinePreparedQueryResultBinder {
    fn adapter(&self) -> Option<&PreparedQueryResultAdapter> {
        self.adapter.as_ref()
    }

    fn is_async(&self) -> bool {
        true
    }

    fn execute_and_return(&self, prepare: &PrepareStatement<'_>, scope: &mut CodeGenScope<'_>) {
        let Some(adapter) = &self.adapter else {
            return;
        };
        let db = scope.db();
        let prefix = format!(
            "{}::execute_callable({db}.clone(), true, ",
            abi::coroutines::COROUTINES_DAOC
        );
        write_deferred_execute(&prefix, ").await", adapter, prepare, scope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::prepared::WriteTarget;
    use crate::solver::rx_types::RxVersion;
    use crate::sql::QueryType;
    use crate::writer::ClassWriter;

    fn prepare(scope: &mut CodeGenScope<'_>) -> PreparedStatementSource {
        let receiver = scope.receiver().to_string();
        scope
            .builder()
            .add_statement(format!("let mut _stmt = {receiver}.__prepared_stmt_of_delete.acquire()"));
        PreparedStatementSource::Statement("_stmt".into())
    }

    fn adapter(ty: &str, kind: QueryType) -> Option<PreparedQueryResultAdapter> {
        PreparedQueryResultAdapter::create(&TypeRef::parse(ty).unwrap(), WriteTarget::Query(kind))
    }

    #[test]
    fn test_instant_prepares_in_place() {
        let binder = InstantPreparedQueryResultBinder::new(adapter("i32", QueryType::Delete));
        let mut writer = ClassWriter::new("Dao");
        let mut scope = CodeGenScope::new(&mut writer);
        binder.execute_and_return(&prepare, &mut scope);
        let code = scope.generate().to_string();
        assert!(code.starts_with("let mut _stmt = self.__prepared_stmt_of_delete.acquire();\n"));
        assert!(code.contains("let _result = _stmt.execute_update_delete()?;"));
        assert!(code.ends_with("self.db.set_transaction_successful();\nOk(_result)\n"));
        assert!(!code.contains("release"));
    }

    #[test]
    fn test_rx_completable_prepares_inside_closure() {
        let binder = RxPreparedQueryResultBinder::new(
            RxType::new(RxVersion::Two, RxKind::Completable),
            adapter("()", QueryType::Delete),
        );
        let mut writer = ClassWriter::new("Dao");
        let mut scope = CodeGenScope::new(&mut writer);
        binder.execute_and_return(&prepare, &mut scope);
        let code = scope.generate().to_string();
        assert!(code.contains("daoc_runtime::rx2::RxDaoc::create_completable(move || -> daoc_runtime::Result<()> {"));
        assert!(code.contains("let mut _stmt = _this.__prepared_stmt_of_delete.acquire();"));
        assert!(code.contains("_stmt.execute()?;"));
    }

    #[test]
    fn test_rx_maybe_wraps_value() {
        let binder = RxPreparedQueryResultBinder::new(
            RxType::new(RxVersion::Three, RxKind::Maybe),
            adapter("i64", QueryType::Insert),
        );
        let mut writer = ClassWriter::new("Dao");
        let mut scope = CodeGenScope::new(&mut writer);
        binder.execute_and_return(&prepare, &mut scope);
        let code = scope.generate().to_string();
        assert!(code.contains("create_maybe(move || -> daoc_runtime::Result<Option<i64>> {"));
        assert!(code.contains("_value.map(Some)"));
    }

    #[test]
    fn test_coroutine_awaits() {
        let binder = CoroutinePreparedQueryResultBinder::new(adapter("()", QueryType::Update));
        assert!(binder.is_async());
        let mut writer = ClassWriter::new("Dao");
        let mut scope = CodeGenScope::new(&mut writer);
        binder.execute_and_return(&prepare, &mut scope);
        let code = scope.generate().to_string();
        assert!(code.contains("CoroutinesDaoc::execute_callable(self.db.clone(), true, move ||"));
        assert!(code.ends_with("}).await\n"));
    }
}
