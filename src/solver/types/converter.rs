use std::fmt;
use std::rc::Rc;

use crate::model::{ConverterKind, CustomTypeConverter, Primitive, TypeRef};
use crate::writer::{snake_case, ClassWriter, CodeBlock, CodeGenScope, MethodSpec, SharedFieldSpec, SharedMethodSpec};

/// Converts a value of one type into another in generated code.
///
/// `convert` assigns to `output`, which the caller has already declared with
/// type [`to`](TypeConverter::to). `input` is a place of type
/// [`from`](TypeConverter::from) that must stay usable afterwards.
pub trait TypeConverter {
    fn from(&self) -> &TypeRef;
    fn to(&self) -> &TypeRef;
    fn convert(&self, input: &str, output: &str, scope: &mut CodeGenScope<'_>);

    /// Number of user or built-in conversions chained together.
    fn hops(&self) -> usize {
        1
    }

    fn describe(&self) -> String {
        format!("{} -> {}", self.from(), self.to())
    }
}

impl fmt::Debug for dyn TypeConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Identity conversion, used when the source already has the target type.
pub struct NoOpConverter {
    ty: TypeRef,
}

impl NoOpConverter {
    pub fn new(ty: TypeRef) -> Self {
        Self { ty }
    }
}

impl TypeConverter for NoOpConverter {
    fn from(&self) -> &TypeRef {
        &self.ty
    }

    fn to(&self) -> &TypeRef {
        &self.ty
    }

    fn convert(&self, input: &str, output: &str, scope: &mut CodeGenScope<'_>) {
        scope
            .builder()
            .add_statement(format!("{output} = {input}.clone()"));
    }

    fn hops(&self) -> usize {
        0
    }
}

/// `bool` <-> `i32`; booleans are stored as integers.
pub struct PrimitiveBooleanToIntConverter {
    from: TypeRef,
    to: TypeRef,
}

impl PrimitiveBooleanToIntConverter {
    /// Both directions.
    pub fn pair() -> [Rc<dyn TypeConverter>; 2] {
        let b = Primitive::Bool.type_ref();
        let i = Primitive::I32.type_ref();
        [
            Rc::new(Self { from: b.clone(), to: i.clone() }),
            Rc::new(Self { from: i, to: b }),
        ]
    }
}

impl TypeConverter for PrimitiveBooleanToIntConverter {
    fn from(&self) -> &TypeRef {
        &self.from
    }

    fn to(&self) -> &TypeRef {
        &self.to
    }

    fn convert(&self, input: &str, output: &str, scope: &mut CodeGenScope<'_>) {
        let expr = if self.from.primitive() == Some(Primitive::Bool) {
            format!("if {input} {{ 1 }} else {{ 0 }}")
        } else {
            format!("{input} != 0")
        };
        scope.builder().add_statement(format!("{output} = {expr}"));
    }
}

/// `Option<bool>` <-> `Option<i32>`.
pub struct BoxedBooleanToBoxedIntConverter {
    from: TypeRef,
    to: TypeRef,
}

impl BoxedBooleanToBoxedIntConverter {
    pub fn pair() -> [Rc<dyn TypeConverter>; 2] {
        let b = Primitive::Bool.type_ref().nullable();
        let i = Primitive::I32.type_ref().nullable();
        [
            Rc::new(Self { from: b.clone(), to: i.clone() }),
            Rc::new(Self { from: i, to: b }),
        ]
    }
}

impl TypeConverter for BoxedBooleanToBoxedIntConverter {
    fn from(&self) -> &TypeRef {
        &self.from
    }

    fn to(&self) -> &TypeRef {
        &self.to
    }

    fn convert(&self, input: &str, output: &str, scope: &mut CodeGenScope<'_>) {
        let expr = if self.from.non_null().primitive() == Some(Primitive::Bool) {
            format!("{input}.map(|v| if v {{ 1 }} else {{ 0 }})")
        } else {
            format!("{input}.map(|v| v != 0)")
        };
        scope.builder().add_statement(format!("{output} = {expr}"));
    }
}

/// A user-declared conversion method.
pub struct CustomTypeConverterWrapper {
    custom: CustomTypeConverter,
}

impl CustomTypeConverterWrapper {
    pub fn new(custom: CustomTypeConverter) -> Self {
        Self { custom }
    }

    pub fn custom(&self) -> &CustomTypeConverter {
        &self.custom
    }

    fn receiver(&self, scope: &mut CodeGenScope<'_>) -> String {
        let recv = scope.receiver().to_string();
        match self.custom.kind {
            ConverterKind::Static => self.custom.class_name.clone(),
            ConverterKind::Instance => {
                let field = scope
                    .writer()
                    .get_or_create_field(&ConverterInstanceField(&self.custom.class_name));
                format!("{recv}.{field}")
            }
            ConverterKind::Provided => {
                let method = scope
                    .writer()
                    .get_or_create_method(&ProvidedConverterGetter(&self.custom.class_name));
                format!("{recv}.{method}()")
            }
        }
    }
}

impl TypeConverter for CustomTypeConverterWrapper {
    fn from(&self) -> &TypeRef {
        &self.custom.from
    }

    fn to(&self) -> &TypeRef {
        &self.custom.to
    }

    fn convert(&self, input: &str, output: &str, scope: &mut CodeGenScope<'_>) {
        let receiver = self.receiver(scope);
        let call = match self.custom.kind {
            ConverterKind::Static => format!("{receiver}::{}", self.custom.method_name),
            _ => format!("{receiver}.{}", self.custom.method_name),
        };
        scope
            .builder()
            .add_statement(format!("{output} = {call}({input}.clone())"));
    }

    fn describe(&self) -> String {
        format!("{} ({} -> {})", self.custom.qualified_name(), self.custom.from, self.custom.to)
    }
}

struct ConverterInstanceField<'a>(&'a str);

impl SharedFieldSpec for ConverterInstanceField<'_> {
    fn base_name(&self) -> String {
        snake_case(self.0)
    }

    fn unique_key(&self) -> String {
        format!("converter_instance:{}", self.0)
    }

    fn prepare(&self, _writer: &mut ClassWriter) -> (String, String) {
        (format!("Arc<{}>", self.0), format!("Arc::new({}::default())", self.0))
    }
}

struct ProvidedConverterCell<'a>(&'a str);

impl SharedFieldSpec for ProvidedConverterCell<'_> {
    fn base_name(&self) -> String {
        format!("{}_cell", snake_case(self.0))
    }

    fn unique_key(&self) -> String {
        format!("provided_converter_cell:{}", self.0)
    }

    fn prepare(&self, _writer: &mut ClassWriter) -> (String, String) {
        (
            format!("std::sync::OnceLock<Arc<{}>>", self.0),
            "std::sync::OnceLock::new()".to_string(),
        )
    }
}

struct ProvidedConverterGetter<'a>(&'a str);

impl SharedMethodSpec for ProvidedConverterGetter<'_> {
    fn base_name(&self) -> String {
        snake_case(self.0)
    }

    fn unique_key(&self) -> String {
        format!("provided_converter:{}", self.0)
    }

    fn prepare(&self, method_name: &str, writer: &mut ClassWriter) -> MethodSpec {
        writer.add_required_converter(self.0);
        let cell = writer.get_or_create_field(&ProvidedConverterCell(self.0));
        let mut body = CodeBlock::new();
        body.add_line(format!(
            "self.{cell}.get_or_init(|| self.db.type_converter::<{}>())",
            self.0
        ));
        MethodSpec {
            name: method_name.to_string(),
            signature: format!("(&self) -> &Arc<{}>", self.0),
            body,
            is_async: false,
        }
    }
}

/// Lifts `A -> B` to `Option<A> -> Option<B>`.
pub struct NullSafeTypeConverter {
    inner: Rc<dyn TypeConverter>,
    from: TypeRef,
    to: TypeRef,
}

impl NullSafeTypeConverter {
    /// `None` when either side of `inner` is already optional.
    pub fn lift(inner: Rc<dyn TypeConverter>) -> Option<Self> {
        if inner.from().is_option() || inner.to().is_option() {
            return None;
        }
        Some(Self {
            from: inner.from().nullable(),
            to: inner.to().nullable(),
            inner,
        })
    }
}

impl TypeConverter for NullSafeTypeConverter {
    fn from(&self) -> &TypeRef {
        &self.from
    }

    fn to(&self) -> &TypeRef {
        &self.to
    }

    fn convert(&self, input: &str, output: &str, scope: &mut CodeGenScope<'_>) {
        let value = scope.tmp_var("value");
        let converted = scope.tmp_var("converted");
        let inner_ty = self.inner.to().to_string();
        let body = scope.fork(|child| {
            child
                .builder()
                .add_statement(format!("let {converted}: {inner_ty}"));
            self.inner.convert(&value, &converted, child);
            child.builder().add_statement(format!("{output} = Some({converted})"));
        });
        scope
            .builder()
            .begin_control_flow(format!("match &{input}"))
            .add_line(format!("None => {output} = None,"))
            .begin_control_flow(format!("Some({value}) =>"))
            .add_code(&body)
            .end_control_flow()
            .end_control_flow();
    }

    fn hops(&self) -> usize {
        self.inner.hops()
    }

    fn describe(&self) -> String {
        format!("{} (null safe)", self.inner.describe())
    }
}

/// Two converters applied in sequence through an intermediate variable.
pub struct CompositeTypeConverter {
    first: Rc<dyn TypeConverter>,
    second: Rc<dyn TypeConverter>,
}

impl CompositeTypeConverter {
    pub fn new(first: Rc<dyn TypeConverter>, second: Rc<dyn TypeConverter>) -> Self {
        Self { first, second }
    }
}

impl TypeConverter for CompositeTypeConverter {
    fn from(&self) -> &TypeRef {
        self.first.from()
    }

    fn to(&self) -> &TypeRef {
        self.second.to()
    }

    fn convert(&self, input: &str, output: &str, scope: &mut CodeGenScope<'_>) {
        let tmp = scope.tmp_var("tmp");
        let mid = self.first.to().to_string();
        scope.builder().add_statement(format!("let {tmp}: {mid}"));
        self.first.convert(input, &tmp, scope);
        self.second.convert(&tmp, output, scope);
    }

    fn hops(&self) -> usize {
        self.first.hops() + self.second.hops()
    }

    fn describe(&self) -> String {
        format!("{} then {}", self.first.describe(), self.second.describe())
    }
}
