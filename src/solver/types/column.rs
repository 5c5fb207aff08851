use std::rc::Rc;

use crate::model::{Affinity, Primitive, TypeRef, BYTES};
use crate::writer::CodeGenScope;

use super::converter::TypeConverter;

/// Reads and binds one Rust type against a single SQL affinity.
///
/// `bind_to_stmt` takes `value` as a place that stays usable afterwards;
/// `read_from_cursor` assigns to an already declared `out`.
pub trait ColumnTypeAdapter {
    fn out_type(&self) -> &TypeRef;
    fn affinity(&self) -> Affinity;
    fn bind_to_stmt(&self, stmt: &str, index: &str, value: &str, scope: &mut CodeGenScope<'_>);
    fn read_from_cursor(&self, out: &str, cursor: &str, index: &str, scope: &mut CodeGenScope<'_>);
}

/// Emits `match &value { None => null, Some(v) => bind(v) }`.
fn bind_nullable(
    stmt: &str,
    index: &str,
    value: &str,
    scope: &mut CodeGenScope<'_>,
    bind_some: impl FnOnce(&str) -> String,
) {
    let some = scope.tmp_var("value");
    let call = bind_some(&some);
    scope
        .builder()
        .begin_control_flow(format!("match &{value}"))
        .add_line(format!("None => {stmt}.bind_null({index}),"))
        .add_line(format!("Some({some}) => {call},"))
        .end_control_flow();
}

fn read_nullable(out: &str, cursor: &str, index: &str, read: String, scope: &mut CodeGenScope<'_>) {
    scope
        .builder()
        .begin_control_flow(format!("if {cursor}.is_null({index})"))
        .add_statement(format!("{out} = None"))
        .next_control_flow("else")
        .add_statement(format!("{out} = Some({read})"))
        .end_control_flow();
}

/// Integers, floats and `char`, plain or wrapped in `Option`.
pub struct PrimitiveColumnTypeAdapter {
    out: TypeRef,
    primitive: Primitive,
    nullable: bool,
}

impl PrimitiveColumnTypeAdapter {
    pub fn create_all() -> Vec<Rc<dyn ColumnTypeAdapter>> {
        let mut out: Vec<Rc<dyn ColumnTypeAdapter>> = Vec::new();
        for primitive in Primitive::ALL {
            if primitive == Primitive::Bool {
                continue;
            }
            for nullable in [false, true] {
                let ty = primitive.type_ref();
                out.push(Rc::new(Self {
                    out: if nullable { ty.nullable() } else { ty },
                    primitive,
                    nullable,
                }));
            }
        }
        out
    }

    fn read_expr(&self, cursor: &str, index: &str) -> String {
        match self.primitive {
            Primitive::I64 => format!("{cursor}.get_long({index})"),
            Primitive::I32 => format!("{cursor}.get_int({index})"),
            Primitive::I16 => format!("{cursor}.get_short({index})"),
            Primitive::I8 => format!("{cursor}.get_short({index}) as i8"),
            Primitive::F64 => format!("{cursor}.get_double({index})"),
            Primitive::F32 => format!("{cursor}.get_float({index})"),
            Primitive::Char => {
                format!("char::from_u32({cursor}.get_int({index}) as u32).unwrap_or_default()")
            }
            Primitive::Bool => format!("{cursor}.get_int({index}) != 0"),
        }
    }

    fn bind_expr(&self, stmt: &str, index: &str, value: &str) -> String {
        match self.affinity() {
            Affinity::Real => format!("{stmt}.bind_double({index}, {value} as f64)"),
            _ => format!("{stmt}.bind_long({index}, {value} as i64)"),
        }
    }
}

impl ColumnTypeAdapter for PrimitiveColumnTypeAdapter {
    fn out_type(&self) -> &TypeRef {
        &self.out
    }

    fn affinity(&self) -> Affinity {
        match self.primitive {
            Primitive::F32 | Primitive::F64 => Affinity::Real,
            _ => Affinity::Integer,
        }
    }

    fn bind_to_stmt(&self, stmt: &str, index: &str, value: &str, scope: &mut CodeGenScope<'_>) {
        if self.nullable {
            bind_nullable(stmt, index, value, scope, |v| self.bind_expr(stmt, index, &format!("*{v}")));
        } else {
            let call = self.bind_expr(stmt, index, value);
            scope.builder().add_statement(call);
        }
    }

    fn read_from_cursor(&self, out: &str, cursor: &str, index: &str, scope: &mut CodeGenScope<'_>) {
        let read = self.read_expr(cursor, index);
        if self.nullable {
            read_nullable(out, cursor, index, read, scope);
        } else {
            scope.builder().add_statement(format!("{out} = {read}"));
        }
    }
}

pub struct StringColumnTypeAdapter {
    out: TypeRef,
    nullable: bool,
}

impl StringColumnTypeAdapter {
    pub fn create_all() -> Vec<Rc<dyn ColumnTypeAdapter>> {
        [false, true]
            .into_iter()
            .map(|nullable| {
                let ty = TypeRef::string();
                Rc::new(Self {
                    out: if nullable { ty.nullable() } else { ty },
                    nullable,
                }) as Rc<dyn ColumnTypeAdapter>
            })
            .collect()
    }
}

impl ColumnTypeAdapter for StringColumnTypeAdapter {
    fn out_type(&self) -> &TypeRef {
        &self.out
    }

    fn affinity(&self) -> Affinity {
        Affinity::Text
    }

    fn bind_to_stmt(&self, stmt: &str, index: &str, value: &str, scope: &mut CodeGenScope<'_>) {
        if self.nullable {
            bind_nullable(stmt, index, value, scope, |v| format!("{stmt}.bind_string({index}, {v})"));
        } else {
            scope
                .builder()
                .add_statement(format!("{stmt}.bind_string({index}, &{value})"));
        }
    }

    fn read_from_cursor(&self, out: &str, cursor: &str, index: &str, scope: &mut CodeGenScope<'_>) {
        let read = format!("{cursor}.get_string({index})");
        if self.nullable {
            read_nullable(out, cursor, index, read, scope);
        } else {
            scope.builder().add_statement(format!("{out} = {read}"));
        }
    }
}

/// `Vec<u8>` and the runtime's `Bytes` buffer, both stored as BLOB.
pub struct BlobColumnTypeAdapter {
    out: TypeRef,
    nullable: bool,
    buffer: bool,
}

impl BlobColumnTypeAdapter {
    pub fn create_all() -> Vec<Rc<dyn ColumnTypeAdapter>> {
        let mut out: Vec<Rc<dyn ColumnTypeAdapter>> = Vec::new();
        for buffer in [false, true] {
            for nullable in [false, true] {
                let ty = if buffer {
                    TypeRef::simple(BYTES)
                } else {
                    TypeRef::vec_of(TypeRef::simple("u8"))
                };
                out.push(Rc::new(Self {
                    out: if nullable { ty.nullable() } else { ty },
                    nullable,
                    buffer,
                }));
            }
        }
        out
    }

    fn read_expr(&self, cursor: &str, index: &str) -> String {
        if self.buffer {
            format!("Bytes::from({cursor}.get_blob({index}))")
        } else {
            format!("{cursor}.get_blob({index})")
        }
    }
}

impl ColumnTypeAdapter for BlobColumnTypeAdapter {
    fn out_type(&self) -> &TypeRef {
        &self.out
    }

    fn affinity(&self) -> Affinity {
        Affinity::Blob
    }

    fn bind_to_stmt(&self, stmt: &str, index: &str, value: &str, scope: &mut CodeGenScope<'_>) {
        if self.nullable {
            bind_nullable(stmt, index, value, scope, |v| {
                format!("{stmt}.bind_blob({index}, {v}.as_ref())")
            });
        } else {
            scope
                .builder()
                .add_statement(format!("{stmt}.bind_blob({index}, {value}.as_ref())"));
        }
    }

    fn read_from_cursor(&self, out: &str, cursor: &str, index: &str, scope: &mut CodeGenScope<'_>) {
        let read = self.read_expr(cursor, index);
        if self.nullable {
            read_nullable(out, cursor, index, read, scope);
        } else {
            scope.builder().add_statement(format!("{out} = {read}"));
        }
    }
}

/// A built-in adapter reached through converters in either direction.
pub struct CompositeAdapter {
    out: TypeRef,
    adapter: Rc<dyn ColumnTypeAdapter>,
    into_statement: Option<Rc<dyn TypeConverter>>,
    from_cursor: Option<Rc<dyn TypeConverter>>,
}

impl CompositeAdapter {
    pub fn new(
        out: TypeRef,
        adapter: Rc<dyn ColumnTypeAdapter>,
        into_statement: Option<Rc<dyn TypeConverter>>,
        from_cursor: Option<Rc<dyn TypeConverter>>,
    ) -> Self {
        Self {
            out,
            adapter,
            into_statement,
            from_cursor,
        }
    }
}

impl ColumnTypeAdapter for CompositeAdapter {
    fn out_type(&self) -> &TypeRef {
        &self.out
    }

    fn affinity(&self) -> Affinity {
        self.adapter.affinity()
    }

    fn bind_to_stmt(&self, stmt: &str, index: &str, value: &str, scope: &mut CodeGenScope<'_>) {
        match &self.into_statement {
            Some(converter) => {
                let tmp = scope.tmp_var("tmp");
                let ty = converter.to().to_string();
                scope.builder().add_statement(format!("let {tmp}: {ty}"));
                converter.convert(value, &tmp, scope);
                self.adapter.bind_to_stmt(stmt, index, &tmp, scope);
            }
            None => self.adapter.bind_to_stmt(stmt, index, value, scope),
        }
    }

    fn read_from_cursor(&self, out: &str, cursor: &str, index: &str, scope: &mut CodeGenScope<'_>) {
        match &self.from_cursor {
            Some(converter) => {
                let tmp = scope.tmp_var("tmp");
                let ty = converter.from().to_string();
                scope.builder().add_statement(format!("let {tmp}: {ty}"));
                self.adapter.read_from_cursor(&tmp, cursor, index, scope);
                converter.convert(&tmp, out, scope);
            }
            None => self.adapter.read_from_cursor(out, cursor, index, scope),
        }
    }
}

/// Binds a value of some type to a statement argument.
#[derive(Clone)]
pub struct StatementValueBinder {
    ty: TypeRef,
    adapter: Rc<dyn ColumnTypeAdapter>,
    converter: Option<Rc<dyn TypeConverter>>,
}

impl StatementValueBinder {
    pub fn new(ty: TypeRef, adapter: Rc<dyn ColumnTypeAdapter>, converter: Option<Rc<dyn TypeConverter>>) -> Self {
        Self { ty, adapter, converter }
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    pub fn bind_to_stmt(&self, stmt: &str, index: &str, value: &str, scope: &mut CodeGenScope<'_>) {
        CompositeAdapter::new(self.ty.clone(), self.adapter.clone(), self.converter.clone(), None)
            .bind_to_stmt(stmt, index, value, scope);
    }
}

/// Reads a value of some type from a cursor column.
#[derive(Clone)]
pub struct CursorValueReader {
    ty: TypeRef,
    adapter: Rc<dyn ColumnTypeAdapter>,
    converter: Option<Rc<dyn TypeConverter>>,
}

impl CursorValueReader {
    pub fn new(ty: TypeRef, adapter: Rc<dyn ColumnTypeAdapter>, converter: Option<Rc<dyn TypeConverter>>) -> Self {
        Self { ty, adapter, converter }
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    pub fn affinity(&self) -> Affinity {
        self.adapter.affinity()
    }

    pub fn read_from_cursor(&self, out: &str, cursor: &str, index: &str, scope: &mut CodeGenScope<'_>) {
        CompositeAdapter::new(self.ty.clone(), self.adapter.clone(), None, self.converter.clone())
            .read_from_cursor(out, cursor, index, scope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::ClassWriter;

    fn adapter_for(all: Vec<Rc<dyn ColumnTypeAdapter>>, ty: &str) -> Rc<dyn ColumnTypeAdapter> {
        let ty = TypeRef::parse(ty).unwrap();
        all.into_iter().find(|a| a.out_type() == &ty).unwrap()
    }

    fn bind(adapter: &dyn ColumnTypeAdapter, value: &str) -> String {
        let mut writer = ClassWriter::new("Dao");
        let mut scope = CodeGenScope::new(&mut writer);
        adapter.bind_to_stmt("_stmt", "1", value, &mut scope);
        scope.generate().to_string()
    }

    fn read(adapter: &dyn ColumnTypeAdapter) -> String {
        let mut writer = ClassWriter::new("Dao");
        let mut scope = CodeGenScope::new(&mut writer);
        adapter.read_from_cursor("_out", "_cursor", "0", &mut scope);
        scope.generate().to_string()
    }

    #[test]
    fn test_primitive_bind_and_read() {
        let a = adapter_for(PrimitiveColumnTypeAdapter::create_all(), "i32");
        assert_eq!(a.affinity(), Affinity::Integer);
        assert_eq!(bind(a.as_ref(), "id"), "_stmt.bind_long(1, id as i64);\n");
        assert_eq!(read(a.as_ref()), "_out = _cursor.get_int(0);\n");

        let f = adapter_for(PrimitiveColumnTypeAdapter::create_all(), "f32");
        assert_eq!(f.affinity(), Affinity::Real);
        assert_eq!(bind(f.as_ref(), "x"), "_stmt.bind_double(1, x as f64);\n");
    }

    #[test]
    fn test_nullable_primitive() {
        let a = adapter_for(PrimitiveColumnTypeAdapter::create_all(), "Option<i64>");
        assert_eq!(
            bind(a.as_ref(), "id"),
            "match &id {\n    None => _stmt.bind_null(1),\n    Some(_value) => _stmt.bind_long(1, *_value as i64),\n}\n"
        );
        assert_eq!(
            read(a.as_ref()),
            "if _cursor.is_null(0) {\n    _out = None;\n} else {\n    _out = Some(_cursor.get_long(0));\n}\n"
        );
    }

    #[test]
    fn test_string_and_blob() {
        let s = adapter_for(StringColumnTypeAdapter::create_all(), "String");
        assert_eq!(bind(s.as_ref(), "name"), "_stmt.bind_string(1, &name);\n");
        let b = adapter_for(BlobColumnTypeAdapter::create_all(), "Bytes");
        assert_eq!(read(b.as_ref()), "_out = Bytes::from(_cursor.get_blob(0));\n");
        assert_eq!(b.affinity(), Affinity::Blob);
    }

    #[test]
    fn test_bytes_buffer_nullable() {
        let ty = TypeRef::simple(BYTES).nullable();
        let all = BlobColumnTypeAdapter::create_all();
        let b = all.iter().find(|a| a.out_type() == &ty).unwrap();
        assert_eq!(b.affinity(), Affinity::Blob);
        assert_eq!(
            read(b.as_ref()),
            "if _cursor.is_null(0) {\n    _out = None;\n} else {\n    _out = Some(Bytes::from(_cursor.get_blob(0)));\n}\n"
        );
    }

    #[test]
    fn test_bool_not_built_in() {
        let all = PrimitiveColumnTypeAdapter::create_all();
        assert!(all.iter().all(|a| a.out_type().primitive() != Some(Primitive::Bool)));
        assert_eq!(all.len(), 14);
    }
}
