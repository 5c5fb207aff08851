use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DaocError;

/// A declared type, written with Rust-like syntax: `Vec<User>`,
/// `Option<i64>`, `rx2::Flowable<Vec<User>>`, `PagingSource<i32, User>`, `()`.
///
/// Types are compared structurally; two `TypeRef`s naming the same path with
/// the same arguments are the same type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeRef {
    name: String,
    args: Vec<TypeRef>,
}

pub const UNIT: &str = "()";
pub const OPTION: &str = "Option";
pub const VEC: &str = "Vec";
pub const STRING: &str = "String";
pub const BYTES: &str = "Bytes";

/// Built-in scalar types with a direct column mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Char,
}

impl Primitive {
    pub const ALL: [Primitive; 8] = [
        Primitive::Bool,
        Primitive::I8,
        Primitive::I16,
        Primitive::I32,
        Primitive::I64,
        Primitive::F32,
        Primitive::F64,
        Primitive::Char,
    ];

    pub fn from_name(name: &str) -> Option<Primitive> {
        Some(match name {
            "bool" => Primitive::Bool,
            "i8" => Primitive::I8,
            "i16" => Primitive::I16,
            "i32" => Primitive::I32,
            "i64" => Primitive::I64,
            "f32" => Primitive::F32,
            "f64" => Primitive::F64,
            "char" => Primitive::Char,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::I8 => "i8",
            Primitive::I16 => "i16",
            Primitive::I32 => "i32",
            Primitive::I64 => "i64",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
            Primitive::Char => "char",
        }
    }

    pub fn type_ref(self) -> TypeRef {
        TypeRef::simple(self.name())
    }

    pub fn default_literal(self) -> &'static str {
        match self {
            Primitive::Bool => "false",
            Primitive::F32 | Primitive::F64 => "0.0",
            Primitive::Char => "'\\0'",
            _ => "0",
        }
    }
}

impl TypeRef {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn unit() -> Self {
        Self::simple(UNIT)
    }

    pub fn option_of(inner: TypeRef) -> Self {
        Self::generic(OPTION, vec![inner])
    }

    pub fn vec_of(inner: TypeRef) -> Self {
        Self::generic(VEC, vec![inner])
    }

    pub fn string() -> Self {
        Self::simple(STRING)
    }

    pub fn parse(input: &str) -> Result<Self, DaocError> {
        let mut parser = TypeParser {
            input,
            chars: input.char_indices().peekable(),
        };
        let ty = parser.parse_type()?;
        parser.skip_ws();
        if let Some((pos, c)) = parser.chars.next() {
            return Err(parser.error(format!("unexpected `{c}` at offset {pos}")));
        }
        Ok(ty)
    }

    /// The full path without type arguments, e.g. `rx2::Flowable`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The last path segment, e.g. `Flowable` for `rx2::Flowable<T>`.
    pub fn simple_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }

    pub fn args(&self) -> &[TypeRef] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&TypeRef> {
        self.args.get(index)
    }

    /// The only type argument, when there is exactly one.
    pub fn single_arg(&self) -> Option<&TypeRef> {
        match self.args.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn is_unit(&self) -> bool {
        self.name == UNIT
    }

    pub fn is_option(&self) -> bool {
        self.name == OPTION && self.args.len() == 1
    }

    pub fn is_vec(&self) -> bool {
        self.name == VEC && self.args.len() == 1
    }

    /// `Vec<u8>` is a blob, not a collection.
    pub fn is_byte_vec(&self) -> bool {
        self.is_vec() && self.args[0].name == "u8"
    }

    pub fn option_inner(&self) -> Option<&TypeRef> {
        if self.is_option() {
            self.args.first()
        } else {
            None
        }
    }

    pub fn primitive(&self) -> Option<Primitive> {
        if self.args.is_empty() {
            Primitive::from_name(&self.name)
        } else {
            None
        }
    }

    pub fn is_primitive(&self) -> bool {
        self.primitive().is_some()
    }

    /// Whether a value of this type may be absent.
    pub fn is_nullable(&self) -> bool {
        self.is_option()
    }

    /// Wraps the type in `Option` unless it already is one.
    pub fn nullable(&self) -> TypeRef {
        if self.is_option() {
            self.clone()
        } else {
            TypeRef::option_of(self.clone())
        }
    }

    /// Strips one `Option` layer if present.
    pub fn non_null(&self) -> TypeRef {
        self.option_inner().cloned().unwrap_or_else(|| self.clone())
    }

    /// The literal used when a single-row query finds nothing, or `None`
    /// when the type has no natural empty value.
    pub fn empty_literal(&self) -> Option<&'static str> {
        if self.is_option() {
            return Some("None");
        }
        if self.is_unit() {
            return Some("()");
        }
        self.primitive().map(Primitive::default_literal)
    }

    /// A name fragment safe to embed in generated identifiers.
    pub fn ident_fragment(&self) -> String {
        let mut out = String::new();
        for c in self.to_string().chars() {
            if c.is_ascii_alphanumeric() {
                out.push(c.to_ascii_lowercase());
            } else if !out.ends_with('_') && !out.is_empty() {
                out.push('_');
            }
        }
        out.trim_end_matches('_').to_string()
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

impl TryFrom<String> for TypeRef {
    type Error = DaocError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TypeRef::parse(&value)
    }
}

impl From<TypeRef> for String {
    fn from(value: TypeRef) -> Self {
        value.to_string()
    }
}

impl std::str::FromStr for TypeRef {
    type Err = DaocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeRef::parse(s)
    }
}

struct TypeParser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl TypeParser<'_> {
    fn error(&self, reason: impl Into<String>) -> DaocError {
        DaocError::TypeSyntax {
            input: self.input.to_string(),
            reason: reason.into(),
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if matches!(self.chars.peek(), Some((_, c)) if *c == expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn parse_type(&mut self) -> Result<TypeRef, DaocError> {
        self.skip_ws();
        if self.eat('(') {
            if self.eat(')') {
                return Ok(TypeRef::unit());
            }
            return Err(self.error("tuples are not supported"));
        }
        let name = self.parse_path()?;
        let mut args = Vec::new();
        if self.eat('<') {
            loop {
                args.push(self.parse_type()?);
                if self.eat(',') {
                    continue;
                }
                if self.eat('>') {
                    break;
                }
                return Err(self.error("expected `,` or `>`"));
            }
        }
        Ok(TypeRef::generic(name, args))
    }

    fn parse_path(&mut self) -> Result<String, DaocError> {
        let mut path = String::new();
        loop {
            self.skip_ws();
            let mut segment = String::new();
            while let Some((_, c)) = self.chars.peek() {
                if c.is_alphanumeric() || *c == '_' {
                    segment.push(*c);
                    self.chars.next();
                } else {
                    break;
                }
            }
            if segment.is_empty() {
                return Err(self.error("expected a type name"));
            }
            path.push_str(&segment);
            if self.eat(':') {
                if !self.eat(':') {
                    return Err(self.error("expected `::`"));
                }
                path.push_str("::");
            } else {
                return Ok(path);
            }
        }
    }
}
