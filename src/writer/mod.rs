/// Code generation: indented code blocks, the per-DAO class writer with its
/// memoised shared code, and the query and DAO writers built on top.
mod class_writer;
mod code;
pub mod dao_writer;
pub mod query_writer;
mod shared;
mod shortcut_writer;

pub use class_writer::{
    ClassWriter, CodeGenScope, FieldSpec, MethodSpec, SharedFieldSpec, SharedMethodSpec,
};
pub use code::{snake_case, string_literal, CodeBlock};
pub use dao_writer::{DaoWriter, GeneratedDao};
pub use query_writer::QueryWriter;
pub use shared::{EntityCursorConverter, RelationFetcher};
pub use shortcut_writer::ShortcutWriter;
