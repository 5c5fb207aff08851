/// Value-level building blocks: converters between types and column
/// adapters that bind to and read from a single SQL affinity.
mod column;
mod converter;

pub use column::{
    BlobColumnTypeAdapter, ColumnTypeAdapter, CompositeAdapter, CursorValueReader,
    PrimitiveColumnTypeAdapter, StatementValueBinder, StringColumnTypeAdapter,
};
pub use converter::{
    BoxedBooleanToBoxedIntConverter, CompositeTypeConverter, CustomTypeConverterWrapper,
    NoOpConverter, NullSafeTypeConverter, PrimitiveBooleanToIntConverter, TypeConverter,
};
