/// Declaration model.
///
/// These are the inputs a round compiles: entities and views that define
/// the schema, pojos used as result shapes, converter classes, and DAOs
/// whose methods carry SQL. The model is populated once from a declarations
/// file and is read-only afterwards.
pub mod converter;
pub mod dao;
pub mod declarations;
pub mod entity;
pub mod shape;
pub mod types;

pub use converter::{ConverterClass, ConverterKind, ConverterMethod, CustomTypeConverter};
pub use dao::{Dao, DaoMethod, MethodKind, OnConflict, Param};
pub use declarations::{DatabaseDecl, Declarations};
pub use entity::{Affinity, Embedded, Entity, Field, Pojo, Relation, View};
pub use shape::{EmbeddedShape, FieldPath, PojoShape};
pub use types::{Primitive, TypeRef, BYTES};
