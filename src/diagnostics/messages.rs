/// Diagnostic message texts.
///
/// Fixed messages are constants; parameterised ones are functions built on
/// [`safe_format`] so a template/argument mismatch degrades to the raw
/// template instead of failing.
use super::safe_format;

pub const MISSING_QUERY_SQL: &str = "Query methods must declare the SQL they run.";
pub const QUERY_IN_TRANSACTION_METHOD: &str =
    "Transaction methods cannot declare SQL. Put the queries in separate query methods.";
pub const OBSERVABLE_QUERY_NOTHING_TO_OBSERVE: &str =
    "Observable query return type (LiveData, Flowable, DataSource, DataSourceFactory etc) can only be used with SELECT queries that directly or indirectly (via relations) access at least one table. For one-shot queries use a plain or suspending return type.";
pub const PAGING_SPECIFY_DATA_SOURCE_TYPE: &str =
    "For now, only PositionalDataSource is supported as a DataSource return type.";
pub const PAGING_SPECIFY_PAGING_SOURCE_TYPE: &str =
    "For now, only i32 keys are supported for PagingSource.";
pub const MISSING_COROUTINES_ARTIFACT: &str =
    "To use coroutine return types the `daoc-coroutines` artifact must be available.";
pub const MISSING_GUAVA_ARTIFACT: &str =
    "To use ListenableFuture return types the `daoc-guava` artifact must be available.";
pub const MISSING_RXJAVA2_ARTIFACT: &str =
    "To use rx2 return types the `daoc-rxjava2` artifact must be available.";
pub const MISSING_RXJAVA3_ARTIFACT: &str =
    "To use rx3 return types the `daoc-rxjava3` artifact must be available.";
pub const RELATION_QUERY_WITHOUT_TRANSACTION: &str =
    "The return value includes a type with relations. The relations are fetched with separate queries; consider marking the method as `transaction` so the whole result is read consistently.";
pub const TYPE_CONVERTER_BAD_RETURN_TYPE: &str =
    "A type converter must convert to a value. `()` is not a valid result type.";
pub const TYPE_CONVERTER_BAD_INPUT_TYPE: &str =
    "A type converter must take a value. `()` is not a valid input type.";
pub const TYPE_CONVERTER_EMPTY_CLASS: &str =
    "A converter class must declare at least one conversion method.";
pub const SHORTCUT_METHOD_WITH_SQL: &str =
    "Insert, update and delete methods cannot declare SQL. Use a query method to run custom statements.";
pub const SHORTCUT_METHOD_MISSING_PARAMS: &str =
    "Insert, update and delete methods must have at least one entity parameter.";
pub const DELETE_METHOD_ON_CONFLICT: &str =
    "Delete methods cannot declare an on_conflict strategy.";
pub const EMBEDDED_OPTIONAL_NOT_SUPPORTED: &str =
    "Embedded fields cannot be optional. Make each column optional instead.";

pub fn missing_parameter_for_bind_variable(names: &[String]) -> String {
    safe_format("missing parameter for bind variable `{}`", &[&names.join(", ")])
}

pub fn unused_query_method_parameter(names: &[String]) -> String {
    safe_format("unused parameter `{}`", &[&names.join(", ")])
}

pub fn cannot_find_query_result_adapter(ty: &str) -> String {
    safe_format("Not sure how to convert a cursor to this method's return type ({}).", &[ty])
}

pub fn cannot_find_prepared_query_result_adapter(ty: &str, kind: &str) -> String {
    safe_format(
        "Not sure how to handle {} query method's return type ({}). INSERT methods return (), i64 (row id) or nothing; UPDATE and DELETE methods return (), i32 (affected rows) or nothing.",
        &[kind, ty],
    )
}

pub fn cannot_find_shortcut_result_adapter(ty: &str, kind: &str) -> String {
    safe_format(
        "Not sure how to handle {} method's return type ({}). Insert methods return (), i64 for one entity or Vec<i64> for one Vec of entities; update and delete methods return () or i32 (affected rows).",
        &[kind, ty],
    )
}

pub fn shortcut_parameter_not_an_entity(name: &str, ty: &str) -> String {
    safe_format(
        "Parameter `{}` ({}) of an insert, update or delete method must be an entity or a Vec of entities.",
        &[name, ty],
    )
}

pub fn shortcut_entity_without_primary_key(entity: &str, kind: &str) -> String {
    safe_format(
        "{} has no primary key. {} methods find rows by primary key.",
        &[entity, kind],
    )
}

pub fn primary_key_column_not_found(entity: &str, column: &str) -> String {
    safe_format("Primary key column `{}` is not a field of {}.", &[column, entity])
}

pub fn cannot_bind_field(pojo: &str, field: &str, ty: &str) -> String {
    safe_format(
        "Cannot figure out how to bind {}.{} ({}) to a statement. Declare a type converter for it.",
        &[pojo, field, ty],
    )
}

pub fn cannot_bind_query_parameter(name: &str, ty: &str) -> String {
    safe_format(
        "Query method parameter `{}` ({}) must either be a type that can be bound to a column or a Vec of such a type.",
        &[name, ty],
    )
}

pub fn invalid_query_type(kind: &str) -> String {
    safe_format(
        "{} query type is not supported yet. You can use SELECT, INSERT, UPDATE or DELETE.",
        &[kind],
    )
}

pub fn cannot_verify_query(error: &str) -> String {
    safe_format("There is a problem with the query: {}", &[error])
}

pub fn cannot_create_verification_database(error: &str) -> String {
    safe_format(
        "Cannot create the reference database used to verify queries, verification is disabled for this round. Reason: {}",
        &[error],
    )
}

pub fn invalid_channel_type(ty: &str) -> String {
    safe_format(
        "{} is not supported as a return type. Use Flow instead.",
        &[ty],
    )
}

pub fn cursor_pojo_mismatch(
    pojo: &str,
    unused_columns: &[String],
    all_columns: &[String],
    unused_fields: &[String],
    all_fields: &[String],
) -> String {
    let mut parts = Vec::new();
    if !unused_columns.is_empty() {
        parts.push(safe_format(
            "The query returns some columns [{}] which are not used by {}.",
            &[&unused_columns.join(", "), pojo],
        ));
    }
    if !unused_fields.is_empty() {
        parts.push(safe_format(
            "{} has some fields [{}] which are not returned by the query.",
            &[pojo, &unused_fields.join(", ")],
        ));
    }
    parts.push(safe_format(
        "Fields in {}: {}. Columns returned by the query: {}.",
        &[pojo, &all_fields.join(", "), &all_columns.join(", ")],
    ));
    parts.join(" ")
}

pub fn pojo_missing_non_null(pojo: &str, missing: &[String], all_columns: &[String]) -> String {
    safe_format(
        "The columns returned by the query do not have the fields [{}] in {} even though they are non-null. Columns returned by the query: [{}]",
        &[&missing.join(", "), pojo, &all_columns.join(", ")],
    )
}

pub fn duplicate_result_columns(columns: &[String]) -> String {
    safe_format(
        "The query returns duplicate column names [{}]. Only the first occurrence of each is read.",
        &[&columns.join(", ")],
    )
}

pub fn cannot_read_field(pojo: &str, field: &str, ty: &str) -> String {
    safe_format(
        "Cannot figure out how to read {}.{} ({}) from a cursor. Declare a type converter for it.",
        &[pojo, field, ty],
    )
}

pub fn unknown_pojo_type(name: &str) -> String {
    safe_format("No entity, view or pojo named `{}` is declared.", &[name])
}

pub fn unknown_relation_entity(name: &str) -> String {
    safe_format("Relation target `{}` is not a declared entity.", &[name])
}

pub fn relation_column_missing(owner: &str, column: &str) -> String {
    safe_format("Cannot find the column `{}` in {} used by a relation.", &[column, owner])
}

pub fn relation_element_unsupported(ty: &str) -> String {
    safe_format(
        "Relation element type {} must be the related entity or a single column of it.",
        &[ty],
    )
}

pub fn type_converter_must_be_declared(class: &str) -> String {
    safe_format("Type converter class `{}` is not declared.", &[class])
}

pub fn duplicate_type_converters(others: &[String]) -> String {
    safe_format(
        "Multiple methods define the same conversion. Conflicts with these: {}",
        &[&others.join(", ")],
    )
}

pub fn transaction_method_async(ty: &str) -> String {
    safe_format(
        "Transaction methods cannot return {}. Declare the method `suspend` or return a plain value.",
        &[ty],
    )
}
