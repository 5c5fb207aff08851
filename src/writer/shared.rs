/// Shared methods emitted once per generated DAO.
use crate::abi;
use crate::solver::{EntityRowAdapter, RelationCollector, RelationElement};

use super::class_writer::{ClassWriter, CodeGenScope, MethodSpec, SharedMethodSpec};
use super::code::{snake_case, string_literal};

/// `__entity_cursor_converter_<entity>(&self, _cursor: &Cursor)`: one row
/// into the entity, with column indices looked up by name.
pub struct EntityCursorConverter<'a>(pub &'a EntityRowAdapter);

impl SharedMethodSpec for EntityCursorConverter<'_> {
    fn base_name(&self) -> String {
        format!("entity_cursor_converter_{}", snake_case(&self.0.entity))
    }

    /// The entity plus the schema identity of every column it reads.
    fn unique_key(&self) -> String {
        let columns: Vec<String> = self
            .0
            .shape
            .all_fields()
            .iter()
            .map(|f| f.field.schema_identity())
            .collect();
        format!("entity_cursor_converter:{}:{}", self.0.entity, columns.join(","))
    }

    fn prepare(&self, method_name: &str, writer: &mut ClassWriter) -> MethodSpec {
        let mut scope = CodeGenScope::new(writer);
        let entity = self.0.write_row("_cursor", &mut scope);
        scope.builder().add_line(format!("Ok({entity})"));
        MethodSpec {
            name: method_name.to_string(),
            signature: format!(
                "(&self, _cursor: &{}) -> {}<{}>",
                abi::CURSOR,
                abi::RESULT,
                self.0.shape.type_ref
            ),
            body: scope.generate(),
            is_async: false,
        }
    }
}

/// `__fetch_relationship_<table>_as_<element>(&self, _map)`: loads every
/// related row for the keys in `_map` with a single `IN (..)` query.
pub struct RelationFetcher<'a>(pub &'a RelationCollector);

impl SharedMethodSpec for RelationFetcher<'_> {
    fn base_name(&self) -> String {
        format!(
            "fetch_relationship_{}_as_{}",
            snake_case(self.0.entity_table()),
            self.0.element_type().ident_fragment()
        )
    }

    fn unique_key(&self) -> String {
        let relation = self.0.relation();
        format!(
            "relation:{}:{}:{}:{}:{}",
            self.0.entity_table(),
            relation.entity_column,
            relation.projection.as_deref().unwrap_or("*"),
            self.0.key_type(),
            self.0.element_type()
        )
    }

    fn prepare(&self, method_name: &str, writer: &mut ClassWriter) -> MethodSpec {
        let collector = self.0;
        let key_ty = collector.key_type().clone();
        let element_ty = collector.element_type().clone();
        let entity_column = collector.relation().entity_column.clone();

        let mut scope = CodeGenScope::new(writer);
        scope
            .builder()
            .begin_control_flow("if _map.is_empty()")
            .add_statement("return Ok(())")
            .end_control_flow()
            .add_statement("let mut _string_builder = String::new()")
            .add_statement(format!(
                "_string_builder.push_str({})",
                string_literal(&collector.query_prefix())
            ))
            .add_statement("let _input_size = _map.len()")
            .add_statement("string_util::append_placeholders(&mut _string_builder, _input_size)")
            .add_statement("_string_builder.push_str(\")\")")
            .add_statement("let _sql = _string_builder")
            .add_statement(format!("let mut _statement = {}::acquire(&_sql, _input_size)", abi::SQL_QUERY))
            .add_statement("let mut _arg_index: usize = 1");
        let bind = scope.fork(|child| {
            collector.key_binder().bind_to_stmt("_statement", "_arg_index", "_item", child);
            child.builder().add_statement("_arg_index += 1");
        });
        scope
            .builder()
            .begin_control_flow("for _item in _map.keys().cloned()")
            .add_code(&bind)
            .end_control_flow()
            .add_statement(format!(
                "let _cursor = {}::new(db_util::query(&self.db, &_statement, false, None)?)",
                abi::CURSOR_GUARD
            ));

        let body = scope.fork(|child| {
            child
                .builder()
                .begin_control_flow(format!(
                    "let _item_key_index = match db_util::column_index(&_cursor, {})",
                    string_literal(&entity_column)
                ))
                .add_line("Some(_index) => _index,")
                .add_line("None => return Ok(()),")
                .end_control_flow_with(";");
            let projection_index = match collector.element() {
                RelationElement::Column { column, .. } => {
                    let index = child.tmp_var("cursor_index_of_value");
                    child.builder().add_statement(format!(
                        "let {index} = db_util::column_index_or_throw(&_cursor, {})?",
                        string_literal(column)
                    ));
                    Some(index)
                }
                RelationElement::Entity(_) => None,
            };
            child
                .builder()
                .begin_control_flow("while _cursor.move_to_next()")
                .add_statement(format!("let _tmp_key: {key_ty}"));
            collector
                .key_reader()
                .read_from_cursor("_tmp_key", "_cursor", "_item_key_index", child);
            child
                .builder()
                .begin_control_flow("if let Some(_tmp_relation) = _map.get_mut(&_tmp_key)")
                .add_statement(format!("let _element: {element_ty}"));
            match collector.element() {
                RelationElement::Entity(adapter) => adapter.convert("_element", "_cursor", child),
                RelationElement::Column { reader, .. } => {
                    let index = projection_index.as_deref().unwrap_or("0");
                    reader.read_from_cursor("_element", "_cursor", index, child);
                }
            }
            child
                .builder()
                .add_statement("_tmp_relation.push(_element)")
                .end_control_flow()
                .end_control_flow()
                .add_line("Ok(())");
        });
        scope.builder().add_code(&body);

        MethodSpec {
            name: method_name.to_string(),
            signature: format!(
                "(&self, _map: &mut HashMap<{key_ty}, Vec<{element_ty}>>) -> {}<()>",
                abi::RESULT
            ),
            body: scope.generate(),
            is_async: false,
        }
    }
}
