use std::collections::HashMap;

use tracing::debug;

use crate::diagnostics::{messages, Logger};
use crate::model::{CustomTypeConverter, Declarations, TypeRef};

/// Validates the converter classes listed for one scope (the database or a
/// DAO) and returns their conversion methods in declaration order.
///
/// Classes that are not declared, declare nothing, or convert from or to
/// `()` are reported and left out. Two methods in the same scope that
/// convert the same pair are each reported, naming the others; both stay
/// in the list and lookups prefer the first.
pub fn process_converters(decls: &Declarations, classes: &[String], logger: &mut Logger) -> Vec<CustomTypeConverter> {
    let mut converters = Vec::new();
    for class_name in classes {
        let Some(class) = decls.converter_class(class_name) else {
            logger.e(messages::type_converter_must_be_declared(class_name));
            continue;
        };
        if class.methods.is_empty() {
            with_anchor(logger, class.name.clone(), |logger| {
                logger.e(messages::TYPE_CONVERTER_EMPTY_CLASS)
            });
            continue;
        }
        for method in &class.methods {
            let converter = CustomTypeConverter::new(class, method);
            let anchor = converter.qualified_name();
            if method.from.is_unit() {
                with_anchor(logger, anchor, |logger| logger.e(messages::TYPE_CONVERTER_BAD_INPUT_TYPE));
                continue;
            }
            if method.to.is_unit() {
                with_anchor(logger, anchor, |logger| logger.e(messages::TYPE_CONVERTER_BAD_RETURN_TYPE));
                continue;
            }
            converters.push(converter);
        }
    }
    report_duplicates(&converters, logger);
    debug!(count = converters.len(), "converters in scope");
    converters
}

fn report_duplicates(converters: &[CustomTypeConverter], logger: &mut Logger) {
    let mut by_pair: HashMap<(&TypeRef, &TypeRef), Vec<&CustomTypeConverter>> = HashMap::new();
    for converter in converters {
        by_pair
            .entry((&converter.from, &converter.to))
            .or_default()
            .push(converter);
    }
    for converter in converters {
        let group = &by_pair[&(&converter.from, &converter.to)];
        if group.len() < 2 {
            continue;
        }
        let name = converter.qualified_name();
        let others: Vec<String> = group
            .iter()
            .map(|c| c.qualified_name())
            .filter(|other| *other != name)
            .collect();
        with_anchor(logger, name, |logger| logger.e(messages::duplicate_type_converters(&others)));
    }
}

fn with_anchor(logger: &mut Logger, anchor: String, f: impl FnOnce(&mut Logger)) {
    let previous = logger.set_anchor(Some(anchor));
    f(logger);
    logger.set_anchor(previous);
}
