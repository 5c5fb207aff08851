use super::entity::{Field, Relation};
use super::types::TypeRef;

/// A pojo with its embedded pojos resolved and column prefixes applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PojoShape {
    pub type_ref: TypeRef,
    pub fields: Vec<Field>,
    pub embedded: Vec<EmbeddedShape>,
    pub relations: Vec<Relation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedShape {
    pub field: String,
    pub shape: PojoShape,
}

/// A column-backed field reachable from the root pojo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath<'a> {
    /// Field names from the root, the last one being `field.name`.
    pub path: Vec<&'a str>,
    pub field: &'a Field,
}

impl FieldPath<'_> {
    /// Dotted path for diagnostics, e.g. `address.street`.
    pub fn display_path(&self) -> String {
        self.path.join(".")
    }

    /// Snake-case fragment for generated variable names.
    pub fn var_fragment(&self) -> String {
        self.path.join("_")
    }
}

impl PojoShape {
    pub fn type_name(&self) -> String {
        self.type_ref.to_string()
    }

    /// Every column-backed field, depth first, in declaration order.
    pub fn all_fields(&self) -> Vec<FieldPath<'_>> {
        let mut out = Vec::new();
        self.collect_fields(&mut Vec::new(), &mut out);
        out
    }

    fn collect_fields<'a>(&'a self, prefix: &mut Vec<&'a str>, out: &mut Vec<FieldPath<'a>>) {
        for field in &self.fields {
            let mut path = prefix.clone();
            path.push(field.name.as_str());
            out.push(FieldPath { path, field });
        }
        for embedded in &self.embedded {
            prefix.push(embedded.field.as_str());
            embedded.shape.collect_fields(prefix, out);
            prefix.pop();
        }
    }

    /// Relations of this pojo and of its embedded pojos, with their paths.
    pub fn all_relations(&self) -> Vec<(Vec<&str>, &Relation)> {
        let mut out = Vec::new();
        for relation in &self.relations {
            out.push((vec![relation.field.as_str()], relation));
        }
        for embedded in &self.embedded {
            for (mut path, relation) in embedded.shape.all_relations() {
                path.insert(0, embedded.field.as_str());
                out.push((path, relation));
            }
        }
        out
    }

    pub fn has_relations(&self) -> bool {
        !self.all_relations().is_empty()
    }

    pub fn find_by_column(&self, column: &str) -> Option<FieldPath<'_>> {
        self.all_fields()
            .into_iter()
            .find(|f| f.field.column_name() == column)
    }

    /// Owned copies of every column-backed field, for DDL generation.
    pub fn columns(&self) -> Vec<Field> {
        self.all_fields().into_iter().map(|f| f.field.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, ty: &str) -> Field {
        Field::new(name, TypeRef::parse(ty).unwrap())
    }

    fn address() -> PojoShape {
        PojoShape {
            type_ref: TypeRef::simple("Address"),
            fields: vec![field("street", "String").with_prefix("home_")],
            embedded: vec![],
            relations: vec![],
        }
    }

    #[test]
    fn test_all_fields_walks_embedded() {
        let user = PojoShape {
            type_ref: TypeRef::simple("User"),
            fields: vec![field("id", "i64")],
            embedded: vec![EmbeddedShape {
                field: "address".into(),
                shape: address(),
            }],
            relations: vec![],
        };
        let fields = user.all_fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1].display_path(), "address.street");
        assert_eq!(fields[1].field.column_name(), "home_street");
        assert!(user.find_by_column("home_street").is_some());
        assert!(user.find_by_column("street").is_none());
    }
}
