use serde::Serialize;

use crate::abi;
use crate::model::Dao;

use super::class_writer::{ClassWriter, MethodSpec};
use super::code::{snake_case, string_literal};

/// One generated DAO implementation file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedDao {
    pub dao: String,
    pub impl_name: String,
    /// Query methods written into the trait impl, in declaration order.
    pub methods: Vec<String>,
    pub required_converters: Vec<String>,
    pub source: String,
}

impl GeneratedDao {
    /// `UserDaoImpl` is written to `user_dao_impl.rs`.
    pub fn file_name(&self) -> String {
        format!("{}.rs", snake_case(&self.impl_name))
    }
}

/// Collects the methods of one DAO and renders the implementing type.
pub struct DaoWriter {
    dao: String,
    writer: ClassWriter,
    methods: Vec<MethodSpec>,
}

impl DaoWriter {
    pub fn new(dao: &Dao) -> Self {
        Self {
            dao: dao.name.clone(),
            writer: ClassWriter::new(dao.impl_name()),
            methods: Vec::new(),
        }
    }

    /// Shared fields and methods go here while a method is generated.
    pub fn class_writer(&mut self) -> &mut ClassWriter {
        &mut self.writer
    }

    pub fn add_method(&mut self, method: MethodSpec) {
        self.methods.push(method);
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn finish(self) -> GeneratedDao {
        let impl_name = self.writer.class_name().to_string();
        let mut out = String::new();
        out.push_str(&format!("// Generated by daoc from `{}`. Do not edit.\n\n", self.dao));
        for line in abi::PRELUDE {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');

        out.push_str("#[derive(Clone)]\n");
        out.push_str(&format!("pub struct {impl_name} {{\n"));
        for field in self.writer.fields() {
            out.push_str(&format!("    {}: {},\n", field.name, field.ty));
        }
        out.push_str(&format!("    db: Arc<{}>,\n", abi::DATABASE));
        out.push_str("}\n\n");

        out.push_str(&format!("impl {impl_name} {{\n"));
        out.push_str(&format!("    pub fn new(db: Arc<{}>) -> Self {{\n", abi::DATABASE));
        out.push_str("        Self {\n");
        for field in self.writer.fields() {
            out.push_str(&format!("            {}: {},\n", field.name, field.init));
        }
        out.push_str("            db,\n");
        out.push_str("        }\n");
        out.push_str("    }\n\n");

        let required: Vec<String> = self.writer.required_converters().iter().cloned().collect();
        let listed: Vec<String> = required.iter().map(|c| string_literal(c)).collect();
        out.push_str("    /// Converter classes the database must provide for this DAO.\n");
        out.push_str("    pub fn required_converters() -> &'static [&'static str] {\n");
        out.push_str(&format!("        &[{}]\n", listed.join(", ")));
        out.push_str("    }\n");
        for method in self.writer.shared_methods() {
            out.push('\n');
            out.push_str(&method.render("", 1));
        }
        out.push_str("}\n\n");

        out.push_str(&format!("impl {} for {impl_name} {{\n", self.dao));
        for (i, method) in self.methods.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&method.render("", 1));
        }
        out.push_str("}\n");

        GeneratedDao {
            dao: self.dao,
            impl_name,
            methods: self.methods.iter().map(|m| m.name.clone()).collect(),
            required_converters: required,
            source: out,
        }
    }
}
