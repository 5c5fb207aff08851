use std::collections::{BTreeSet, HashMap, HashSet};

use super::code::CodeBlock;

/// A field on the generated DAO type, initialised in `new`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub ty: String,
    /// Expression evaluated in `new`, where `db: Arc<Database>` is in scope.
    pub init: String,
}

/// A method on the generated DAO type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSpec {
    pub name: String,
    /// Everything after the name, e.g. `(&self, _cursor: &Cursor) -> daoc_runtime::Result<User>`.
    pub signature: String,
    pub body: CodeBlock,
    pub is_async: bool,
}

impl MethodSpec {
    pub fn render(&self, visibility: &str, base: usize) -> String {
        let indent = "    ".repeat(base);
        let asyncness = if self.is_async { "async " } else { "" };
        let mut out = format!(
            "{indent}{visibility}{asyncness}fn {}{} {{\n",
            self.name, self.signature
        );
        out.push_str(&self.body.render(base + 1));
        out.push_str(&indent);
        out.push_str("}\n");
        out
    }
}

/// Support code shared by every method that needs it, created at most once.
pub trait SharedFieldSpec {
    fn base_name(&self) -> String;
    /// Two specs with the same key produce the same field.
    fn unique_key(&self) -> String;
    /// Returns the field's type and initialiser.
    fn prepare(&self, writer: &mut ClassWriter) -> (String, String);
}

pub trait SharedMethodSpec {
    fn base_name(&self) -> String;
    /// Two specs with the same key produce the same method.
    fn unique_key(&self) -> String;
    /// Builds the method; may request other shared code from `writer`.
    fn prepare(&self, method_name: &str, writer: &mut ClassWriter) -> MethodSpec;
}

/// Accumulates the generated DAO implementation.
///
/// Shared fields and methods are memoised by their unique key, so however
/// many query methods need, say, the converter for `User`, it is emitted
/// once and every caller gets the same name.
#[derive(Debug, Default)]
pub struct ClassWriter {
    class_name: String,
    fields: Vec<FieldSpec>,
    field_names: HashMap<String, String>,
    shared_methods: Vec<MethodSpec>,
    method_names: HashMap<String, String>,
    used_names: HashSet<String>,
    required_converters: BTreeSet<String>,
}

impl ClassWriter {
    pub fn new(class_name: impl Into<String>) -> Self {
        let mut used_names = HashSet::new();
        used_names.insert("db".to_string());
        used_names.insert("new".to_string());
        Self {
            class_name: class_name.into(),
            used_names,
            ..Default::default()
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn get_or_create_field(&mut self, spec: &dyn SharedFieldSpec) -> String {
        let key = spec.unique_key();
        if let Some(name) = self.field_names.get(&key) {
            return name.clone();
        }
        let name = self.allocate_name(&spec.base_name());
        self.field_names.insert(key, name.clone());
        let (ty, init) = spec.prepare(self);
        self.fields.push(FieldSpec {
            name: name.clone(),
            ty,
            init,
        });
        name
    }

    pub fn get_or_create_method(&mut self, spec: &dyn SharedMethodSpec) -> String {
        let key = spec.unique_key();
        if let Some(name) = self.method_names.get(&key) {
            return name.clone();
        }
        let name = self.allocate_name(&spec.base_name());
        // Reserved before preparing so a recursive request resolves to the same name.
        self.method_names.insert(key, name.clone());
        let method = spec.prepare(&name, self);
        self.shared_methods.push(method);
        name
    }

    /// Records a converter class that must be registered with the database.
    pub fn add_required_converter(&mut self, class: impl Into<String>) {
        self.required_converters.insert(class.into());
    }

    pub fn required_converters(&self) -> &BTreeSet<String> {
        &self.required_converters
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn shared_methods(&self) -> &[MethodSpec] {
        &self.shared_methods
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.shared_methods.is_empty()
    }

    fn allocate_name(&mut self, base: &str) -> String {
        let base = format!("__{}", base.trim_start_matches('_'));
        let mut candidate = base.clone();
        let mut index = 1;
        while !self.used_names.insert(candidate.clone()) {
            candidate = format!("{base}_{index}");
            index += 1;
        }
        candidate
    }
}

/// Where one method's code is being written.
///
/// Temporary variable names are unique within a scope and its forks, so
/// code spliced from a fork never shadows a variable of its parent.
pub struct CodeGenScope<'w> {
    writer: &'w mut ClassWriter,
    code: CodeBlock,
    tmp_vars: HashMap<String, usize>,
    receiver: String,
}

impl<'w> CodeGenScope<'w> {
    pub fn new(writer: &'w mut ClassWriter) -> Self {
        Self {
            writer,
            code: CodeBlock::new(),
            tmp_vars: HashMap::new(),
            receiver: "self".to_string(),
        }
    }

    /// Expression for the DAO instance: `self`, or a clone captured by a closure.
    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    /// The database handle, as reachable from the current receiver.
    pub fn db(&self) -> String {
        format!("{}.db", self.receiver)
    }

    pub fn writer(&mut self) -> &mut ClassWriter {
        &mut *self.writer
    }

    pub fn builder(&mut self) -> &mut CodeBlock {
        &mut self.code
    }

    /// A fresh variable name: `_result`, then `_result_1`, ...
    pub fn tmp_var(&mut self, prefix: &str) -> String {
        let prefix = format!("_{}", prefix.trim_start_matches('_'));
        let count = self.tmp_vars.entry(prefix.clone()).or_insert(0);
        let name = if *count == 0 {
            prefix
        } else {
            format!("{prefix}_{count}")
        };
        *count += 1;
        name
    }

    /// Runs `f` against a child scope and returns the code it wrote.
    ///
    /// The child starts from this scope's variable counters and hands them
    /// back, so names stay unique across the parent and all its forks.
    pub fn fork<F>(&mut self, f: F) -> CodeBlock
    where
        F: FnOnce(&mut CodeGenScope<'_>),
    {
        let receiver = self.receiver.clone();
        self.fork_as(&receiver, f)
    }

    /// Like [`fork`](Self::fork), with code that reaches the DAO through `receiver`.
    pub fn fork_as<F>(&mut self, receiver: &str, f: F) -> CodeBlock
    where
        F: FnOnce(&mut CodeGenScope<'_>),
    {
        let mut child = CodeGenScope {
            writer: &mut *self.writer,
            code: CodeBlock::new(),
            tmp_vars: self.tmp_vars.clone(),
            receiver: receiver.to_string(),
        };
        f(&mut child);
        let CodeGenScope { code, tmp_vars, .. } = child;
        self.tmp_vars = tmp_vars;
        code
    }

    pub fn generate(self) -> CodeBlock {
        self.code
    }
}
