use std::fmt;

const INDENT: &str = "    ";

/// An indented block of generated Rust.
///
/// Lines are stored with their nesting depth so blocks built separately can
/// be spliced into each other at any depth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBlock {
    lines: Vec<(usize, String)>,
    depth: usize,
}

impl CodeBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Adds `stmt;`.
    pub fn add_statement(&mut self, stmt: impl AsRef<str>) -> &mut Self {
        self.lines.push((self.depth, format!("{};", stmt.as_ref())));
        self
    }

    /// Adds a line as-is, e.g. a tail expression.
    pub fn add_line(&mut self, line: impl AsRef<str>) -> &mut Self {
        self.lines.push((self.depth, line.as_ref().to_string()));
        self
    }

    pub fn add_comment(&mut self, comment: impl AsRef<str>) -> &mut Self {
        self.add_line(format!("// {}", comment.as_ref()))
    }

    /// Opens `header {`.
    pub fn begin_control_flow(&mut self, header: impl AsRef<str>) -> &mut Self {
        self.lines.push((self.depth, format!("{} {{", header.as_ref())));
        self.depth += 1;
        self
    }

    /// Closes the current block and opens `} header {`.
    pub fn next_control_flow(&mut self, header: impl AsRef<str>) -> &mut Self {
        self.depth = self.depth.saturating_sub(1);
        self.lines.push((self.depth, format!("}} {} {{", header.as_ref())));
        self.depth += 1;
        self
    }

    pub fn end_control_flow(&mut self) -> &mut Self {
        self.end_control_flow_with("")
    }

    /// Closes the current block with `}suffix`, e.g. `})();`.
    pub fn end_control_flow_with(&mut self, suffix: &str) -> &mut Self {
        self.depth = self.depth.saturating_sub(1);
        self.lines.push((self.depth, format!("}}{suffix}")));
        self
    }

    /// Splices `other` in at the current depth.
    pub fn add_code(&mut self, other: &CodeBlock) -> &mut Self {
        for (depth, line) in &other.lines {
            self.lines.push((self.depth + depth, line.clone()));
        }
        self
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|(_, l)| l.as_str())
    }

    /// Renders the block indented by `base` levels.
    pub fn render(&self, base: usize) -> String {
        let mut out = String::new();
        for (depth, line) in &self.lines {
            if !line.is_empty() {
                for _ in 0..base + depth {
                    out.push_str(INDENT);
                }
                out.push_str(line);
            }
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for CodeBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(0))
    }
}

/// Escapes `text` as a Rust string literal, quotes included.
pub fn string_literal(text: &str) -> String {
    format!("{text:?}")
}

/// `UserDao` to `user_dao`; anything not alphanumeric becomes `_`.
pub fn snake_case(name: &str) -> String {
    let mut out = String::new();
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else if c.is_alphanumeric() {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    out
}
