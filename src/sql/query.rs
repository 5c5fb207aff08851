use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;

use crate::model::Affinity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    Unknown,
}

impl QueryType {
    pub fn is_write(self) -> bool {
        matches!(self, QueryType::Insert | QueryType::Update | QueryType::Delete)
    }

    pub fn name(self) -> &'static str {
        match self {
            QueryType::Select => "SELECT",
            QueryType::Insert => "INSERT",
            QueryType::Update => "UPDATE",
            QueryType::Delete => "DELETE",
            QueryType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    Text(String),
    NewLine,
    /// A placeholder; `name` is set for `:name` placeholders.
    BindVar { text: String, name: Option<String> },
}

impl Section {
    pub fn text(&self) -> &str {
        match self {
            Section::Text(text) => text,
            Section::NewLine => "\n",
            Section::BindVar { text, .. } => text,
        }
    }

    pub fn is_bind_var(&self) -> bool {
        matches!(self, Section::BindVar { .. })
    }
}

/// How a placeholder selects its argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindTarget {
    Named(String),
    /// One-based position.
    Index(usize),
}

impl fmt::Display for BindTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindTarget::Named(name) => write!(f, ":{name}"),
            BindTarget::Index(index) => write!(f, "?{index}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Table {
    pub name: String,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub affinity: Option<Affinity>,
}

/// What the reference database reported for a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryResultInfo {
    pub columns: Vec<ColumnInfo>,
    pub error: Option<String>,
}

impl QueryResultInfo {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            columns: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn has_duplicate_columns(&self) -> bool {
        let mut seen = BTreeSet::new();
        self.columns.iter().any(|c| !seen.insert(c.name.as_str()))
    }

    pub fn duplicate_columns(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut dups = BTreeSet::new();
        for c in &self.columns {
            if !seen.insert(c.name.as_str()) {
                dups.insert(c.name.clone());
            }
        }
        dups.into_iter().collect()
    }
}

/// A query split into sections, with its statement kind and tables.
///
/// Produced for every input, however malformed; `errors` says whether the
/// other fields can be trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub original: String,
    pub kind: QueryType,
    pub sections: Vec<Section>,
    pub tables: BTreeSet<Table>,
    pub errors: Vec<String>,
    pub result_info: Option<QueryResultInfo>,
    /// The declared text when this query was produced by a rewrite.
    pub rewritten_from: Option<String>,
    pub(crate) missing: bool,
}

impl ParsedQuery {
    /// Stand-in for a method that declares no SQL.
    pub fn missing() -> Self {
        Self {
            original: "missing query".to_string(),
            kind: QueryType::Unknown,
            sections: Vec::new(),
            tables: BTreeSet::new(),
            errors: Vec::new(),
            result_info: None,
            rewritten_from: None,
            missing: true,
        }
    }

    pub fn is_missing(&self) -> bool {
        self.missing
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn bind_sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter().filter(|s| s.is_bind_var())
    }

    /// The target of every placeholder, in source order.
    ///
    /// Numbering follows SQLite: `?N` uses `N`, a bare `?` takes one more
    /// than the largest index so far, and a `:name` placeholder takes a new
    /// index on first use and keeps it afterwards.
    pub fn bind_targets(&self) -> Vec<BindTarget> {
        let mut largest = 0usize;
        let mut named: HashMap<&str, usize> = HashMap::new();
        let mut out = Vec::new();
        for section in self.bind_sections() {
            let Section::BindVar { text, name } = section else {
                continue;
            };
            match name {
                Some(name) => {
                    if !named.contains_key(name.as_str()) {
                        largest += 1;
                        named.insert(name, largest);
                    }
                    out.push(BindTarget::Named(name.clone()));
                }
                None => {
                    let index = text[1..].parse::<usize>().ok().filter(|n| *n > 0);
                    let index = index.unwrap_or(largest + 1);
                    largest = largest.max(index);
                    out.push(BindTarget::Index(index));
                }
            }
        }
        out
    }

    /// The text with every placeholder replaced by `?`.
    pub fn query_with_replaced_bind_params(&self) -> String {
        self.sections
            .iter()
            .map(|s| match s {
                Section::BindVar { .. } => "?",
                other => other.text(),
            })
            .collect()
    }

    pub fn table_names(&self) -> BTreeSet<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }
}

impl fmt::Display for ParsedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}
