/// Post-resolution query rewrites.
///
/// A rewriter sees the resolved row adapter and may return a new query.
/// Rewriters never fail: when a rewrite does not apply, or its result would
/// not parse cleanly, the input comes back unchanged.
use tracing::debug;

use super::parser::parse;
use super::query::ParsedQuery;
use crate::solver::RowAdapter;

pub trait QueryRewriter: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn rewrite(&self, query: ParsedQuery, row: &RowAdapter) -> ParsedQuery;
}

/// Runs rewriters in registration order, each on the previous output.
#[derive(Default)]
pub struct RewritePipeline {
    rewriters: Vec<Box<dyn QueryRewriter>>,
}

impl RewritePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut pipeline = Self::new();
        pipeline.add(Box::new(RemoveUnusedColumnQueryRewriter));
        pipeline
    }

    pub fn add(&mut self, rewriter: Box<dyn QueryRewriter>) {
        self.rewriters.push(rewriter);
    }

    pub fn rewrite(&self, query: ParsedQuery, row: &RowAdapter) -> ParsedQuery {
        let mut current = query;
        for rewriter in &self.rewriters {
            current = rewriter.rewrite(current, row);
        }
        current
    }

    pub fn rewriter_names(&self) -> Vec<&str> {
        self.rewriters.iter().map(|r| r.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rewriters.is_empty()
    }
}

/// Wraps a pojo query so it selects only the columns the pojo reads.
pub struct RemoveUnusedColumnQueryRewriter;

impl QueryRewriter for RemoveUnusedColumnQueryRewriter {
    fn name(&self) -> &str {
        "remove_unused_columns"
    }

    fn description(&self) -> &str {
        "Projects a pojo query down to the columns its fields read"
    }

    fn rewrite(&self, query: ParsedQuery, row: &RowAdapter) -> ParsedQuery {
        let Some(pojo) = row.as_pojo() else {
            return query;
        };
        let Some(info) = &query.result_info else {
            return query;
        };
        if info.error.is_some() || info.has_duplicate_columns() {
            return query;
        }
        let mapping = pojo.mapping();
        if mapping.unused_columns.is_empty() {
            return query;
        }

        let columns: Vec<String> = mapping
            .used_columns
            .iter()
            .map(|c| format!("`{c}`"))
            .collect();
        let text = format!("SELECT {} FROM ({})", columns.join(", "), query.original);
        let mut rewritten = parse(&text);
        if rewritten.has_errors() {
            debug!(errors = ?rewritten.errors, "rewritten query did not parse, keeping original");
            return query;
        }
        debug!(
            dropped = ?mapping.unused_columns,
            original = %query.original,
            "pruned unused columns"
        );
        rewritten.rewritten_from = Some(query.original.clone());
        rewritten
    }
}
