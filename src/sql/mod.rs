/// Query text handling: sections, statement kind, tables, and rewrites.
mod analyzer;
pub mod lexer;
mod parser;
pub mod query;
pub mod rewriter;

pub use parser::parse;
pub use query::{
    BindTarget, ColumnInfo, ParsedQuery, QueryResultInfo, QueryType, Section, Table,
};
pub use rewriter::{QueryRewriter, RemoveUnusedColumnQueryRewriter, RewritePipeline};
