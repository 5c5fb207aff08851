use tracing::{debug, trace};

use super::analyzer;
use super::lexer::{tokenize, Token, TokenKind};
use super::query::{ParsedQuery, QueryType, Section};
use crate::diagnostics::messages;

/// Parses query text into a [`ParsedQuery`]. Never fails: problems are
/// recorded in `errors` and the remaining fields are filled best-effort.
pub fn parse(text: &str) -> ParsedQuery {
    let lexed = tokenize(text);
    let sections = sections(&lexed.tokens);
    let mut errors = lexed.errors;

    let mut query = ParsedQuery {
        original: text.to_string(),
        kind: QueryType::Unknown,
        sections,
        tables: Default::default(),
        errors: Vec::new(),
        result_info: None,
        rewritten_from: None,
        missing: false,
    };

    // sqlparser accepts less than SQLite; its failures only downgrade to the
    // keyword scan.
    let analysis = if errors.is_empty() {
        match analyzer::analyze(&query.query_with_replaced_bind_params()) {
            Ok(analysis) => analysis,
            Err(e) => {
                debug!(error = %e, "sqlparser rejected query, scanning keywords");
                analyzer::scan(&lexed.tokens)
            }
        }
    } else {
        analyzer::scan(&lexed.tokens)
    };

    if analysis.kind == QueryType::Unknown {
        let leading = leading_keyword(&lexed.tokens).unwrap_or("empty");
        errors.push(messages::invalid_query_type(&leading.to_ascii_uppercase()));
    }

    query.kind = analysis.kind;
    query.tables = analysis.tables;
    query.errors = errors;
    trace!(
        kind = %query.kind,
        tables = query.tables.len(),
        errors = query.errors.len(),
        "parsed query"
    );
    query
}

fn sections(tokens: &[Token]) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut text = String::new();
    for token in tokens {
        match &token.kind {
            TokenKind::NewLine => {
                flush(&mut text, &mut sections);
                sections.push(Section::NewLine);
            }
            TokenKind::Bind { name } => {
                flush(&mut text, &mut sections);
                sections.push(Section::BindVar {
                    text: token.text.clone(),
                    name: name.clone(),
                });
            }
            _ => text.push_str(&token.text),
        }
    }
    flush(&mut text, &mut sections);
    sections
}

fn flush(text: &mut String, sections: &mut Vec<Section>) {
    if !text.is_empty() {
        sections.push(Section::Text(std::mem::take(text)));
    }
}

fn leading_keyword(tokens: &[Token]) -> Option<&str> {
    tokens
        .iter()
        .find(|t| t.kind == TokenKind::Word)
        .map(|t| t.text.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_preserve_order() {
        let q = parse("SELECT * FROM user\nWHERE id = :id AND name = ?");
        assert!(q.errors.is_empty(), "{:?}", q.errors);
        assert_eq!(
            q.sections,
            vec![
                Section::Text("SELECT * FROM user".into()),
                Section::NewLine,
                Section::Text("WHERE id = ".into()),
                Section::BindVar { text: ":id".into(), name: Some("id".into()) },
                Section::Text(" AND name = ".into()),
                Section::BindVar { text: "?".into(), name: None },
            ]
        );
        assert_eq!(q.kind, QueryType::Select);
        assert_eq!(q.table_names().into_iter().collect::<Vec<_>>(), vec!["user"]);
    }

    #[test]
    fn test_sections_reassemble_original() {
        let text = "SELECT a, 'b:c' FROM t -- note ?\nWHERE x = ?1";
        let q = parse(text);
        let joined: String = q.sections.iter().map(Section::text).collect();
        assert_eq!(joined, text);
    }

    #[test]
    fn test_collection_placeholder_parses() {
        let q = parse("SELECT * FROM user WHERE id IN (:ids)");
        assert!(q.errors.is_empty(), "{:?}", q.errors);
        assert_eq!(q.bind_sections().count(), 1);
    }

    #[test]
    fn test_lex_error_keeps_best_effort_fields() {
        let q = parse("SELECT * FROM user WHERE name = 'open");
        assert_eq!(q.errors.len(), 1);
        assert!(q.errors[0].starts_with("line 1:33"));
        assert_eq!(q.kind, QueryType::Select);
        assert_eq!(q.table_names().len(), 1);
    }

    #[test]
    fn test_grammar_gap_falls_back_to_scan() {
        let q = parse("SELECT * FROM user WHERE");
        assert!(q.errors.is_empty(), "{:?}", q.errors);
        assert_eq!(q.kind, QueryType::Select);
        assert_eq!(q.table_names().into_iter().collect::<Vec<_>>(), vec!["user"]);
    }

    #[test]
    fn test_sqlite_only_syntax_accepted() {
        let queries = [
            "SELECT * FROM user WHERE name GLOB :name AND id = :id",
            "SELECT * FROM user WHERE name MATCH :name",
            "SELECT * FROM user WHERE name IS NOT :name",
            "SELECT * FROM user INDEXED BY sqlite_autoindex_user_1 WHERE id = :id",
        ];
        for text in queries {
            let q = parse(text);
            assert!(q.errors.is_empty(), "{text}: {:?}", q.errors);
            assert_eq!(q.kind, QueryType::Select, "{text}");
            assert_eq!(q.table_names().into_iter().collect::<Vec<_>>(), vec!["user"], "{text}");
        }
    }

    #[test]
    fn test_sqlite_only_write_keeps_kind() {
        let q = parse("DELETE FROM user INDEXED BY user_name WHERE name GLOB ?");
        assert!(q.errors.is_empty(), "{:?}", q.errors);
        assert_eq!(q.kind, QueryType::Delete);
        assert_eq!(q.table_names().into_iter().collect::<Vec<_>>(), vec!["user"]);
    }

    #[test]
    fn test_unknown_statement_kind() {
        let q = parse("PRAGMA foreign_keys");
        assert_eq!(q.kind, QueryType::Unknown);
        assert!(q.errors.iter().any(|e| e.contains("PRAGMA")));
    }

    #[test]
    fn test_empty_text_is_unknown() {
        let q = parse("");
        assert_eq!(q.kind, QueryType::Unknown);
        assert!(q.has_errors());
    }

    #[test]
    fn test_insert_with_named_params() {
        let q = parse("INSERT INTO pet (owner_id, name) VALUES (:owner, :name)");
        assert!(q.errors.is_empty(), "{:?}", q.errors);
        assert_eq!(q.kind, QueryType::Insert);
        assert_eq!(q.table_names().into_iter().collect::<Vec<_>>(), vec!["pet"]);
    }
}
