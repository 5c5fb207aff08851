/// Statement kind and table extraction.
///
/// Uses `sqlparser` as the frontend. Only two facts are taken from the AST:
/// what kind of statement it is and which tables it reads or writes. Common
/// table expression names are not tables and are filtered out.
use std::collections::BTreeSet;
use std::ops::ControlFlow;

use sqlparser::ast::{self as sp, Visit, Visitor};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser as SqlParser;

use super::lexer::{Token, TokenKind};
use super::query::{QueryType, Table};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub kind: QueryType,
    pub tables: BTreeSet<Table>,
}

/// Parses `sql` (placeholders already normalised to `?`) with sqlparser.
pub fn analyze(sql: &str) -> Result<Analysis, String> {
    let statements =
        SqlParser::parse_sql(&SQLiteDialect {}, sql).map_err(|e| format!("SQL parse error: {e}"))?;
    let [statement] = statements.as_slice() else {
        return Err(format!(
            "expected exactly one statement, found {}",
            statements.len()
        ));
    };

    let kind = statement_kind(statement);
    let mut collector = RelationCollector::default();
    statement.visit(&mut collector);
    let tables = collector.into_tables();
    Ok(Analysis { kind, tables })
}

fn statement_kind(statement: &sp::Statement) -> QueryType {
    match statement {
        sp::Statement::Query(query) => match query.body.as_ref() {
            sp::SetExpr::Insert(_) => QueryType::Insert,
            sp::SetExpr::Update(_) => QueryType::Update,
            _ => QueryType::Select,
        },
        sp::Statement::Insert(_) => QueryType::Insert,
        sp::Statement::Update { .. } => QueryType::Update,
        sp::Statement::Delete(_) => QueryType::Delete,
        _ => QueryType::Unknown,
    }
}

#[derive(Default)]
struct RelationCollector {
    relations: Vec<String>,
    cte_names: BTreeSet<String>,
}

impl RelationCollector {
    fn into_tables(self) -> BTreeSet<Table> {
        let ctes = self.cte_names;
        self.relations
            .into_iter()
            .filter(|name| !ctes.contains(&name.to_ascii_lowercase()))
            .map(Table::new)
            .collect()
    }
}

impl Visitor for RelationCollector {
    type Break = ();

    fn pre_visit_query(&mut self, query: &sp::Query) -> ControlFlow<Self::Break> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.cte_names
                    .insert(cte.alias.name.value.to_ascii_lowercase());
            }
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_relation(&mut self, relation: &sp::ObjectName) -> ControlFlow<Self::Break> {
        if let Some(ident) = relation.0.last() {
            self.relations.push(ident.value.clone());
        }
        ControlFlow::Continue(())
    }
}

/// Best-effort kind and tables from tokens, for text sqlparser rejects.
pub fn scan(tokens: &[Token]) -> Analysis {
    let significant: Vec<&Token> = tokens
        .iter()
        .filter(|t| !t.is_trivia() && t.kind != TokenKind::LParen)
        .collect();

    let kind = significant
        .iter()
        .find(|t| t.kind == TokenKind::Word)
        .map(|t| keyword_kind(&t.text))
        .unwrap_or(QueryType::Unknown);
    let starts_with_cte = significant.first().is_some_and(|t| t.is_keyword("WITH"));
    let kind = if kind == QueryType::Select && starts_with_cte {
        significant
            .iter()
            .map(|t| keyword_kind(&t.text))
            .find(|k| k.is_write())
            .unwrap_or(QueryType::Select)
    } else {
        kind
    };

    let mut tables = BTreeSet::new();
    let mut cte_names = BTreeSet::new();
    for window in significant.windows(2) {
        let [keyword, next] = window else { continue };
        let names_cte = keyword.is_keyword("WITH") || keyword.is_keyword("RECURSIVE") || keyword.text == ",";
        if starts_with_cte && names_cte {
            if let Some(name) = next.ident() {
                cte_names.insert(name.to_ascii_lowercase());
            }
        }
        let introduces_table = ["FROM", "JOIN", "UPDATE", "INTO"]
            .iter()
            .any(|k| keyword.is_keyword(k));
        if !introduces_table {
            continue;
        }
        if let Some(name) = next.ident() {
            if next.kind == TokenKind::Word && is_reserved(name) {
                continue;
            }
            tables.insert(name.to_string());
        }
    }
    // CTE names are not tables.
    let tables = tables
        .into_iter()
        .filter(|t| !cte_names.contains(&t.to_ascii_lowercase()))
        .map(Table::new)
        .collect();
    Analysis { kind, tables }
}

fn keyword_kind(word: &str) -> QueryType {
    match word.to_ascii_uppercase().as_str() {
        "SELECT" | "WITH" | "VALUES" => QueryType::Select,
        "INSERT" | "REPLACE" => QueryType::Insert,
        "UPDATE" => QueryType::Update,
        "DELETE" => QueryType::Delete,
        _ => QueryType::Unknown,
    }
}

fn is_reserved(word: &str) -> bool {
    const RESERVED: &[&str] = &[
        "SELECT", "WHERE", "ON", "AS", "SET", "VALUES", "LEFT", "INNER", "OUTER", "CROSS",
        "NATURAL", "JOIN", "GROUP", "ORDER", "LIMIT", "WITH",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(word))
}

#[cfg(test)]
mod tests {
    use super::super::lexer::tokenize;
    use super::*;

    fn names(tables: &BTreeSet<Table>) -> Vec<&str> {
        tables.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_analyze_select_with_join() {
        let a = analyze("SELECT * FROM user u JOIN pet p ON p.owner_id = u.id WHERE u.id = ?").unwrap();
        assert_eq!(a.kind, QueryType::Select);
        assert_eq!(names(&a.tables), vec!["pet", "user"]);
    }

    #[test]
    fn test_analyze_subquery_and_quoted() {
        let a = analyze("SELECT `name` FROM (SELECT * FROM `user` WHERE id IN (SELECT owner_id FROM pet))").unwrap();
        assert_eq!(names(&a.tables), vec!["pet", "user"]);
    }

    #[test]
    fn test_analyze_cte_names_excluded() {
        let a = analyze("WITH active AS (SELECT * FROM user WHERE active = 1) SELECT * FROM active").unwrap();
        assert_eq!(a.kind, QueryType::Select);
        assert_eq!(names(&a.tables), vec!["user"]);
    }

    #[test]
    fn test_analyze_write_kinds() {
        assert_eq!(analyze("INSERT INTO user (id) VALUES (?)").unwrap().kind, QueryType::Insert);
        assert_eq!(analyze("UPDATE user SET name = ? WHERE id = ?").unwrap().kind, QueryType::Update);
        let delete = analyze("DELETE FROM user WHERE id = ?").unwrap();
        assert_eq!(delete.kind, QueryType::Delete);
        assert_eq!(names(&delete.tables), vec!["user"]);
    }

    #[test]
    fn test_analyze_other_statement_is_unknown() {
        assert_eq!(analyze("CREATE TABLE t (id INTEGER)").unwrap().kind, QueryType::Unknown);
    }

    #[test]
    fn test_analyze_rejects_multiple_statements() {
        assert!(analyze("SELECT 1; SELECT 2").is_err());
    }

    #[test]
    fn test_scan_fallback() {
        let lexed = tokenize("SELECT * FROM user WHERE id IN (SELECT owner_id FROM pet WHERE ) ");
        let a = scan(&lexed.tokens);
        assert_eq!(a.kind, QueryType::Select);
        assert_eq!(names(&a.tables), vec!["pet", "user"]);
    }

    #[test]
    fn test_scan_unknown_keyword() {
        let lexed = tokenize("EXPLODE user");
        assert_eq!(scan(&lexed.tokens).kind, QueryType::Unknown);
    }
}
