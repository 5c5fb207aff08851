/// Query verification against an in-memory reference database.
///
/// The schema declared by entities and views is replayed into a private
/// SQLite connection once per round. Each query is then prepared against it,
/// which validates names and yields the result columns with their declared
/// types.
use rusqlite::types::Null;
use rusqlite::Connection;
use thiserror::Error;
use tracing::debug;

use crate::model::{Affinity, Declarations};
use crate::sql::{ColumnInfo, QueryResultInfo};

#[derive(Debug, Error)]
pub enum VerifierError {
    #[error("cannot open the reference database: {0}")]
    Open(#[source] rusqlite::Error),

    #[error("cannot create table for entity `{entity}`: {source}")]
    Entity {
        entity: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("cannot resolve entity `{entity}`: {reason}")]
    Shape { entity: String, reason: String },

    #[error("cannot create view `{view}`: {source}")]
    View {
        view: String,
        #[source]
        source: rusqlite::Error,
    },
}

pub struct DatabaseVerifier {
    conn: Connection,
}

impl DatabaseVerifier {
    /// Builds the reference schema from every entity and view.
    pub fn create(decls: &Declarations) -> Result<Self, VerifierError> {
        let conn = Connection::open_in_memory().map_err(VerifierError::Open)?;

        for entity in &decls.entities {
            let ddl = match &entity.ddl {
                Some(ddl) => ddl.clone(),
                None => {
                    let shape = decls
                        .resolve_shape(&entity.pojo.type_ref())
                        .map_err(|reason| VerifierError::Shape {
                            entity: entity.name().to_string(),
                            reason,
                        })?;
                    entity.create_table_query(&shape.columns())
                }
            };
            debug!(entity = entity.name(), %ddl, "creating reference table");
            conn.execute_batch(&ddl).map_err(|source| VerifierError::Entity {
                entity: entity.name().to_string(),
                source,
            })?;
        }

        // Views may depend on each other; keep retrying while progress is made.
        let mut pending: Vec<_> = decls.views.iter().collect();
        while !pending.is_empty() {
            let mut failed = Vec::new();
            let mut first_error = None;
            for view in &pending {
                if let Err(source) = conn.execute_batch(&view.create_view_query()) {
                    if first_error.is_none() {
                        first_error = Some((view.view_name().to_string(), source));
                    }
                    failed.push(*view);
                }
            }
            if failed.len() == pending.len() {
                if let Some((view, source)) = first_error {
                    return Err(VerifierError::View { view, source });
                }
            }
            pending = failed;
        }

        Ok(Self { conn })
    }

    /// Prepares `sql` and reports its result columns or the SQLite error.
    pub fn analyze(&self, sql: &str) -> QueryResultInfo {
        match self.try_analyze(sql) {
            Ok(info) => info,
            Err(e) => {
                debug!(error = %e, "query failed verification");
                QueryResultInfo::failed(e.to_string())
            }
        }
    }

    fn try_analyze(&self, sql: &str) -> rusqlite::Result<QueryResultInfo> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<ColumnInfo> = stmt
            .columns()
            .iter()
            .map(|c| ColumnInfo {
                name: c.name().to_string(),
                affinity: c.decl_type().and_then(Affinity::from_decl_type),
            })
            .collect();
        for index in 1..=stmt.parameter_count() {
            stmt.raw_bind_parameter(index, Null)?;
        }
        // Only read-only statements are stepped; writes are validated by prepare.
        if stmt.readonly() && stmt.column_count() > 0 {
            let mut rows = stmt.raw_query();
            rows.next()?;
        }
        Ok(QueryResultInfo {
            columns,
            error: None,
        })
    }
}
