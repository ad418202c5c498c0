//! Connection and statement registries for one service instance.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use tokio::sync::RwLock;
use uuid::Uuid;

use scanstress_model::Frame;

use crate::{
    catalog::Catalog,
    error::{ServiceError, ServiceResult},
};

/// Where a statement's rows come from.
#[derive(Debug, Clone)]
enum ResultSource {
    /// Wildcard metadata enumeration over the whole catalog.
    Tables,
    /// Full scan of one table.
    Scan { schema: String, table: String },
}

#[derive(Debug)]
struct StatementEntry {
    source: Option<ResultSource>,
}

#[derive(Debug, Default)]
struct ConnectionEntry {
    statements: HashMap<u64, StatementEntry>,
}

/// Shared state behind the protocol handler. One instance per served
/// endpoint; connections and statements live here until released.
#[derive(Debug)]
pub struct ServiceState {
    catalog: Catalog,
    frame_size: u64,
    next_statement_id: AtomicU64,
    connections: RwLock<HashMap<Uuid, ConnectionEntry>>,
}

impl ServiceState {
    pub fn new(catalog: Catalog, frame_size: u64) -> Self {
        Self {
            catalog,
            frame_size: frame_size.max(1),
            next_statement_id: AtomicU64::new(1),
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Sessions currently open. Zero after a leak-free run.
    pub async fn open_connections(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Statements currently open across all sessions. Zero after a
    /// leak-free run.
    pub async fn open_statements(&self) -> usize {
        self.connections
            .read()
            .await
            .values()
            .map(|conn| conn.statements.len())
            .sum()
    }

    pub async fn open_connection(&self, id: Uuid) -> ServiceResult<()> {
        let mut connections = self.connections.write().await;
        if connections.contains_key(&id) {
            return Err(ServiceError::conflict(format!(
                "connection {id} already open"
            )));
        }
        connections.insert(id, ConnectionEntry::default());
        tracing::debug!(connection = %id, "connection opened");
        Ok(())
    }

    /// Idempotent: closing an unknown connection is a no-op. Any statements
    /// still registered under the connection are released with it.
    pub async fn close_connection(&self, id: Uuid) {
        let removed = self.connections.write().await.remove(&id);
        if removed.is_some() {
            tracing::debug!(connection = %id, "connection closed");
        }
    }

    pub async fn create_statement(&self, connection_id: Uuid) -> ServiceResult<u64> {
        let mut connections = self.connections.write().await;
        let conn = known_connection(&mut connections, connection_id)?;
        let statement_id = self.next_statement_id.fetch_add(1, Ordering::Relaxed);
        conn.statements
            .insert(statement_id, StatementEntry { source: None });
        Ok(statement_id)
    }

    /// Wildcard metadata enumeration. Allocates a server-side statement
    /// holding the descriptor result set and returns its id, the descriptor
    /// column signature, and the first frame.
    pub async fn tables(
        &self,
        connection_id: Uuid,
    ) -> ServiceResult<(u64, Vec<String>, Frame)> {
        let statement_id = self.create_statement(connection_id).await?;
        self.bind_source(connection_id, statement_id, ResultSource::Tables)
            .await?;
        let frame = self.page(ResultSource::Tables, 0, self.frame_size)?;
        Ok((statement_id, self.catalog.descriptor_columns(), frame))
    }

    pub async fn prepare_and_execute(
        &self,
        connection_id: Uuid,
        statement_id: u64,
        sql: &str,
        max_rows_in_first_frame: u64,
    ) -> ServiceResult<(Vec<String>, Frame)> {
        let (schema, table) = parse_scan(sql).ok_or_else(|| {
            ServiceError::bad_request(format!(
                "unsupported statement, only full-table scans are served: {sql}"
            ))
        })?;
        let columns = self
            .catalog
            .table(&schema, &table)
            .ok_or_else(|| {
                ServiceError::not_found(format!("no such table {schema}.{table}"))
            })?
            .columns
            .clone();

        let source = ResultSource::Scan { schema, table };
        self.bind_source(connection_id, statement_id, source.clone())
            .await?;
        let frame = self.page(source, 0, max_rows_in_first_frame)?;
        Ok((columns, frame))
    }

    pub async fn fetch(
        &self,
        connection_id: Uuid,
        statement_id: u64,
        offset: u64,
        fetch_max_row_count: u64,
    ) -> ServiceResult<Frame> {
        let source = {
            let mut connections = self.connections.write().await;
            let conn = known_connection(&mut connections, connection_id)?;
            let stmt = conn.statements.get(&statement_id).ok_or_else(|| {
                ServiceError::not_found(format!("unknown statement {statement_id}"))
            })?;
            stmt.source.clone().ok_or_else(|| {
                ServiceError::bad_request(format!(
                    "statement {statement_id} has no open result set"
                ))
            })?
        };
        self.page(source, offset, fetch_max_row_count)
    }

    /// Idempotent: closing an unknown statement is a no-op.
    pub async fn close_statement(&self, connection_id: Uuid, statement_id: u64) {
        if let Some(conn) = self.connections.write().await.get_mut(&connection_id) {
            conn.statements.remove(&statement_id);
        }
    }

    async fn bind_source(
        &self,
        connection_id: Uuid,
        statement_id: u64,
        source: ResultSource,
    ) -> ServiceResult<()> {
        let mut connections = self.connections.write().await;
        let conn = known_connection(&mut connections, connection_id)?;
        let stmt = conn.statements.get_mut(&statement_id).ok_or_else(|| {
            ServiceError::not_found(format!("unknown statement {statement_id}"))
        })?;
        stmt.source = Some(source);
        Ok(())
    }

    /// Serve one frame of a result set starting at `offset`. For scan
    /// sources carrying a fault threshold, rows up to the threshold are
    /// served normally and the fetch that would cross it fails.
    fn page(
        &self,
        source: ResultSource,
        offset: u64,
        max_rows: u64,
    ) -> ServiceResult<Frame> {
        let (rows, fail_after) = match &source {
            ResultSource::Tables => (self.catalog.descriptor_rows(), None),
            ResultSource::Scan { schema, table } => {
                let def = self.catalog.table(schema, table).ok_or_else(|| {
                    ServiceError::not_found(format!("no such table {schema}.{table}"))
                })?;
                (def.rows.clone(), def.fail_after)
            }
        };

        let total = rows.len() as u64;
        let mut limit = total;
        if let Some(fail_after) = fail_after {
            if offset >= fail_after && fail_after < total {
                return Err(ServiceError::internal(format!(
                    "injected fault after {fail_after} rows"
                )));
            }
            limit = limit.min(fail_after.max(offset));
        }

        let cap = if max_rows == 0 {
            self.frame_size
        } else {
            max_rows.min(self.frame_size)
        };
        let start = offset.min(limit);
        let end = limit.min(start + cap);
        let page = rows[start as usize..end as usize].to_vec();

        Ok(Frame {
            offset: start,
            done: end >= total,
            rows: page,
        })
    }
}

fn known_connection<'a>(
    connections: &'a mut HashMap<Uuid, ConnectionEntry>,
    id: Uuid,
) -> ServiceResult<&'a mut ConnectionEntry> {
    connections
        .get_mut(&id)
        .ok_or_else(|| ServiceError::not_found(format!("unknown connection {id}")))
}

/// Accepts exactly `select * from <schema>.<table>`, case-insensitive on the
/// keywords. Everything else is rejected; the service is a scan target, not
/// a query engine.
fn parse_scan(sql: &str) -> Option<(String, String)> {
    let trimmed = sql.trim().trim_end_matches(';');
    let lowered = trimmed.to_ascii_lowercase();
    let rest = lowered.strip_prefix("select * from ")?;
    let rest_start = trimmed.len() - rest.len();
    let qualified = trimmed[rest_start..].trim();
    let (schema, table) = qualified.split_once('.')?;
    if schema.is_empty() || table.is_empty() || table.contains('.') {
        return None;
    }
    Some((schema.trim().to_owned(), table.trim().to_owned()))
}
