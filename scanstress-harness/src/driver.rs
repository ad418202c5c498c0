//! Scan driver: the full sequence one unit performs against its own
//! logical connection.
//!
//! Open, enumerate every queryable object through a wildcard metadata
//! request, fully scan each object whose schema matches the target
//! (case-insensitive), release everything, close. All resources opened
//! here are released on every exit path, including failures; when both a
//! scan and its cleanup fail, the scan error wins.

use serde_json::Value;
use tracing::{debug, info};

use scanstress_model::{
    ClientError, DESCRIPTOR_SCHEMA_POS, DESCRIPTOR_TABLE_POS,
};

use crate::{
    aggregate::RunAggregate,
    client::{Connection, Cursor, ProtocolClient},
};

/// Per-unit outcome on the success path. The shared aggregate receives the
/// same counts; this report exists so unit results stay inspectable without
/// reading the shared counters mid-run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UnitReport {
    pub objects_scanned: u64,
    pub rows_loaded: u64,
}

/// Run one complete scan unit. `log_tables` makes this unit log the full
/// metadata enumeration before scanning; the orchestrator grants it to the
/// first unit only.
pub async fn run_unit(
    base_url: &str,
    target_schema: &str,
    totals: &RunAggregate,
    log_tables: bool,
) -> Result<UnitReport, ClientError> {
    let mut conn = ProtocolClient::connect(base_url).await?;
    let scanned = scan_connection(&conn, target_schema, totals, log_tables).await;
    let closed = conn.close().await;
    let report = scanned?;
    closed?;
    Ok(report)
}

async fn scan_connection(
    conn: &Connection,
    target_schema: &str,
    totals: &RunAggregate,
    log_tables: bool,
) -> Result<UnitReport, ClientError> {
    if log_tables {
        log_enumeration(conn).await?;
    }

    let (mut meta_stmt, mut descriptors) = conn.tables().await?;
    let scanned = scan_descriptors(conn, &mut descriptors, target_schema, totals).await;
    let closed = meta_stmt.close().await;
    let report = scanned?;
    closed?;
    Ok(report)
}

async fn scan_descriptors(
    conn: &Connection,
    descriptors: &mut Cursor<'_>,
    target_schema: &str,
    totals: &RunAggregate,
) -> Result<UnitReport, ClientError> {
    let mut report = UnitReport::default();
    while let Some(row) = descriptors.next_row().await? {
        let schema = descriptor_name(descriptors, &row, DESCRIPTOR_SCHEMA_POS)?;
        let table = descriptor_name(descriptors, &row, DESCRIPTOR_TABLE_POS)?;
        if !schema.eq_ignore_ascii_case(target_schema) {
            continue;
        }

        let rows = scan_object(conn, schema, table, totals).await?;
        totals.record_object();
        report.objects_scanned += 1;
        report.rows_loaded += rows;
        debug!(connection = %conn.id(), schema, table, rows, "object scanned");
    }
    Ok(report)
}

/// Full scan of one object: execute, drain every row decoding every column
/// by position, count each row, release the statement on both paths.
async fn scan_object(
    conn: &Connection,
    schema: &str,
    table: &str,
    totals: &RunAggregate,
) -> Result<u64, ClientError> {
    let sql = format!("select * from {schema}.{table}");
    let (mut stmt, mut cursor) = conn.execute(&sql).await?;
    let drained = drain(&mut cursor, totals).await;
    let closed = stmt.close().await;
    let rows = drained?;
    closed?;
    Ok(rows)
}

async fn drain(
    cursor: &mut Cursor<'_>,
    totals: &RunAggregate,
) -> Result<u64, ClientError> {
    let columns = cursor.column_count();
    let mut rows = 0u64;
    while let Some(row) = cursor.next_row().await? {
        // Touch every column by position; the values themselves are not
        // inspected. This exercises the full decode path.
        for position in 1..=columns {
            let _ = cursor.column(&row, position)?;
        }
        totals.record_row();
        rows += 1;
    }
    Ok(rows)
}

/// One-shot dump of the wildcard enumeration, the run's only look at the
/// whole catalog. Uses its own statement so the scan sequence proper stays
/// identical across units.
async fn log_enumeration(conn: &Connection) -> Result<(), ClientError> {
    let (mut stmt, mut cursor) = conn.tables().await?;
    let listed = async {
        let columns = cursor.column_count();
        while let Some(row) = cursor.next_row().await? {
            let rendered: Vec<String> = (1..=columns)
                .map(|position| {
                    cursor
                        .column(&row, position)
                        .map(render_value)
                })
                .collect::<Result<_, _>>()?;
            info!(descriptor = rendered.join(", "), "catalog object");
        }
        Ok::<_, ClientError>(())
    }
    .await;
    let closed = stmt.close().await;
    listed?;
    closed?;
    Ok(())
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn descriptor_name<'r>(
    cursor: &Cursor<'_>,
    row: &'r [Value],
    position: usize,
) -> Result<&'r str, ClientError> {
    cursor.column(row, position)?.as_str().ok_or_else(|| {
        ClientError::Protocol(format!(
            "descriptor column {position} is not a string"
        ))
    })
}
