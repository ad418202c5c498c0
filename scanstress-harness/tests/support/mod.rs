//! Shared fixtures for the harness integration tests.

use std::sync::Arc;

use scanstress_harness::{ClientError, RunAggregate, RunTotals, StressRun};
use scanstress_server::{Catalog, SchemaDef, ServiceHandle, TableDef};
use serde_json::{Value, json};

// Items are used across test binaries, not all of them in every binary.
#[allow(dead_code)]
pub fn number_rows(count: u64) -> Vec<Vec<Value>> {
    (0..count)
        .map(|i| vec![json!(i), json!(format!("row-{i}"))])
        .collect()
}

/// One `sales` schema holding two objects of five rows each, the fixture
/// the accounting scenarios are written against.
#[allow(dead_code)]
pub fn sales_catalog() -> Catalog {
    Catalog::new(vec![SchemaDef {
        name: "sales".into(),
        tables: vec![
            TableDef::new("EMPS", vec!["ID", "NAME"], number_rows(5)),
            TableDef::new("DEPTS", vec!["ID", "NAME"], number_rows(5)),
        ],
    }])
}

#[allow(dead_code)]
pub async fn run_against(
    service: &ServiceHandle,
    target_schema: &str,
    units: usize,
) -> Result<RunTotals, ClientError> {
    let totals = Arc::new(RunAggregate::new());
    StressRun::new(service.base_url(), target_schema)
        .with_units(units)
        .execute(totals)
        .await
}
