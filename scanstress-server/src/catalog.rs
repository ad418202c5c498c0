//! In-memory catalog backing the service under test.
//!
//! The catalog is loaded from a JSON model file describing schemas and their
//! tables, each table carrying its full row contents inline. The harness core
//! never looks inside the model file; only this crate parses it.

use std::{fs, path::Path};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use scanstress_model::DESCRIPTOR_COLUMNS;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read model file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse model file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Root of the JSON model file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelFile {
    pub schemas: Vec<SchemaDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDef {
    pub name: String,
    #[serde(default)]
    pub tables: Vec<TableDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
    /// Fault injection: serve this many rows, then fail the fetch that would
    /// cross the threshold. Absent in normal catalogs.
    #[serde(default)]
    pub fail_after: Option<u64>,
}

impl TableDef {
    pub fn new(
        name: impl Into<String>,
        columns: Vec<&str>,
        rows: Vec<Vec<Value>>,
    ) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(str::to_owned).collect(),
            rows,
            fail_after: None,
        }
    }

    pub fn failing_after(mut self, rows: u64) -> Self {
        self.fail_after = Some(rows);
        self
    }
}

/// Immutable catalog shared by every connection of one service instance.
#[derive(Debug, Clone)]
pub struct Catalog {
    schemas: Vec<SchemaDef>,
}

impl Catalog {
    pub fn new(schemas: Vec<SchemaDef>) -> Self {
        Self { schemas }
    }

    pub fn from_model_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let model: ModelFile =
            serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self::new(model.schemas))
    }

    /// Descriptor rows for a wildcard metadata enumeration, one per table,
    /// in `DESCRIPTOR_COLUMNS` order. The catalog column is always null.
    pub fn descriptor_rows(&self) -> Vec<Vec<Value>> {
        self.schemas
            .iter()
            .flat_map(|schema| {
                schema.tables.iter().map(|table| {
                    vec![
                        Value::Null,
                        Value::String(schema.name.clone()),
                        Value::String(table.name.clone()),
                        Value::String("TABLE".to_owned()),
                    ]
                })
            })
            .collect()
    }

    pub fn descriptor_columns(&self) -> Vec<String> {
        DESCRIPTOR_COLUMNS.iter().map(|c| (*c).to_owned()).collect()
    }

    /// Case-sensitive lookup; scan queries carry names verbatim from the
    /// descriptor rows, so they always match exactly.
    pub fn table(&self, schema: &str, table: &str) -> Option<&TableDef> {
        self.schemas
            .iter()
            .find(|s| s.name == schema)?
            .tables
            .iter()
            .find(|t| t.name == table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_model() -> &'static str {
        r#"{
            "schemas": [
                {
                    "name": "SALES",
                    "tables": [
                        {
                            "name": "EMPS",
                            "columns": ["ID", "NAME"],
                            "rows": [[1, "Fred"], [2, "Eric"]]
                        },
                        {
                            "name": "DEPTS",
                            "columns": ["ID"],
                            "rows": [[10]],
                            "failAfter": 1
                        }
                    ]
                },
                { "name": "HR" }
            ]
        }"#
    }

    #[test]
    fn parses_model_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(sample_model().as_bytes()).unwrap();

        let catalog = Catalog::from_model_file(file.path()).unwrap();
        let emps = catalog.table("SALES", "EMPS").unwrap();
        assert_eq!(emps.columns, vec!["ID", "NAME"]);
        assert_eq!(emps.rows.len(), 2);
        assert_eq!(emps.fail_after, None);
        assert_eq!(catalog.table("SALES", "DEPTS").unwrap().fail_after, Some(1));
        assert!(catalog.table("HR", "EMPS").is_none());
    }

    #[test]
    fn descriptor_rows_follow_fixed_column_order() {
        let model: ModelFile = serde_json::from_str(sample_model()).unwrap();
        let catalog = Catalog::new(model.schemas);

        let rows = catalog.descriptor_rows();
        // Two SALES tables; the empty HR schema contributes nothing.
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1], Value::String("SALES".into()));
        assert_eq!(rows[0][2], Value::String("EMPS".into()));
        assert_eq!(rows[0][3], Value::String("TABLE".into()));
        assert!(rows[0][0].is_null());
    }

    #[test]
    fn missing_model_file_is_an_io_error() {
        let err = Catalog::from_model_file("/nonexistent/model.json").unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }
}
