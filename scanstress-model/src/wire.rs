//! Request/response bodies and result-set framing.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Column order of metadata descriptor rows, in JDBC `getTables` layout.
///
/// Positions are 1-based on the wire, matching how clients address columns.
pub const DESCRIPTOR_COLUMNS: [&str; 4] =
    ["TABLE_CAT", "TABLE_SCHEM", "TABLE_NAME", "TABLE_TYPE"];

/// 1-based position of the container (schema) name in a descriptor row.
pub const DESCRIPTOR_SCHEMA_POS: usize = 2;

/// 1-based position of the object (table) name in a descriptor row.
pub const DESCRIPTOR_TABLE_POS: usize = 3;

/// One page of result rows. A result set is a sequence of frames; the frame
/// with `done == true` is the last one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Row offset of the first row in this frame within the full result set.
    pub offset: u64,
    /// True when no further rows exist past this frame.
    pub done: bool,
    pub rows: Vec<Vec<Value>>,
}

impl Frame {
    pub fn empty() -> Self {
        Self {
            offset: 0,
            done: true,
            rows: Vec::new(),
        }
    }
}

/// Protocol requests, discriminated by the `request` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "camelCase")]
pub enum WireRequest {
    /// Session negotiation. The client supplies the connection id, as the
    /// Avatica remote driver does.
    #[serde(rename_all = "camelCase")]
    OpenConnection { connection_id: Uuid },

    /// Release a session. Idempotent on the server side.
    #[serde(rename_all = "camelCase")]
    CloseConnection { connection_id: Uuid },

    #[serde(rename_all = "camelCase")]
    CreateStatement { connection_id: Uuid },

    /// Wildcard metadata enumeration: descriptor rows for every queryable
    /// object visible to the connection, no catalog/schema/table filter.
    #[serde(rename_all = "camelCase")]
    Tables { connection_id: Uuid },

    #[serde(rename_all = "camelCase")]
    PrepareAndExecute {
        connection_id: Uuid,
        statement_id: u64,
        sql: String,
        max_rows_in_first_frame: u64,
    },

    #[serde(rename_all = "camelCase")]
    Fetch {
        connection_id: Uuid,
        statement_id: u64,
        offset: u64,
        fetch_max_row_count: u64,
    },

    /// Release a statement and its result set. Idempotent on the server side.
    #[serde(rename_all = "camelCase")]
    CloseStatement {
        connection_id: Uuid,
        statement_id: u64,
    },
}

/// Protocol responses, discriminated by the `response` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "response", rename_all = "camelCase")]
pub enum WireResponse {
    /// Acknowledgement carrying no payload (open/close operations).
    Ack {},

    #[serde(rename_all = "camelCase")]
    CreateStatement { statement_id: u64 },

    /// Column signature plus the first frame of rows. The column count of
    /// the cursor is the length of `columns`.
    #[serde(rename_all = "camelCase")]
    ResultSet {
        statement_id: u64,
        columns: Vec<String>,
        first_frame: Frame,
    },

    /// A follow-up frame produced by a fetch.
    Frame { frame: Frame },

    #[serde(rename_all = "camelCase")]
    Error { message: String, code: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_tag_matches_protocol_name() {
        let req = WireRequest::OpenConnection {
            connection_id: Uuid::nil(),
        };
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["request"], "openConnection");
        assert!(body["connectionId"].is_string());
    }

    #[test]
    fn result_set_response_decodes() {
        let body = serde_json::json!({
            "response": "resultSet",
            "statementId": 7,
            "columns": DESCRIPTOR_COLUMNS,
            "firstFrame": { "offset": 0, "done": true, "rows": [[null, "SALES", "EMPS", "TABLE"]] },
        });
        let decoded: WireResponse = serde_json::from_value(body).unwrap();
        match decoded {
            WireResponse::ResultSet {
                statement_id,
                columns,
                first_frame,
            } => {
                assert_eq!(statement_id, 7);
                assert_eq!(columns.len(), DESCRIPTOR_COLUMNS.len());
                assert!(first_frame.done);
                assert_eq!(
                    first_frame.rows[0][DESCRIPTOR_SCHEMA_POS - 1],
                    serde_json::json!("SALES")
                );
            }
            other => panic!("expected resultSet, got {other:?}"),
        }
    }
}
