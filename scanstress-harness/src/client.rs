//! Protocol client: logical connections, statements, and forward-only
//! cursors over the JSON query protocol.
//!
//! One [`ProtocolClient`] wraps one HTTP client pointed at one endpoint;
//! every scan unit builds its own, so no connection state is ever shared
//! across units. There are no implicit retries at any layer.

use reqwest::Client as HttpClient;
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use scanstress_model::{ClientError, Frame, WireRequest, WireResponse};

/// Rows requested per frame. Small enough that real catalogs exercise the
/// fetch path, large enough not to dominate round-trip count.
const FETCH_SIZE: u64 = 100;

#[derive(Debug, Clone)]
pub struct ProtocolClient {
    http: HttpClient,
    endpoint: Url,
}

impl ProtocolClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let endpoint = Url::parse(base_url).map_err(|err| {
            ClientError::Connection(format!("invalid endpoint {base_url}: {err}"))
        })?;
        Ok(Self {
            http: HttpClient::new(),
            endpoint,
        })
    }

    /// Open a logical connection. Either the session is fully established
    /// or this fails with [`ClientError::Connection`]; a partially
    /// initialized handle is never returned.
    pub async fn connect(base_url: &str) -> Result<Connection, ClientError> {
        let client = Self::new(base_url)?;
        let id = Uuid::new_v4();
        let request = WireRequest::OpenConnection { connection_id: id };
        match client.call(&request).await {
            Ok(WireResponse::Ack {}) => Ok(Connection {
                client,
                id,
                open: true,
            }),
            Ok(other) => Err(ClientError::Connection(format!(
                "unexpected open response: {other:?}"
            ))),
            Err(err) => Err(ClientError::Connection(err.to_string())),
        }
    }

    /// One protocol round trip. Transport failures surface as `Execution`
    /// (callers in the open path re-wrap them), undecodable bodies as
    /// `Protocol`, and error response bodies as `Execution` with the
    /// server's message.
    async fn call(&self, request: &WireRequest) -> Result<WireResponse, ClientError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|err| ClientError::Execution(format!("transport failure: {err}")))?;
        let body: WireResponse = response.json().await.map_err(|err| {
            ClientError::Protocol(format!("undecodable response body: {err}"))
        })?;
        match body {
            WireResponse::Error { message, .. } => Err(ClientError::Execution(message)),
            other => Ok(other),
        }
    }
}

/// One client session against the endpoint. Exclusively owned by the scan
/// unit that opened it.
#[derive(Debug)]
pub struct Connection {
    client: ProtocolClient,
    id: Uuid,
    open: bool,
}

impl Connection {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wildcard metadata enumeration: a cursor over descriptor rows for
    /// every queryable object, plus the server-side statement holding it.
    pub async fn tables(&self) -> Result<(Statement<'_>, Cursor<'_>), ClientError> {
        let request = WireRequest::Tables {
            connection_id: self.id,
        };
        match self.client.call(&request).await? {
            WireResponse::ResultSet {
                statement_id,
                columns,
                first_frame,
            } => Ok((
                Statement {
                    conn: self,
                    id: statement_id,
                    open: true,
                },
                Cursor::new(self, statement_id, columns, first_frame),
            )),
            other => Err(unexpected("tables", &other)),
        }
    }

    /// Execute a scan query on a fresh statement. If execution fails after
    /// the statement was created, the statement is released before the
    /// error is surfaced.
    pub async fn execute(
        &self,
        sql: &str,
    ) -> Result<(Statement<'_>, Cursor<'_>), ClientError> {
        let request = WireRequest::CreateStatement {
            connection_id: self.id,
        };
        let statement_id = match self.client.call(&request).await? {
            WireResponse::CreateStatement { statement_id } => statement_id,
            other => return Err(unexpected("createStatement", &other)),
        };
        let mut statement = Statement {
            conn: self,
            id: statement_id,
            open: true,
        };

        let request = WireRequest::PrepareAndExecute {
            connection_id: self.id,
            statement_id,
            sql: sql.to_owned(),
            max_rows_in_first_frame: FETCH_SIZE,
        };
        let executed = match self.client.call(&request).await {
            Ok(WireResponse::ResultSet {
                columns,
                first_frame,
                ..
            }) => Ok(Cursor::new(self, statement_id, columns, first_frame)),
            Ok(other) => Err(unexpected("prepareAndExecute", &other)),
            Err(err) => Err(err),
        };

        match executed {
            Ok(cursor) => Ok((statement, cursor)),
            Err(err) => {
                // Best effort; the execute failure is the one that matters.
                let _ = statement.close().await;
                Err(err)
            }
        }
    }

    /// Idempotent release. Safe to call again after a prior failure; only
    /// the first call reaches the wire.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        let request = WireRequest::CloseConnection {
            connection_id: self.id,
        };
        match self.client.call(&request).await? {
            WireResponse::Ack {} => Ok(()),
            other => Err(unexpected("closeConnection", &other)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

/// One server-side statement, released through [`Statement::close`].
#[derive(Debug)]
pub struct Statement<'a> {
    conn: &'a Connection,
    id: u64,
    open: bool,
}

impl Statement<'_> {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Idempotent release, same discipline as [`Connection::close`].
    pub async fn close(&mut self) -> Result<(), ClientError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        let request = WireRequest::CloseStatement {
            connection_id: self.conn.id,
            statement_id: self.id,
        };
        match self.conn.client.call(&request).await? {
            WireResponse::Ack {} => Ok(()),
            other => Err(unexpected("closeStatement", &other)),
        }
    }
}

/// Forward-only finite cursor. Fetches follow-up frames transparently until
/// the endpoint marks a frame as final.
#[derive(Debug)]
pub struct Cursor<'a> {
    conn: &'a Connection,
    statement_id: u64,
    columns: Vec<String>,
    frame: Frame,
    next_in_frame: usize,
    consumed: u64,
}

impl<'a> Cursor<'a> {
    fn new(
        conn: &'a Connection,
        statement_id: u64,
        columns: Vec<String>,
        first_frame: Frame,
    ) -> Self {
        Self {
            conn,
            statement_id,
            columns,
            frame: first_frame,
            next_in_frame: 0,
            consumed: 0,
        }
    }

    /// Fixed for the lifetime of the cursor, taken from the result-set
    /// signature.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub async fn next_row(&mut self) -> Result<Option<Vec<Value>>, ClientError> {
        loop {
            if self.next_in_frame < self.frame.rows.len() {
                let row = self.frame.rows[self.next_in_frame].clone();
                self.next_in_frame += 1;
                self.consumed += 1;
                return Ok(Some(row));
            }
            if self.frame.done {
                return Ok(None);
            }

            let request = WireRequest::Fetch {
                connection_id: self.conn.id,
                statement_id: self.statement_id,
                offset: self.consumed,
                fetch_max_row_count: FETCH_SIZE,
            };
            let frame = match self.conn.client.call(&request).await? {
                WireResponse::Frame { frame } => frame,
                other => return Err(unexpected("fetch", &other)),
            };
            if frame.rows.is_empty() && !frame.done {
                return Err(ClientError::Protocol(
                    "endpoint returned an empty non-final frame".into(),
                ));
            }
            self.frame = frame;
            self.next_in_frame = 0;
        }
    }

    /// Read a column by 1-based position, as the protocol addresses them.
    pub fn column<'r>(
        &self,
        row: &'r [Value],
        position: usize,
    ) -> Result<&'r Value, ClientError> {
        position
            .checked_sub(1)
            .and_then(|idx| row.get(idx))
            .ok_or_else(|| {
                ClientError::Protocol(format!(
                    "row has {} columns, wanted position {position}",
                    row.len()
                ))
            })
    }
}

fn unexpected(operation: &str, response: &WireResponse) -> ClientError {
    ClientError::Protocol(format!(
        "unexpected {operation} response: {response:?}"
    ))
}
