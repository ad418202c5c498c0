//! In-process HTTP query service used as the system under test.
//!
//! Serves an Avatica-flavored JSON protocol (session open/close, wildcard
//! metadata enumeration, full-table scans with framed fetches, statement
//! release) over an in-memory catalog loaded from a JSON model file. The
//! state handle stays reachable from [`ServiceHandle`] so tests can assert
//! that every connection and statement was released after a run.

pub mod catalog;
pub mod error;
mod handlers;
pub mod state;

pub use catalog::{Catalog, CatalogError, ModelFile, SchemaDef, TableDef};
pub use error::{ServiceError, ServiceResult};
pub use state::ServiceState;

use std::sync::Arc;

use axum::{Router, routing::post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Rows per fetch frame when the caller does not choose one.
pub const DEFAULT_FRAME_SIZE: u64 = 100;

pub fn router(state: Arc<ServiceState>) -> Router {
    Router::new()
        .route("/", post(handlers::protocol_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A running endpoint bound to an ephemeral localhost port. Dropping the
/// handle aborts the server task.
#[derive(Debug)]
pub struct ServiceHandle {
    base_url: String,
    state: Arc<ServiceState>,
    task: tokio::task::JoinHandle<()>,
}

impl ServiceHandle {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn state(&self) -> Arc<ServiceState> {
        Arc::clone(&self.state)
    }

    pub async fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Bind `127.0.0.1:0` and serve the protocol over `catalog` until the
/// returned handle is dropped.
pub async fn serve(
    catalog: Catalog,
    frame_size: u64,
) -> Result<ServiceHandle, std::io::Error> {
    let state = Arc::new(ServiceState::new(catalog, frame_size));
    let app = router(Arc::clone(&state));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let base_url = format!("http://{addr}");
    info!(%base_url, "query service listening");

    let task = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            error!(error = %err, "query service terminated");
        }
    });

    Ok(ServiceHandle {
        base_url,
        state,
        task,
    })
}
