use std::sync::Arc;

use axum::{Json, extract::State};

use scanstress_model::{WireRequest, WireResponse};

use crate::{error::ServiceResult, state::ServiceState};

/// Single protocol endpoint: every operation is a tagged `POST /` body.
pub async fn protocol_handler(
    State(state): State<Arc<ServiceState>>,
    Json(request): Json<WireRequest>,
) -> ServiceResult<Json<WireResponse>> {
    let response = match request {
        WireRequest::OpenConnection { connection_id } => {
            state.open_connection(connection_id).await?;
            WireResponse::Ack {}
        }
        WireRequest::CloseConnection { connection_id } => {
            state.close_connection(connection_id).await;
            WireResponse::Ack {}
        }
        WireRequest::CreateStatement { connection_id } => {
            let statement_id = state.create_statement(connection_id).await?;
            WireResponse::CreateStatement { statement_id }
        }
        WireRequest::Tables { connection_id } => {
            let (statement_id, columns, first_frame) =
                state.tables(connection_id).await?;
            WireResponse::ResultSet {
                statement_id,
                columns,
                first_frame,
            }
        }
        WireRequest::PrepareAndExecute {
            connection_id,
            statement_id,
            sql,
            max_rows_in_first_frame,
        } => {
            let (columns, first_frame) = state
                .prepare_and_execute(
                    connection_id,
                    statement_id,
                    &sql,
                    max_rows_in_first_frame,
                )
                .await?;
            WireResponse::ResultSet {
                statement_id,
                columns,
                first_frame,
            }
        }
        WireRequest::Fetch {
            connection_id,
            statement_id,
            offset,
            fetch_max_row_count,
        } => {
            let frame = state
                .fetch(connection_id, statement_id, offset, fetch_max_row_count)
                .await?;
            WireResponse::Frame { frame }
        }
        WireRequest::CloseStatement {
            connection_id,
            statement_id,
        } => {
            state.close_statement(connection_id, statement_id).await;
            WireResponse::Ack {}
        }
    };

    Ok(Json(response))
}
