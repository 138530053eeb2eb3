// SPDX-License-Identifier: AGPL-3.0-or-later

use std::convert::Infallible;
use std::time::{SystemTime, UNIX_EPOCH};

use async_graphql::http::{playground_source, GraphQLPlaygroundConfig};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{self, IntoResponse, Response};
use axum::Json;
use futures::Stream;
use log::{info, warn};
use serde::Deserialize;
use serde_json::json;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::bus::{ServiceMessage, TableAction, TableEvent};
use crate::db::query::Direction;
use crate::db::sql::table_name;
use crate::http::context::HttpServiceContext;
use crate::logs::read_logs;
use crate::schema::errors::ProviderError;

/// Errors surfaced by the HTTP routes.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::InternalError(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::UnknownTenant(_) => ApiError::NotFound(err.to_string()),
            ProviderError::Sdl(_) | ProviderError::Contract(_) => {
                ApiError::BadRequest(err.to_string())
            }
            ProviderError::Schema(_) => ApiError::InternalError(err.to_string()),
        }
    }
}

/// Query parameters selecting the (tenant, chain) pair a GraphQL request runs against.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLParams {
    /// Tenant identifier.
    pub id: String,

    /// Chain partition.
    #[serde(rename = "chainId")]
    pub chain_id: String,
}

/// Handle GraphQL playground requests at the given path.
pub async fn handle_graphql_playground(path: &str) -> impl IntoResponse {
    response::Html(playground_source(GraphQLPlaygroundConfig::new(path)))
}

/// Handle GraphQL requests against the schema of one (tenant, chain) pair.
pub async fn handle_graphql_query(
    Extension(context): Extension<HttpServiceContext>,
    Query(params): Query<GraphQLParams>,
    req: GraphQLRequest,
) -> Result<GraphQLResponse, ApiError> {
    let response = context
        .schemas
        .execute(&params.id, &params.chain_id, req.into_inner())
        .await?;

    Ok(response.into())
}

/// Handle requests for the derived SDL of one (tenant, chain) pair.
///
/// Useful for inspecting the generated query surface without introspection queries.
pub async fn handle_graphql_sdl(
    Extension(context): Extension<HttpServiceContext>,
    Query(params): Query<GraphQLParams>,
) -> Result<String, ApiError> {
    let contract = context.provider.contract(&params.id, &params.chain_id)?;

    Ok(contract.sdl)
}

/// Handle tenant deployment webhooks.
///
/// Validates that the tenant's schema document compiles and evicts any stale compiled
/// contracts so the next query picks up the new document.
pub async fn handle_deploy_tenant(
    Extension(context): Extension<HttpServiceContext>,
    Path(tenant): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    context.provider.validate(&tenant)?;
    context.provider.invalidate(&tenant);
    info!("Deployed tenant {}", tenant);

    Ok(Json(json!({ "success": true, "tenant": tenant })))
}

/// Handle tenant removal webhooks, dropping all compiled contracts of the tenant.
pub async fn handle_delete_tenant(
    Extension(context): Extension<HttpServiceContext>,
    Path(tenant): Path<String>,
) -> Json<serde_json::Value> {
    context.provider.invalidate(&tenant);
    info!("Deleted tenant {}", tenant);

    Json(json!({ "success": true, "tenant": tenant }))
}

/// Query parameters selecting the table an event stream subscribes to.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamParams {
    /// Tenant identifier.
    pub id: String,

    /// Entity type name.
    #[serde(rename = "typeName")]
    pub type_name: String,

    /// Chain partition.
    #[serde(rename = "chainId")]
    pub chain_id: String,

    /// Optional action filter (`insert`, `update` or `delete`), all actions when absent.
    pub action: Option<String>,
}

/// Handle server-sent event subscriptions for table changes.
///
/// Emits a `connection` hello event first, then one named event per matching table change.
pub async fn handle_event_stream(
    Extension(context): Extension<HttpServiceContext>,
    Query(params): Query<StreamParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let action = match &params.action {
        Some(token) => Some(
            TableAction::parse(token)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown action '{}'", token)))?,
        ),
        None => None,
    };

    let table = table_name(&params.id, &params.type_name, &params.chain_id);
    info!(
        "New subscription for table {}, action: {}",
        table,
        params.action.as_deref().unwrap_or("all")
    );

    let hello = Event::default()
        .event("connection")
        .json_data(json!({
            "message": "Connected to event stream",
            "tableName": table,
            "action": params.action.as_deref().unwrap_or("all"),
        }))
        .map_err(|err| ApiError::InternalError(err.to_string()))?;

    let StreamParams {
        id: tenant,
        type_name: entity,
        chain_id: chain,
        ..
    } = params;

    let events = BroadcastStream::new(context.tx.subscribe()).filter_map(move |message| {
        let event = match message {
            Ok(ServiceMessage::TableEvent(event)) => event,
            // Lagging subscribers just skip the dropped messages
            _ => return None,
        };

        if event.tenant != tenant || event.entity != entity || event.chain != chain {
            return None;
        }
        if let Some(action) = action {
            if event.action != action {
                return None;
            }
        }

        sse_event(&event).map(Ok)
    });

    let stream = tokio_stream::once(Ok::<_, Infallible>(hello)).chain(events);

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Renders one table event as a named SSE event.
fn sse_event(event: &TableEvent) -> Option<Event> {
    let mut body = match serde_json::to_value(event) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => return None,
    };
    body.insert(
        "tableName".to_string(),
        serde_json::Value::String(event.table_name()),
    );

    Event::default()
        .event(event.action.as_str())
        .json_data(serde_json::Value::Object(body))
        .ok()
}

/// Handle event stream status requests.
pub async fn handle_events_status(
    Extension(context): Extension<HttpServiceContext>,
) -> Json<serde_json::Value> {
    Json(json!({
        "activeSubscriptions": context.tx.receiver_count(),
        "timestamp": unix_millis(),
    }))
}

/// Handle requests emitting a synthetic insert event, useful for debugging subscribers.
pub async fn handle_emit_test_event(
    Extension(context): Extension<HttpServiceContext>,
    Query(params): Query<StreamParams>,
) -> Json<serde_json::Value> {
    let event = TableEvent::new(
        TableAction::Insert,
        &params.id,
        &params.type_name,
        &params.chain_id,
        json!({ "id": 999, "test": true, "message": "This is a test event" }),
    );

    let _ = context.tx.send(ServiceMessage::TableEvent(event));

    Json(json!({ "success": true, "message": "Test event emitted" }))
}

/// Query parameters windowing the log inspection route.
#[derive(Debug, Clone, Deserialize)]
pub struct LogParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub order: Option<String>,
}

/// Handle log inspection requests over the node's NDJSON log files.
pub async fn handle_logs(
    Extension(context): Extension<HttpServiceContext>,
    Query(params): Query<LogParams>,
) -> Json<serde_json::Value> {
    // Log lines come back newest-first unless ascending order is asked for explicitly
    let direction = match params.order.as_deref() {
        Some(token) if token.eq_ignore_ascii_case("asc") => Direction::Ascending,
        _ => Direction::Descending,
    };

    match read_logs(
        &context.log_dir,
        params.limit,
        params.offset.unwrap_or(0),
        direction,
    ) {
        Ok(logs) => Json(json!({ "success": true, "data": logs })),
        Err(err) => {
            warn!("Could not read log files: {}", err);
            Json(json!({ "success": false, "error": err.to_string(), "data": [] }))
        }
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
