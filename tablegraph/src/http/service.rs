// SPDX-License-Identifier: AGPL-3.0-or-later

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::Result;
use axum::extract::Extension;
use axum::http::Method;
use axum::routing::{delete, get, post};
use axum::Router;
use http::header::CONTENT_TYPE;
use log::debug;
use tower_http::cors::{Any, CorsLayer};

use crate::bus::ServiceSender;
use crate::context::Context;
use crate::db::Executor;
use crate::graphql::GraphQLSchemaManager;
use crate::http::api::{
    handle_delete_tenant, handle_deploy_tenant, handle_emit_test_event, handle_event_stream,
    handle_events_status, handle_graphql_playground, handle_graphql_query, handle_graphql_sdl,
    handle_logs,
};
use crate::http::context::HttpServiceContext;
use crate::manager::Shutdown;

/// Route to the GraphQL API and playground.
const GRAPHQL_ROUTE: &str = "/graphql";

/// Build HTTP server with GraphQL API, webhooks, event stream and log routes.
pub fn build_server(http_context: HttpServiceContext) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(false)
        .allow_origin(Any);

    Router::new()
        // Add GraphQL routes
        .route(
            GRAPHQL_ROUTE,
            get(|| handle_graphql_playground(GRAPHQL_ROUTE)).post(handle_graphql_query),
        )
        .route("/graphql/sdl", get(handle_graphql_sdl))
        // Add tenant deployment webhooks
        .route(
            "/webhooks/subgraphs/deploy/:tenant",
            post(handle_deploy_tenant),
        )
        .route("/webhooks/subgraphs/:tenant", delete(handle_delete_tenant))
        // Add table event routes
        .route("/events/stream", get(handle_event_stream))
        .route("/events/status", get(handle_events_status))
        .route("/events/test", post(handle_emit_test_event))
        // Add log inspection route
        .route("/logs", get(handle_logs))
        // Add middlewares
        .layer(cors)
        // Add shared context
        .layer(Extension(http_context))
}

/// Start HTTP server.
pub async fn http_service(context: Context, signal: Shutdown, tx: ServiceSender) -> Result<()> {
    let http_port = context.config.http_port;
    let http_address = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), http_port);

    // Prepare the schema manager executing incoming GraphQL queries
    let executor: Arc<dyn Executor> = Arc::new(context.store.clone());
    let schemas = GraphQLSchemaManager::new(
        executor,
        context.cache.clone(),
        context.provider.clone(),
    );

    // Introduce a new context for all HTTP routes
    let http_context = HttpServiceContext::new(
        schemas,
        context.provider.clone(),
        tx,
        context.config.log_dir.clone(),
    );

    axum::Server::try_bind(&http_address)?
        .serve(build_server(http_context).into_make_service())
        .with_graceful_shutdown(async {
            debug!("HTTP service is ready");
            signal.await.ok();
        })
        .await?;

    Ok(())
}
