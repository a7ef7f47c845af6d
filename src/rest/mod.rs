// rest/mod.rs — HTTP API server.
//
// Axum server bound to `{bind_address}:{port}`.
//
// Endpoints:
//   POST   /register
//   POST   /login
//   POST   /logout
//   GET    /me
//   GET    /projects          POST /projects          DELETE /projects?id=
//   GET    /time-entries[?projectId=]
//   POST   /time-entries      DELETE /time-entries?id=
//   GET    /summary
//   GET    /health            (no auth)

pub mod routes;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::AppContext;

pub async fn start_rest_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    // Everything project-scoped sits behind the session gate.
    let protected = Router::new()
        .route("/me", get(routes::auth::me))
        .route(
            "/projects",
            get(routes::projects::list)
                .post(routes::projects::create)
                .delete(routes::projects::delete),
        )
        .route(
            "/time-entries",
            get(routes::entries::list)
                .post(routes::entries::create)
                .delete(routes::entries::delete),
        )
        .route("/summary", get(routes::report::summary))
        .route_layer(middleware::from_fn_with_state(
            ctx.clone(),
            crate::auth::require_session,
        ));

    let mut router = Router::new()
        .route("/health", get(routes::health::health))
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout))
        .merge(protected)
        .with_state(ctx.clone());

    // Credentialed CORS for a separately-hosted browser UI. Same-origin
    // deployments leave cors_origin unset and skip the layer entirely.
    if let Some(origin) = ctx.config.cors_origin.as_deref() {
        match origin.parse::<HeaderValue>() {
            Ok(origin) => {
                router = router.layer(
                    CorsLayer::new()
                        .allow_origin(origin)
                        .allow_methods([Method::GET, Method::POST, Method::DELETE])
                        .allow_headers([header::CONTENT_TYPE])
                        .allow_credentials(true),
                );
            }
            Err(_) => warn!(origin, "invalid cors_origin — CORS layer disabled"),
        }
    }

    router
}
