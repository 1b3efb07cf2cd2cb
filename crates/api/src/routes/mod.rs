mod comments;
mod notifications;
mod posts;
mod users;

use axum::extract::State;
use axum::{
    Json, Router,
    http::{StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{MethodRouter, get},
};
use respawn_domain::identity::ActorIdentity;
use serde::Serialize;

use crate::middleware::AuthContext;
use crate::{error::ApiError, middleware as app_middleware, observability, state::AppState};

pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics))
        .merge(users::routes())
        .merge(posts::routes())
        .merge(comments::routes())
        .merge(notifications::routes())
        .route_layer(middleware::from_fn(app_middleware::metrics_layer))
        .layer(app_middleware::timeout_layer())
        .layer(app_middleware::trace_layer())
        .layer(app_middleware::set_request_id_layer())
        .layer(app_middleware::propagate_request_id_layer())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::auth_middleware,
        ))
        .layer(middleware::from_fn(
            app_middleware::correlation_id_middleware,
        ))
        .layer(app_middleware::cors_layer(&state.config));

    if !state.config.is_test() {
        app = app.layer(app_middleware::rate_limit_layer());
    }

    app.with_state(state)
}

/// Guards a single method handler so public and authenticated methods can
/// share one path.
fn protected(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.route_layer(middleware::from_fn(app_middleware::require_auth_middleware))
}

fn actor_identity(auth: &AuthContext) -> Result<ActorIdentity, ApiError> {
    if !auth.is_authenticated {
        return Err(ApiError::Unauthorized);
    }
    let user_id = auth
        .user_id
        .as_ref()
        .filter(|user_id| !user_id.trim().is_empty())
        .ok_or(ApiError::Unauthorized)?;
    let username = auth.username.as_deref().unwrap_or(user_id);
    Ok(ActorIdentity::new(user_id.as_str(), username).with_role(auth.role))
}

/// Authenticated caller, if any. Public handlers use this to personalise.
fn viewer_id(auth: &AuthContext) -> Option<&str> {
    auth.is_authenticated
        .then_some(auth.user_id.as_deref())
        .flatten()
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    environment: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.app_env.clone(),
    })
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    backend: &'static str,
}

async fn ready(State(state): State<AppState>) -> Result<Json<ReadyResponse>, ApiError> {
    state.db.health_check().await.map_err(|err| {
        tracing::warn!(backend = state.db.name(), error = %err, "readiness check failed");
        ApiError::Unavailable(state.db.name().to_string())
    })?;
    Ok(Json(ReadyResponse {
        status: "ready",
        backend: state.db.name(),
    }))
}

async fn metrics() -> Response {
    match observability::render_metrics() {
        Some(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
