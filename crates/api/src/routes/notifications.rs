use axum::extract::{Extension, Path, Query, State};
use axum::{
    Json, Router,
    routing::{get, post},
};
use respawn_domain::notifications::{Notification, NotificationListQuery};
use respawn_domain::pagination::CursorPage;
use serde::{Deserialize, Serialize};

use super::{actor_identity, protected};
use crate::middleware::AuthContext;
use crate::{error::ApiError, state::AppState};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/notifications", protected(get(list_notifications)))
        .route(
            "/v1/notifications/unread-count",
            protected(get(unread_count)),
        )
        .route(
            "/v1/notifications/read-all",
            protected(post(mark_all_read)),
        )
        .route(
            "/v1/notifications/:notification_id/read",
            protected(post(mark_read)),
        )
}

#[derive(Debug, Deserialize)]
struct NotificationListParams {
    cursor: Option<String>,
    limit: Option<usize>,
    include_read: Option<bool>,
}

#[derive(Serialize)]
struct UnreadCountResponse {
    unread: usize,
}

#[derive(Serialize)]
struct MarkAllReadResponse {
    updated: usize,
}

async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<NotificationListParams>,
) -> Result<Json<CursorPage<Notification>>, ApiError> {
    let actor = actor_identity(&auth)?;
    let page = state
        .notifications
        .list(NotificationListQuery {
            recipient_id: actor.user_id,
            cursor: params.cursor,
            limit: params.limit,
            include_read: params.include_read,
        })
        .await?;
    Ok(Json(page))
}

async fn unread_count(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let actor = actor_identity(&auth)?;
    let unread = state.notifications.unread_count(&actor.user_id).await?;
    Ok(Json(UnreadCountResponse { unread }))
}

async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(notification_id): Path<String>,
) -> Result<Json<Notification>, ApiError> {
    let actor = actor_identity(&auth)?;
    let notification = state
        .notifications
        .mark_read(&actor.user_id, &notification_id)
        .await?;
    Ok(Json(notification))
}

async fn mark_all_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<MarkAllReadResponse>, ApiError> {
    let actor = actor_identity(&auth)?;
    let updated = state.notifications.mark_all_read(&actor.user_id).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}
