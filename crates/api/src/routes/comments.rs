use axum::extract::{Extension, Path, State};
use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, patch, post},
};
use respawn_domain::comments::{Comment, CommentCreate, CommentThread};
use respawn_domain::reactions::ReactionState;
use serde::Deserialize;
use validator::Validate;

use super::posts::ReactRequest;
use super::{actor_identity, protected};
use crate::middleware::AuthContext;
use crate::{error::ApiError, state::AppState, validation};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/posts/:post_id/comments",
            get(comment_thread).merge(protected(post(add_comment))),
        )
        .route(
            "/v1/comments/:comment_id",
            protected(patch(update_comment).delete(delete_comment)),
        )
        .route(
            "/v1/comments/:comment_id/reactions",
            protected(post(react_to_comment)),
        )
}

#[derive(Debug, Deserialize, Validate)]
struct CreateCommentRequest {
    #[validate(length(min = 1, max = 5000))]
    body: String,
    parent_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateCommentRequest {
    #[validate(length(min = 1, max = 5000))]
    body: String,
}

async fn comment_thread(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<CommentThread>, ApiError> {
    let thread = state.comments.thread(&post_id).await?;
    Ok(Json(thread))
}

async fn add_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(post_id): Path<String>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    validation::validate(&payload)?;
    let actor = actor_identity(&auth)?;
    let comment = state
        .comments
        .add(
            &actor,
            &post_id,
            CommentCreate {
                body: payload.body,
                parent_id: payload.parent_id,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn update_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(comment_id): Path<String>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<Comment>, ApiError> {
    validation::validate(&payload)?;
    let actor = actor_identity(&auth)?;
    let comment = state
        .comments
        .update(&actor, &comment_id, &payload.body)
        .await?;
    Ok(Json(comment))
}

async fn delete_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(comment_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let actor = actor_identity(&auth)?;
    state.comments.delete(&actor, &comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn react_to_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(comment_id): Path<String>,
    Json(payload): Json<ReactRequest>,
) -> Result<Json<ReactionState>, ApiError> {
    let actor = actor_identity(&auth)?;
    let kind = payload.kind()?;
    let reaction = state
        .reactions
        .react_to_comment(&actor, &comment_id, kind)
        .await?;
    Ok(Json(reaction))
}
