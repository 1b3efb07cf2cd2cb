use axum::extract::{Extension, Path, Query, State};
use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, patch, post, put},
};
use respawn_domain::pagination::Page;
use respawn_domain::posts::{Post, PostCreate, PostListQuery, PostSort, PostUpdate, PostView};
use respawn_domain::ratings::{RatingOutcome, RatingSummary};
use respawn_domain::reactions::{ReactionKind, ReactionState};
use serde::Deserialize;
use validator::Validate;

use super::{actor_identity, protected, viewer_id};
use crate::middleware::AuthContext;
use crate::{error::ApiError, state::AppState, validation};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/posts", get(list_posts).merge(protected(post(create_post))))
        .route(
            "/v1/posts/:post_id",
            get(get_post).merge(protected(patch(update_post).delete(delete_post))),
        )
        .route(
            "/v1/posts/:post_id/rating",
            get(rating_summary).merge(protected(put(rate_post).delete(remove_rating))),
        )
        .route(
            "/v1/posts/:post_id/reactions",
            protected(post(react_to_post)),
        )
}

#[derive(Debug, Deserialize)]
pub(super) struct PageQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostListParams {
    page: Option<usize>,
    limit: Option<usize>,
    author_id: Option<String>,
    game: Option<String>,
    q: Option<String>,
    sort: Option<String>,
}

pub(super) fn parse_sort(value: Option<&str>) -> Result<Option<PostSort>, ApiError> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => PostSort::parse(value)
            .map(Some)
            .ok_or_else(|| ApiError::Validation(format!("unknown sort: {value}"))),
    }
}

pub(super) fn post_page(page: Page<Post>) -> Page<PostView> {
    Page {
        items: page.items.into_iter().map(PostView::from).collect(),
        page: page.page,
        limit: page.limit,
        total: page.total,
        total_pages: page.total_pages,
    }
}

async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<PostListParams>,
) -> Result<Json<Page<PostView>>, ApiError> {
    let sort = parse_sort(params.sort.as_deref())?;
    let page = state
        .posts
        .list(PostListQuery {
            page: params.page,
            limit: params.limit,
            author_id: params.author_id,
            game: params.game,
            text: params.q,
            sort,
        })
        .await?;
    Ok(Json(post_page(page)))
}

#[derive(Debug, Deserialize, Validate)]
struct CreatePostRequest {
    #[validate(length(min = 1, max = 200))]
    title: String,
    #[validate(length(min = 1, max = 20000))]
    body: String,
    #[validate(length(min = 1, max = 120))]
    game_title: String,
    #[validate(length(max = 40))]
    platform: Option<String>,
    #[serde(default)]
    #[validate(length(max = 10))]
    tags: Vec<String>,
    image_url: Option<String>,
}

async fn create_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostView>), ApiError> {
    validation::validate(&payload)?;
    let actor = actor_identity(&auth)?;
    let post = state
        .posts
        .create(
            &actor,
            PostCreate {
                title: payload.title,
                body: payload.body,
                game_title: payload.game_title,
                platform: payload.platform,
                tags: payload.tags,
                image_url: payload.image_url,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(PostView::from(post))))
}

async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<PostView>, ApiError> {
    let post = state.posts.get(&post_id).await?;
    Ok(Json(PostView::from(post)))
}

#[derive(Debug, Deserialize, Validate)]
struct UpdatePostRequest {
    #[validate(length(min = 1, max = 200))]
    title: Option<String>,
    #[validate(length(min = 1, max = 20000))]
    body: Option<String>,
    #[validate(length(min = 1, max = 120))]
    game_title: Option<String>,
    #[validate(length(max = 40))]
    platform: Option<String>,
    #[validate(length(max = 10))]
    tags: Option<Vec<String>>,
    image_url: Option<String>,
}

async fn update_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(post_id): Path<String>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<PostView>, ApiError> {
    validation::validate(&payload)?;
    let actor = actor_identity(&auth)?;
    let post = state
        .posts
        .update(
            &actor,
            &post_id,
            PostUpdate {
                title: payload.title,
                body: payload.body,
                game_title: payload.game_title,
                platform: payload.platform,
                tags: payload.tags,
                image_url: payload.image_url,
            },
        )
        .await?;
    Ok(Json(PostView::from(post)))
}

async fn delete_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(post_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let actor = actor_identity(&auth)?;
    state.posts.delete(&actor, &post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn rating_summary(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(post_id): Path<String>,
) -> Result<Json<RatingSummary>, ApiError> {
    let summary = state.ratings.summary(&post_id, viewer_id(&auth)).await?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
struct RateRequest {
    score: i64,
}

async fn rate_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(post_id): Path<String>,
    Json(payload): Json<RateRequest>,
) -> Result<Json<RatingOutcome>, ApiError> {
    let actor = actor_identity(&auth)?;
    let outcome = state.ratings.rate(&actor, &post_id, payload.score).await?;
    Ok(Json(outcome))
}

async fn remove_rating(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(post_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let actor = actor_identity(&auth)?;
    state.ratings.remove(&actor, &post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub(super) struct ReactRequest {
    pub kind: String,
}

impl ReactRequest {
    pub(super) fn kind(&self) -> Result<ReactionKind, ApiError> {
        ReactionKind::parse(self.kind.trim()).ok_or_else(|| {
            ApiError::Validation("kind must be one of: like, dislike".into())
        })
    }
}

async fn react_to_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(post_id): Path<String>,
    Json(payload): Json<ReactRequest>,
) -> Result<Json<ReactionState>, ApiError> {
    let actor = actor_identity(&auth)?;
    let kind = payload.kind()?;
    let reaction = state.reactions.react_to_post(&actor, &post_id, kind).await?;
    Ok(Json(reaction))
}
