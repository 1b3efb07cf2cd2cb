use axum::extract::{Extension, Path, Query, State};
use axum::{
    Json, Router,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use respawn_domain::pagination::Page;
use respawn_domain::posts::{PostListQuery, PostView};
use respawn_domain::users::{ProfileUpdate, RegisterInput, User, UserAccount, UserProfile};
use respawn_infra::auth::AuthToken;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::posts::{PageQuery, parse_sort, post_page};
use super::{actor_identity, protected};
use crate::middleware::{AuthContext, session_cookie};
use crate::{error::ApiError, state::AppState, validation};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/register", post(register))
        .route("/v1/auth/login", post(login))
        .route("/v1/auth/logout", post(logout))
        .route("/v1/auth/me", protected(get(me).patch(update_me)))
        .route("/v1/users/:user_id", get(get_profile))
        .route("/v1/users/:user_id/posts", get(list_user_posts))
}

#[derive(Debug, Deserialize, Validate)]
struct RegisterRequest {
    username: String,
    email: String,
    #[validate(length(min = 8, max = 128))]
    password: String,
    #[validate(length(max = 64))]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct LoginRequest {
    #[serde(alias = "username", alias = "email")]
    #[validate(length(min = 1, max = 254))]
    identifier: String,
    #[validate(length(min = 1, max = 128))]
    password: String,
}

#[derive(Serialize)]
struct SessionResponse {
    user: UserAccount,
    token: AuthToken,
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response, ApiError> {
    validation::validate(&payload)?;
    let user = state
        .users
        .register(RegisterInput {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            display_name: payload.display_name,
        })
        .await?;
    session_response(&state, &user, StatusCode::CREATED)
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    validation::validate(&payload)?;
    let user = state
        .users
        .authenticate(&payload.identifier, &payload.password)
        .await?;
    tracing::info!(user_id = %user.user_id, "user logged in");
    session_response(&state, &user, StatusCode::OK)
}

async fn logout(State(state): State<AppState>) -> Result<Response, ApiError> {
    let cookie = session_cookie(None, 0, state.config.is_production());
    let cookie = HeaderValue::from_str(&cookie).map_err(|_| ApiError::Internal)?;
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]).into_response())
}

fn session_response(state: &AppState, user: &User, status: StatusCode) -> Result<Response, ApiError> {
    let token = state.tokens.issue(user).map_err(|err| {
        tracing::error!(error = %err, user_id = %user.user_id, "token issue failed");
        ApiError::Internal
    })?;
    let cookie = session_cookie(
        Some(&token.access_token),
        state.config.jwt_ttl_secs,
        state.config.is_production(),
    );
    let cookie = HeaderValue::from_str(&cookie).map_err(|_| ApiError::Internal)?;
    let body = SessionResponse {
        user: UserAccount::from(user),
        token,
    };
    Ok((status, [(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<UserAccount>, ApiError> {
    let actor = actor_identity(&auth)?;
    let user = state.users.get(&actor.user_id).await?;
    Ok(Json(UserAccount::from(&user)))
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateProfileRequest {
    #[validate(length(max = 64))]
    display_name: Option<String>,
    #[validate(length(max = 500))]
    bio: Option<String>,
    #[validate(length(max = 2048))]
    avatar_url: Option<String>,
}

async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserAccount>, ApiError> {
    validation::validate(&payload)?;
    let actor = actor_identity(&auth)?;
    let user = state
        .users
        .update_profile(
            &actor,
            ProfileUpdate {
                display_name: payload.display_name,
                bio: payload.bio,
                avatar_url: payload.avatar_url,
            },
        )
        .await?;
    Ok(Json(UserAccount::from(&user)))
}

async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state.users.get(&user_id).await?;
    Ok(Json(UserProfile::from(&user)))
}

async fn list_user_posts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<PostView>>, ApiError> {
    let user = state.users.get(&user_id).await?;
    let page = state
        .posts
        .list(PostListQuery {
            page: query.page,
            limit: query.limit,
            author_id: Some(user.user_id),
            sort: parse_sort(query.sort.as_deref())?,
            ..PostListQuery::default()
        })
        .await?;
    Ok(Json(post_page(page)))
}
