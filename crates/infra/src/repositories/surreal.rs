use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, to_value};
use surrealdb::{Surreal, engine::remote::ws::Client};

use respawn_domain::DomainResult;
use respawn_domain::auth::Role;
use respawn_domain::comments::Comment;
use respawn_domain::error::DomainError;
use respawn_domain::notifications::{Notification, NotificationKind};
use respawn_domain::ports::BoxFuture;
use respawn_domain::ports::comments::CommentRepository;
use respawn_domain::ports::notifications::{
    NotificationRepository, NotificationRepositoryListQuery,
};
use respawn_domain::ports::posts::{PostCounterDelta, PostRepository, PostRepositoryQuery};
use respawn_domain::ports::ratings::RatingRepository;
use respawn_domain::ports::reactions::ReactionRepository;
use respawn_domain::ports::users::UserRepository;
use respawn_domain::posts::{Post, PostSort};
use respawn_domain::ratings::Rating;
use respawn_domain::reactions::{Reaction, ReactionKind, ReactionTarget};
use respawn_domain::users::User;
use respawn_domain::util::{format_ms_rfc3339, parse_rfc3339_ms};

type SurrealClient = Arc<Surreal<Client>>;

fn map_surreal_error(err: surrealdb::Error) -> DomainError {
    let error_message = err.to_string().to_lowercase();
    if error_message.contains("already exists")
        || error_message.contains("duplicate")
        || error_message.contains("unique")
    {
        return DomainError::Conflict(error_message);
    }
    DomainError::Storage(format!("surreal query failed: {error_message}"))
}

fn invalid_result(err: surrealdb::Error) -> DomainError {
    DomainError::Storage(format!("invalid query result: {err}"))
}

fn to_payload<T: Serialize>(payload: T) -> DomainResult<Value> {
    to_value(payload).map_err(|err| DomainError::Storage(format!("invalid payload: {err}")))
}

fn decode_rows<T, R>(
    rows: Vec<Value>,
    entity: &str,
    map: impl Fn(R) -> DomainResult<T>,
) -> DomainResult<Vec<T>>
where
    R: for<'de> Deserialize<'de>,
{
    rows.into_iter()
        .map(|row| {
            serde_json::from_value::<R>(row)
                .map_err(|err| DomainError::Storage(format!("invalid {entity} row: {err}")))
                .and_then(&map)
        })
        .collect()
}

fn decode_count(rows: Vec<Value>) -> DomainResult<usize> {
    let Some(row) = rows.into_iter().next() else {
        return Ok(0);
    };
    let value = row
        .get("total")
        .and_then(|value| value.as_u64().or_else(|| value.as_i64().map(|v| v.max(0) as u64)))
        .ok_or_else(|| DomainError::Storage("invalid count row".into()))?;
    Ok(value as usize)
}

fn parse_optional_ms(value: Option<String>) -> DomainResult<Option<i64>> {
    value.as_deref().map(parse_rfc3339_ms).transpose()
}

// users

const USER_PROJECTION: &str = "user_id, username, email, password_hash, display_name, bio, \
     avatar_url, role, <string>created_at AS created_at, <string>updated_at AS updated_at";

#[derive(Debug, Serialize)]
struct SurrealUserCreateRow {
    user_id: String,
    username: String,
    username_lower: String,
    email: String,
    password_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar_url: Option<String>,
    role: String,
    created_at: String,
    updated_at: String,
}

impl From<&User> for SurrealUserCreateRow {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id.clone(),
            username: user.username.clone(),
            username_lower: user.username.to_lowercase(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            display_name: user.display_name.clone(),
            bio: user.bio.clone(),
            avatar_url: user.avatar_url.clone(),
            role: user.role.as_str().to_string(),
            created_at: format_ms_rfc3339(user.created_at_ms),
            updated_at: format_ms_rfc3339(user.updated_at_ms),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SurrealUserRow {
    user_id: String,
    username: String,
    email: String,
    password_hash: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    bio: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
    role: String,
    created_at: String,
    updated_at: String,
}

fn map_user_row(row: SurrealUserRow) -> DomainResult<User> {
    Ok(User {
        user_id: row.user_id,
        username: row.username,
        email: row.email,
        password_hash: row.password_hash,
        display_name: row.display_name,
        bio: row.bio,
        avatar_url: row.avatar_url,
        role: Role::parse(&row.role)
            .ok_or_else(|| DomainError::Storage(format!("invalid role '{}'", row.role)))?,
        created_at_ms: parse_rfc3339_ms(&row.created_at)?,
        updated_at_ms: parse_rfc3339_ms(&row.updated_at)?,
    })
}

#[derive(Clone)]
pub struct SurrealUserRepository {
    client: SurrealClient,
}

impl SurrealUserRepository {
    pub fn with_client(client: SurrealClient) -> Self {
        Self { client }
    }

    async fn find_one(&self, filter: &'static str, value: String) -> DomainResult<Option<User>> {
        let mut response = self
            .client
            .query(format!(
                "SELECT {USER_PROJECTION} FROM user WHERE {filter} = $value LIMIT 1"
            ))
            .bind(("value", value))
            .await
            .map_err(map_surreal_error)?;
        let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
        Ok(decode_rows(rows, "user", map_user_row)?.pop())
    }
}

impl UserRepository for SurrealUserRepository {
    fn create(&self, user: &User) -> BoxFuture<'_, DomainResult<User>> {
        let user = user.clone();
        Box::pin(async move {
            let payload = to_payload(SurrealUserCreateRow::from(&user))?;
            let response = self
                .client
                .query(
                    "BEGIN TRANSACTION; \
                     CREATE type::record('username_claim', $payload.username_lower) \
                        SET user_id = $payload.user_id; \
                     CREATE type::record('email_claim', $payload.email) \
                        SET user_id = $payload.user_id; \
                     CREATE type::record('user', $payload.user_id) SET \
                        user_id = $payload.user_id, \
                        username = $payload.username, \
                        username_lower = $payload.username_lower, \
                        email = $payload.email, \
                        password_hash = $payload.password_hash, \
                        display_name = $payload.display_name, \
                        bio = $payload.bio, \
                        avatar_url = $payload.avatar_url, \
                        role = $payload.role, \
                        created_at = <datetime>$payload.created_at, \
                        updated_at = <datetime>$payload.updated_at; \
                     COMMIT TRANSACTION;",
                )
                .bind(("payload", payload))
                .await
                .map_err(map_surreal_error)?;
            match response.check() {
                Ok(_) => Ok(user),
                Err(err) => match map_surreal_error(err) {
                    DomainError::Conflict(_) => {
                        let username_taken = self
                            .find_one("username_lower", user.username.to_lowercase())
                            .await?
                            .is_some();
                        Err(DomainError::Conflict(if username_taken {
                            "username already taken".into()
                        } else {
                            "email already registered".into()
                        }))
                    }
                    other => Err(other),
                },
            }
        })
    }

    fn get(&self, user_id: &str) -> BoxFuture<'_, DomainResult<Option<User>>> {
        let user_id = user_id.to_string();
        Box::pin(async move { self.find_one("user_id", user_id).await })
    }

    fn get_by_username(&self, username: &str) -> BoxFuture<'_, DomainResult<Option<User>>> {
        let username = username.to_lowercase();
        Box::pin(async move { self.find_one("username_lower", username).await })
    }

    fn get_by_email(&self, email: &str) -> BoxFuture<'_, DomainResult<Option<User>>> {
        let email = email.to_lowercase();
        Box::pin(async move { self.find_one("email", email).await })
    }

    fn update(&self, user: &User) -> BoxFuture<'_, DomainResult<User>> {
        let payload = SurrealUserCreateRow::from(user);
        Box::pin(async move {
            let user_id = payload.user_id.clone();
            let payload = to_payload(payload)?;
            let mut response = self
                .client
                .query(format!(
                    "UPDATE type::record('user', $user_id) SET \
                        display_name = $payload.display_name, \
                        bio = $payload.bio, \
                        avatar_url = $payload.avatar_url, \
                        updated_at = <datetime>$payload.updated_at; \
                     SELECT {USER_PROJECTION} FROM type::record('user', $user_id)"
                ))
                .bind(("user_id", user_id))
                .bind(("payload", payload))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(1).map_err(invalid_result)?;
            decode_rows(rows, "user", map_user_row)?
                .pop()
                .ok_or(DomainError::NotFound)
        })
    }
}

// posts

const POST_PROJECTION: &str = "post_id, author_id, author_username, title, body, game_title, \
     platform, tags, image_url, like_count, dislike_count, comment_count, rating_total, \
     rating_count, <string>created_at AS created_at, <string>updated_at AS updated_at";

#[derive(Debug, Serialize)]
struct SurrealPostCreateRow {
    post_id: String,
    author_id: String,
    author_username: String,
    title: String,
    body: String,
    game_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    platform: Option<String>,
    tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<&Post> for SurrealPostCreateRow {
    fn from(post: &Post) -> Self {
        Self {
            post_id: post.post_id.clone(),
            author_id: post.author_id.clone(),
            author_username: post.author_username.clone(),
            title: post.title.clone(),
            body: post.body.clone(),
            game_title: post.game_title.clone(),
            platform: post.platform.clone(),
            tags: post.tags.clone(),
            image_url: post.image_url.clone(),
            created_at: format_ms_rfc3339(post.created_at_ms),
            updated_at: format_ms_rfc3339(post.updated_at_ms),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SurrealPostRow {
    post_id: String,
    author_id: String,
    author_username: String,
    title: String,
    body: String,
    game_title: String,
    #[serde(default)]
    platform: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    image_url: Option<String>,
    like_count: i64,
    dislike_count: i64,
    comment_count: i64,
    rating_total: i64,
    rating_count: i64,
    created_at: String,
    updated_at: String,
}

fn map_post_row(row: SurrealPostRow) -> DomainResult<Post> {
    Ok(Post {
        post_id: row.post_id,
        author_id: row.author_id,
        author_username: row.author_username,
        title: row.title,
        body: row.body,
        game_title: row.game_title,
        platform: row.platform,
        tags: row.tags,
        image_url: row.image_url,
        like_count: row.like_count,
        dislike_count: row.dislike_count,
        comment_count: row.comment_count,
        rating_total: row.rating_total,
        rating_count: row.rating_count,
        created_at_ms: parse_rfc3339_ms(&row.created_at)?,
        updated_at_ms: parse_rfc3339_ms(&row.updated_at)?,
    })
}

fn post_order_clause(sort: PostSort) -> &'static str {
    match sort {
        PostSort::Newest => "created_at DESC, post_id DESC",
        PostSort::Oldest => "created_at ASC, post_id DESC",
        PostSort::TopRated => "rating_average DESC, rating_count DESC, created_at DESC, post_id DESC",
        PostSort::MostLiked => "like_count DESC, created_at DESC, post_id DESC",
        PostSort::MostDiscussed => "comment_count DESC, created_at DESC, post_id DESC",
    }
}

#[derive(Clone)]
pub struct SurrealPostRepository {
    client: SurrealClient,
}

impl SurrealPostRepository {
    pub fn with_client(client: SurrealClient) -> Self {
        Self { client }
    }

    async fn fetch(&self, post_id: String) -> DomainResult<Option<Post>> {
        let mut response = self
            .client
            .query(format!(
                "SELECT {POST_PROJECTION} FROM type::record('post', $post_id)"
            ))
            .bind(("post_id", post_id))
            .await
            .map_err(map_surreal_error)?;
        let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
        Ok(decode_rows(rows, "post", map_post_row)?.pop())
    }
}

// Counters never drop below zero, matching the in-memory adapter.
const POST_COUNTER_UPDATE: &str = "UPDATE type::record('post', $post_id) SET \
    like_count = math::max([like_count + $like, 0]), \
    dislike_count = math::max([dislike_count + $dislike, 0]), \
    comment_count = math::max([comment_count + $comment, 0]), \
    rating_total = math::max([rating_total + $rating_total, 0]), \
    rating_count = math::max([rating_count + $rating_count, 0]), \
    rating_average = IF rating_count > 0 \
        THEN math::fixed(<float>rating_total / rating_count, 2) \
        ELSE 0f END";

const COMMENT_COUNTER_UPDATE: &str = "UPDATE type::record('comment', $comment_id) SET \
    like_count = math::max([like_count + $like, 0]), \
    dislike_count = math::max([dislike_count + $dislike, 0])";

impl PostRepository for SurrealPostRepository {
    fn create(&self, post: &Post) -> BoxFuture<'_, DomainResult<Post>> {
        let payload = SurrealPostCreateRow::from(post);
        Box::pin(async move {
            let post_id = payload.post_id.clone();
            let payload = to_payload(payload)?;
            let response = self
                .client
                .query(
                    "CREATE type::record('post', $payload.post_id) SET \
                        post_id = $payload.post_id, \
                        author_id = $payload.author_id, \
                        author_username = $payload.author_username, \
                        title = $payload.title, \
                        body = $payload.body, \
                        game_title = $payload.game_title, \
                        game_title_lower = string::lowercase($payload.game_title), \
                        platform = $payload.platform, \
                        tags = $payload.tags, \
                        image_url = $payload.image_url, \
                        like_count = 0, \
                        dislike_count = 0, \
                        comment_count = 0, \
                        rating_total = 0, \
                        rating_count = 0, \
                        rating_average = 0f, \
                        created_at = <datetime>$payload.created_at, \
                        updated_at = <datetime>$payload.updated_at",
                )
                .bind(("payload", payload))
                .await
                .map_err(map_surreal_error)?;
            response.check().map_err(map_surreal_error)?;
            self.fetch(post_id)
                .await?
                .ok_or_else(|| DomainError::Storage("create returned no row".into()))
        })
    }

    fn get(&self, post_id: &str) -> BoxFuture<'_, DomainResult<Option<Post>>> {
        let post_id = post_id.to_string();
        Box::pin(async move { self.fetch(post_id).await })
    }

    fn update(&self, post: &Post) -> BoxFuture<'_, DomainResult<Post>> {
        let payload = SurrealPostCreateRow::from(post);
        Box::pin(async move {
            let post_id = payload.post_id.clone();
            let payload = to_payload(payload)?;
            let response = self
                .client
                .query(
                    "UPDATE type::record('post', $payload.post_id) SET \
                        title = $payload.title, \
                        body = $payload.body, \
                        game_title = $payload.game_title, \
                        game_title_lower = string::lowercase($payload.game_title), \
                        platform = $payload.platform, \
                        tags = $payload.tags, \
                        image_url = $payload.image_url, \
                        updated_at = <datetime>$payload.updated_at",
                )
                .bind(("payload", payload))
                .await
                .map_err(map_surreal_error)?;
            response.check().map_err(map_surreal_error)?;
            self.fetch(post_id).await?.ok_or(DomainError::NotFound)
        })
    }

    fn delete(&self, post_id: &str) -> BoxFuture<'_, DomainResult<()>> {
        let post_id = post_id.to_string();
        Box::pin(async move {
            let response = self
                .client
                .query("DELETE type::record('post', $post_id)")
                .bind(("post_id", post_id))
                .await
                .map_err(map_surreal_error)?;
            response.check().map_err(map_surreal_error)?;
            Ok(())
        })
    }

    fn list(&self, query: &PostRepositoryQuery) -> BoxFuture<'_, DomainResult<(Vec<Post>, usize)>> {
        let query = query.clone();
        Box::pin(async move {
            let mut filters = Vec::new();
            if query.author_id.is_some() {
                filters.push("author_id = $author_id");
            }
            if query.game.is_some() {
                filters.push("game_title_lower = $game");
            }
            if query.text.is_some() {
                filters.push(
                    "(string::contains(string::lowercase(title), $text) \
                      OR string::contains(string::lowercase(body), $text) \
                      OR string::contains(game_title_lower, $text))",
                );
            }
            let where_clause = if filters.is_empty() {
                String::new()
            } else {
                format!(" WHERE {}", filters.join(" AND "))
            };
            let statement = format!(
                "SELECT {POST_PROJECTION}, rating_average FROM post{where_clause} \
                 ORDER BY {order} LIMIT $limit START $offset; \
                 SELECT count() AS total FROM post{where_clause} GROUP ALL",
                order = post_order_clause(query.sort),
            );

            let mut db_query = self
                .client
                .query(statement)
                .bind(("limit", query.limit as i64))
                .bind(("offset", query.offset as i64));
            if let Some(author_id) = query.author_id.clone() {
                db_query = db_query.bind(("author_id", author_id));
            }
            if let Some(game) = query.game.clone() {
                db_query = db_query.bind(("game", game));
            }
            if let Some(text) = query.text.clone() {
                db_query = db_query.bind(("text", text));
            }

            let mut response = db_query.await.map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            let count_rows: Vec<Value> = response.take(1).map_err(invalid_result)?;
            let mut posts = decode_rows(rows, "post", map_post_row)?;
            posts.sort_by(|left, right| query.sort.compare(left, right));
            Ok((posts, decode_count(count_rows)?))
        })
    }

    fn apply_counters(
        &self,
        post_id: &str,
        delta: &PostCounterDelta,
    ) -> BoxFuture<'_, DomainResult<Post>> {
        let post_id = post_id.to_string();
        let delta = delta.clone();
        Box::pin(async move {
            let response = self
                .client
                .query(POST_COUNTER_UPDATE)
                .bind(("post_id", post_id.clone()))
                .bind(("like", delta.like))
                .bind(("dislike", delta.dislike))
                .bind(("comment", delta.comment))
                .bind(("rating_total", delta.rating_total))
                .bind(("rating_count", delta.rating_count))
                .await
                .map_err(map_surreal_error)?;
            response.check().map_err(map_surreal_error)?;
            self.fetch(post_id).await?.ok_or(DomainError::NotFound)
        })
    }
}

// comments

const COMMENT_PROJECTION: &str = "comment_id, post_id, parent_id, author_id, author_username, \
     body, like_count, dislike_count, deleted, <string>created_at AS created_at, \
     <string>updated_at AS updated_at";

#[derive(Debug, Serialize)]
struct SurrealCommentCreateRow {
    comment_id: String,
    post_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<String>,
    author_id: String,
    author_username: String,
    body: String,
    deleted: bool,
    created_at: String,
    updated_at: String,
}

impl From<&Comment> for SurrealCommentCreateRow {
    fn from(comment: &Comment) -> Self {
        Self {
            comment_id: comment.comment_id.clone(),
            post_id: comment.post_id.clone(),
            parent_id: comment.parent_id.clone(),
            author_id: comment.author_id.clone(),
            author_username: comment.author_username.clone(),
            body: comment.body.clone(),
            deleted: comment.deleted,
            created_at: format_ms_rfc3339(comment.created_at_ms),
            updated_at: format_ms_rfc3339(comment.updated_at_ms),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SurrealCommentRow {
    comment_id: String,
    post_id: String,
    #[serde(default)]
    parent_id: Option<String>,
    author_id: String,
    author_username: String,
    body: String,
    like_count: i64,
    dislike_count: i64,
    #[serde(default)]
    deleted: bool,
    created_at: String,
    updated_at: String,
}

fn map_comment_row(row: SurrealCommentRow) -> DomainResult<Comment> {
    Ok(Comment {
        comment_id: row.comment_id,
        post_id: row.post_id,
        parent_id: row.parent_id,
        author_id: row.author_id,
        author_username: row.author_username,
        body: row.body,
        like_count: row.like_count,
        dislike_count: row.dislike_count,
        deleted: row.deleted,
        created_at_ms: parse_rfc3339_ms(&row.created_at)?,
        updated_at_ms: parse_rfc3339_ms(&row.updated_at)?,
    })
}

#[derive(Clone)]
pub struct SurrealCommentRepository {
    client: SurrealClient,
}

impl SurrealCommentRepository {
    pub fn with_client(client: SurrealClient) -> Self {
        Self { client }
    }

    async fn fetch(&self, comment_id: String) -> DomainResult<Option<Comment>> {
        let mut response = self
            .client
            .query(format!(
                "SELECT {COMMENT_PROJECTION} FROM type::record('comment', $comment_id)"
            ))
            .bind(("comment_id", comment_id))
            .await
            .map_err(map_surreal_error)?;
        let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
        Ok(decode_rows(rows, "comment", map_comment_row)?.pop())
    }
}

impl CommentRepository for SurrealCommentRepository {
    fn create(&self, comment: &Comment) -> BoxFuture<'_, DomainResult<Comment>> {
        let payload = SurrealCommentCreateRow::from(comment);
        Box::pin(async move {
            let comment_id = payload.comment_id.clone();
            let payload = to_payload(payload)?;
            let response = self
                .client
                .query(
                    "CREATE type::record('comment', $payload.comment_id) SET \
                        comment_id = $payload.comment_id, \
                        post_id = $payload.post_id, \
                        parent_id = $payload.parent_id, \
                        author_id = $payload.author_id, \
                        author_username = $payload.author_username, \
                        body = $payload.body, \
                        like_count = 0, \
                        dislike_count = 0, \
                        deleted = $payload.deleted, \
                        created_at = <datetime>$payload.created_at, \
                        updated_at = <datetime>$payload.updated_at",
                )
                .bind(("payload", payload))
                .await
                .map_err(map_surreal_error)?;
            response.check().map_err(map_surreal_error)?;
            self.fetch(comment_id)
                .await?
                .ok_or_else(|| DomainError::Storage("create returned no row".into()))
        })
    }

    fn get(&self, comment_id: &str) -> BoxFuture<'_, DomainResult<Option<Comment>>> {
        let comment_id = comment_id.to_string();
        Box::pin(async move { self.fetch(comment_id).await })
    }

    fn update(&self, comment: &Comment) -> BoxFuture<'_, DomainResult<Comment>> {
        let payload = SurrealCommentCreateRow::from(comment);
        Box::pin(async move {
            let comment_id = payload.comment_id.clone();
            let payload = to_payload(payload)?;
            let response = self
                .client
                .query(
                    "UPDATE type::record('comment', $payload.comment_id) SET \
                        body = $payload.body, \
                        deleted = $payload.deleted, \
                        updated_at = <datetime>$payload.updated_at",
                )
                .bind(("payload", payload))
                .await
                .map_err(map_surreal_error)?;
            response.check().map_err(map_surreal_error)?;
            self.fetch(comment_id).await?.ok_or(DomainError::NotFound)
        })
    }

    fn delete(&self, comment_id: &str) -> BoxFuture<'_, DomainResult<()>> {
        let comment_id = comment_id.to_string();
        Box::pin(async move {
            let response = self
                .client
                .query("DELETE type::record('comment', $comment_id)")
                .bind(("comment_id", comment_id))
                .await
                .map_err(map_surreal_error)?;
            response.check().map_err(map_surreal_error)?;
            Ok(())
        })
    }

    fn list_by_post(&self, post_id: &str) -> BoxFuture<'_, DomainResult<Vec<Comment>>> {
        let post_id = post_id.to_string();
        Box::pin(async move {
            let mut response = self
                .client
                .query(format!(
                    "SELECT {COMMENT_PROJECTION} FROM comment WHERE post_id = $post_id \
                     ORDER BY created_at ASC, comment_id ASC"
                ))
                .bind(("post_id", post_id))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            decode_rows(rows, "comment", map_comment_row)
        })
    }

    fn has_replies(&self, comment_id: &str) -> BoxFuture<'_, DomainResult<bool>> {
        let comment_id = comment_id.to_string();
        Box::pin(async move {
            let mut response = self
                .client
                .query("SELECT count() AS total FROM comment WHERE parent_id = $comment_id GROUP ALL")
                .bind(("comment_id", comment_id))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            Ok(decode_count(rows)? > 0)
        })
    }

    fn delete_by_post(&self, post_id: &str) -> BoxFuture<'_, DomainResult<Vec<String>>> {
        let post_id = post_id.to_string();
        Box::pin(async move {
            let mut response = self
                .client
                .query(
                    "SELECT comment_id FROM comment WHERE post_id = $post_id; \
                     DELETE comment WHERE post_id = $post_id",
                )
                .bind(("post_id", post_id))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            response.check().map_err(map_surreal_error)?;
            Ok(rows
                .iter()
                .filter_map(|row| row.get("comment_id").and_then(Value::as_str))
                .map(str::to_string)
                .collect())
        })
    }

    fn apply_reaction_delta(
        &self,
        comment_id: &str,
        like: i64,
        dislike: i64,
    ) -> BoxFuture<'_, DomainResult<Comment>> {
        let comment_id = comment_id.to_string();
        Box::pin(async move {
            let response = self
                .client
                .query(COMMENT_COUNTER_UPDATE)
                .bind(("comment_id", comment_id.clone()))
                .bind(("like", like))
                .bind(("dislike", dislike))
                .await
                .map_err(map_surreal_error)?;
            response.check().map_err(map_surreal_error)?;
            self.fetch(comment_id).await?.ok_or(DomainError::NotFound)
        })
    }
}

// ratings

const RATING_PROJECTION: &str = "post_id, user_id, score, <string>created_at AS created_at, \
     <string>updated_at AS updated_at";

fn rating_key(post_id: &str, user_id: &str) -> String {
    format!("{post_id}_{user_id}")
}

#[derive(Debug, Serialize)]
struct SurrealRatingCreateRow {
    post_id: String,
    user_id: String,
    score: u8,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, Deserialize)]
struct SurrealRatingRow {
    post_id: String,
    user_id: String,
    score: u8,
    created_at: String,
    updated_at: String,
}

fn map_rating_row(row: SurrealRatingRow) -> DomainResult<Rating> {
    Ok(Rating {
        post_id: row.post_id,
        user_id: row.user_id,
        score: row.score,
        created_at_ms: parse_rfc3339_ms(&row.created_at)?,
        updated_at_ms: parse_rfc3339_ms(&row.updated_at)?,
    })
}

#[derive(Clone)]
pub struct SurrealRatingRepository {
    client: SurrealClient,
}

impl SurrealRatingRepository {
    pub fn with_client(client: SurrealClient) -> Self {
        Self { client }
    }
}

impl RatingRepository for SurrealRatingRepository {
    fn upsert(&self, rating: &Rating) -> BoxFuture<'_, DomainResult<Option<Rating>>> {
        let key = rating_key(&rating.post_id, &rating.user_id);
        let payload = SurrealRatingCreateRow {
            post_id: rating.post_id.clone(),
            user_id: rating.user_id.clone(),
            score: rating.score,
            created_at: format_ms_rfc3339(rating.created_at_ms),
            updated_at: format_ms_rfc3339(rating.updated_at_ms),
        };
        Box::pin(async move {
            let payload = to_payload(payload)?;
            let mut response = self
                .client
                .query(format!(
                    "SELECT {RATING_PROJECTION} FROM type::record('rating', $key); \
                     UPSERT type::record('rating', $key) SET \
                        post_id = $payload.post_id, \
                        user_id = $payload.user_id, \
                        score = $payload.score, \
                        created_at = created_at ?? <datetime>$payload.created_at, \
                        updated_at = <datetime>$payload.updated_at"
                ))
                .bind(("key", key))
                .bind(("payload", payload))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            response.check().map_err(map_surreal_error)?;
            Ok(decode_rows(rows, "rating", map_rating_row)?.pop())
        })
    }

    fn get(&self, post_id: &str, user_id: &str) -> BoxFuture<'_, DomainResult<Option<Rating>>> {
        let key = rating_key(post_id, user_id);
        Box::pin(async move {
            let mut response = self
                .client
                .query(format!(
                    "SELECT {RATING_PROJECTION} FROM type::record('rating', $key)"
                ))
                .bind(("key", key))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            Ok(decode_rows(rows, "rating", map_rating_row)?.pop())
        })
    }

    fn delete(&self, post_id: &str, user_id: &str) -> BoxFuture<'_, DomainResult<Option<Rating>>> {
        let key = rating_key(post_id, user_id);
        Box::pin(async move {
            let mut response = self
                .client
                .query(format!(
                    "SELECT {RATING_PROJECTION} FROM type::record('rating', $key); \
                     DELETE type::record('rating', $key)"
                ))
                .bind(("key", key))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            response.check().map_err(map_surreal_error)?;
            Ok(decode_rows(rows, "rating", map_rating_row)?.pop())
        })
    }

    fn list_by_post(&self, post_id: &str) -> BoxFuture<'_, DomainResult<Vec<Rating>>> {
        let post_id = post_id.to_string();
        Box::pin(async move {
            let mut response = self
                .client
                .query(format!(
                    "SELECT {RATING_PROJECTION} FROM rating WHERE post_id = $post_id \
                     ORDER BY user_id ASC"
                ))
                .bind(("post_id", post_id))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            decode_rows(rows, "rating", map_rating_row)
        })
    }

    fn delete_by_post(&self, post_id: &str) -> BoxFuture<'_, DomainResult<()>> {
        let post_id = post_id.to_string();
        Box::pin(async move {
            let response = self
                .client
                .query("DELETE rating WHERE post_id = $post_id")
                .bind(("post_id", post_id))
                .await
                .map_err(map_surreal_error)?;
            response.check().map_err(map_surreal_error)?;
            Ok(())
        })
    }
}

// reactions

const REACTION_PROJECTION: &str =
    "target_type, target_id, user_id, kind, <string>created_at AS created_at";

fn reaction_key(target: ReactionTarget, target_id: &str, user_id: &str) -> String {
    format!("{}_{target_id}_{user_id}", target.as_str())
}

#[derive(Debug, Serialize)]
struct SurrealReactionCreateRow {
    target_type: String,
    target_id: String,
    user_id: String,
    kind: String,
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct SurrealReactionRow {
    target_type: String,
    target_id: String,
    user_id: String,
    kind: String,
    created_at: String,
}

fn map_reaction_row(row: SurrealReactionRow) -> DomainResult<Reaction> {
    Ok(Reaction {
        target_type: ReactionTarget::parse(&row.target_type).ok_or_else(|| {
            DomainError::Storage(format!("invalid reaction target '{}'", row.target_type))
        })?,
        target_id: row.target_id,
        user_id: row.user_id,
        kind: ReactionKind::parse(&row.kind)
            .ok_or_else(|| DomainError::Storage(format!("invalid reaction kind '{}'", row.kind)))?,
        created_at_ms: parse_rfc3339_ms(&row.created_at)?,
    })
}

#[derive(Clone)]
pub struct SurrealReactionRepository {
    client: SurrealClient,
}

impl SurrealReactionRepository {
    pub fn with_client(client: SurrealClient) -> Self {
        Self { client }
    }
}

impl ReactionRepository for SurrealReactionRepository {
    fn get(
        &self,
        target: ReactionTarget,
        target_id: &str,
        user_id: &str,
    ) -> BoxFuture<'_, DomainResult<Option<Reaction>>> {
        let key = reaction_key(target, target_id, user_id);
        Box::pin(async move {
            let mut response = self
                .client
                .query(format!(
                    "SELECT {REACTION_PROJECTION} FROM type::record('reaction', $key)"
                ))
                .bind(("key", key))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            Ok(decode_rows(rows, "reaction", map_reaction_row)?.pop())
        })
    }

    fn put(&self, reaction: &Reaction) -> BoxFuture<'_, DomainResult<Option<Reaction>>> {
        let key = reaction_key(reaction.target_type, &reaction.target_id, &reaction.user_id);
        let payload = SurrealReactionCreateRow {
            target_type: reaction.target_type.as_str().to_string(),
            target_id: reaction.target_id.clone(),
            user_id: reaction.user_id.clone(),
            kind: reaction.kind.as_str().to_string(),
            created_at: format_ms_rfc3339(reaction.created_at_ms),
        };
        Box::pin(async move {
            let payload = to_payload(payload)?;
            let mut response = self
                .client
                .query(format!(
                    "SELECT {REACTION_PROJECTION} FROM type::record('reaction', $key); \
                     UPSERT type::record('reaction', $key) SET \
                        target_type = $payload.target_type, \
                        target_id = $payload.target_id, \
                        user_id = $payload.user_id, \
                        kind = $payload.kind, \
                        created_at = <datetime>$payload.created_at"
                ))
                .bind(("key", key))
                .bind(("payload", payload))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            response.check().map_err(map_surreal_error)?;
            Ok(decode_rows(rows, "reaction", map_reaction_row)?.pop())
        })
    }

    fn delete(
        &self,
        target: ReactionTarget,
        target_id: &str,
        user_id: &str,
    ) -> BoxFuture<'_, DomainResult<Option<Reaction>>> {
        let key = reaction_key(target, target_id, user_id);
        Box::pin(async move {
            let mut response = self
                .client
                .query(format!(
                    "SELECT {REACTION_PROJECTION} FROM type::record('reaction', $key); \
                     DELETE type::record('reaction', $key)"
                ))
                .bind(("key", key))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            response.check().map_err(map_surreal_error)?;
            Ok(decode_rows(rows, "reaction", map_reaction_row)?.pop())
        })
    }

    fn delete_by_target(
        &self,
        target: ReactionTarget,
        target_id: &str,
    ) -> BoxFuture<'_, DomainResult<()>> {
        let target_type = target.as_str().to_string();
        let target_id = target_id.to_string();
        Box::pin(async move {
            let response = self
                .client
                .query("DELETE reaction WHERE target_type = $target_type AND target_id = $target_id")
                .bind(("target_type", target_type))
                .bind(("target_id", target_id))
                .await
                .map_err(map_surreal_error)?;
            response.check().map_err(map_surreal_error)?;
            Ok(())
        })
    }
}

// notifications

const NOTIFICATION_PROJECTION: &str = "notification_id, recipient_id, actor_id, actor_username, \
     kind, post_id, comment_id, message, dedupe_key, <string>created_at AS created_at, \
     (IF read_at THEN <string>read_at ELSE NONE END) AS read_at";

#[derive(Debug, Serialize)]
struct SurrealNotificationCreateRow {
    notification_id: String,
    recipient_id: String,
    actor_id: String,
    actor_username: String,
    kind: String,
    post_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment_id: Option<String>,
    message: String,
    dedupe_key: String,
    dedupe_claim: String,
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct SurrealNotificationRow {
    notification_id: String,
    recipient_id: String,
    actor_id: String,
    actor_username: String,
    kind: String,
    post_id: String,
    #[serde(default)]
    comment_id: Option<String>,
    message: String,
    dedupe_key: String,
    created_at: String,
    #[serde(default)]
    read_at: Option<String>,
}

fn map_notification_row(row: SurrealNotificationRow) -> DomainResult<Notification> {
    Ok(Notification {
        notification_id: row.notification_id,
        recipient_id: row.recipient_id,
        actor_id: row.actor_id,
        actor_username: row.actor_username,
        kind: NotificationKind::parse(&row.kind).ok_or_else(|| {
            DomainError::Storage(format!("invalid notification kind '{}'", row.kind))
        })?,
        post_id: row.post_id,
        comment_id: row.comment_id,
        message: row.message,
        created_at_ms: parse_rfc3339_ms(&row.created_at)?,
        read_at_ms: parse_optional_ms(row.read_at)?,
        dedupe_key: row.dedupe_key,
    })
}

#[derive(Clone)]
pub struct SurrealNotificationRepository {
    client: SurrealClient,
}

impl SurrealNotificationRepository {
    pub fn with_client(client: SurrealClient) -> Self {
        Self { client }
    }

    async fn fetch(&self, notification_id: String) -> DomainResult<Option<Notification>> {
        let mut response = self
            .client
            .query(format!(
                "SELECT {NOTIFICATION_PROJECTION} \
                 FROM type::record('notification', $notification_id)"
            ))
            .bind(("notification_id", notification_id))
            .await
            .map_err(map_surreal_error)?;
        let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
        Ok(decode_rows(rows, "notification", map_notification_row)?.pop())
    }
}

impl NotificationRepository for SurrealNotificationRepository {
    fn create(&self, notification: &Notification) -> BoxFuture<'_, DomainResult<Notification>> {
        let notification = notification.clone();
        let payload = SurrealNotificationCreateRow {
            notification_id: notification.notification_id.clone(),
            recipient_id: notification.recipient_id.clone(),
            actor_id: notification.actor_id.clone(),
            actor_username: notification.actor_username.clone(),
            kind: notification.kind.as_str().to_string(),
            post_id: notification.post_id.clone(),
            comment_id: notification.comment_id.clone(),
            message: notification.message.clone(),
            dedupe_key: notification.dedupe_key.clone(),
            dedupe_claim: format!("{}|{}", notification.recipient_id, notification.dedupe_key),
            created_at: format_ms_rfc3339(notification.created_at_ms),
        };
        Box::pin(async move {
            let payload = to_payload(payload)?;
            let response = self
                .client
                .query(
                    "BEGIN TRANSACTION; \
                     CREATE type::record('notification_dedupe', $payload.dedupe_claim) \
                        SET notification_id = $payload.notification_id; \
                     CREATE type::record('notification', $payload.notification_id) SET \
                        notification_id = $payload.notification_id, \
                        recipient_id = $payload.recipient_id, \
                        actor_id = $payload.actor_id, \
                        actor_username = $payload.actor_username, \
                        kind = $payload.kind, \
                        post_id = $payload.post_id, \
                        comment_id = $payload.comment_id, \
                        message = $payload.message, \
                        dedupe_key = $payload.dedupe_key, \
                        created_at = <datetime>$payload.created_at; \
                     COMMIT TRANSACTION;",
                )
                .bind(("payload", payload))
                .await
                .map_err(map_surreal_error)?;
            response.check().map_err(map_surreal_error)?;
            Ok(notification)
        })
    }

    fn get_by_dedupe_key(
        &self,
        recipient_id: &str,
        dedupe_key: &str,
    ) -> BoxFuture<'_, DomainResult<Option<Notification>>> {
        let recipient_id = recipient_id.to_string();
        let dedupe_key = dedupe_key.to_string();
        Box::pin(async move {
            let mut response = self
                .client
                .query(format!(
                    "SELECT {NOTIFICATION_PROJECTION} FROM notification \
                     WHERE recipient_id = $recipient_id AND dedupe_key = $dedupe_key LIMIT 1"
                ))
                .bind(("recipient_id", recipient_id))
                .bind(("dedupe_key", dedupe_key))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            Ok(decode_rows(rows, "notification", map_notification_row)?.pop())
        })
    }

    fn get(&self, notification_id: &str) -> BoxFuture<'_, DomainResult<Option<Notification>>> {
        let notification_id = notification_id.to_string();
        Box::pin(async move { self.fetch(notification_id).await })
    }

    fn list(
        &self,
        query: &NotificationRepositoryListQuery,
    ) -> BoxFuture<'_, DomainResult<Vec<Notification>>> {
        let query = query.clone();
        Box::pin(async move {
            let mut filters = vec!["recipient_id = $recipient_id"];
            let cursor = match (query.cursor_created_at_ms, query.cursor_notification_id.clone()) {
                (Some(created_at_ms), Some(notification_id)) => {
                    filters.push(
                        "(created_at < <datetime>$cursor_created_at \
                          OR (created_at = <datetime>$cursor_created_at \
                              AND notification_id < $cursor_notification_id))",
                    );
                    Some((format_ms_rfc3339(created_at_ms), notification_id))
                }
                _ => None,
            };
            if !query.include_read {
                filters.push("read_at IS NONE");
            }
            let statement = format!(
                "SELECT {NOTIFICATION_PROJECTION} FROM notification WHERE {} \
                 ORDER BY created_at DESC, notification_id DESC LIMIT $limit",
                filters.join(" AND ")
            );

            let mut db_query = self
                .client
                .query(statement)
                .bind(("recipient_id", query.recipient_id.clone()))
                .bind(("limit", query.limit as i64));
            if let Some((cursor_created_at, cursor_notification_id)) = cursor {
                db_query = db_query
                    .bind(("cursor_created_at", cursor_created_at))
                    .bind(("cursor_notification_id", cursor_notification_id));
            }

            let mut response = db_query.await.map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            decode_rows(rows, "notification", map_notification_row)
        })
    }

    fn mark_as_read(
        &self,
        notification_id: &str,
        read_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<Notification>> {
        let notification_id = notification_id.to_string();
        let read_at = format_ms_rfc3339(read_at_ms);
        Box::pin(async move {
            let response = self
                .client
                .query(
                    "UPDATE type::record('notification', $notification_id) \
                     SET read_at = <datetime>$read_at WHERE read_at IS NONE",
                )
                .bind(("notification_id", notification_id.clone()))
                .bind(("read_at", read_at))
                .await
                .map_err(map_surreal_error)?;
            response.check().map_err(map_surreal_error)?;
            self.fetch(notification_id)
                .await?
                .ok_or(DomainError::NotFound)
        })
    }

    fn mark_all_as_read(
        &self,
        recipient_id: &str,
        read_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<usize>> {
        let recipient_id = recipient_id.to_string();
        let read_at = format_ms_rfc3339(read_at_ms);
        Box::pin(async move {
            let mut response = self
                .client
                .query(
                    "UPDATE notification SET read_at = <datetime>$read_at \
                     WHERE recipient_id = $recipient_id AND read_at IS NONE \
                     RETURN notification_id",
                )
                .bind(("recipient_id", recipient_id))
                .bind(("read_at", read_at))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            Ok(rows.len())
        })
    }

    fn unread_count(&self, recipient_id: &str) -> BoxFuture<'_, DomainResult<usize>> {
        let recipient_id = recipient_id.to_string();
        Box::pin(async move {
            let mut response = self
                .client
                .query(
                    "SELECT count() AS total FROM notification \
                     WHERE recipient_id = $recipient_id AND read_at IS NONE GROUP ALL",
                )
                .bind(("recipient_id", recipient_id))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            decode_count(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keys_are_stable() {
        assert_eq!(rating_key("p1", "u1"), "p1_u1");
        assert_eq!(
            reaction_key(ReactionTarget::Comment, "c1", "u1"),
            "comment_c1_u1"
        );
    }

    #[test]
    fn every_sort_breaks_ties_by_recency_then_id() {
        for sort in [
            PostSort::Newest,
            PostSort::Oldest,
            PostSort::TopRated,
            PostSort::MostLiked,
            PostSort::MostDiscussed,
        ] {
            assert!(post_order_clause(sort).ends_with("post_id DESC"));
        }
    }

    #[test]
    fn counter_updates_clamp_at_zero() {
        for counter in [
            "like_count",
            "dislike_count",
            "comment_count",
            "rating_total",
            "rating_count",
        ] {
            assert!(POST_COUNTER_UPDATE.contains(&format!("{counter} = math::max([{counter} + $")));
            assert!(!POST_COUNTER_UPDATE.contains(&format!("{counter} +=")));
        }
        for counter in ["like_count", "dislike_count"] {
            assert!(COMMENT_COUNTER_UPDATE.contains(&format!("{counter} = math::max([{counter} + $")));
        }
    }

    #[test]
    fn count_rows_decode() {
        assert_eq!(decode_count(Vec::new()).unwrap(), 0);
        assert_eq!(
            decode_count(vec![serde_json::json!({ "total": 7 })]).unwrap(),
            7
        );
        assert!(decode_count(vec![serde_json::json!({ "other": 1 })]).is_err());
    }

    #[test]
    fn user_row_maps_role_and_times() {
        let row = SurrealUserRow {
            user_id: "u1".into(),
            username: "Alice".into(),
            email: "alice@example.com".into(),
            password_hash: "hash".into(),
            display_name: None,
            bio: None,
            avatar_url: None,
            role: "admin".into(),
            created_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:01Z".into(),
        };
        let user = map_user_row(row).unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.updated_at_ms - user.created_at_ms, 1000);
    }
}
