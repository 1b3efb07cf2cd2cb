use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::identity::ActorIdentity;
use crate::pagination::{Page, normalize_limit, normalize_page};
use crate::ports::comments::CommentRepository;
use crate::ports::posts::{PostRepository, PostRepositoryQuery};
use crate::ports::ratings::RatingRepository;
use crate::ports::reactions::ReactionRepository;
use crate::reactions::ReactionTarget;
use crate::util::{dedupe_trimmed, now_ms, optional_text, require_text, validate_http_url};

const MAX_TITLE_LENGTH: usize = 200;
const MAX_BODY_LENGTH: usize = 20_000;
const MAX_GAME_TITLE_LENGTH: usize = 120;
const MAX_PLATFORM_LENGTH: usize = 40;
const MAX_TAGS: usize = 10;
const MAX_TAG_LENGTH: usize = 32;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub post_id: String,
    pub author_id: String,
    pub author_username: String,
    pub title: String,
    pub body: String,
    pub game_title: String,
    pub platform: Option<String>,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub like_count: i64,
    pub dislike_count: i64,
    pub comment_count: i64,
    pub rating_total: i64,
    pub rating_count: i64,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl Post {
    /// Mean score rounded to two decimals, `0.0` when unrated.
    pub fn rating_average(&self) -> f64 {
        rating_average(self.rating_total, self.rating_count)
    }
}

pub fn rating_average(total: i64, count: i64) -> f64 {
    if count <= 0 {
        return 0.0;
    }
    let average = total as f64 / count as f64;
    (average * 100.0).round() / 100.0
}

/// Post as returned by the API.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub rating_average: f64,
}

impl From<Post> for PostView {
    fn from(post: Post) -> Self {
        let rating_average = post.rating_average();
        Self {
            post,
            rating_average,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PostSort {
    #[default]
    Newest,
    Oldest,
    TopRated,
    MostLiked,
    MostDiscussed,
}

impl PostSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::TopRated => "top_rated",
            Self::MostLiked => "most_liked",
            Self::MostDiscussed => "most_discussed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "newest" => Some(Self::Newest),
            "oldest" => Some(Self::Oldest),
            "top_rated" => Some(Self::TopRated),
            "most_liked" => Some(Self::MostLiked),
            "most_discussed" => Some(Self::MostDiscussed),
            _ => None,
        }
    }

    /// Total order used by every backend: the sort key first, then newest
    /// first, then post id descending.
    pub fn compare(&self, left: &Post, right: &Post) -> std::cmp::Ordering {
        let primary = match self {
            Self::Newest => std::cmp::Ordering::Equal,
            Self::Oldest => left.created_at_ms.cmp(&right.created_at_ms),
            Self::TopRated => right
                .rating_average()
                .total_cmp(&left.rating_average())
                .then_with(|| right.rating_count.cmp(&left.rating_count)),
            Self::MostLiked => right.like_count.cmp(&left.like_count),
            Self::MostDiscussed => right.comment_count.cmp(&left.comment_count),
        };
        primary
            .then_with(|| right.created_at_ms.cmp(&left.created_at_ms))
            .then_with(|| right.post_id.cmp(&left.post_id))
    }
}

#[derive(Clone, Debug)]
pub struct PostCreate {
    pub title: String,
    pub body: String,
    pub game_title: String,
    pub platform: Option<String>,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
    pub game_title: Option<String>,
    pub platform: Option<String>,
    pub tags: Option<Vec<String>>,
    pub image_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct PostListQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub author_id: Option<String>,
    pub game: Option<String>,
    pub text: Option<String>,
    pub sort: Option<PostSort>,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    ratings: Arc<dyn RatingRepository>,
    reactions: Arc<dyn ReactionRepository>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
        ratings: Arc<dyn RatingRepository>,
        reactions: Arc<dyn ReactionRepository>,
    ) -> Self {
        Self {
            posts,
            comments,
            ratings,
            reactions,
        }
    }

    pub async fn create(&self, actor: &ActorIdentity, input: PostCreate) -> DomainResult<Post> {
        let now = now_ms();
        let post = Post {
            post_id: crate::util::uuid_v7_without_dashes(),
            author_id: actor.user_id.clone(),
            author_username: actor.username.clone(),
            title: require_text("title", &input.title, MAX_TITLE_LENGTH)?,
            body: require_text("body", &input.body, MAX_BODY_LENGTH)?,
            game_title: require_text("game_title", &input.game_title, MAX_GAME_TITLE_LENGTH)?,
            platform: optional_text("platform", input.platform.as_deref(), MAX_PLATFORM_LENGTH)?,
            tags: normalize_tags(&input.tags)?,
            image_url: normalize_image_url(input.image_url.as_deref())?,
            like_count: 0,
            dislike_count: 0,
            comment_count: 0,
            rating_total: 0,
            rating_count: 0,
            created_at_ms: now,
            updated_at_ms: now,
        };
        self.posts.create(&post).await
    }

    pub async fn get(&self, post_id: &str) -> DomainResult<Post> {
        self.posts.get(post_id).await?.ok_or(DomainError::NotFound)
    }

    pub async fn list(&self, query: PostListQuery) -> DomainResult<Page<Post>> {
        let page = normalize_page(query.page)?;
        let limit = normalize_limit(query.limit)?;
        let repo_query = PostRepositoryQuery {
            author_id: non_empty(query.author_id),
            game: non_empty(query.game).map(|game| game.to_lowercase()),
            text: non_empty(query.text).map(|text| text.to_lowercase()),
            sort: query.sort.unwrap_or_default(),
            offset: (page - 1).saturating_mul(limit),
            limit,
        };
        let (items, total) = self.posts.list(&repo_query).await?;
        Ok(Page::new(items, page, limit, total))
    }

    pub async fn update(
        &self,
        actor: &ActorIdentity,
        post_id: &str,
        update: PostUpdate,
    ) -> DomainResult<Post> {
        let mut post = self.get(post_id).await?;
        if post.author_id != actor.user_id {
            return Err(DomainError::Forbidden(
                "only the author can edit this post".into(),
            ));
        }
        if let Some(title) = update.title.as_deref() {
            post.title = require_text("title", title, MAX_TITLE_LENGTH)?;
        }
        if let Some(body) = update.body.as_deref() {
            post.body = require_text("body", body, MAX_BODY_LENGTH)?;
        }
        if let Some(game_title) = update.game_title.as_deref() {
            post.game_title = require_text("game_title", game_title, MAX_GAME_TITLE_LENGTH)?;
        }
        if let Some(platform) = update.platform.as_deref() {
            post.platform = optional_text("platform", Some(platform), MAX_PLATFORM_LENGTH)?;
        }
        if let Some(tags) = update.tags.as_ref() {
            post.tags = normalize_tags(tags)?;
        }
        if let Some(image_url) = update.image_url.as_deref() {
            post.image_url = normalize_image_url(Some(image_url))?;
        }
        post.updated_at_ms = now_ms();
        self.posts.update(&post).await
    }

    /// Deletes the post together with its comments, ratings and reactions.
    pub async fn delete(&self, actor: &ActorIdentity, post_id: &str) -> DomainResult<()> {
        let post = self.get(post_id).await?;
        if !actor.can_manage(&post.author_id) {
            return Err(DomainError::Forbidden(
                "only the author can delete this post".into(),
            ));
        }

        let comment_ids = self.comments.delete_by_post(post_id).await?;
        for comment_id in &comment_ids {
            self.reactions
                .delete_by_target(ReactionTarget::Comment, comment_id)
                .await?;
        }
        self.reactions
            .delete_by_target(ReactionTarget::Post, post_id)
            .await?;
        self.ratings.delete_by_post(post_id).await?;
        self.posts.delete(post_id).await?;

        tracing::info!(
            post_id,
            actor_id = %actor.user_id,
            removed_comments = comment_ids.len(),
            "post deleted"
        );
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn normalize_tags(tags: &[String]) -> DomainResult<Vec<String>> {
    let lowered: Vec<String> = tags.iter().map(|tag| tag.to_lowercase()).collect();
    let tags = dedupe_trimmed(&lowered);
    if tags.len() > MAX_TAGS {
        return Err(DomainError::Validation(format!(
            "tags exceeds max of {MAX_TAGS}"
        )));
    }
    if let Some(tag) = tags.iter().find(|tag| tag.chars().count() > MAX_TAG_LENGTH) {
        return Err(DomainError::Validation(format!(
            "tag '{tag}' exceeds max length of {MAX_TAG_LENGTH}"
        )));
    }
    Ok(tags)
}

fn normalize_image_url(value: Option<&str>) -> DomainResult<Option<String>> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => Ok(Some(validate_http_url("image_url", value)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(post_id: &str, created_at_ms: i64) -> Post {
        Post {
            post_id: post_id.into(),
            author_id: "u1".into(),
            author_username: "alice".into(),
            title: "t".into(),
            body: "b".into(),
            game_title: "g".into(),
            platform: None,
            tags: vec![],
            image_url: None,
            like_count: 0,
            dislike_count: 0,
            comment_count: 0,
            rating_total: 0,
            rating_count: 0,
            created_at_ms,
            updated_at_ms: created_at_ms,
        }
    }

    #[test]
    fn average_is_rounded_and_zero_when_unrated() {
        assert_eq!(rating_average(0, 0), 0.0);
        assert_eq!(rating_average(14, 3), 4.67);
        assert_eq!(rating_average(5, 1), 5.0);
    }

    #[test]
    fn tags_are_lowercased_deduped_and_bounded() {
        let tags = vec!["RPG".to_string(), "rpg".to_string(), " Indie ".to_string()];
        assert_eq!(normalize_tags(&tags).unwrap(), vec!["rpg", "indie"]);

        let too_many: Vec<String> = (0..=MAX_TAGS).map(|idx| format!("tag{idx}")).collect();
        assert!(normalize_tags(&too_many).is_err());
        assert!(normalize_tags(&["x".repeat(MAX_TAG_LENGTH + 1)]).is_err());
    }

    #[test]
    fn top_rated_orders_by_average_then_recency() {
        let mut great = post("a", 1);
        great.rating_total = 10;
        great.rating_count = 2;
        let mut good = post("b", 3);
        good.rating_total = 4;
        good.rating_count = 1;
        let unrated = post("c", 2);

        let mut posts = vec![unrated.clone(), good.clone(), great.clone()];
        posts.sort_by(|left, right| PostSort::TopRated.compare(left, right));
        let ids: Vec<_> = posts.iter().map(|post| post.post_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn newest_breaks_ties_by_id() {
        let mut posts = vec![post("a", 5), post("b", 5), post("c", 9)];
        posts.sort_by(|left, right| PostSort::Newest.compare(left, right));
        let ids: Vec<_> = posts.iter().map(|post| post.post_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn view_serializes_average_next_to_post_fields() {
        let mut rated = post("a", 1);
        rated.rating_total = 7;
        rated.rating_count = 2;
        let value = serde_json::to_value(PostView::from(rated)).unwrap();
        assert_eq!(value["post_id"], "a");
        assert_eq!(value["rating_average"], 3.5);
    }
}
