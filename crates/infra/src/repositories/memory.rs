use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use respawn_domain::DomainResult;
use respawn_domain::comments::Comment;
use respawn_domain::error::DomainError;
use respawn_domain::notifications::Notification;
use respawn_domain::ports::BoxFuture;
use respawn_domain::ports::comments::CommentRepository;
use respawn_domain::ports::notifications::{
    NotificationRepository, NotificationRepositoryListQuery,
};
use respawn_domain::ports::posts::{PostCounterDelta, PostRepository, PostRepositoryQuery};
use respawn_domain::ports::ratings::RatingRepository;
use respawn_domain::ports::reactions::ReactionRepository;
use respawn_domain::ports::users::UserRepository;
use respawn_domain::posts::Post;
use respawn_domain::ratings::Rating;
use respawn_domain::reactions::{Reaction, ReactionTarget};
use respawn_domain::users::User;

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserRepository for InMemoryUserRepository {
    fn create(&self, user: &User) -> BoxFuture<'_, DomainResult<User>> {
        let user = user.clone();
        let users = self.users.clone();
        Box::pin(async move {
            let mut users = users.write().await;
            if users.contains_key(&user.user_id) {
                return Err(DomainError::Conflict("user already exists".into()));
            }
            let username = user.username.to_lowercase();
            if users
                .values()
                .any(|existing| existing.username.to_lowercase() == username)
            {
                return Err(DomainError::Conflict("username already taken".into()));
            }
            if users.values().any(|existing| existing.email == user.email) {
                return Err(DomainError::Conflict("email already registered".into()));
            }
            users.insert(user.user_id.clone(), user.clone());
            Ok(user)
        })
    }

    fn get(&self, user_id: &str) -> BoxFuture<'_, DomainResult<Option<User>>> {
        let user_id = user_id.to_string();
        let users = self.users.clone();
        Box::pin(async move { Ok(users.read().await.get(&user_id).cloned()) })
    }

    fn get_by_username(&self, username: &str) -> BoxFuture<'_, DomainResult<Option<User>>> {
        let username = username.to_lowercase();
        let users = self.users.clone();
        Box::pin(async move {
            let users = users.read().await;
            Ok(users
                .values()
                .find(|user| user.username.to_lowercase() == username)
                .cloned())
        })
    }

    fn get_by_email(&self, email: &str) -> BoxFuture<'_, DomainResult<Option<User>>> {
        let email = email.to_lowercase();
        let users = self.users.clone();
        Box::pin(async move {
            let users = users.read().await;
            Ok(users.values().find(|user| user.email == email).cloned())
        })
    }

    fn update(&self, user: &User) -> BoxFuture<'_, DomainResult<User>> {
        let user = user.clone();
        let users = self.users.clone();
        Box::pin(async move {
            let mut users = users.write().await;
            let Some(existing) = users.get_mut(&user.user_id) else {
                return Err(DomainError::NotFound);
            };
            *existing = user.clone();
            Ok(user)
        })
    }
}

#[derive(Default)]
pub struct InMemoryPostRepository {
    posts: Arc<RwLock<HashMap<String, Post>>>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn post_matches(post: &Post, query: &PostRepositoryQuery) -> bool {
    if let Some(author_id) = query.author_id.as_deref() {
        if post.author_id != author_id {
            return false;
        }
    }
    if let Some(game) = query.game.as_deref() {
        if post.game_title.to_lowercase() != game {
            return false;
        }
    }
    if let Some(text) = query.text.as_deref() {
        let hit = [&post.title, &post.body, &post.game_title]
            .iter()
            .any(|field| field.to_lowercase().contains(text));
        if !hit {
            return false;
        }
    }
    true
}

impl PostRepository for InMemoryPostRepository {
    fn create(&self, post: &Post) -> BoxFuture<'_, DomainResult<Post>> {
        let post = post.clone();
        let posts = self.posts.clone();
        Box::pin(async move {
            let mut posts = posts.write().await;
            if posts.contains_key(&post.post_id) {
                return Err(DomainError::Conflict("post already exists".into()));
            }
            posts.insert(post.post_id.clone(), post.clone());
            Ok(post)
        })
    }

    fn get(&self, post_id: &str) -> BoxFuture<'_, DomainResult<Option<Post>>> {
        let post_id = post_id.to_string();
        let posts = self.posts.clone();
        Box::pin(async move { Ok(posts.read().await.get(&post_id).cloned()) })
    }

    fn update(&self, post: &Post) -> BoxFuture<'_, DomainResult<Post>> {
        let post = post.clone();
        let posts = self.posts.clone();
        Box::pin(async move {
            let mut posts = posts.write().await;
            let Some(existing) = posts.get_mut(&post.post_id) else {
                return Err(DomainError::NotFound);
            };
            existing.title = post.title;
            existing.body = post.body;
            existing.game_title = post.game_title;
            existing.platform = post.platform;
            existing.tags = post.tags;
            existing.image_url = post.image_url;
            existing.updated_at_ms = post.updated_at_ms;
            Ok(existing.clone())
        })
    }

    fn delete(&self, post_id: &str) -> BoxFuture<'_, DomainResult<()>> {
        let post_id = post_id.to_string();
        let posts = self.posts.clone();
        Box::pin(async move {
            posts.write().await.remove(&post_id);
            Ok(())
        })
    }

    fn list(&self, query: &PostRepositoryQuery) -> BoxFuture<'_, DomainResult<(Vec<Post>, usize)>> {
        let query = query.clone();
        let posts = self.posts.clone();
        Box::pin(async move {
            let posts = posts.read().await;
            let mut matches: Vec<Post> = posts
                .values()
                .filter(|post| post_matches(post, &query))
                .cloned()
                .collect();
            matches.sort_by(|left, right| query.sort.compare(left, right));
            let total = matches.len();
            let items = matches
                .into_iter()
                .skip(query.offset)
                .take(query.limit)
                .collect();
            Ok((items, total))
        })
    }

    fn apply_counters(
        &self,
        post_id: &str,
        delta: &PostCounterDelta,
    ) -> BoxFuture<'_, DomainResult<Post>> {
        let post_id = post_id.to_string();
        let delta = delta.clone();
        let posts = self.posts.clone();
        Box::pin(async move {
            let mut posts = posts.write().await;
            let Some(post) = posts.get_mut(&post_id) else {
                return Err(DomainError::NotFound);
            };
            post.like_count = (post.like_count + delta.like).max(0);
            post.dislike_count = (post.dislike_count + delta.dislike).max(0);
            post.comment_count = (post.comment_count + delta.comment).max(0);
            post.rating_total = (post.rating_total + delta.rating_total).max(0);
            post.rating_count = (post.rating_count + delta.rating_count).max(0);
            Ok(post.clone())
        })
    }
}

#[derive(Default)]
pub struct InMemoryCommentRepository {
    comments: Arc<RwLock<HashMap<String, Comment>>>,
}

impl InMemoryCommentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommentRepository for InMemoryCommentRepository {
    fn create(&self, comment: &Comment) -> BoxFuture<'_, DomainResult<Comment>> {
        let comment = comment.clone();
        let comments = self.comments.clone();
        Box::pin(async move {
            let mut comments = comments.write().await;
            if comments.contains_key(&comment.comment_id) {
                return Err(DomainError::Conflict("comment already exists".into()));
            }
            comments.insert(comment.comment_id.clone(), comment.clone());
            Ok(comment)
        })
    }

    fn get(&self, comment_id: &str) -> BoxFuture<'_, DomainResult<Option<Comment>>> {
        let comment_id = comment_id.to_string();
        let comments = self.comments.clone();
        Box::pin(async move { Ok(comments.read().await.get(&comment_id).cloned()) })
    }

    fn update(&self, comment: &Comment) -> BoxFuture<'_, DomainResult<Comment>> {
        let comment = comment.clone();
        let comments = self.comments.clone();
        Box::pin(async move {
            let mut comments = comments.write().await;
            let Some(existing) = comments.get_mut(&comment.comment_id) else {
                return Err(DomainError::NotFound);
            };
            existing.body = comment.body;
            existing.deleted = comment.deleted;
            existing.updated_at_ms = comment.updated_at_ms;
            Ok(existing.clone())
        })
    }

    fn delete(&self, comment_id: &str) -> BoxFuture<'_, DomainResult<()>> {
        let comment_id = comment_id.to_string();
        let comments = self.comments.clone();
        Box::pin(async move {
            comments.write().await.remove(&comment_id);
            Ok(())
        })
    }

    fn list_by_post(&self, post_id: &str) -> BoxFuture<'_, DomainResult<Vec<Comment>>> {
        let post_id = post_id.to_string();
        let comments = self.comments.clone();
        Box::pin(async move {
            let comments = comments.read().await;
            let mut items: Vec<Comment> = comments
                .values()
                .filter(|comment| comment.post_id == post_id)
                .cloned()
                .collect();
            items.sort_by(|left, right| {
                left.created_at_ms
                    .cmp(&right.created_at_ms)
                    .then_with(|| left.comment_id.cmp(&right.comment_id))
            });
            Ok(items)
        })
    }

    fn has_replies(&self, comment_id: &str) -> BoxFuture<'_, DomainResult<bool>> {
        let comment_id = comment_id.to_string();
        let comments = self.comments.clone();
        Box::pin(async move {
            let comments = comments.read().await;
            Ok(comments
                .values()
                .any(|comment| comment.parent_id.as_deref() == Some(comment_id.as_str())))
        })
    }

    fn delete_by_post(&self, post_id: &str) -> BoxFuture<'_, DomainResult<Vec<String>>> {
        let post_id = post_id.to_string();
        let comments = self.comments.clone();
        Box::pin(async move {
            let mut comments = comments.write().await;
            let ids: Vec<String> = comments
                .values()
                .filter(|comment| comment.post_id == post_id)
                .map(|comment| comment.comment_id.clone())
                .collect();
            for id in &ids {
                comments.remove(id);
            }
            Ok(ids)
        })
    }

    fn apply_reaction_delta(
        &self,
        comment_id: &str,
        like: i64,
        dislike: i64,
    ) -> BoxFuture<'_, DomainResult<Comment>> {
        let comment_id = comment_id.to_string();
        let comments = self.comments.clone();
        Box::pin(async move {
            let mut comments = comments.write().await;
            let Some(comment) = comments.get_mut(&comment_id) else {
                return Err(DomainError::NotFound);
            };
            comment.like_count = (comment.like_count + like).max(0);
            comment.dislike_count = (comment.dislike_count + dislike).max(0);
            Ok(comment.clone())
        })
    }
}

#[derive(Default)]
pub struct InMemoryRatingRepository {
    ratings: Arc<RwLock<HashMap<(String, String), Rating>>>,
}

impl InMemoryRatingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RatingRepository for InMemoryRatingRepository {
    fn upsert(&self, rating: &Rating) -> BoxFuture<'_, DomainResult<Option<Rating>>> {
        let rating = rating.clone();
        let ratings = self.ratings.clone();
        Box::pin(async move {
            let key = (rating.post_id.clone(), rating.user_id.clone());
            let mut ratings = ratings.write().await;
            let previous = ratings.get(&key).cloned();
            let mut stored = rating;
            if let Some(previous) = previous.as_ref() {
                stored.created_at_ms = previous.created_at_ms;
            }
            ratings.insert(key, stored);
            Ok(previous)
        })
    }

    fn get(&self, post_id: &str, user_id: &str) -> BoxFuture<'_, DomainResult<Option<Rating>>> {
        let key = (post_id.to_string(), user_id.to_string());
        let ratings = self.ratings.clone();
        Box::pin(async move { Ok(ratings.read().await.get(&key).cloned()) })
    }

    fn delete(&self, post_id: &str, user_id: &str) -> BoxFuture<'_, DomainResult<Option<Rating>>> {
        let key = (post_id.to_string(), user_id.to_string());
        let ratings = self.ratings.clone();
        Box::pin(async move { Ok(ratings.write().await.remove(&key)) })
    }

    fn list_by_post(&self, post_id: &str) -> BoxFuture<'_, DomainResult<Vec<Rating>>> {
        let post_id = post_id.to_string();
        let ratings = self.ratings.clone();
        Box::pin(async move {
            let ratings = ratings.read().await;
            let mut items: Vec<Rating> = ratings
                .values()
                .filter(|rating| rating.post_id == post_id)
                .cloned()
                .collect();
            items.sort_by(|left, right| left.user_id.cmp(&right.user_id));
            Ok(items)
        })
    }

    fn delete_by_post(&self, post_id: &str) -> BoxFuture<'_, DomainResult<()>> {
        let post_id = post_id.to_string();
        let ratings = self.ratings.clone();
        Box::pin(async move {
            ratings
                .write()
                .await
                .retain(|(rated_post, _), _| *rated_post != post_id);
            Ok(())
        })
    }
}

type ReactionKey = (ReactionTarget, String, String);

#[derive(Default)]
pub struct InMemoryReactionRepository {
    reactions: Arc<RwLock<HashMap<ReactionKey, Reaction>>>,
}

impl InMemoryReactionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReactionRepository for InMemoryReactionRepository {
    fn get(
        &self,
        target: ReactionTarget,
        target_id: &str,
        user_id: &str,
    ) -> BoxFuture<'_, DomainResult<Option<Reaction>>> {
        let key = (target, target_id.to_string(), user_id.to_string());
        let reactions = self.reactions.clone();
        Box::pin(async move { Ok(reactions.read().await.get(&key).cloned()) })
    }

    fn put(&self, reaction: &Reaction) -> BoxFuture<'_, DomainResult<Option<Reaction>>> {
        let reaction = reaction.clone();
        let reactions = self.reactions.clone();
        Box::pin(async move {
            let key = (
                reaction.target_type,
                reaction.target_id.clone(),
                reaction.user_id.clone(),
            );
            Ok(reactions.write().await.insert(key, reaction))
        })
    }

    fn delete(
        &self,
        target: ReactionTarget,
        target_id: &str,
        user_id: &str,
    ) -> BoxFuture<'_, DomainResult<Option<Reaction>>> {
        let key = (target, target_id.to_string(), user_id.to_string());
        let reactions = self.reactions.clone();
        Box::pin(async move { Ok(reactions.write().await.remove(&key)) })
    }

    fn delete_by_target(
        &self,
        target: ReactionTarget,
        target_id: &str,
    ) -> BoxFuture<'_, DomainResult<()>> {
        let target_id = target_id.to_string();
        let reactions = self.reactions.clone();
        Box::pin(async move {
            reactions
                .write()
                .await
                .retain(|(kind, id, _), _| !(*kind == target && *id == target_id));
            Ok(())
        })
    }
}

#[derive(Default)]
pub struct InMemoryNotificationRepository {
    notifications: Arc<RwLock<HashMap<String, Notification>>>,
    by_dedupe_key: Arc<RwLock<HashMap<(String, String), String>>>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(left: &Notification, right: &Notification) -> std::cmp::Ordering {
    right
        .created_at_ms
        .cmp(&left.created_at_ms)
        .then_with(|| right.notification_id.cmp(&left.notification_id))
}

fn is_before_cursor(
    notification: &Notification,
    cursor_created_at_ms: Option<i64>,
    cursor_notification_id: Option<&str>,
) -> bool {
    match (cursor_created_at_ms, cursor_notification_id) {
        (Some(created_at_ms), Some(notification_id)) => {
            notification.created_at_ms < created_at_ms
                || (notification.created_at_ms == created_at_ms
                    && notification.notification_id.as_str() < notification_id)
        }
        (Some(created_at_ms), None) => notification.created_at_ms < created_at_ms,
        _ => true,
    }
}

impl NotificationRepository for InMemoryNotificationRepository {
    fn create(&self, notification: &Notification) -> BoxFuture<'_, DomainResult<Notification>> {
        let notification = notification.clone();
        let notifications = self.notifications.clone();
        let by_dedupe_key = self.by_dedupe_key.clone();
        Box::pin(async move {
            let mut notifications = notifications.write().await;
            let mut by_dedupe_key = by_dedupe_key.write().await;
            let key = (
                notification.recipient_id.clone(),
                notification.dedupe_key.clone(),
            );
            if by_dedupe_key.contains_key(&key)
                || notifications.contains_key(&notification.notification_id)
            {
                return Err(DomainError::Conflict("notification already exists".into()));
            }
            by_dedupe_key.insert(key, notification.notification_id.clone());
            notifications.insert(notification.notification_id.clone(), notification.clone());
            Ok(notification)
        })
    }

    fn get_by_dedupe_key(
        &self,
        recipient_id: &str,
        dedupe_key: &str,
    ) -> BoxFuture<'_, DomainResult<Option<Notification>>> {
        let key = (recipient_id.to_string(), dedupe_key.to_string());
        let notifications = self.notifications.clone();
        let by_dedupe_key = self.by_dedupe_key.clone();
        Box::pin(async move {
            let by_dedupe_key = by_dedupe_key.read().await;
            let Some(notification_id) = by_dedupe_key.get(&key) else {
                return Ok(None);
            };
            Ok(notifications.read().await.get(notification_id).cloned())
        })
    }

    fn get(&self, notification_id: &str) -> BoxFuture<'_, DomainResult<Option<Notification>>> {
        let notification_id = notification_id.to_string();
        let notifications = self.notifications.clone();
        Box::pin(async move { Ok(notifications.read().await.get(&notification_id).cloned()) })
    }

    fn list(
        &self,
        query: &NotificationRepositoryListQuery,
    ) -> BoxFuture<'_, DomainResult<Vec<Notification>>> {
        let query = query.clone();
        let notifications = self.notifications.clone();
        Box::pin(async move {
            let notifications = notifications.read().await;
            let mut items: Vec<Notification> = notifications
                .values()
                .filter(|item| item.recipient_id == query.recipient_id)
                .filter(|item| query.include_read || item.read_at_ms.is_none())
                .filter(|item| {
                    is_before_cursor(
                        item,
                        query.cursor_created_at_ms,
                        query.cursor_notification_id.as_deref(),
                    )
                })
                .cloned()
                .collect();
            items.sort_by(newest_first);
            items.truncate(query.limit);
            Ok(items)
        })
    }

    fn mark_as_read(
        &self,
        notification_id: &str,
        read_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<Notification>> {
        let notification_id = notification_id.to_string();
        let notifications = self.notifications.clone();
        Box::pin(async move {
            let mut notifications = notifications.write().await;
            let Some(notification) = notifications.get_mut(&notification_id) else {
                return Err(DomainError::NotFound);
            };
            if notification.read_at_ms.is_none() {
                notification.read_at_ms = Some(read_at_ms);
            }
            Ok(notification.clone())
        })
    }

    fn mark_all_as_read(
        &self,
        recipient_id: &str,
        read_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<usize>> {
        let recipient_id = recipient_id.to_string();
        let notifications = self.notifications.clone();
        Box::pin(async move {
            let mut notifications = notifications.write().await;
            let mut updated = 0;
            for notification in notifications.values_mut() {
                if notification.recipient_id == recipient_id && notification.read_at_ms.is_none() {
                    notification.read_at_ms = Some(read_at_ms);
                    updated += 1;
                }
            }
            Ok(updated)
        })
    }

    fn unread_count(&self, recipient_id: &str) -> BoxFuture<'_, DomainResult<usize>> {
        let recipient_id = recipient_id.to_string();
        let notifications = self.notifications.clone();
        Box::pin(async move {
            let notifications = notifications.read().await;
            Ok(notifications
                .values()
                .filter(|item| item.recipient_id == recipient_id && item.read_at_ms.is_none())
                .count())
        })
    }
}
