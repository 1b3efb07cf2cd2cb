use std::collections::HashSet;
use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::comments::Comment;
use crate::error::DomainError;
use crate::identity::ActorIdentity;
use crate::pagination::{CursorPage, make_cursor, normalize_limit, parse_cursor};
use crate::ports::notifications::{NotificationRepository, NotificationRepositoryListQuery};
use crate::posts::Post;
use crate::reactions::{ReactionKind, ReactionTarget};
use crate::util::now_ms;
use crate::{DomainResult, util};

const NOTIFICATIONS_EMITTED_TOTAL: &str = "respawn_notifications_emitted_total";
const MAX_EXCERPT_CHARS: usize = 80;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PostComment,
    CommentReply,
    PostLike,
    PostDislike,
    CommentLike,
    CommentDislike,
    PostRating,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PostComment => "post_comment",
            Self::CommentReply => "comment_reply",
            Self::PostLike => "post_like",
            Self::PostDislike => "post_dislike",
            Self::CommentLike => "comment_like",
            Self::CommentDislike => "comment_dislike",
            Self::PostRating => "post_rating",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "post_comment" => Some(Self::PostComment),
            "comment_reply" => Some(Self::CommentReply),
            "post_like" => Some(Self::PostLike),
            "post_dislike" => Some(Self::PostDislike),
            "comment_like" => Some(Self::CommentLike),
            "comment_dislike" => Some(Self::CommentDislike),
            "post_rating" => Some(Self::PostRating),
            _ => None,
        }
    }

    fn for_reaction(target: ReactionTarget, kind: ReactionKind) -> Self {
        match (target, kind) {
            (ReactionTarget::Post, ReactionKind::Like) => Self::PostLike,
            (ReactionTarget::Post, ReactionKind::Dislike) => Self::PostDislike,
            (ReactionTarget::Comment, ReactionKind::Like) => Self::CommentLike,
            (ReactionTarget::Comment, ReactionKind::Dislike) => Self::CommentDislike,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub notification_id: String,
    pub recipient_id: String,
    pub actor_id: String,
    pub actor_username: String,
    pub kind: NotificationKind,
    pub post_id: String,
    pub comment_id: Option<String>,
    pub message: String,
    pub created_at_ms: i64,
    pub read_at_ms: Option<i64>,
    pub dedupe_key: String,
}

/// A notification that has not been stored yet.
#[derive(Clone, Debug)]
pub struct NotificationDraft {
    pub recipient_id: String,
    pub actor: ActorIdentity,
    pub kind: NotificationKind,
    pub post_id: String,
    pub comment_id: Option<String>,
    pub message: String,
    pub dedupe_key: String,
}

#[derive(Clone, Debug)]
pub struct NotificationListQuery {
    pub recipient_id: String,
    pub cursor: Option<String>,
    pub limit: Option<usize>,
    pub include_read: Option<bool>,
}

pub fn should_notify(actor_id: &str, recipient_id: &str) -> bool {
    !recipient_id.is_empty() && actor_id != recipient_id
}

/// Drafts for a new comment. A top-level comment notifies the post author; a
/// reply notifies the parent author and, when distinct, the post author.
pub fn comment_drafts(
    actor: &ActorIdentity,
    post: &Post,
    parent: Option<&Comment>,
    comment: &Comment,
) -> Vec<NotificationDraft> {
    let excerpt = excerpt(&comment.body);
    let mut drafts = Vec::with_capacity(2);
    if let Some(parent) = parent {
        drafts.push(NotificationDraft {
            recipient_id: parent.author_id.clone(),
            actor: actor.clone(),
            kind: NotificationKind::CommentReply,
            post_id: post.post_id.clone(),
            comment_id: Some(comment.comment_id.clone()),
            message: format!("{} replied to your comment: \"{excerpt}\"", actor.username),
            dedupe_key: format!(
                "{}:{}",
                NotificationKind::CommentReply.as_str(),
                comment.comment_id
            ),
        });
    }
    drafts.push(NotificationDraft {
        recipient_id: post.author_id.clone(),
        actor: actor.clone(),
        kind: NotificationKind::PostComment,
        post_id: post.post_id.clone(),
        comment_id: Some(comment.comment_id.clone()),
        message: format!(
            "{} commented on your review \"{}\": \"{excerpt}\"",
            actor.username, post.title
        ),
        dedupe_key: format!(
            "{}:{}",
            NotificationKind::PostComment.as_str(),
            comment.comment_id
        ),
    });
    drafts
}

pub fn reaction_draft(
    actor: &ActorIdentity,
    post: &Post,
    comment: Option<&Comment>,
    kind: ReactionKind,
) -> NotificationDraft {
    let (target, recipient_id, target_id, noun) = match comment {
        Some(comment) => (
            ReactionTarget::Comment,
            comment.author_id.clone(),
            comment.comment_id.clone(),
            format!("your comment on \"{}\"", post.title),
        ),
        None => (
            ReactionTarget::Post,
            post.author_id.clone(),
            post.post_id.clone(),
            format!("your review \"{}\"", post.title),
        ),
    };
    let notification_kind = NotificationKind::for_reaction(target, kind);
    let verb = match kind {
        ReactionKind::Like => "liked",
        ReactionKind::Dislike => "disliked",
    };
    NotificationDraft {
        recipient_id,
        actor: actor.clone(),
        kind: notification_kind,
        post_id: post.post_id.clone(),
        comment_id: comment.map(|comment| comment.comment_id.clone()),
        message: format!("{} {verb} {noun}", actor.username),
        dedupe_key: format!(
            "{}:{}:{target_id}",
            notification_kind.as_str(),
            actor.user_id
        ),
    }
}

pub fn rating_draft(actor: &ActorIdentity, post: &Post, score: u8) -> NotificationDraft {
    NotificationDraft {
        recipient_id: post.author_id.clone(),
        actor: actor.clone(),
        kind: NotificationKind::PostRating,
        post_id: post.post_id.clone(),
        comment_id: None,
        message: format!(
            "{} rated your review \"{}\" {score}/5",
            actor.username, post.title
        ),
        dedupe_key: format!(
            "{}:{}:{}",
            NotificationKind::PostRating.as_str(),
            actor.user_id,
            post.post_id
        ),
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let mut short: String = trimmed.chars().take(MAX_EXCERPT_CHARS).collect();
    short.push_str("...");
    short
}

#[derive(Clone)]
pub struct NotificationService {
    repository: Arc<dyn NotificationRepository>,
}

impl NotificationService {
    pub fn new(repository: Arc<dyn NotificationRepository>) -> Self {
        Self { repository }
    }

    /// Stores the draft unless the actor is the recipient. A repeated dedupe
    /// key yields the notification stored the first time.
    pub async fn notify(&self, draft: NotificationDraft) -> DomainResult<Option<Notification>> {
        if !should_notify(&draft.actor.user_id, &draft.recipient_id) {
            return Ok(None);
        }
        let notification = Notification {
            notification_id: util::uuid_v7_without_dashes(),
            recipient_id: draft.recipient_id,
            actor_id: draft.actor.user_id,
            actor_username: draft.actor.username,
            kind: draft.kind,
            post_id: draft.post_id,
            comment_id: draft.comment_id,
            message: draft.message,
            created_at_ms: now_ms(),
            read_at_ms: None,
            dedupe_key: draft.dedupe_key,
        };

        match self.repository.create(&notification).await {
            Ok(notification) => {
                counter!(NOTIFICATIONS_EMITTED_TOTAL, "kind" => notification.kind.as_str())
                    .increment(1);
                tracing::debug!(
                    notification_id = %notification.notification_id,
                    recipient_id = %notification.recipient_id,
                    kind = notification.kind.as_str(),
                    "notification emitted"
                );
                Ok(Some(notification))
            }
            Err(DomainError::Conflict(_)) => self
                .repository
                .get_by_dedupe_key(&notification.recipient_id, &notification.dedupe_key)
                .await,
            Err(err) => Err(err),
        }
    }

    /// Best-effort fan-out: each recipient is notified at most once and
    /// failures are logged instead of returned.
    pub async fn dispatch(&self, drafts: Vec<NotificationDraft>) -> Vec<Notification> {
        let mut recipients = HashSet::new();
        let mut emitted = Vec::new();
        for draft in drafts {
            if !should_notify(&draft.actor.user_id, &draft.recipient_id) {
                continue;
            }
            if !recipients.insert(draft.recipient_id.clone()) {
                continue;
            }
            let kind = draft.kind;
            let recipient_id = draft.recipient_id.clone();
            match self.notify(draft).await {
                Ok(Some(notification)) => emitted.push(notification),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        recipient_id = %recipient_id,
                        kind = kind.as_str(),
                        "notification fan-out failed"
                    );
                }
            }
        }
        emitted
    }

    pub async fn list(&self, query: NotificationListQuery) -> DomainResult<CursorPage<Notification>> {
        validate_recipient_id(&query.recipient_id)?;
        let limit = normalize_limit(query.limit)?;
        let (cursor_ms, cursor_notification_id) = parse_cursor(query.cursor.as_deref())?;
        let repo_query = NotificationRepositoryListQuery {
            recipient_id: query.recipient_id,
            cursor_created_at_ms: cursor_ms,
            cursor_notification_id,
            limit: limit + 1,
            include_read: query.include_read.unwrap_or(false),
        };
        let mut items = self.repository.list(&repo_query).await?;

        let next_cursor = items
            .get(limit)
            .and(items.get(limit - 1))
            .map(|item| make_cursor(item.created_at_ms, &item.notification_id));
        items.truncate(limit);
        Ok(CursorPage { items, next_cursor })
    }

    pub async fn unread_count(&self, recipient_id: &str) -> DomainResult<usize> {
        validate_recipient_id(recipient_id)?;
        self.repository.unread_count(recipient_id).await
    }

    pub async fn mark_read(
        &self,
        recipient_id: &str,
        notification_id: &str,
    ) -> DomainResult<Notification> {
        validate_recipient_id(recipient_id)?;
        let notification = self
            .repository
            .get(notification_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        if notification.recipient_id != recipient_id {
            return Err(DomainError::Forbidden(
                "notification belongs to another user".into(),
            ));
        }
        if notification.read_at_ms.is_some() {
            return Ok(notification);
        }
        self.repository
            .mark_as_read(notification_id, now_ms())
            .await
    }

    pub async fn mark_all_read(&self, recipient_id: &str) -> DomainResult<usize> {
        validate_recipient_id(recipient_id)?;
        self.repository
            .mark_all_as_read(recipient_id, now_ms())
            .await
    }
}

fn validate_recipient_id(recipient_id: &str) -> DomainResult<()> {
    if recipient_id.trim().is_empty() {
        return Err(DomainError::Validation("recipient_id is required".into()));
    }
    Ok(())
}
