use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::comments::Comment;
use crate::error::DomainError;
use crate::identity::ActorIdentity;
use crate::notifications::{NotificationService, reaction_draft};
use crate::ports::comments::CommentRepository;
use crate::ports::posts::{PostCounterDelta, PostRepository};
use crate::ports::reactions::ReactionRepository;
use crate::posts::Post;
use crate::util::now_ms;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "like" => Some(Self::Like),
            "dislike" => Some(Self::Dislike),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReactionTarget {
    Post,
    Comment,
}

impl ReactionTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "post" => Some(Self::Post),
            "comment" => Some(Self::Comment),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reaction {
    pub target_type: ReactionTarget,
    pub target_id: String,
    pub user_id: String,
    pub kind: ReactionKind,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReactionState {
    pub target_type: ReactionTarget,
    pub target_id: String,
    pub kind: Option<ReactionKind>,
    pub like_count: i64,
    pub dislike_count: i64,
}

/// Move from `previous` to `next` reaction with the counter deltas it implies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReactionTransition {
    pub previous: Option<ReactionKind>,
    pub next: Option<ReactionKind>,
    pub like_delta: i64,
    pub dislike_delta: i64,
}

impl ReactionTransition {
    /// Whether the owner should hear about it: only newly set or switched
    /// reactions count, never removals.
    pub fn notifies(&self) -> bool {
        self.next.is_some() && self.next != self.previous
    }
}

/// Requesting the reaction already held removes it; anything else sets it.
pub fn toggle(current: Option<ReactionKind>, requested: ReactionKind) -> ReactionTransition {
    let next = if current == Some(requested) {
        None
    } else {
        Some(requested)
    };
    reaction_delta(current, next)
}

pub fn reaction_delta(
    previous: Option<ReactionKind>,
    next: Option<ReactionKind>,
) -> ReactionTransition {
    fn counts(kind: Option<ReactionKind>) -> (i64, i64) {
        match kind {
            Some(ReactionKind::Like) => (1, 0),
            Some(ReactionKind::Dislike) => (0, 1),
            None => (0, 0),
        }
    }

    let (old_like, old_dislike) = counts(previous);
    let (new_like, new_dislike) = counts(next);
    ReactionTransition {
        previous,
        next,
        like_delta: new_like - old_like,
        dislike_delta: new_dislike - old_dislike,
    }
}

#[derive(Clone)]
pub struct ReactionService {
    reactions: Arc<dyn ReactionRepository>,
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    notifications: NotificationService,
}

impl ReactionService {
    pub fn new(
        reactions: Arc<dyn ReactionRepository>,
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
        notifications: NotificationService,
    ) -> Self {
        Self {
            reactions,
            posts,
            comments,
            notifications,
        }
    }

    pub async fn react_to_post(
        &self,
        actor: &ActorIdentity,
        post_id: &str,
        kind: ReactionKind,
    ) -> DomainResult<ReactionState> {
        let post = self.posts.get(post_id).await?.ok_or(DomainError::NotFound)?;
        let transition = self
            .apply(actor, ReactionTarget::Post, &post.post_id, kind)
            .await?;

        let post = self
            .posts
            .apply_counters(
                &post.post_id,
                &PostCounterDelta {
                    like: transition.like_delta,
                    dislike: transition.dislike_delta,
                    ..PostCounterDelta::default()
                },
            )
            .await?;

        if transition.notifies() {
            self.notifications
                .dispatch(vec![reaction_draft(actor, &post, None, kind)])
                .await;
        }

        Ok(ReactionState {
            target_type: ReactionTarget::Post,
            target_id: post.post_id,
            kind: transition.next,
            like_count: post.like_count,
            dislike_count: post.dislike_count,
        })
    }

    pub async fn react_to_comment(
        &self,
        actor: &ActorIdentity,
        comment_id: &str,
        kind: ReactionKind,
    ) -> DomainResult<ReactionState> {
        let comment = self
            .comments
            .get(comment_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        if comment.deleted {
            return Err(DomainError::Validation(
                "cannot react to a deleted comment".into(),
            ));
        }
        let transition = self
            .apply(actor, ReactionTarget::Comment, &comment.comment_id, kind)
            .await?;

        let comment = self
            .comments
            .apply_reaction_delta(
                &comment.comment_id,
                transition.like_delta,
                transition.dislike_delta,
            )
            .await?;

        if transition.notifies() {
            self.notify_comment_owner(actor, &comment, kind).await;
        }

        Ok(ReactionState {
            target_type: ReactionTarget::Comment,
            target_id: comment.comment_id,
            kind: transition.next,
            like_count: comment.like_count,
            dislike_count: comment.dislike_count,
        })
    }

    async fn apply(
        &self,
        actor: &ActorIdentity,
        target: ReactionTarget,
        target_id: &str,
        kind: ReactionKind,
    ) -> DomainResult<ReactionTransition> {
        let current = self
            .reactions
            .get(target, target_id, &actor.user_id)
            .await?;
        let requested = toggle(current.as_ref().map(|reaction| reaction.kind), kind);
        // Counters follow what the store replaced, not the read above.
        let replaced = match requested.next {
            Some(next) => {
                let reaction = Reaction {
                    target_type: target,
                    target_id: target_id.to_string(),
                    user_id: actor.user_id.clone(),
                    kind: next,
                    created_at_ms: now_ms(),
                };
                self.reactions.put(&reaction).await?
            }
            None => {
                self.reactions
                    .delete(target, target_id, &actor.user_id)
                    .await?
            }
        };
        Ok(reaction_delta(
            replaced.map(|reaction| reaction.kind),
            requested.next,
        ))
    }

    async fn notify_comment_owner(
        &self,
        actor: &ActorIdentity,
        comment: &Comment,
        kind: ReactionKind,
    ) {
        let post: Option<Post> = match self.posts.get(&comment.post_id).await {
            Ok(post) => post,
            Err(err) => {
                tracing::warn!(error = %err, comment_id = %comment.comment_id, "post lookup for notification failed");
                None
            }
        };
        if let Some(post) = post {
            self.notifications
                .dispatch(vec![reaction_draft(actor, &post, Some(comment), kind)])
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_reaction_sets_kind() {
        let transition = toggle(None, ReactionKind::Like);
        assert_eq!(transition.next, Some(ReactionKind::Like));
        assert_eq!((transition.like_delta, transition.dislike_delta), (1, 0));
        assert!(transition.notifies());
    }

    #[test]
    fn same_reaction_toggles_off_without_notification() {
        let transition = toggle(Some(ReactionKind::Dislike), ReactionKind::Dislike);
        assert_eq!(transition.next, None);
        assert_eq!((transition.like_delta, transition.dislike_delta), (0, -1));
        assert!(!transition.notifies());
    }

    #[test]
    fn opposite_reaction_switches_counters() {
        let transition = toggle(Some(ReactionKind::Like), ReactionKind::Dislike);
        assert_eq!(transition.next, Some(ReactionKind::Dislike));
        assert_eq!((transition.like_delta, transition.dislike_delta), (-1, 1));
    }

    #[test]
    fn delta_follows_the_replaced_reaction() {
        // A toggle decided on a stale read: the store already held the like.
        let transition = reaction_delta(Some(ReactionKind::Like), Some(ReactionKind::Like));
        assert_eq!((transition.like_delta, transition.dislike_delta), (0, 0));
        assert!(!transition.notifies());

        let removed_nothing = reaction_delta(None, None);
        assert_eq!((removed_nothing.like_delta, removed_nothing.dislike_delta), (0, 0));
    }

    #[test]
    fn names_round_trip() {
        assert_eq!(ReactionKind::parse("like"), Some(ReactionKind::Like));
        assert_eq!(ReactionKind::parse("meh"), None);
        assert_eq!(
            ReactionTarget::parse(ReactionTarget::Comment.as_str()),
            Some(ReactionTarget::Comment)
        );
    }
}
