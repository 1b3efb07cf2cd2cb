use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::identity::ActorIdentity;
use crate::notifications::{NotificationService, comment_drafts};
use crate::ports::comments::CommentRepository;
use crate::ports::posts::{PostCounterDelta, PostRepository};
use crate::ports::reactions::ReactionRepository;
use crate::reactions::ReactionTarget;
use crate::util::{now_ms, require_text};

const MAX_BODY_LENGTH: usize = 5_000;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub comment_id: String,
    pub post_id: String,
    pub parent_id: Option<String>,
    pub author_id: String,
    pub author_username: String,
    pub body: String,
    pub like_count: i64,
    pub dislike_count: i64,
    pub deleted: bool,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CommentThread {
    pub post_id: String,
    pub total: usize,
    pub comments: Vec<CommentNode>,
}

#[derive(Clone, Debug)]
pub struct CommentCreate {
    pub body: String,
    pub parent_id: Option<String>,
}

/// Deepest reply level kept in a thread; root comments sit at level 0.
pub const MAX_REPLY_DEPTH: usize = 8;

/// Assembles a reply tree from a flat list.
///
/// Comments are bucketed under their parent id and then placed with an
/// explicit stack, so thread depth never grows the call stack. A comment whose
/// parent is missing from `comments` is treated as a root. Replies that would
/// sit below [`MAX_REPLY_DEPTH`] join their parent's siblings at that level.
/// Siblings are ordered oldest first.
pub fn build_comment_tree(mut comments: Vec<Comment>) -> Vec<CommentNode> {
    comments.sort_by(comment_order);

    let known: HashSet<String> = comments
        .iter()
        .map(|comment| comment.comment_id.clone())
        .collect();
    let mut children: HashMap<String, Vec<Comment>> = HashMap::new();
    let mut roots = Vec::new();
    for comment in comments {
        match comment.parent_id.clone() {
            Some(parent_id) if parent_id != comment.comment_id && known.contains(&parent_id) => {
                children.entry(parent_id).or_default().push(comment);
            }
            _ => roots.push(comment),
        }
    }

    let mut placed = PlacedComments::default();
    for root in roots {
        placed.place(root, &mut children);
    }
    // Parent cycles never reach a root; surface them at the top level.
    while let Some(parent_id) = children.keys().min().cloned() {
        let mut bucket = children.remove(&parent_id).unwrap_or_default();
        if bucket.is_empty() {
            continue;
        }
        let stranded = bucket.remove(0);
        if !bucket.is_empty() {
            children.insert(parent_id, bucket);
        }
        placed.place(stranded, &mut children);
    }
    placed.into_tree()
}

fn comment_order(left: &Comment, right: &Comment) -> std::cmp::Ordering {
    left.created_at_ms
        .cmp(&right.created_at_ms)
        .then_with(|| left.comment_id.cmp(&right.comment_id))
}

/// Flat arena of comments; a parent always precedes its replies.
#[derive(Default)]
struct PlacedComments {
    comments: Vec<Comment>,
    replies: Vec<Vec<usize>>,
    top_level: Vec<usize>,
}

impl PlacedComments {
    fn place(&mut self, root: Comment, children: &mut HashMap<String, Vec<Comment>>) {
        let mut pending = vec![(root, None::<usize>, 0usize)];
        while let Some((comment, parent, depth)) = pending.pop() {
            let index = self.comments.len();
            match parent {
                Some(parent) => self.replies[parent].push(index),
                None => self.top_level.push(index),
            }
            let (reply_parent, reply_depth) = if depth < MAX_REPLY_DEPTH {
                (Some(index), depth + 1)
            } else {
                (parent, depth)
            };
            if let Some(bucket) = children.remove(&comment.comment_id) {
                pending.extend(
                    bucket
                        .into_iter()
                        .map(|reply| (reply, reply_parent, reply_depth)),
                );
            }
            self.comments.push(comment);
            self.replies.push(Vec::new());
        }
    }

    fn into_tree(self) -> Vec<CommentNode> {
        let Self {
            comments,
            mut replies,
            top_level,
        } = self;
        for indices in &mut replies {
            indices.sort_by(|left, right| comment_order(&comments[*left], &comments[*right]));
        }
        let mut nodes: Vec<Option<CommentNode>> = Vec::with_capacity(comments.len());
        nodes.resize_with(comments.len(), || None);
        // Replies always have larger indices, so walking backwards builds leaves first.
        for (index, comment) in comments.into_iter().enumerate().rev() {
            let node_replies = replies[index]
                .iter()
                .filter_map(|reply| nodes[*reply].take())
                .collect();
            nodes[index] = Some(CommentNode {
                comment,
                replies: node_replies,
            });
        }
        top_level
            .into_iter()
            .filter_map(|index| nodes[index].take())
            .collect()
    }
}

#[derive(Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
    reactions: Arc<dyn ReactionRepository>,
    notifications: NotificationService,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentRepository>,
        posts: Arc<dyn PostRepository>,
        reactions: Arc<dyn ReactionRepository>,
        notifications: NotificationService,
    ) -> Self {
        Self {
            comments,
            posts,
            reactions,
            notifications,
        }
    }

    pub async fn add(
        &self,
        actor: &ActorIdentity,
        post_id: &str,
        input: CommentCreate,
    ) -> DomainResult<Comment> {
        let body = require_text("body", &input.body, MAX_BODY_LENGTH)?;
        let post = self.posts.get(post_id).await?.ok_or(DomainError::NotFound)?;

        let parent = match input.parent_id.as_deref().map(str::trim) {
            Some(parent_id) if !parent_id.is_empty() => {
                let parent = self.comments.get(parent_id).await?.ok_or_else(|| {
                    DomainError::Validation("parent comment does not exist".into())
                })?;
                if parent.post_id != post.post_id {
                    return Err(DomainError::Validation(
                        "parent comment belongs to another post".into(),
                    ));
                }
                if parent.deleted {
                    return Err(DomainError::Validation(
                        "cannot reply to a deleted comment".into(),
                    ));
                }
                Some(parent)
            }
            _ => None,
        };

        let now = now_ms();
        let comment = Comment {
            comment_id: crate::util::uuid_v7_without_dashes(),
            post_id: post.post_id.clone(),
            parent_id: parent.as_ref().map(|parent| parent.comment_id.clone()),
            author_id: actor.user_id.clone(),
            author_username: actor.username.clone(),
            body,
            like_count: 0,
            dislike_count: 0,
            deleted: false,
            created_at_ms: now,
            updated_at_ms: now,
        };
        let comment = self.comments.create(&comment).await?;
        let post = self
            .posts
            .apply_counters(
                &post.post_id,
                &PostCounterDelta {
                    comment: 1,
                    ..PostCounterDelta::default()
                },
            )
            .await?;

        self.notifications
            .dispatch(comment_drafts(actor, &post, parent.as_ref(), &comment))
            .await;
        Ok(comment)
    }

    pub async fn get(&self, comment_id: &str) -> DomainResult<Comment> {
        self.comments
            .get(comment_id)
            .await?
            .ok_or(DomainError::NotFound)
    }

    pub async fn thread(&self, post_id: &str) -> DomainResult<CommentThread> {
        if self.posts.get(post_id).await?.is_none() {
            return Err(DomainError::NotFound);
        }
        let comments = self.comments.list_by_post(post_id).await?;
        let total = comments.len();
        Ok(CommentThread {
            post_id: post_id.to_string(),
            total,
            comments: build_comment_tree(comments),
        })
    }

    pub async fn update(
        &self,
        actor: &ActorIdentity,
        comment_id: &str,
        body: &str,
    ) -> DomainResult<Comment> {
        let mut comment = self.get(comment_id).await?;
        if comment.author_id != actor.user_id {
            return Err(DomainError::Forbidden(
                "only the author can edit this comment".into(),
            ));
        }
        if comment.deleted {
            return Err(DomainError::Validation(
                "cannot edit a deleted comment".into(),
            ));
        }
        comment.body = require_text("body", body, MAX_BODY_LENGTH)?;
        comment.updated_at_ms = now_ms();
        self.comments.update(&comment).await
    }

    /// A comment with replies becomes a placeholder so the thread stays
    /// intact; otherwise it is removed outright.
    pub async fn delete(&self, actor: &ActorIdentity, comment_id: &str) -> DomainResult<()> {
        let mut comment = self.get(comment_id).await?;
        if !actor.can_manage(&comment.author_id) {
            return Err(DomainError::Forbidden(
                "only the author can delete this comment".into(),
            ));
        }
        if comment.deleted {
            return Err(DomainError::NotFound);
        }

        if self.comments.has_replies(comment_id).await? {
            comment.deleted = true;
            comment.body = String::new();
            comment.updated_at_ms = now_ms();
            self.comments.update(&comment).await?;
        } else {
            self.comments.delete(comment_id).await?;
            self.reactions
                .delete_by_target(ReactionTarget::Comment, comment_id)
                .await?;
        }

        self.posts
            .apply_counters(
                &comment.post_id,
                &PostCounterDelta {
                    comment: -1,
                    ..PostCounterDelta::default()
                },
            )
            .await?;
        Ok(())
    }
}
