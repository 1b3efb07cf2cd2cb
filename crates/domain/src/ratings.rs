use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::identity::ActorIdentity;
use crate::notifications::{NotificationService, rating_draft};
use crate::ports::posts::{PostCounterDelta, PostRepository};
use crate::ports::ratings::RatingRepository;
use crate::posts::{Post, rating_average};
use crate::util::now_ms;

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rating {
    pub post_id: String,
    pub user_id: String,
    pub score: u8,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RatingSummary {
    pub post_id: String,
    pub average: f64,
    pub count: i64,
    /// Number of ratings per score, index 0 holds the 1-star count.
    pub distribution: [u64; 5],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_score: Option<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RatingOutcome {
    pub rating: Rating,
    pub previous_score: Option<u8>,
    pub average: f64,
    pub count: i64,
}

pub fn validate_score(score: i64) -> DomainResult<u8> {
    if !(i64::from(MIN_SCORE)..=i64::from(MAX_SCORE)).contains(&score) {
        return Err(DomainError::Validation(format!(
            "score must be between {MIN_SCORE} and {MAX_SCORE}"
        )));
    }
    Ok(score as u8)
}

/// Counter change on the post when `previous` is replaced by `score`.
pub fn rating_delta(previous: Option<u8>, score: Option<u8>) -> PostCounterDelta {
    let old_total = previous.map(i64::from).unwrap_or(0);
    let new_total = score.map(i64::from).unwrap_or(0);
    let old_count = i64::from(previous.is_some());
    let new_count = i64::from(score.is_some());
    PostCounterDelta {
        rating_total: new_total - old_total,
        rating_count: new_count - old_count,
        ..PostCounterDelta::default()
    }
}

pub fn score_distribution(ratings: &[Rating]) -> [u64; 5] {
    let mut distribution = [0u64; 5];
    for rating in ratings {
        if (MIN_SCORE..=MAX_SCORE).contains(&rating.score) {
            distribution[usize::from(rating.score - MIN_SCORE)] += 1;
        }
    }
    distribution
}

#[derive(Clone)]
pub struct RatingService {
    ratings: Arc<dyn RatingRepository>,
    posts: Arc<dyn PostRepository>,
    notifications: NotificationService,
}

impl RatingService {
    pub fn new(
        ratings: Arc<dyn RatingRepository>,
        posts: Arc<dyn PostRepository>,
        notifications: NotificationService,
    ) -> Self {
        Self {
            ratings,
            posts,
            notifications,
        }
    }

    pub async fn rate(
        &self,
        actor: &ActorIdentity,
        post_id: &str,
        score: i64,
    ) -> DomainResult<RatingOutcome> {
        let score = validate_score(score)?;
        let post = self.load_post(post_id).await?;

        let now = now_ms();
        let existing = self.ratings.get(post_id, &actor.user_id).await?;
        let rating = Rating {
            post_id: post.post_id.clone(),
            user_id: actor.user_id.clone(),
            score,
            created_at_ms: existing
                .as_ref()
                .map(|rating| rating.created_at_ms)
                .unwrap_or(now),
            updated_at_ms: now,
        };
        let previous_score = self
            .ratings
            .upsert(&rating)
            .await?
            .map(|previous| previous.score);

        let delta = rating_delta(previous_score, Some(score));
        let post = if delta.is_empty() {
            post
        } else {
            self.posts.apply_counters(&post.post_id, &delta).await?
        };

        if previous_score != Some(score) {
            self.notifications
                .dispatch(vec![rating_draft(actor, &post, score)])
                .await;
        }

        Ok(RatingOutcome {
            rating,
            previous_score,
            average: post.rating_average(),
            count: post.rating_count,
        })
    }

    pub async fn remove(&self, actor: &ActorIdentity, post_id: &str) -> DomainResult<()> {
        let post = self.load_post(post_id).await?;
        let Some(previous) = self.ratings.delete(post_id, &actor.user_id).await? else {
            return Err(DomainError::NotFound);
        };
        self.posts
            .apply_counters(&post.post_id, &rating_delta(Some(previous.score), None))
            .await?;
        Ok(())
    }

    pub async fn summary(
        &self,
        post_id: &str,
        viewer_id: Option<&str>,
    ) -> DomainResult<RatingSummary> {
        let post = self.load_post(post_id).await?;
        let ratings = self.ratings.list_by_post(post_id).await?;
        let count = ratings.len() as i64;
        let total: i64 = ratings.iter().map(|rating| i64::from(rating.score)).sum();
        let my_score = viewer_id.and_then(|viewer_id| {
            ratings
                .iter()
                .find(|rating| rating.user_id == viewer_id)
                .map(|rating| rating.score)
        });
        Ok(RatingSummary {
            post_id: post.post_id,
            average: rating_average(total, count),
            count,
            distribution: score_distribution(&ratings),
            my_score,
        })
    }

    async fn load_post(&self, post_id: &str) -> DomainResult<Post> {
        self.posts.get(post_id).await?.ok_or(DomainError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(user_id: &str, score: u8) -> Rating {
        Rating {
            post_id: "p1".into(),
            user_id: user_id.into(),
            score,
            created_at_ms: 0,
            updated_at_ms: 0,
        }
    }

    #[test]
    fn score_bounds() {
        assert!(validate_score(0).is_err());
        assert!(validate_score(6).is_err());
        assert!(validate_score(-3).is_err());
        assert_eq!(validate_score(1).unwrap(), 1);
        assert_eq!(validate_score(5).unwrap(), 5);
    }

    #[test]
    fn delta_for_new_changed_and_removed_ratings() {
        let created = rating_delta(None, Some(4));
        assert_eq!((created.rating_total, created.rating_count), (4, 1));

        let changed = rating_delta(Some(4), Some(2));
        assert_eq!((changed.rating_total, changed.rating_count), (-2, 0));

        let removed = rating_delta(Some(3), None);
        assert_eq!((removed.rating_total, removed.rating_count), (-3, -1));

        assert!(rating_delta(Some(5), Some(5)).is_empty());
    }

    #[test]
    fn distribution_counts_each_score() {
        let ratings = vec![rating("a", 5), rating("b", 5), rating("c", 1), rating("d", 3)];
        assert_eq!(score_distribution(&ratings), [1, 0, 1, 0, 2]);
    }
}
