use crate::DomainResult;
use crate::ports::BoxFuture;
use crate::ratings::Rating;

#[allow(clippy::needless_pass_by_value)]
pub trait RatingRepository: Send + Sync {
    /// Inserts or replaces the rating of `(post_id, user_id)` and returns the
    /// rating it replaced.
    fn upsert(&self, rating: &Rating) -> BoxFuture<'_, DomainResult<Option<Rating>>>;

    fn get(&self, post_id: &str, user_id: &str) -> BoxFuture<'_, DomainResult<Option<Rating>>>;

    fn delete(&self, post_id: &str, user_id: &str) -> BoxFuture<'_, DomainResult<Option<Rating>>>;

    fn list_by_post(&self, post_id: &str) -> BoxFuture<'_, DomainResult<Vec<Rating>>>;

    fn delete_by_post(&self, post_id: &str) -> BoxFuture<'_, DomainResult<()>>;
}
