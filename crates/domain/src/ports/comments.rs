use crate::DomainResult;
use crate::comments::Comment;
use crate::ports::BoxFuture;

#[allow(clippy::needless_pass_by_value)]
pub trait CommentRepository: Send + Sync {
    fn create(&self, comment: &Comment) -> BoxFuture<'_, DomainResult<Comment>>;

    fn get(&self, comment_id: &str) -> BoxFuture<'_, DomainResult<Option<Comment>>>;

    fn update(&self, comment: &Comment) -> BoxFuture<'_, DomainResult<Comment>>;

    fn delete(&self, comment_id: &str) -> BoxFuture<'_, DomainResult<()>>;

    fn list_by_post(&self, post_id: &str) -> BoxFuture<'_, DomainResult<Vec<Comment>>>;

    fn has_replies(&self, comment_id: &str) -> BoxFuture<'_, DomainResult<bool>>;

    /// Removes every comment of the post and returns the removed ids.
    fn delete_by_post(&self, post_id: &str) -> BoxFuture<'_, DomainResult<Vec<String>>>;

    fn apply_reaction_delta(
        &self,
        comment_id: &str,
        like: i64,
        dislike: i64,
    ) -> BoxFuture<'_, DomainResult<Comment>>;
}
