use crate::DomainResult;
use crate::ports::BoxFuture;
use crate::reactions::{Reaction, ReactionTarget};

#[allow(clippy::needless_pass_by_value)]
pub trait ReactionRepository: Send + Sync {
    fn get(
        &self,
        target: ReactionTarget,
        target_id: &str,
        user_id: &str,
    ) -> BoxFuture<'_, DomainResult<Option<Reaction>>>;

    /// Inserts or replaces the reaction of `(target, target_id, user_id)` and
    /// returns the reaction it replaced.
    fn put(&self, reaction: &Reaction) -> BoxFuture<'_, DomainResult<Option<Reaction>>>;

    /// Returns the removed reaction, if there was one.
    fn delete(
        &self,
        target: ReactionTarget,
        target_id: &str,
        user_id: &str,
    ) -> BoxFuture<'_, DomainResult<Option<Reaction>>>;

    fn delete_by_target(
        &self,
        target: ReactionTarget,
        target_id: &str,
    ) -> BoxFuture<'_, DomainResult<()>>;
}
