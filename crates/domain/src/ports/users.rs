use crate::DomainResult;
use crate::ports::BoxFuture;
use crate::users::User;

#[allow(clippy::needless_pass_by_value)]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the username or email is already claimed.
    fn create(&self, user: &User) -> BoxFuture<'_, DomainResult<User>>;

    fn get(&self, user_id: &str) -> BoxFuture<'_, DomainResult<Option<User>>>;

    /// Case-insensitive lookup.
    fn get_by_username(&self, username: &str) -> BoxFuture<'_, DomainResult<Option<User>>>;

    fn get_by_email(&self, email: &str) -> BoxFuture<'_, DomainResult<Option<User>>>;

    fn update(&self, user: &User) -> BoxFuture<'_, DomainResult<User>>;
}
