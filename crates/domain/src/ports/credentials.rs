use crate::DomainResult;
use crate::ports::BoxFuture;

/// One-way password hashing. Implementations embed their own salt and
/// parameters in the returned string and keep the work off the async
/// executor.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> BoxFuture<'_, DomainResult<String>>;

    fn verify(&self, password: &str, password_hash: &str) -> BoxFuture<'_, DomainResult<bool>>;
}
