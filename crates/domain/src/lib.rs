pub mod auth;
pub mod comments;
pub mod error;
pub mod identity;
pub mod notifications;
pub mod pagination;
pub mod ports;
pub mod posts;
pub mod ratings;
pub mod reactions;
pub mod users;
pub mod util;

pub type DomainResult<T> = Result<T, error::DomainError>;
