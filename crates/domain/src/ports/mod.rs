use std::future::Future;
use std::pin::Pin;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub mod comments;
pub mod credentials;
pub mod db;
pub mod notifications;
pub mod posts;
pub mod ratings;
pub mod reactions;
pub mod users;
