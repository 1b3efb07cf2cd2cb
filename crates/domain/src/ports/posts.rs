use crate::DomainResult;
use crate::ports::BoxFuture;
use crate::posts::{Post, PostSort};

#[derive(Clone, Debug)]
pub struct PostRepositoryQuery {
    pub author_id: Option<String>,
    /// Lower-cased game title, matched exactly.
    pub game: Option<String>,
    /// Lower-cased search text, matched as a substring.
    pub text: Option<String>,
    pub sort: PostSort,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostCounterDelta {
    pub like: i64,
    pub dislike: i64,
    pub comment: i64,
    pub rating_total: i64,
    pub rating_count: i64,
}

impl PostCounterDelta {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[allow(clippy::needless_pass_by_value)]
pub trait PostRepository: Send + Sync {
    fn create(&self, post: &Post) -> BoxFuture<'_, DomainResult<Post>>;

    fn get(&self, post_id: &str) -> BoxFuture<'_, DomainResult<Option<Post>>>;

    /// Replaces the editable fields; counters are left untouched.
    fn update(&self, post: &Post) -> BoxFuture<'_, DomainResult<Post>>;

    fn delete(&self, post_id: &str) -> BoxFuture<'_, DomainResult<()>>;

    /// Returns one page of matches and the total number of matches.
    fn list(&self, query: &PostRepositoryQuery) -> BoxFuture<'_, DomainResult<(Vec<Post>, usize)>>;

    /// Applies the delta atomically on the post document.
    fn apply_counters(
        &self,
        post_id: &str,
        delta: &PostCounterDelta,
    ) -> BoxFuture<'_, DomainResult<Post>>;
}
