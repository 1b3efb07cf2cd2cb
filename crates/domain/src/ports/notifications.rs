use crate::DomainResult;
use crate::notifications::Notification;
use crate::ports::BoxFuture;

#[derive(Clone, Debug)]
pub struct NotificationRepositoryListQuery {
    pub recipient_id: String,
    pub cursor_created_at_ms: Option<i64>,
    pub cursor_notification_id: Option<String>,
    pub limit: usize,
    pub include_read: bool,
}

#[allow(clippy::needless_pass_by_value)]
pub trait NotificationRepository: Send + Sync {
    /// Fails with `Conflict` when `(recipient_id, dedupe_key)` already exists.
    fn create(&self, notification: &Notification) -> BoxFuture<'_, DomainResult<Notification>>;

    fn get_by_dedupe_key(
        &self,
        recipient_id: &str,
        dedupe_key: &str,
    ) -> BoxFuture<'_, DomainResult<Option<Notification>>>;

    fn get(&self, notification_id: &str) -> BoxFuture<'_, DomainResult<Option<Notification>>>;

    fn list(
        &self,
        query: &NotificationRepositoryListQuery,
    ) -> BoxFuture<'_, DomainResult<Vec<Notification>>>;

    fn mark_as_read(
        &self,
        notification_id: &str,
        read_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<Notification>>;

    fn mark_all_as_read(
        &self,
        recipient_id: &str,
        read_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<usize>>;

    fn unread_count(&self, recipient_id: &str) -> BoxFuture<'_, DomainResult<usize>>;
}
