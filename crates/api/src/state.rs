use std::sync::Arc;

use respawn_domain::comments::CommentService;
use respawn_domain::notifications::NotificationService;
use respawn_domain::ports::comments::CommentRepository;
use respawn_domain::ports::db::DbAdapter;
use respawn_domain::ports::notifications::NotificationRepository;
use respawn_domain::ports::posts::PostRepository;
use respawn_domain::ports::ratings::RatingRepository;
use respawn_domain::ports::reactions::ReactionRepository;
use respawn_domain::ports::users::UserRepository;
use respawn_domain::posts::PostService;
use respawn_domain::ratings::RatingService;
use respawn_domain::reactions::ReactionService;
use respawn_domain::users::UserService;
use respawn_infra::auth::{Argon2PasswordHasher, TokenService};
use respawn_infra::config::{AppConfig, DataBackend};
use respawn_infra::db::{self, DbConfig, MemoryAdapter, SurrealAdapter};
use respawn_infra::repositories::{
    InMemoryCommentRepository, InMemoryNotificationRepository, InMemoryPostRepository,
    InMemoryRatingRepository, InMemoryReactionRepository, InMemoryUserRepository,
    SurrealCommentRepository, SurrealNotificationRepository, SurrealPostRepository,
    SurrealRatingRepository, SurrealReactionRepository, SurrealUserRepository,
};

/// Repository handles for one backend.
struct Repositories {
    users: Arc<dyn UserRepository>,
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    ratings: Arc<dyn RatingRepository>,
    reactions: Arc<dyn ReactionRepository>,
    notifications: Arc<dyn NotificationRepository>,
    db: Arc<dyn DbAdapter>,
}

impl Repositories {
    fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryUserRepository::new()),
            posts: Arc::new(InMemoryPostRepository::new()),
            comments: Arc::new(InMemoryCommentRepository::new()),
            ratings: Arc::new(InMemoryRatingRepository::new()),
            reactions: Arc::new(InMemoryReactionRepository::new()),
            notifications: Arc::new(InMemoryNotificationRepository::new()),
            db: Arc::new(MemoryAdapter),
        }
    }

    async fn surreal(config: &AppConfig) -> anyhow::Result<Self> {
        let client = db::connect(&DbConfig::from_app_config(config)).await?;
        Ok(Self {
            users: Arc::new(SurrealUserRepository::with_client(client.clone())),
            posts: Arc::new(SurrealPostRepository::with_client(client.clone())),
            comments: Arc::new(SurrealCommentRepository::with_client(client.clone())),
            ratings: Arc::new(SurrealRatingRepository::with_client(client.clone())),
            reactions: Arc::new(SurrealReactionRepository::with_client(client.clone())),
            notifications: Arc::new(SurrealNotificationRepository::with_client(client.clone())),
            db: Arc::new(SurrealAdapter::new(client)),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub tokens: TokenService,
    pub db: Arc<dyn DbAdapter>,
    pub users: UserService,
    pub posts: PostService,
    pub comments: CommentService,
    pub ratings: RatingService,
    pub reactions: ReactionService,
    pub notifications: NotificationService,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let repositories = match config.data_backend()? {
            DataBackend::Memory => {
                tracing::warn!("using in-memory storage; data is lost on restart");
                Repositories::in_memory()
            }
            DataBackend::Surreal => Repositories::surreal(&config).await?,
        };
        Ok(Self::from_repositories(config, repositories))
    }

    #[cfg(test)]
    pub fn in_memory(config: AppConfig) -> Self {
        Self::from_repositories(config, Repositories::in_memory())
    }

    fn from_repositories(config: AppConfig, repos: Repositories) -> Self {
        let notifications = NotificationService::new(repos.notifications.clone());
        Self {
            tokens: TokenService::from_app_config(&config),
            users: UserService::new(repos.users.clone(), Arc::new(Argon2PasswordHasher::new())),
            posts: PostService::new(
                repos.posts.clone(),
                repos.comments.clone(),
                repos.ratings.clone(),
                repos.reactions.clone(),
            ),
            comments: CommentService::new(
                repos.comments.clone(),
                repos.posts.clone(),
                repos.reactions.clone(),
                notifications.clone(),
            ),
            ratings: RatingService::new(
                repos.ratings.clone(),
                repos.posts.clone(),
                notifications.clone(),
            ),
            reactions: ReactionService::new(
                repos.reactions.clone(),
                repos.posts.clone(),
                repos.comments.clone(),
                notifications.clone(),
            ),
            notifications,
            db: repos.db,
            config,
        }
    }
}
