//! Application state shared across handlers.

use crate::auth::AuthService;
use crate::catalog::CatalogClient;
use crate::config::Config;
use crate::db::Database;
use crate::exchange::ExchangeService;
use crate::lists::ListService;
use crate::progress::ProgressService;
use crate::reviews::ReviewService;
use crate::social::SocialService;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,
    /// Database connection.
    pub db: Database,
    /// Authentication service.
    pub auth: Arc<AuthService>,
    /// Book catalog client.
    pub catalog: Arc<CatalogClient>,
    /// Reading progress service.
    pub progress: Arc<ProgressService>,
    /// Favorites and reading list service.
    pub lists: Arc<ListService>,
    /// Review service.
    pub reviews: Arc<ReviewService>,
    /// Exchange service.
    pub exchange: Arc<ExchangeService>,
    /// Social service.
    pub social: Arc<SocialService>,
}

impl AppState {
    /// Create new application state with database.
    pub fn new(config: Config, db: Database) -> Self {
        let auth = AuthService::new(
            db.clone(),
            config.auth.session_days,
            config.auth.registration_enabled(),
        );
        let catalog = CatalogClient::new(
            config.catalog.base_url.clone(),
            config.catalog.resolve_api_key(),
        );

        Self {
            auth: Arc::new(auth),
            catalog: Arc::new(catalog),
            progress: Arc::new(ProgressService::new(db.clone())),
            lists: Arc::new(ListService::new(db.clone())),
            reviews: Arc::new(ReviewService::new(db.clone())),
            exchange: Arc::new(ExchangeService::new(db.clone())),
            social: Arc::new(SocialService::new(db.clone())),
            config: Arc::new(config),
            db,
        }
    }
}
