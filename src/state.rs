use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::user::{
    repo::{MemoryUserStore, PgUserStore, UserStore},
    services::AccountService,
    tokens::{JwtKeys, TokenIssuer},
};

/// Capabilities handed to the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub accounts: AccountService,
    pub tokens: TokenIssuer,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let store: Arc<dyn UserStore> = match &config.database_url {
            Some(url) => {
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                sqlx::migrate!("./migrations")
                    .run(&db)
                    .await
                    .context("run migrations")?;
                info!("using postgres user store");
                Arc::new(PgUserStore::new(db))
            }
            None => {
                warn!("DATABASE_URL not set; accounts are kept in memory only");
                Arc::new(MemoryUserStore::new())
            }
        };

        Ok(Self::from_parts(Arc::new(config), store))
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn UserStore>) -> Self {
        let accounts = AccountService::new(store.clone(), config.min_password_len);
        let tokens = TokenIssuer::new(store, JwtKeys::from(&config.jwt));
        Self {
            config,
            accounts,
            tokens,
        }
    }
}
