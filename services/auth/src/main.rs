use anyhow::Result;
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

mod error;
mod jwt;
mod mailer;
mod middleware;
mod models;
mod otp;
mod password;
mod repositories;
mod routes;
mod validation;

use crate::jwt::JwtService;
use crate::mailer::{HttpMailer, LogMailer, Mailer, MailerConfig};
use crate::repositories::{PgUserStore, UserStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub mailer: Arc<dyn Mailer>,
    pub jwt_service: JwtService,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting authentication service");

    // Initialize database connection pool
    let db_config = common::database::DatabaseConfig::from_env()?;
    let pool = common::database::init_pool(&db_config).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    // Initialize JWT service
    let jwt_config = jwt::JwtConfig::from_env()?;
    let jwt_service = JwtService::new(&jwt_config);

    // Initialize the mail transport; without credentials, delivery is
    // log-only so the service stays usable in development
    let mailer: Arc<dyn Mailer> = match MailerConfig::from_env() {
        Ok(mail_config) => Arc::new(HttpMailer::new(mail_config)),
        Err(e) => {
            warn!("Mail transport not configured ({}), using log-only delivery", e);
            Arc::new(LogMailer)
        }
    };

    let store: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool));

    let app_state = AppState {
        store,
        mailer,
        jwt_service,
    };

    info!("Authentication service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Authentication service listening on 0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
