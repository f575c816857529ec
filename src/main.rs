use std::net::SocketAddr;
use std::sync::Arc;

use dealer_site::config::Config;
use dealer_site::db::create_pool;
use dealer_site::mailer::{LogMailer, Mailer, ResendMailer};
use dealer_site::models::AdminUser;
use dealer_site::repository::{MemoryStore, PgStore, Repositories};
use dealer_site::storage;
use dealer_site::web::{self, AppState};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dealer_site=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Starting dealer-site...");

    let repos = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = create_pool(url).await?;
            if config.run_migrations {
                sqlx::migrate!("./migrations").run(&pool).await?;
                tracing::info!("Migrations applied");
            }
            tracing::info!("Database connection established");
            Repositories::from_store(Arc::new(PgStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store with demo inventory");
            let store = MemoryStore::with_demo_inventory().await;
            if let (Some(email), Some(password_hash)) =
                (&config.admin_email, &config.admin_password_hash)
            {
                store
                    .put_admin(AdminUser {
                        id: uuid::Uuid::new_v4(),
                        email: email.clone(),
                        password_hash: password_hash.clone(),
                    })
                    .await;
                tracing::info!("Seeded admin account: email={}", email);
            }
            Repositories::from_store(Arc::new(store))
        }
    };

    let storage = match &config.storage {
        Some(storage_config) => {
            match storage::from_config(storage_config, config.storage_public_url.clone()).await {
                Ok(backend) => {
                    tracing::info!("Image storage enabled: bucket={}", backend.bucket());
                    Some(backend)
                }
                Err(e) => {
                    tracing::error!("Failed to create storage backend: {}", e);
                    None
                }
            }
        }
        None => {
            tracing::info!("Image storage disabled, uploads will be rejected");
            None
        }
    };

    let mailer: Arc<dyn Mailer> = match &config.resend_api_key {
        Some(key) => Arc::new(ResendMailer::new(config.resend_api_url.clone(), key.clone())),
        None => {
            tracing::warn!("RESEND_API_KEY not set, emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let state = AppState::new(&config, repos, storage, mailer)?;
    let app = web::router(state);

    let addr: SocketAddr = config.server_addr().parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
