use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use roteiro_api::{app, AppState, AuthConfig, Backends};
use roteiro_core::billing::StaticBillingProvider;
use roteiro_core::events::EventPublisher;
use roteiro_store::app_config::{Config, StorageBackend};
use roteiro_store::{
    DbClient, EventProducer, LogEventPublisher, MemoryStore, RedisClient, StoreAffiliateRepository,
    StoreBookingRepository, StoreContactRepository, StoreFleetRepository, StorePackageRepository, StoreUserDirectory,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roteiro_api=debug,roteiro_store=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Roteiro API on port {} ({:?} storage)", config.server.port, config.storage.backend);

    let mut business_rules = config.business_rules.clone();
    let backends = match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Backends {
                events: Arc::new(LogEventPublisher),
                ..Backends::memory(Arc::new(MemoryStore::new()))
            }
        }
        StorageBackend::Postgres => {
            let db = DbClient::new(&config.database.url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            business_rules = db
                .fetch_business_rules(business_rules)
                .await
                .context("Failed to load business rules")?;

            let redis = Arc::new(
                RedisClient::new(&config.redis.url)
                    .await
                    .context("Failed to connect to Redis")?,
            );

            let events: Arc<dyn EventPublisher> = match config.kafka.brokers.as_deref() {
                Some(brokers) => Arc::new(EventProducer::new(brokers).context("Failed to create Kafka producer")?),
                None => {
                    tracing::info!("No Kafka brokers configured, logging domain events");
                    Arc::new(LogEventPublisher)
                }
            };

            let pool = db.pool.clone();
            Backends {
                packages: Arc::new(StorePackageRepository::new(pool.clone())),
                fleet: Arc::new(StoreFleetRepository::new(pool.clone())),
                bookings: Arc::new(StoreBookingRepository::new(pool.clone())),
                affiliates: Arc::new(StoreAffiliateRepository::new(pool.clone())),
                contacts: Arc::new(StoreContactRepository::new(pool.clone())),
                users: Arc::new(StoreUserDirectory::new(pool)),
                holds: redis.clone(),
                rate_limiter: redis,
                events,
            }
        }
    };

    let billing = Arc::new(StaticBillingProvider::new(
        config.billing.plan.clone(),
        config.billing.amount_cents,
        config.billing.portal_url.clone(),
    ));

    let state = AppState::new(
        backends,
        billing,
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        business_rules,
    )
    .context("Failed to register metrics")?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state).into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
