use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use diesel::{Connection, PgConnection};
use diesel_async::pooled_connection::{bb8::Pool, AsyncDieselConnectionManager};
use diesel_async::AsyncPgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use rdkafka::config::ClientConfig;
use rdkafka::producer::FutureProducer;
use tracing::info;

use storefront_service::api::{self, AppState};
use storefront_service::auth::AuthKeys;
use storefront_service::outbox::OutboxProcessor;
use storefront_service::store::Storefront;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Parser)]
#[command(name = "storefront-service")]
struct Args {
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[arg(long, env = "KAFKA_BROKERS", default_value = "localhost:9092")]
    kafka_brokers: String,

    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    #[arg(long, env = "PORT", default_value = "3000")]
    port: u16,

    #[arg(long, env = "DB_POOL_SIZE", default_value = "10")]
    db_pool_size: u32,

    #[arg(long, env = "DB_POOL_TIMEOUT_SECS", default_value = "30")]
    db_pool_timeout_secs: u64,

    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "10")]
    request_timeout_secs: u64,

    #[arg(long, default_value = "order-events")]
    order_events_topic: String,

    #[arg(long, default_value = "5")]
    outbox_interval_secs: u64,

    #[arg(long)]
    skip_migrations: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    if args.skip_migrations {
        info!("Skipping database migrations");
    } else {
        info!("Running database migrations...");
        let mut conn = PgConnection::establish(&args.database_url)?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow::anyhow!("Migration error: {}", e))?;
        info!("Migrations completed successfully");
    }

    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&args.database_url);
    let pool = Pool::builder()
        .max_size(args.db_pool_size)
        .connection_timeout(Duration::from_secs(args.db_pool_timeout_secs))
        .build(config)
        .await?;

    let store = Storefront::new(pool.clone());
    store.seed_catalog_if_empty().await?;

    let producer: FutureProducer = ClientConfig::new()
        .set("bootstrap.servers", &args.kafka_brokers)
        .set("message.timeout.ms", "5000")
        .create()?;

    let outbox_processor = OutboxProcessor::new(
        pool,
        producer,
        args.order_events_topic.clone(),
        Duration::from_secs(args.outbox_interval_secs),
    );
    tokio::spawn(async move {
        outbox_processor.run().await;
    });

    let state = AppState {
        store,
        auth: Arc::new(AuthKeys::new(&args.jwt_secret)),
    };
    let app = api::create_router(state, Duration::from_secs(args.request_timeout_secs));
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.port)).await?;

    info!("Storefront service listening on http://0.0.0.0:{}/api", args.port);
    info!("Publishing order events to topic {}", args.order_events_topic);

    axum::serve(listener, app).await?;

    Ok(())
}
