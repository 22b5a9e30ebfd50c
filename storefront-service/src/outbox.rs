use anyhow::Result;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use rdkafka::producer::{FutureProducer, FutureRecord};
use std::time::Duration;
use tokio::time;
use tracing::{debug, error, info};

use crate::models::DbOutboxEvent;
use crate::schema::outbox_events;
use crate::store::DbPool;

const BATCH_SIZE: i64 = 100;

/// Publishes unprocessed outbox rows to Kafka, oldest first, and marks each
/// row processed once the broker has acknowledged it.
pub struct OutboxProcessor {
    pool: DbPool,
    producer: FutureProducer,
    topic: String,
    interval: Duration,
}

impl OutboxProcessor {
    pub fn new(pool: DbPool, producer: FutureProducer, topic: String, interval: Duration) -> Self {
        Self {
            pool,
            producer,
            topic,
            interval,
        }
    }

    pub async fn run(&self) {
        let mut interval = time::interval(self.interval);

        loop {
            interval.tick().await;

            match self.publish_pending().await {
                Ok(0) => {}
                Ok(published) => debug!("Published {} outbox events", published),
                Err(e) => error!("Error processing outbox events: {}", e),
            }
        }
    }

    pub async fn publish_pending(&self) -> Result<usize> {
        let mut conn = self.pool.get().await?;

        let pending = outbox_events::table
            .filter(outbox_events::processed.eq(false))
            .order(outbox_events::created_at.asc())
            .limit(BATCH_SIZE)
            .select(DbOutboxEvent::as_select())
            .load::<DbOutboxEvent>(&mut conn)
            .await?;

        let mut published = 0;
        for event in pending {
            if let Err(e) = self.publish_event(&event).await {
                // Leave the row pending; later rows for the same order must wait.
                error!("Failed to publish event {}: {}", event.id, e);
                break;
            }

            diesel::update(outbox_events::table.find(event.id))
                .set(outbox_events::processed.eq(true))
                .execute(&mut conn)
                .await?;

            info!("Published {} event {} for order {}", event.event_type, event.id, event.aggregate_id);
            published += 1;
        }

        Ok(published)
    }

    async fn publish_event(&self, event: &DbOutboxEvent) -> Result<()> {
        let json = serde_json::to_string(&event.event_data)?;
        let key = event.aggregate_id.to_string();
        let record = FutureRecord::to(&self.topic).payload(&json).key(&key);

        self.producer
            .send(record, Duration::from_secs(5))
            .await
            .map_err(|(e, _)| anyhow::anyhow!("Failed to publish event: {}", e))?;

        Ok(())
    }
}
