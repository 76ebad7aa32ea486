//! Outbox relay: moves committed outbox rows to the broker.
//!
//! One or more relay instances may run concurrently, in one process or
//! across replicas. Each cycle claims a bounded batch of due rows under a
//! lease, publishes them grouped by partition key in generation order,
//! and marks each row delivered in a short autocommit statement. A
//! publish failure backs the row off and releases the instance's claims
//! on the rest of that key, so a later row never overtakes a failed
//! earlier one.
//!
//! Crash windows: a relay that dies after publishing but before marking
//! delivered leaves a claimed row whose lease expires, and the row is
//! published again by the next claimant. That is the at-least-once
//! contract; consumers deduplicate.

use crate::{compute_backoff, BrokerPublisher, OutboxResult};
use chrono::Utc;
use dispatch_database::{outbox, Database, OutboxMessage};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tracing::{debug, info, warn};

/// Relay tuning.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// How often to poll for due rows when idle.
    pub poll_interval: Duration,
    /// Maximum rows claimed per cycle.
    pub batch_size: usize,
    /// How long a claim is held before other instances may take it over.
    pub claim_ttl: Duration,
    /// Base delay for per-row exponential backoff.
    pub backoff_base: Duration,
    /// Cap for per-row backoff.
    pub backoff_max: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            batch_size: 50,
            claim_ttl: Duration::from_secs(30),
            backoff_base: Duration::from_secs(2),
            backoff_max: Duration::from_secs(300),
        }
    }
}

/// Outcome of one relay cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelayCycle {
    pub claimed: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Background publisher for pending outbox rows.
pub struct OutboxRelay {
    config: RelayConfig,
    db: Arc<Database>,
    publisher: Arc<dyn BrokerPublisher>,
    instance_id: String,
    wake: Arc<Notify>,
}

impl OutboxRelay {
    /// Create a relay instance with a fresh instance id.
    pub fn new(config: RelayConfig, db: Arc<Database>, publisher: Arc<dyn BrokerPublisher>) -> Self {
        Self {
            config,
            db,
            publisher,
            instance_id: format!("relay-{}", uuid::Uuid::new_v4()),
            wake: Arc::new(Notify::new()),
        }
    }

    /// Handle for nudging the relay after a commit, instead of waiting
    /// for the next poll tick.
    pub fn wake_handle(&self) -> Arc<Notify> {
        self.wake.clone()
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Run one claim/publish/mark cycle.
    pub async fn run_once(&self) -> OutboxResult<RelayCycle> {
        let now = Utc::now();
        let lease_until = now + chrono::Duration::milliseconds(self.config.claim_ttl.as_millis() as i64);

        let conn = self.db.get()?;
        let claimed = outbox::claim_due(
            &conn,
            &self.instance_id,
            now,
            lease_until,
            self.config.batch_size,
        )?;

        let mut cycle = RelayCycle {
            claimed: claimed.len(),
            ..RelayCycle::default()
        };
        if claimed.is_empty() {
            return Ok(cycle);
        }

        // Group by partition key, preserving generation order within and
        // across groups as claimed.
        let mut keys: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<OutboxMessage>> = HashMap::new();
        for row in claimed {
            if !groups.contains_key(&row.partition_key) {
                keys.push(row.partition_key.clone());
            }
            groups.entry(row.partition_key.clone()).or_default().push(row);
        }

        for key in keys {
            let rows = groups.remove(&key).unwrap_or_default();
            for row in rows {
                let result = self
                    .publisher
                    .publish(&row.topic, &row.partition_key, &row.event_type, &row.payload)
                    .await;

                match result {
                    Ok(()) => {
                        outbox::mark_delivered(&conn, row.id, Utc::now())?;
                        cycle.delivered += 1;
                    }
                    Err(err) => {
                        warn!(
                            id = row.id,
                            partition_key = %key,
                            retry_count = row.retry_count,
                            error = %err,
                            "Publish failed, backing off"
                        );
                        let delay = compute_backoff(
                            row.retry_count + 1,
                            self.config.backoff_base,
                            self.config.backoff_max,
                        );
                        outbox::mark_failed(&conn, row.id, &err.to_string(), Utc::now() + delay)?;
                        // The rest of this key waits its turn behind the
                        // failed row.
                        outbox::release_claims_for_key(&conn, &self.instance_id, &key)?;
                        cycle.failed += 1;
                        break;
                    }
                }
            }
        }

        Ok(cycle)
    }

    /// Run until the shutdown signal fires. The current cycle always
    /// finishes; outstanding claims are released on the way out so
    /// another instance can take over immediately.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        info!(instance = %self.instance_id, "Outbox relay started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.wake.notified() => {}
                _ = shutdown.changed() => break,
            }

            match self.run_once().await {
                Ok(cycle) if cycle.claimed > 0 => {
                    debug!(
                        claimed = cycle.claimed,
                        delivered = cycle.delivered,
                        failed = cycle.failed,
                        "Relay cycle complete"
                    );
                }
                Ok(_) => {}
                Err(err) => warn!(error = %err, "Relay cycle failed"),
            }
        }

        if let Ok(conn) = self.db.get() {
            match outbox::release_claims(&conn, &self.instance_id) {
                Ok(released) if released > 0 => {
                    info!(released, "Released outstanding claims on shutdown")
                }
                Ok(_) => {}
                Err(err) => warn!(error = %err, "Failed to release claims on shutdown"),
            }
        }
        info!(instance = %self.instance_id, "Outbox relay stopped");
    }
}
