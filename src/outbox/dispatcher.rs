use std::sync::Arc;
use std::time::Duration;

use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, DbErr, TransactionTrait};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::OutboxConfig;
use crate::metrics::AppMetrics;

use super::{OutboxError, OutboxEvent, OutboxMessage, OutboxWriter, PublishError, Publisher};

/// Counts of one dispatch cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub claimed: usize,
    pub published: usize,
    pub failed: usize,
}

/// Polls the outbox table and hands unsent events to a [`Publisher`]
///
/// A cycle reads a batch in a short transaction, publishes each event with a
/// deadline outside any transaction and marks every acknowledged event sent
/// in its own short transaction. Failed events stay unsent and are picked up
/// again next cycle.
///
/// With `skip_locked` on Postgres the batch is instead claimed with
/// `FOR UPDATE SKIP LOCKED` and the transaction stays open until the batch is
/// done, so concurrent dispatchers never publish the same rows. The locks only
/// cover outbox rows already written, note requests are not blocked by them.
#[derive(Clone)]
pub struct OutboxDispatcher {
    db: DatabaseConnection,
    writer: OutboxWriter,
    publisher: Arc<dyn Publisher>,
    poll_interval: Duration,
    publish_timeout: Duration,
    batch_size: u64,
    skip_locked: bool,
    metrics: Option<AppMetrics>,
}

impl OutboxDispatcher {
    pub fn new(
        db: DatabaseConnection,
        writer: OutboxWriter,
        publisher: Arc<dyn Publisher>,
        config: &OutboxConfig,
    ) -> Self {
        Self {
            db,
            writer,
            publisher,
            poll_interval: config.poll_interval(),
            publish_timeout: config.publish_timeout(),
            batch_size: config.batch_size,
            skip_locked: config.skip_locked,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: AppMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Whether a cycle holds row locks on its batch until it is done
    pub fn locks_batch(&self) -> bool {
        self.skip_locked && self.db.get_database_backend() == DbBackend::Postgres
    }

    /// Run a single read/publish/mark cycle
    #[tracing::instrument(skip(self))]
    pub async fn dispatch_once(&self) -> Result<DispatchSummary, OutboxError> {
        let summary = if self.locks_batch() {
            self.dispatch_locked().await?
        } else {
            self.dispatch_unlocked().await?
        };

        if let Some(metrics) = &self.metrics {
            metrics.set_outbox_pending(self.writer.count_unsent(&self.db).await?);
            metrics.record_outbox_published(summary.published as u64);
            metrics.record_outbox_publish_failures(summary.failed as u64);
        }

        tracing::debug!(
            claimed = summary.claimed,
            published = summary.published,
            failed = summary.failed,
            "Outbox dispatch cycle finished"
        );

        Ok(summary)
    }

    async fn dispatch_unlocked(&self) -> Result<DispatchSummary, OutboxError> {
        let tx = self.db.begin().await.map_err(storage("begin"))?;
        let events = self.writer.claim_unsent(&tx, self.batch_size, false).await?;
        tx.commit().await.map_err(storage("commit"))?;

        let mut summary = DispatchSummary {
            claimed: events.len(),
            ..DispatchSummary::default()
        };

        for event in &events {
            if self.deliver(event).await {
                let tx = self.db.begin().await.map_err(storage("begin"))?;
                self.writer.mark_as_sent(&tx, event).await?;
                tx.commit().await.map_err(storage("commit"))?;
                summary.published += 1;
            } else {
                summary.failed += 1;
            }
        }

        Ok(summary)
    }

    async fn dispatch_locked(&self) -> Result<DispatchSummary, OutboxError> {
        let tx = self.db.begin().await.map_err(storage("begin"))?;
        let events = self.writer.claim_unsent(&tx, self.batch_size, true).await?;

        let mut summary = DispatchSummary {
            claimed: events.len(),
            ..DispatchSummary::default()
        };

        for event in &events {
            if self.deliver(event).await {
                self.writer.mark_as_sent(&tx, event).await?;
                summary.published += 1;
            } else {
                summary.failed += 1;
            }
        }

        tx.commit().await.map_err(storage("commit"))?;

        Ok(summary)
    }

    /// Publish one event, `true` once the publisher acknowledged it
    async fn deliver(&self, event: &OutboxEvent) -> bool {
        let message = OutboxMessage::from(event);

        match self.publish(&message).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    event_id = %message.event_id,
                    action = %message.action,
                    error = %e,
                    "Failed to publish outbox event, will retry"
                );
                false
            }
        }
    }

    async fn publish(&self, message: &OutboxMessage) -> Result<(), PublishError> {
        match tokio::time::timeout(self.publish_timeout, self.publisher.publish(message)).await {
            Ok(result) => result,
            Err(_) => Err(PublishError::Timeout(self.publish_timeout)),
        }
    }

    /// Dispatch on every poll tick until `shutdown` flips to true or its
    /// sender is dropped. A cycle in progress is finished first.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            poll_interval = ?self.poll_interval,
            batch_size = self.batch_size,
            "Outbox dispatcher started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.dispatch_once().await {
                        tracing::error!(error = %e, "Outbox dispatch cycle failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Outbox dispatcher stopped");
    }

    /// Start [`run`](Self::run) on the current thread's local task set
    ///
    /// Publishers may hold non-`Send` HTTP clients, so the loop stays on the
    /// actix runtime it was spawned from.
    pub fn spawn(self) -> DispatcherHandle {
        let (sender, receiver) = watch::channel(false);
        let task = actix_web::rt::spawn(self.run(receiver));

        DispatcherHandle { sender, task }
    }
}

fn storage(operation: &'static str) -> impl FnOnce(DbErr) -> OutboxError {
    move |source| OutboxError::Storage { operation, source }
}

/// Stops a spawned dispatcher
pub struct DispatcherHandle {
    sender: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl DispatcherHandle {
    /// Signal shutdown and wait for the loop to exit
    pub async fn stop(self) {
        let _ = self.sender.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Outbox dispatcher task failed");
        }
    }
}
