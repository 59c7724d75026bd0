use sea_orm::sea_query::{Expr, LockBehavior, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, DbBackend, DbErr,
    EntityTrait, NotSet, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use thiserror::Error;
use uuid::Uuid;

use crate::entities::v1::notes_outbox::{self, NoteOutboxAction};
use crate::metrics::AppMetrics;
use crate::models::v1::{Note, User};

/// A row of the `notes_outbox` table
pub type OutboxEvent = notes_outbox::Model;

#[derive(Debug, Error)]
pub enum OutboxError {
    /// A query on the outbox table failed. The enclosing transaction must be
    /// abandoned.
    #[error("Outbox {operation} failed: {source}")]
    Storage {
        operation: &'static str,
        #[source]
        source: DbErr,
    },
}

impl OutboxError {
    fn storage(operation: &'static str) -> impl FnOnce(DbErr) -> Self {
        move |source| Self::Storage { operation, source }
    }
}

/// Records note actions in the outbox table
///
/// Every method takes the caller's open transaction, so the event commits or
/// rolls back together with the note change it describes.
#[derive(Clone, Default)]
pub struct OutboxWriter {
    metrics: Option<AppMetrics>,
}

impl OutboxWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics(mut self, metrics: AppMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn create(
        &self,
        tx: &DatabaseTransaction,
        user: &User,
        note: &Note,
    ) -> Result<OutboxEvent, OutboxError> {
        self.insert(tx, NoteOutboxAction::Created, user, note.id).await
    }

    pub async fn update(
        &self,
        tx: &DatabaseTransaction,
        user: &User,
        note: &Note,
    ) -> Result<OutboxEvent, OutboxError> {
        self.insert(tx, NoteOutboxAction::Updated, user, note.id).await
    }

    pub async fn delete(
        &self,
        tx: &DatabaseTransaction,
        user: &User,
        note: &Note,
    ) -> Result<OutboxEvent, OutboxError> {
        self.insert(tx, NoteOutboxAction::Deleted, user, note.id).await
    }

    pub async fn find_by_id(
        &self,
        tx: &DatabaseTransaction,
        user: &User,
        note: &Note,
    ) -> Result<OutboxEvent, OutboxError> {
        self.insert(tx, NoteOutboxAction::Read, user, note.id).await
    }

    pub async fn search(
        &self,
        tx: &DatabaseTransaction,
        user: &User,
        note: &Note,
    ) -> Result<OutboxEvent, OutboxError> {
        self.insert(tx, NoteOutboxAction::Search, user, note.id).await
    }

    #[tracing::instrument(skip(self, tx, user), fields(user_id = %user.id))]
    async fn insert(
        &self,
        tx: &DatabaseTransaction,
        action: NoteOutboxAction,
        user: &User,
        note_id: Uuid,
    ) -> Result<OutboxEvent, OutboxError> {
        let event = notes_outbox::ActiveModel {
            id: NotSet,
            event_id: Set(Uuid::new_v4()),
            action: Set(action),
            user_id: Set(user.id.clone()),
            note_id: Set(note_id),
            sent: Set(false),
        }
        .insert(tx)
        .await
        .map_err(OutboxError::storage("insert"))?;

        if let Some(metrics) = &self.metrics {
            metrics.record_outbox_written(action);
        }

        tracing::debug!(event_id = %event.event_id, id = event.id, "Outbox event written");

        Ok(event)
    }

    /// Every unsent event, in storage order
    pub async fn get_all_outbox(
        &self,
        tx: &DatabaseTransaction,
    ) -> Result<Vec<OutboxEvent>, OutboxError> {
        notes_outbox::Entity::find()
            .filter(notes_outbox::Column::Sent.eq(false))
            .all(tx)
            .await
            .map_err(OutboxError::storage("get_all_outbox"))
    }

    /// Up to `limit` unsent events, oldest first.
    ///
    /// With `skip_locked` on PostgreSQL the rows are locked `FOR UPDATE SKIP
    /// LOCKED` until the transaction ends, so concurrent dispatchers claim
    /// disjoint sets.
    pub async fn claim_unsent(
        &self,
        tx: &DatabaseTransaction,
        limit: u64,
        skip_locked: bool,
    ) -> Result<Vec<OutboxEvent>, OutboxError> {
        let mut query = notes_outbox::Entity::find()
            .filter(notes_outbox::Column::Sent.eq(false))
            .order_by_asc(notes_outbox::Column::Id)
            .limit(limit);

        if skip_locked && tx.get_database_backend() == DbBackend::Postgres {
            query = query.lock_with_behavior(LockType::Update, LockBehavior::SkipLocked);
        }

        query
            .all(tx)
            .await
            .map_err(OutboxError::storage("claim_unsent"))
    }

    /// Number of events still waiting for delivery
    pub async fn count_unsent<C: ConnectionTrait>(&self, conn: &C) -> Result<u64, OutboxError> {
        notes_outbox::Entity::find()
            .filter(notes_outbox::Column::Sent.eq(false))
            .count(conn)
            .await
            .map_err(OutboxError::storage("count_unsent"))
    }

    /// Flag the event as delivered. Marking an already sent event is a no-op.
    pub async fn mark_as_sent(
        &self,
        tx: &DatabaseTransaction,
        event: &OutboxEvent,
    ) -> Result<(), OutboxError> {
        notes_outbox::Entity::update_many()
            .col_expr(notes_outbox::Column::Sent, Expr::value(true))
            .filter(notes_outbox::Column::Id.eq(event.id))
            .exec(tx)
            .await
            .map_err(OutboxError::storage("mark_as_sent"))?;

        Ok(())
    }
}
