use sea_orm::{ActiveModelTrait, DatabaseConnection, TransactionTrait};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::entities::v1::notes;
use crate::models::v1::{NewNote, Note, User};
use crate::outbox::OutboxWriter;

use super::{storage, NoteError};

/// Outcome for one submitted note, `index` is its position in the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateNoteResult {
    Created { index: usize, id: Uuid },
    Failed { index: usize, reason: String },
}

impl CreateNoteResult {
    pub fn index(&self) -> usize {
        match self {
            CreateNoteResult::Created { index, .. } | CreateNoteResult::Failed { index, .. } => {
                *index
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateNotesSummary {
    pub created: usize,
    pub failed: usize,
}

/// Receiving side of a bulk creation
///
/// `results` yields one item per submitted note. `completion` resolves once,
/// after the last result has been sent.
pub struct CreateNotesHandle {
    pub results: mpsc::UnboundedReceiver<CreateNoteResult>,
    pub completion: oneshot::Receiver<CreateNotesSummary>,
}

impl CreateNotesHandle {
    /// Drain every result and wait for completion
    pub async fn collect(mut self) -> (Vec<CreateNoteResult>, Option<CreateNotesSummary>) {
        let mut results = Vec::new();
        while let Some(result) = self.results.recv().await {
            results.push(result);
        }
        (results, self.completion.await.ok())
    }
}

/// Create notes in the background, `batch_size` notes per transaction
///
/// Each stored note gets a `created` outbox event in the same transaction. A
/// note with an empty title fails on its own. A storage failure fails every
/// valid note of its batch.
pub fn create_notes(
    db: DatabaseConnection,
    writer: OutboxWriter,
    batch_size: usize,
    user: User,
    notes: Vec<NewNote>,
) -> CreateNotesHandle {
    let (results_tx, results) = mpsc::unbounded_channel();
    let (completion_tx, completion) = oneshot::channel();
    let batch_size = batch_size.max(1);

    tokio::spawn(async move {
        let mut summary = CreateNotesSummary::default();
        let total = notes.len();
        let mut inputs = notes.into_iter().enumerate().peekable();

        while inputs.peek().is_some() {
            let batch: Vec<(usize, NewNote)> = inputs.by_ref().take(batch_size).collect();

            for result in create_batch(&db, &writer, &user, batch).await {
                match &result {
                    CreateNoteResult::Created { .. } => summary.created += 1,
                    CreateNoteResult::Failed { .. } => summary.failed += 1,
                }
                // The caller may have stopped listening, creation goes on
                let _ = results_tx.send(result);
            }
        }

        tracing::info!(
            user_id = %user.id,
            total,
            created = summary.created,
            failed = summary.failed,
            "Bulk note creation finished"
        );

        drop(results_tx);
        let _ = completion_tx.send(summary);
    });

    CreateNotesHandle {
        results,
        completion,
    }
}

async fn create_batch(
    db: &DatabaseConnection,
    writer: &OutboxWriter,
    user: &User,
    batch: Vec<(usize, NewNote)>,
) -> Vec<CreateNoteResult> {
    let mut results = Vec::with_capacity(batch.len());
    let mut valid = Vec::with_capacity(batch.len());

    for (index, input) in batch {
        if input.title.trim().is_empty() {
            results.push(CreateNoteResult::Failed {
                index,
                reason: NoteError::EmptyTitle.to_string(),
            });
        } else {
            valid.push((index, Note::new(user.id.clone(), input.title, input.content)));
        }
    }

    if valid.is_empty() {
        return results;
    }

    match store_batch(db, writer, user, &valid).await {
        Ok(()) => results.extend(
            valid
                .iter()
                .map(|(index, note)| CreateNoteResult::Created {
                    index: *index,
                    id: note.id,
                }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, notes = valid.len(), "Note batch rolled back");
            let reason = e.to_string();
            results.extend(valid.iter().map(|(index, _)| CreateNoteResult::Failed {
                index: *index,
                reason: reason.clone(),
            }));
        }
    }

    results.sort_by_key(CreateNoteResult::index);
    results
}

#[tracing::instrument(skip_all, fields(user_id = %user.id, notes = notes.len()))]
async fn store_batch(
    db: &DatabaseConnection,
    writer: &OutboxWriter,
    user: &User,
    notes: &[(usize, Note)],
) -> Result<(), NoteError> {
    let tx = db.begin().await.map_err(storage("begin"))?;

    for (_, note) in notes {
        notes::ActiveModel::from(notes::Model::from(note))
            .insert(&tx)
            .await
            .map_err(storage("insert"))?;

        writer.create(&tx, user, note).await?;
    }

    tx.commit().await.map_err(storage("commit"))
}
