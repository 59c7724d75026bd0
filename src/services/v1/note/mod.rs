//! Note operations
//!
//! Each operation opens one transaction and writes its outbox event inside it,
//! so a note change and its event commit together or not at all. Reads and
//! searches are recorded too, one event per returned note.

pub mod create;
pub mod delete;
pub mod read;
pub mod search;
pub mod update;

use sea_orm::DbErr;
use thiserror::Error;

use crate::outbox::OutboxError;

pub use create::{create_notes, CreateNoteResult, CreateNotesHandle, CreateNotesSummary};
pub use delete::delete;
pub use read::read_by_id;
pub use search::search;
pub use update::update;

#[derive(Debug, Error)]
pub enum NoteError {
    #[error("Note title cannot be empty")]
    EmptyTitle,

    #[error("Note {operation} failed: {source}")]
    Storage {
        operation: &'static str,
        #[source]
        source: DbErr,
    },

    #[error(transparent)]
    Outbox(#[from] OutboxError),
}

pub(crate) fn storage(operation: &'static str) -> impl FnOnce(DbErr) -> NoteError {
    move |source| NoteError::Storage { operation, source }
}
