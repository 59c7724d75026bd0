use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::v1::notes;
use crate::models::v1::{NewNote, Note, User};
use crate::outbox::OutboxWriter;

use super::{storage, NoteError};

/// Replace title and content of one of the user's notes
///
/// Returns false when the user owns no note with that id.
#[tracing::instrument(skip(db, writer, user, changes), fields(user_id = %user.id))]
pub async fn update(
    db: &DatabaseConnection,
    writer: &OutboxWriter,
    user: &User,
    id: Uuid,
    changes: NewNote,
) -> Result<bool, NoteError> {
    if changes.title.trim().is_empty() {
        return Err(NoteError::EmptyTitle);
    }

    let tx = db.begin().await.map_err(storage("begin"))?;

    let Some(existing) = notes::Entity::find_by_id(id)
        .filter(notes::Column::UserId.eq(user.id.as_str()))
        .one(&tx)
        .await
        .map_err(storage("find_by_id"))?
    else {
        return Ok(false);
    };

    let note = Note::from(existing.clone()).with_content(changes.title, changes.content);

    let mut model = existing.into_active_model();
    model.title = Set(note.title.clone());
    model.content = Set(note.content.clone());
    model.updated_at = Set(note.updated_at);
    model.update(&tx).await.map_err(storage("update"))?;

    writer.update(&tx, user, &note).await?;

    tx.commit().await.map_err(storage("commit"))?;

    tracing::info!(note_id = %id, "Note updated");

    Ok(true)
}
