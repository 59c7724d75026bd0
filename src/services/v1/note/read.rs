use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait};
use uuid::Uuid;

use crate::entities::v1::notes;
use crate::models::v1::{Note, User};
use crate::outbox::OutboxWriter;

use super::{storage, NoteError};

/// Fetch one of the user's notes, recording a `read` event when it exists
#[tracing::instrument(skip(db, writer, user), fields(user_id = %user.id))]
pub async fn read_by_id(
    db: &DatabaseConnection,
    writer: &OutboxWriter,
    user: &User,
    id: Uuid,
) -> Result<Option<Note>, NoteError> {
    let tx = db.begin().await.map_err(storage("begin"))?;

    let note = notes::Entity::find_by_id(id)
        .filter(notes::Column::UserId.eq(user.id.as_str()))
        .one(&tx)
        .await
        .map_err(storage("find_by_id"))?
        .map(Note::from);

    if let Some(note) = &note {
        writer.find_by_id(&tx, user, note).await?;
    }

    tx.commit().await.map_err(storage("commit"))?;

    Ok(note)
}
