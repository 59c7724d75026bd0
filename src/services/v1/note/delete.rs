use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait};
use uuid::Uuid;

use crate::entities::v1::notes;
use crate::models::v1::{Note, User};
use crate::outbox::OutboxWriter;

use super::{storage, NoteError};

/// Remove one of the user's notes. Returns false when nothing was removed.
#[tracing::instrument(skip(db, writer, user), fields(user_id = %user.id))]
pub async fn delete(
    db: &DatabaseConnection,
    writer: &OutboxWriter,
    user: &User,
    id: Uuid,
) -> Result<bool, NoteError> {
    let tx = db.begin().await.map_err(storage("begin"))?;

    let Some(existing) = notes::Entity::find_by_id(id)
        .filter(notes::Column::UserId.eq(user.id.as_str()))
        .one(&tx)
        .await
        .map_err(storage("find_by_id"))?
    else {
        return Ok(false);
    };

    let result = notes::Entity::delete_by_id(existing.id)
        .exec(&tx)
        .await
        .map_err(storage("delete"))?;

    if result.rows_affected == 0 {
        return Ok(false);
    }

    writer.delete(&tx, user, &Note::from(existing)).await?;

    tx.commit().await.map_err(storage("commit"))?;

    tracing::info!(note_id = %id, "Note deleted");

    Ok(true)
}
