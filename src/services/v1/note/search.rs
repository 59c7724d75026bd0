use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};

use crate::entities::v1::notes;
use crate::models::v1::{Note, SearchCriteria, User};
use crate::outbox::OutboxWriter;

use super::{storage, NoteError};

pub const DEFAULT_SEARCH_LIMIT: u64 = 50;

/// Substring search over title and content of the user's notes, newest first
///
/// One `search` event is written per returned note.
#[tracing::instrument(skip(db, writer, user), fields(user_id = %user.id))]
pub async fn search(
    db: &DatabaseConnection,
    writer: &OutboxWriter,
    user: &User,
    criteria: SearchCriteria,
) -> Result<Vec<Note>, NoteError> {
    let tx = db.begin().await.map_err(storage("begin"))?;

    let query = criteria.query.trim();
    let limit = criteria.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);

    let found: Vec<Note> = notes::Entity::find()
        .filter(notes::Column::UserId.eq(user.id.as_str()))
        .filter(
            Condition::any()
                .add(notes::Column::Title.contains(query))
                .add(notes::Column::Content.contains(query)),
        )
        .order_by_desc(notes::Column::CreatedAt)
        .limit(limit)
        .all(&tx)
        .await
        .map_err(storage("search"))?
        .into_iter()
        .map(Note::from)
        .collect();

    for note in &found {
        writer.search(&tx, user, note).await?;
    }

    tx.commit().await.map_err(storage("commit"))?;

    tracing::debug!(results = found.len(), "Notes searched");

    Ok(found)
}
