use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Note action recorded by an outbox row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum NoteOutboxAction {
    #[sea_orm(string_value = "created")]
    Created,
    #[sea_orm(string_value = "updated")]
    Updated,
    #[sea_orm(string_value = "deleted")]
    Deleted,
    #[sea_orm(string_value = "read")]
    Read,
    #[sea_orm(string_value = "search")]
    Search,
}

impl NoteOutboxAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteOutboxAction::Created => "created",
            NoteOutboxAction::Updated => "updated",
            NoteOutboxAction::Deleted => "deleted",
            NoteOutboxAction::Read => "read",
            NoteOutboxAction::Search => "search",
        }
    }

    /// Whether the action changed note state, as opposed to only reading it
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            NoteOutboxAction::Created | NoteOutboxAction::Updated | NoteOutboxAction::Deleted
        )
    }
}

impl std::fmt::Display for NoteOutboxAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "notes_outbox")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub event_id: Uuid,
    pub action: NoteOutboxAction,
    pub user_id: String,
    pub note_id: Uuid,
    pub sent: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
