use serde::{Deserialize, Serialize};
use utoipa::{IntoResponses, ToSchema};
use uuid::Uuid;

use crate::models::v1::Note;
use crate::services::v1::note::CreateNoteResult;

/// Failure of one note in a bulk creation
#[derive(Clone, Debug, Deserialize, Serialize, ToSchema, PartialEq, Eq)]
pub struct CreateNoteFailure {
    pub index: usize,
    pub message: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, ToSchema, IntoResponses, PartialEq, Eq)]
#[response(status = 200, description = "OK")]
pub struct CreateNotesResponse {
    /// Ids of the stored notes, in input order
    pub ids: Vec<Uuid>,
    pub errors: Vec<CreateNoteFailure>,
}

impl FromIterator<CreateNoteResult> for CreateNotesResponse {
    fn from_iter<I: IntoIterator<Item = CreateNoteResult>>(results: I) -> Self {
        let mut results: Vec<_> = results.into_iter().collect();
        results.sort_by_key(CreateNoteResult::index);

        let mut response = Self::default();
        for result in results {
            match result {
                CreateNoteResult::Created { id, .. } => response.ids.push(id),
                CreateNoteResult::Failed { index, reason } => {
                    response.errors.push(CreateNoteFailure {
                        index,
                        message: reason,
                    })
                }
            }
        }
        response
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema, IntoResponses)]
#[response(status = 200, description = "OK")]
pub struct NoteResponse {
    pub note: Note,
}

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema, IntoResponses)]
#[response(status = 200, description = "OK")]
pub struct UpdateNoteResponse {
    pub updated: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema, IntoResponses)]
#[response(status = 200, description = "OK")]
pub struct DeleteNoteResponse {
    pub deleted: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema, IntoResponses)]
#[response(status = 200, description = "OK")]
pub struct SearchNotesResponse {
    pub notes: Vec<Note>,
}
