use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::v1::{NewNote, SearchCriteria};

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateNotesRequest {
    pub notes: Vec<NewNote>,
}

#[derive(Clone, Debug, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReadNoteQuery {
    pub id: Uuid,
}

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateNoteRequest {
    pub id: Uuid,
    #[schema(example = "Groceries")]
    pub title: String,
    #[serde(default)]
    #[schema(example = "Milk, eggs")]
    pub content: String,
}

impl UpdateNoteRequest {
    pub fn changes(&self) -> NewNote {
        NewNote::new(self.title.clone(), self.content.clone())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct DeleteNoteRequest {
    pub id: Uuid,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchNotesQuery {
    /// Substring matched against title and content
    #[serde(default)]
    pub query: String,
    pub limit: Option<u64>,
}

impl From<SearchNotesQuery> for SearchCriteria {
    fn from(query: SearchNotesQuery) -> Self {
        Self {
            query: query.query,
            limit: query.limit,
        }
    }
}
