use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::{controllers, errors, models, requests, responses};

/// Registers the bearer scheme referenced as `token` by the note routes
pub struct Authentication;

impl Modify for Authentication {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "token",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    tags(
        (name = "Note"),
        (name = "Health"),
    ),
    modifiers(&Authentication),
    paths(
        controllers::v1::note::create,
        controllers::v1::note::read,
        controllers::v1::note::update,
        controllers::v1::note::delete,
        controllers::v1::note::search,

        controllers::health::health,
    ),
    components(schemas(
        models::v1::Note,
        models::v1::NewNote,
        models::v1::User,

        requests::v1::note::CreateNotesRequest,
        requests::v1::note::UpdateNoteRequest,
        requests::v1::note::DeleteNoteRequest,

        responses::v1::note::CreateNotesResponse,
        responses::v1::note::CreateNoteFailure,
        responses::v1::note::NoteResponse,
        responses::v1::note::UpdateNoteResponse,
        responses::v1::note::DeleteNoteResponse,
        responses::v1::note::SearchNotesResponse,

        errors::ErrorResponse,
        controllers::health::HealthResponse,
    )),
)]
pub struct Definition;
