use actix_web::web::{Data, Json, Query};
use actix_web::{get, post};
use sea_orm::DatabaseConnection;

use crate::config::NotesConfig;
use crate::errors::{Error, ErrorResponse};
use crate::middlewares::v1::auth::Auth;
use crate::outbox::OutboxWriter;
use crate::requests::v1::note::{
    CreateNotesRequest, DeleteNoteRequest, ReadNoteQuery, SearchNotesQuery, UpdateNoteRequest,
};
use crate::responses::v1::note::{
    CreateNotesResponse, DeleteNoteResponse, NoteResponse, SearchNotesResponse,
    UpdateNoteResponse,
};
use crate::services;

/// Create notes in bulk
///
/// Each note either yields an id or an entry in `errors`. Notes with an
/// empty title fail individually.
#[utoipa::path(
    tag = "Note",
    security(("token" = [])),
    request_body = CreateNotesRequest,
    responses(
        CreateNotesResponse,
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 502, description = "Authentication service failed", body = ErrorResponse),
        (status = 503, description = "Authentication service unavailable", body = ErrorResponse),
    ),
)]
#[post("/create")]
pub async fn create(
    auth: Auth,
    db: Data<DatabaseConnection>,
    writer: Data<OutboxWriter>,
    config: Data<NotesConfig>,
    Json(request): Json<CreateNotesRequest>,
) -> Result<Json<CreateNotesResponse>, Error> {
    let handle = services::v1::note::create_notes(
        db.get_ref().clone(),
        writer.get_ref().clone(),
        config.create_notes_batch_size,
        auth.user,
        request.notes,
    );

    let (results, summary) = handle.collect().await;
    if summary.is_none() {
        return Err(Error::InternalServerError {
            message: "Note creation stopped before completion".to_string(),
        });
    }

    Ok(Json(results.into_iter().collect()))
}

/// Read one of the caller's notes
#[utoipa::path(
    tag = "Note",
    security(("token" = [])),
    params(ReadNoteQuery),
    responses(
        NoteResponse,
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Note not found", body = ErrorResponse),
        (status = 503, description = "Authentication service unavailable", body = ErrorResponse),
    ),
)]
#[get("/read")]
pub async fn read(
    auth: Auth,
    db: Data<DatabaseConnection>,
    writer: Data<OutboxWriter>,
    Query(query): Query<ReadNoteQuery>,
) -> Result<Json<NoteResponse>, Error> {
    services::v1::note::read_by_id(&db, &writer, &auth.user, query.id)
        .await?
        .map(|note| Json(NoteResponse { note }))
        .ok_or_else(|| Error::not_found(format!("Note {} not found", query.id)))
}

/// Update title and content of one of the caller's notes
#[utoipa::path(
    tag = "Note",
    security(("token" = [])),
    request_body = UpdateNoteRequest,
    responses(
        UpdateNoteResponse,
        (status = 400, description = "Empty title", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 503, description = "Authentication service unavailable", body = ErrorResponse),
    ),
)]
#[post("/update")]
pub async fn update(
    auth: Auth,
    db: Data<DatabaseConnection>,
    writer: Data<OutboxWriter>,
    Json(request): Json<UpdateNoteRequest>,
) -> Result<Json<UpdateNoteResponse>, Error> {
    let updated =
        services::v1::note::update(&db, &writer, &auth.user, request.id, request.changes()).await?;

    Ok(Json(UpdateNoteResponse { updated }))
}

/// Delete one of the caller's notes
#[utoipa::path(
    tag = "Note",
    security(("token" = [])),
    request_body = DeleteNoteRequest,
    responses(
        DeleteNoteResponse,
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 503, description = "Authentication service unavailable", body = ErrorResponse),
    ),
)]
#[post("/delete")]
pub async fn delete(
    auth: Auth,
    db: Data<DatabaseConnection>,
    writer: Data<OutboxWriter>,
    Json(request): Json<DeleteNoteRequest>,
) -> Result<Json<DeleteNoteResponse>, Error> {
    let deleted = services::v1::note::delete(&db, &writer, &auth.user, request.id).await?;

    Ok(Json(DeleteNoteResponse { deleted }))
}

/// Search the caller's notes by title or content
#[utoipa::path(
    tag = "Note",
    security(("token" = [])),
    params(SearchNotesQuery),
    responses(
        SearchNotesResponse,
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 503, description = "Authentication service unavailable", body = ErrorResponse),
    ),
)]
#[get("/search")]
pub async fn search(
    auth: Auth,
    db: Data<DatabaseConnection>,
    writer: Data<OutboxWriter>,
    Query(query): Query<SearchNotesQuery>,
) -> Result<Json<SearchNotesResponse>, Error> {
    let notes = services::v1::note::search(&db, &writer, &auth.user, query.into()).await?;

    Ok(Json(SearchNotesResponse { notes }))
}
