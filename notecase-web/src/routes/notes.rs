use actix_multipart::{Multipart, MultipartError};
use actix_web::dev::Payload;
use actix_web::error::ErrorInternalServerError;
use actix_web::http::header::ContentType;
use actix_web::{
    delete, get, post, route, web, FromRequest, HttpRequest, HttpResponse, Responder,
    ResponseError,
};
use futures::future::LocalBoxFuture;
use futures::TryStreamExt;
use notecase::errors::NoteStoreError;
use notecase::{Note, NoteID, NoteService};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_PREVIEW_LENGTH: usize = 200;
const CONTENT_FIELD: &str = "content";
/// Largest accepted request body for note content, form or multipart.
pub const CONTENT_LIMIT: usize = 4 << 20;

fn notestore_error_handler(e: &NoteStoreError) -> HttpResponse {
    match e {
        NoteStoreError::NoteNotExist(_) => HttpResponse::NotFound().body(e.to_string()),
        NoteStoreError::InvalidNoteID(_) => HttpResponse::BadRequest().body(e.to_string()),
        NoteStoreError::ValidationError(_) => HttpResponse::BadRequest().body(e.to_string()),
        NoteStoreError::UnknownContentType(_) => HttpResponse::BadRequest().body(e.to_string()),
        NoteStoreError::ParseError(_) => {
            error!("Note index is corrupt {:?}", e);
            HttpResponse::InternalServerError().finish()
        }
        NoteStoreError::IDOverflow(_) => {
            error!("Note store ran out of IDs {:?}", e);
            HttpResponse::InternalServerError().finish()
        }
        NoteStoreError::IOError(_) => {
            error!("Note store internal error {:?}", e);
            HttpResponse::InternalServerError().finish()
        }
        NoteStoreError::SQLiteError(_) => {
            error!("Note store internal error {:?}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// A [`NoteStoreError`] raised outside of a handler body.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct ApiError(#[from] pub NoteStoreError);

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        notestore_error_handler(&self.0)
    }
}

/// The note named by the `note_id` segment of the route.
///
/// The note is looked up before the handler runs, so a missing note
/// answers 404 and a malformed ID answers 400.
pub struct LoadedNote(pub Note);

impl FromRequest for LoadedNote {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let service = req.app_data::<web::Data<NoteService>>().cloned();
        let note_id = req.match_info().get("note_id").map(NoteID::from);
        Box::pin(async move {
            let (service, note_id) = match (service, note_id) {
                (Some(service), Some(note_id)) => (service, note_id),
                _ => return Err(ErrorInternalServerError("no note to load on this route")),
            };
            match service.get_note(&note_id).await {
                Ok(note) => Ok(LoadedNote(note)),
                Err(e) => Err(ApiError(e).into()),
            }
        })
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    include_preview: Option<String>,
    preview_length: Option<usize>,
}

#[get("")]
#[instrument(skip(service))]
async fn list_notes(
    service: web::Data<NoteService>,
    query: web::Query<ListQuery>,
) -> impl Responder {
    let query = query.into_inner();
    let include_preview = query
        .include_preview
        .map_or(false, |v| v.eq_ignore_ascii_case("true"));
    if include_preview {
        let preview_len = query.preview_length.unwrap_or(DEFAULT_PREVIEW_LENGTH);
        match service.list_notes_with_preview(preview_len).await {
            Ok(notes) => HttpResponse::Ok().json(notes),
            Err(e) => notestore_error_handler(&e),
        }
    } else {
        match service.list_notes().await {
            Ok(notes) => HttpResponse::Ok().json(notes),
            Err(e) => notestore_error_handler(&e),
        }
    }
}

#[derive(Deserialize, Debug)]
struct NotePostData {
    #[serde(default)]
    title: String,
}

#[post("")]
#[instrument(skip(service))]
async fn create_note(
    service: web::Data<NoteService>,
    note: web::Json<NotePostData>,
) -> impl Responder {
    match service.create_note(note.into_inner().title).await {
        Ok(note) => HttpResponse::Created().json(note),
        Err(e) => notestore_error_handler(&e),
    }
}

#[get("/{note_id}")]
#[instrument(skip(note), fields(note_id = %note.0.id))]
async fn get_note(note: LoadedNote) -> impl Responder {
    HttpResponse::Ok().json(note.0)
}

#[route("/{note_id}", method = "POST", method = "PUT")]
#[instrument(skip(service, note, data), fields(note_id = %note.0.id))]
async fn update_note(
    service: web::Data<NoteService>,
    note: LoadedNote,
    data: web::Json<NotePostData>,
) -> impl Responder {
    match service.update_note(&note.0, data.into_inner().title).await {
        Ok(_) => HttpResponse::NoContent().finish(),
        Err(e) => notestore_error_handler(&e),
    }
}

#[delete("/{note_id}")]
#[instrument(skip(service, note), fields(note_id = %note.0.id))]
async fn delete_note(service: web::Data<NoteService>, note: LoadedNote) -> impl Responder {
    match service.delete_note(&note.0.id).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => notestore_error_handler(&e),
    }
}

fn sniff_content_type(content: &[u8]) -> ContentType {
    if std::str::from_utf8(content).is_ok() {
        ContentType::plaintext()
    } else {
        ContentType::octet_stream()
    }
}

#[get("/{note_id}/content")]
#[instrument(skip(service, note), fields(note_id = %note.0.id))]
async fn get_content(service: web::Data<NoteService>, note: LoadedNote) -> impl Responder {
    match service.get_content(&note.0).await {
        Ok(content) => HttpResponse::Ok()
            .content_type(sniff_content_type(&content))
            .body(content),
        Err(e) => notestore_error_handler(&e),
    }
}

#[derive(Deserialize, Debug)]
struct ContentForm {
    content: Option<String>,
}

/// Read the field named `content`, if any.
async fn read_multipart_content(mut payload: Multipart) -> Result<Option<Vec<u8>>, MultipartError> {
    while let Some(mut field) = payload.try_next().await? {
        if field.name() != Some(CONTENT_FIELD) {
            continue;
        }
        let mut content = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            content.extend_from_slice(&chunk);
        }
        return Ok(Some(content));
    }
    Ok(None)
}

#[route("/{note_id}/content", method = "POST", method = "PUT")]
#[instrument(skip(service, note, body), fields(note_id = %note.0.id))]
async fn set_content(
    service: web::Data<NoteService>,
    note: LoadedNote,
    body: web::Either<web::Form<ContentForm>, Multipart>,
) -> impl Responder {
    let content = match body {
        web::Either::Left(form) => form.into_inner().content.map(String::into_bytes),
        web::Either::Right(multipart) => match read_multipart_content(multipart).await {
            Ok(content) => content,
            Err(e) => {
                return HttpResponse::BadRequest().body(format!("cannot read form file: {}", e))
            }
        },
    };
    let content = match content {
        Some(content) if !content.is_empty() => content,
        _ => {
            return HttpResponse::BadRequest()
                .body("either form value or form file required for `content` form field")
        }
    };
    match service.set_content(&note.0, content).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => notestore_error_handler(&e),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    // `web::Either` buffers the whole body before trying the form.
    cfg.app_data(web::PayloadConfig::new(CONTENT_LIMIT))
        .app_data(web::FormConfig::default().limit(CONTENT_LIMIT))
        .service(list_notes)
        .service(create_note)
        .service(get_note)
        .service(update_note)
        .service(delete_note)
        .service(get_content)
        .service(set_content);
}
