use actix_web::{get, web, HttpResponse};

mod notes;

pub use notes::config as notes_config;
pub use notes::{ApiError, LoadedNote, CONTENT_LIMIT, DEFAULT_PREVIEW_LENGTH};

#[get("/health_check")]
#[instrument]
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().finish()
}

/// Routes outside of `/notes` and `/auth`.
pub fn service_config(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check);
}
