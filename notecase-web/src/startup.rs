use crate::auth::{self, require_access_token, AuthGateway};
use crate::routes::*;
use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::middleware::{from_fn, Condition, NormalizePath, TrailingSlash};
use actix_web::web::Data;
use actix_web::{web, App, HttpServer};
use notecase::NoteService;
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

const CORS_METHODS: [&str; 6] = ["GET", "POST", "HEAD", "PUT", "DELETE", "PATCH"];

/// Allow cross-origin requests from exactly one origin.
fn cors(origin: &str) -> Cors {
    let origin = origin.to_owned();
    Cors::default()
        .allowed_origin_fn(move |request_origin, _| request_origin.as_bytes() == origin.as_bytes())
        .allowed_methods(CORS_METHODS)
        .allow_any_header()
}

/// Start serving on `listener`.
///
/// Without an [`AuthGateway`], `/notes` is open to everyone and `/auth` is not served.
/// Without a CORS origin, cross-origin requests get no CORS headers.
pub fn run(
    listener: TcpListener,
    service: NoteService,
    gateway: Option<AuthGateway>,
    cors_origin: Option<String>,
) -> Result<Server, std::io::Error> {
    let service: Data<NoteService> = Data::new(service);
    let gateway: Option<Data<AuthGateway>> = gateway.map(Data::new);
    let server = HttpServer::new(move || {
        let auth_enabled = gateway.is_some();
        App::new()
            .wrap(NormalizePath::new(TrailingSlash::Trim))
            .wrap(Condition::new(
                cors_origin.is_some(),
                cors(cors_origin.as_deref().unwrap_or_default()),
            ))
            .wrap(TracingLogger::default())
            .configure(service_config)
            .service(
                web::scope("/notes")
                    .wrap(Condition::new(auth_enabled, from_fn(require_access_token)))
                    .configure(notes_config),
            )
            .configure(|cfg| {
                if let Some(ref gateway) = gateway {
                    cfg.app_data(gateway.clone())
                        .service(web::scope("/auth").configure(auth::config));
                }
            })
            .app_data(service.clone())
    })
    .listen(listener)?
    .run();
    Ok(server)
}
