use notecase::NoteService;
use notecase_web::auth::AuthGateway;
use notecase_web::configuration::{SetupError, CONFIGURATION};
use notecase_web::startup::run;
use notecase_web::telemetry::{get_subscriber, init_tracing};
use std::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;

#[actix_web::main]
async fn main() -> Result<(), SetupError> {
    let subscriber =
        get_subscriber(&CONFIGURATION).with(tracing_subscriber::fmt::Layer::default());
    init_tracing(subscriber);

    let store = CONFIGURATION.get_note_store().await?;
    let service = NoteService::new(store);

    let gateway = match CONFIGURATION.auth_settings()? {
        Some(settings) => Some(AuthGateway::discover(settings).await?),
        None => {
            warn!("Authentication is disabled. This should only be used for testing!");
            None
        }
    };

    let address = format!("{}:{}", CONFIGURATION.host, CONFIGURATION.port);
    let listener = TcpListener::bind(&address)?;
    info!(address = %address, "Listening for requests");
    run(listener, service, gateway, CONFIGURATION.cors_origin())?.await?;
    Ok(())
}
