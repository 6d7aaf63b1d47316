#![allow(dead_code)]

use actix_web::{web, App, HttpResponse, HttpServer};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use lazy_static::lazy_static;
use notecase::notestore::BoxedNoteStore;
use notecase::{FlatFileStore, NoteService, SQLiteStoreBuilder};
use notecase_web::auth::{AuthGateway, ProviderMetadata};
use notecase_web::configuration::{AuthSettings, NoteStoreType, CONFIGURATION};
use notecase_web::startup::run;
use notecase_web::telemetry::{get_subscriber, init_tracing};
use std::net::TcpListener;
use tempfile::TempDir;
use tracing_subscriber::layer::SubscriberExt;

pub const CORS_ORIGIN: &str = "http://localhost:4444";
pub const SIGNING_KEY_ID: &str = "notecase-test";
pub const SIGNING_SECRET: &[u8] = b"notecase-test-signing-secret-0123";
/// `SIGNING_SECRET` in unpadded base64url, as it appears in the key set.
const SIGNING_SECRET_B64: &str = "bm90ZWNhc2UtdGVzdC1zaWduaW5nLXNlY3JldC0wMTIz";

lazy_static! {
    static ref TRACING: () = {
        let subscriber = get_subscriber(&*CONFIGURATION)
            .with(tracing_subscriber::fmt::Layer::default().with_test_writer());
        init_tracing(subscriber);
    };
}

pub struct TestApp {
    pub address: String,
    _notes_dir: TempDir,
}

async fn open_store(store_type: NoteStoreType, dir: &TempDir) -> BoxedNoteStore {
    match store_type {
        NoteStoreType::FlatFile => Box::new(FlatFileStore::open(dir.path()).unwrap()),
        NoteStoreType::SQLite => Box::new(
            SQLiteStoreBuilder::with_path(dir.path().join("notes.sqlite"))
                .build()
                .await
                .unwrap(),
        ),
    }
}

/// A gateway whose provider cannot be reached.
pub fn unreachable_gateway() -> AuthGateway {
    let settings = AuthSettings {
        providerurl: "http://127.0.0.1:9/realms/notes".to_owned(),
        redirecturl: "http://127.0.0.1:3333/auth/callback".to_owned(),
        clientid: "notes-api".to_owned(),
        clientsecret: None,
    };
    let metadata = ProviderMetadata {
        issuer: "http://127.0.0.1:9/realms/notes".to_owned(),
        authorization_endpoint: "http://127.0.0.1:9/realms/notes/auth".to_owned(),
        token_endpoint: "http://127.0.0.1:9/realms/notes/token".to_owned(),
        jwks_uri: "http://127.0.0.1:9/realms/notes/certs".to_owned(),
    };
    AuthGateway::new(&settings, metadata)
}

pub async fn spawn_app_with(store_type: NoteStoreType, gateway: Option<AuthGateway>) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    // We retrieve the port assigned to us by the OS
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);
    lazy_static::initialize(&TRACING);

    let notes_dir = tempfile::tempdir().unwrap();
    let service = NoteService::new(open_store(store_type, &notes_dir).await);
    let server = run(listener, service, gateway, Some(CORS_ORIGIN.to_owned()))
        .expect("Failed to bind address");
    let _ = tokio::spawn(server);
    TestApp {
        address,
        _notes_dir: notes_dir,
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(NoteStoreType::SQLite, None).await
}

/// Sign an access token for `alice` with an HMAC key.
pub fn sign_token(issuer: &str, kid: &str, secret: &[u8]) -> String {
    let header = Header {
        kid: Some(kid.to_owned()),
        ..Header::new(Algorithm::HS256)
    };
    let claims = serde_json::json!({
        "sub": "alice",
        "preferred_username": "alice",
        "iss": issuer,
        "exp": jsonwebtoken::get_current_timestamp() + 3600,
    });
    jsonwebtoken::encode(&header, &claims, &EncodingKey::from_secret(secret)).unwrap()
}

#[derive(Clone)]
struct ProviderState {
    issuer: String,
    access_token: String,
}

async fn provider_configuration(state: web::Data<ProviderState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "issuer": state.issuer,
        "authorization_endpoint": format!("{}/auth", state.issuer),
        "token_endpoint": format!("{}/token", state.issuer),
        "jwks_uri": format!("{}/certs", state.issuer),
    }))
}

async fn provider_keys() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "keys": [{ "kty": "oct", "kid": SIGNING_KEY_ID, "k": SIGNING_SECRET_B64 }]
    }))
}

async fn provider_token(state: web::Data<ProviderState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "access_token": state.access_token,
        "token_type": "Bearer",
    }))
}

/// An OpenID Connect provider that hands out one token for any code.
pub struct TestProvider {
    pub issuer: String,
}

impl TestProvider {
    /// A token the provider's key set verifies.
    pub fn token(&self) -> String {
        sign_token(&self.issuer, SIGNING_KEY_ID, SIGNING_SECRET)
    }

    pub fn settings(&self) -> AuthSettings {
        AuthSettings {
            providerurl: self.issuer.clone(),
            redirecturl: "http://127.0.0.1:3333/auth/callback".to_owned(),
            clientid: "notes-api".to_owned(),
            clientsecret: Some("secret".to_owned()),
        }
    }

    pub async fn gateway(&self) -> AuthGateway {
        AuthGateway::discover(&self.settings())
            .await
            .expect("Failed to discover provider")
    }
}

pub fn spawn_provider() -> TestProvider {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let issuer = format!("http://127.0.0.1:{}/realms/notes", port);
    let state = ProviderState {
        issuer: issuer.clone(),
        access_token: sign_token(&issuer, SIGNING_KEY_ID, SIGNING_SECRET),
    };
    let server = HttpServer::new(move || {
        App::new().app_data(web::Data::new(state.clone())).service(
            web::scope("/realms/notes")
                .route(
                    "/.well-known/openid-configuration",
                    web::get().to(provider_configuration),
                )
                .route("/certs", web::get().to(provider_keys))
                .route("/token", web::post().to(provider_token)),
        )
    })
    .workers(1)
    .listen(listener)
    .expect("Failed to bind address")
    .run();
    let _ = tokio::spawn(server);
    TestProvider { issuer }
}
