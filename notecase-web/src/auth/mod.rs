//! Login through an OpenID Connect provider, and access tokens for `/notes`.
//!
//! `/auth/login` redirects to the provider with a one-time nonce in the state.
//! The provider sends the browser back to `/auth/callback`, where the code is
//! exchanged for an access token that ends up in the `access_token` cookie.
use crate::configuration::AuthSettings;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::error::ErrorInternalServerError;
use actix_web::http::{header, StatusCode};
use actix_web::middleware::Next;
use actix_web::{web, HttpMessage, HttpResponse, ResponseError};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

mod nonce;
mod routes;

pub use nonce::{NonceCache, NONCE_CAPACITY, NONCE_TTL};
pub use routes::config;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";
const DISCOVERY_ATTEMPTS: u32 = 5;
const DISCOVERY_RETRY_DELAY: Duration = Duration::from_secs(10);
const SCOPES: &str = "openid profile email";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("no access token")]
    MissingToken,
    #[error("authorization header is not a bearer token")]
    MalformedAuthorization,
    #[error("state is invalid: {0}")]
    InvalidState(String),
    #[error("state is invalid: nonce not found in cache")]
    UnknownNonce,
    #[error("request to the auth provider failed: {0}")]
    Provider(#[from] reqwest::Error),
    #[error("token is invalid: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("token has no key ID")]
    MissingKeyID,
    #[error("no key `{0}` in the provider key set")]
    UnknownKey(String),
    #[error("invalid provider URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("provider configuration unavailable after {0} attempts")]
    Discovery(u32),
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        warn!("Authentication failed: {}", self);
        HttpResponse::Unauthorized().body(self.to_string())
    }
}

/// The part of the provider's discovery document we use.
#[derive(Deserialize, Debug, Clone)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
}

/// Round-tripped through the provider in the `state` parameter.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoginState {
    pub nonce: String,
    pub came_from: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Claims of a verified access token.
#[derive(Deserialize, Debug, Clone)]
pub struct Claims {
    pub sub: Option<String>,
    pub preferred_username: Option<String>,
}

async fn fetch_metadata(
    client: &reqwest::Client,
    url: &str,
) -> Result<ProviderMetadata, reqwest::Error> {
    client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
}

/// Fetch the discovery document, retrying while the provider is unreachable.
pub async fn discover_provider(
    client: &reqwest::Client,
    provider_url: &str,
) -> Result<ProviderMetadata, AuthError> {
    let url = format!("{}{}", provider_url.trim_end_matches('/'), DISCOVERY_PATH);
    for attempt in 1..=DISCOVERY_ATTEMPTS {
        match fetch_metadata(client, &url).await {
            Ok(metadata) => return Ok(metadata),
            Err(e) => {
                warn!(attempt, url = %url, error = %e, "Failed to fetch provider configuration");
                if attempt < DISCOVERY_ATTEMPTS {
                    tokio::time::sleep(DISCOVERY_RETRY_DELAY).await;
                }
            }
        }
    }
    Err(AuthError::Discovery(DISCOVERY_ATTEMPTS))
}

pub struct AuthGateway {
    client: reqwest::Client,
    metadata: ProviderMetadata,
    client_id: String,
    client_secret: Option<String>,
    redirect_url: String,
    nonces: NonceCache,
}

impl AuthGateway {
    pub fn new(settings: &AuthSettings, metadata: ProviderMetadata) -> Self {
        Self::with_client(reqwest::Client::new(), settings, metadata)
    }

    fn with_client(
        client: reqwest::Client,
        settings: &AuthSettings,
        metadata: ProviderMetadata,
    ) -> Self {
        AuthGateway {
            client,
            metadata,
            client_id: settings.clientid.clone(),
            client_secret: settings.clientsecret.clone(),
            redirect_url: settings.redirecturl.clone(),
            nonces: NonceCache::default(),
        }
    }

    /// Set up the gateway from the provider's discovery document.
    pub async fn discover(settings: &AuthSettings) -> Result<Self, AuthError> {
        let client = reqwest::Client::new();
        let metadata = discover_provider(&client, &settings.providerurl).await?;
        info!(issuer = %metadata.issuer, "Discovered auth provider");
        Ok(Self::with_client(client, settings, metadata))
    }

    pub fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    /// Where to send the browser to log in, with a fresh nonce in the state.
    pub async fn login_url(&self, came_from: Option<String>) -> Result<Url, AuthError> {
        let nonce = Uuid::new_v4().simple().to_string();
        let state = serde_json::to_string(&LoginState {
            nonce: nonce.clone(),
            came_from,
        })
        .map_err(|e| AuthError::InvalidState(e.to_string()))?;
        let mut url = Url::parse(&self.metadata.authorization_endpoint)?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("scope", SCOPES)
            .append_pair("state", &state);
        self.nonces.insert(nonce).await;
        Ok(url)
    }

    /// Parse the state of a callback and consume its nonce.
    pub async fn check_state(&self, state: &str) -> Result<LoginState, AuthError> {
        let state: LoginState =
            serde_json::from_str(state).map_err(|e| AuthError::InvalidState(e.to_string()))?;
        if !self.nonces.take(&state.nonce).await {
            return Err(AuthError::UnknownNonce);
        }
        Ok(state)
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, AuthError> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_url.as_str()),
            ("client_id", self.client_id.as_str()),
        ];
        if let Some(ref secret) = self.client_secret {
            form.push(("client_secret", secret.as_str()));
        }
        let token: TokenResponse = self
            .client
            .post(&self.metadata.token_endpoint)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(token.access_token)
    }

    /// Check the signature and issuer of an access token against the provider's keys.
    ///
    /// The audience is not checked.
    pub async fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let token_header = decode_header(token)?;
        let kid = token_header.kid.ok_or(AuthError::MissingKeyID)?;
        let jwks: JwkSet = self
            .client
            .get(&self.metadata.jwks_uri)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let jwk = jwks
            .find(&kid)
            .ok_or_else(|| AuthError::UnknownKey(kid.clone()))?;
        let key = DecodingKey::from_jwk(jwk)?;
        let mut validation = Validation::new(token_header.alg);
        validation.set_issuer(&[&self.metadata.issuer]);
        validation.validate_aud = false;
        Ok(decode::<Claims>(token, &key, &validation)?.claims)
    }
}

fn access_token(req: &ServiceRequest) -> Result<String, AuthError> {
    match req.headers().get(header::AUTHORIZATION) {
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MalformedAuthorization),
        None => req
            .cookie(ACCESS_TOKEN_COOKIE)
            .map(|c| c.value().to_owned())
            .ok_or(AuthError::MissingToken),
    }
}

/// Reject requests without a valid access token.
pub async fn require_access_token(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let gateway = req
        .app_data::<web::Data<AuthGateway>>()
        .cloned()
        .ok_or_else(|| ErrorInternalServerError("auth gateway not configured"))?;
    let token = access_token(&req)?;
    let claims = gateway.verify_token(&token).await?;
    debug!(sub = ?claims.sub, "Access token verified");
    req.extensions_mut().insert(claims);
    next.call(req).await
}
