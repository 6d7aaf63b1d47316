use super::{AuthError, AuthGateway, ACCESS_TOKEN_COOKIE};
use actix_web::cookie::Cookie;
use actix_web::http::header;
use actix_web::{get, web, HttpResponse};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
struct LoginQuery {
    came_from: Option<String>,
}

/// Keep only redirect targets on this server: absolute paths without a scheme or host.
fn local_path(came_from: Option<String>) -> Option<String> {
    came_from.filter(|c| {
        c.starts_with('/') && !c.starts_with("//") && !c.starts_with("/\\")
    })
}

#[get("/login")]
#[instrument(skip(gateway))]
async fn login(
    gateway: web::Data<AuthGateway>,
    query: web::Query<LoginQuery>,
) -> Result<HttpResponse, AuthError> {
    let url = gateway.login_url(local_path(query.into_inner().came_from)).await?;
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, url.as_str()))
        .finish())
}

#[derive(Deserialize)]
struct CallbackQuery {
    code: String,
    state: String,
}

#[get("/callback")]
#[instrument(skip(gateway, query))]
async fn callback(
    gateway: web::Data<AuthGateway>,
    query: web::Query<CallbackQuery>,
) -> Result<HttpResponse, AuthError> {
    let query = query.into_inner();
    let state = gateway.check_state(&query.state).await?;
    let token = gateway.exchange_code(&query.code).await?;
    let claims = gateway.verify_token(&token).await?;
    info!(sub = ?claims.sub, "Login successful");
    let cookie = Cookie::build(ACCESS_TOKEN_COOKIE, token)
        .path("/")
        .http_only(true)
        .finish();
    Ok(match local_path(state.came_from) {
        Some(came_from) => HttpResponse::SeeOther()
            .cookie(cookie)
            .insert_header((header::LOCATION, came_from))
            .finish(),
        None => HttpResponse::Ok().cookie(cookie).body("Login successful"),
    })
}

#[get("/logout")]
#[instrument]
async fn logout() -> HttpResponse {
    let mut cookie = Cookie::build(ACCESS_TOKEN_COOKIE, "").path("/").finish();
    cookie.make_removal();
    HttpResponse::Ok().cookie(cookie).body("Logout successful")
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(login).service(callback).service(logout);
}
