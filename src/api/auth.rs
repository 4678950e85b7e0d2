use axum::{
    Form,
    body::Body,
    extract::State,
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

use super::with_error;
use crate::auth::cookie_header;
use crate::backend::{LoginRequest, SignupRequest};
use crate::error::Result;
use crate::gate::middleware::removal_cookie;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub(super) struct LoginForm {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct SignupForm {
    email: String,
    full_name: String,
    password: String,
}

/// `GET /api/auth/me`: the backend's answer, uncached.
pub(super) async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    let upstream = state.backend.me(&cookie_header(&headers)).await?;
    Ok((
        upstream.status,
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        Body::from(upstream.body),
    )
        .into_response())
}

pub(super) async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let rules = &state.gate.rules();
    let credentials = LoginRequest {
        email: form.email,
        password: form.password,
    };

    match state.backend.login(&credentials).await {
        Ok(token) => {
            tracing::info!(name: "auth.login", email = %credentials.email, "Signed in");
            let cookie = Cookie::build((rules.cookie_name.clone(), token.access_token))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax);
            (jar.add(cookie), Redirect::to(&rules.landing_path)).into_response()
        }
        Err(e) => {
            tracing::info!(name: "auth.login.failed", email = %credentials.email, error = %e, "Sign-in failed");
            Redirect::to(&with_error(&rules.signin_path, &e.user_message())).into_response()
        }
    }
}

pub(super) async fn signup(State(state): State<AppState>, Form(form): Form<SignupForm>) -> Redirect {
    let request = SignupRequest {
        email: form.email,
        full_name: form.full_name,
        password: form.password,
    };
    let rules = state.gate.rules();
    match state.backend.signup(&request).await {
        Ok(_) => Redirect::to(&rules.signin_path),
        Err(e) => Redirect::to(&with_error(&rules.signup_path, &e.user_message())),
    }
}

/// Sign out: tell the backend if it listens, then drop the cookie regardless.
pub(super) async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    let rules = state.gate.rules();
    if let Err(e) = state.backend.logout(&cookie_header(&headers)).await {
        tracing::warn!(name: "auth.logout.failed", error = %e, "Backend logout failed");
    }
    (
        jar.remove(removal_cookie(&rules.cookie_name)),
        Redirect::to(&rules.signin_path),
    )
        .into_response()
}
