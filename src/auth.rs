//! Per-request authentication context.
//!
//! The signed-in user is never held in global state. The session gate
//! attaches an [`AuthContext`] to requests for protected pages; on other
//! routes the extractor resolves it on demand from the session cookie.
//! Signing out deletes the cookie, so the next request starts anonymous.

use std::borrow::Cow;
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};

use crate::backend::CurrentUser;
use crate::error::Error;
use crate::gate::SessionGate;

/// Who is making the request, if anyone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    user: Option<CurrentUser>,
}

impl AuthContext {
    pub fn authenticated(user: CurrentUser) -> Self {
        Self { user: Some(user) }
    }

    pub(crate) fn from_validation(user: Option<CurrentUser>) -> Self {
        Self { user }
    }

    pub fn user(&self) -> Option<&CurrentUser> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// The request's cookies as one `Cookie` header value, or `""`.
///
/// Cookies split over several headers (as HTTP/2 clients send them) are
/// joined with `"; "`.
pub fn cookie_header(headers: &HeaderMap) -> Cow<'_, str> {
    let mut values = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok());
    match (values.next(), values.next()) {
        (None, _) => Cow::Borrowed(""),
        (Some(only), None) => Cow::Borrowed(only),
        (Some(first), Some(second)) => {
            let mut joined = format!("{first}; {second}");
            for value in values {
                joined.push_str("; ");
                joined.push_str(value);
            }
            Cow::Owned(joined)
        }
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    Arc<SessionGate>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(context) = parts.extensions.get::<AuthContext>() {
            return Ok(context.clone());
        }
        let gate = Arc::<SessionGate>::from_ref(state);
        let context = AuthContext::from_validation(gate.resolve_user(&cookie_header(&parts.headers)).await);
        parts.extensions.insert(context.clone());
        Ok(context)
    }
}

/// A signed-in user, for page handlers. Anonymous requests are sent to sign-in.
#[derive(Debug, Clone)]
pub struct RequireUser(pub CurrentUser);

/// Rejection for [`RequireUser`]: a redirect to the sign-in page.
#[derive(Debug)]
pub struct SigninRedirect(String);

impl IntoResponse for SigninRedirect {
    fn into_response(self) -> Response {
        Redirect::temporary(&self.0).into_response()
    }
}

impl<S> FromRequestParts<S> for RequireUser
where
    Arc<SessionGate>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = SigninRedirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Ok(context) = AuthContext::from_request_parts(parts, state).await;
        match context.user {
            Some(user) => Ok(Self(user)),
            None => {
                let gate = Arc::<SessionGate>::from_ref(state);
                Err(SigninRedirect(gate.rules().signin_path.clone()))
            }
        }
    }
}

/// A signed-in user, for JSON API handlers. Anonymous requests get 401.
#[derive(Debug, Clone)]
pub struct ApiUser(pub CurrentUser);

impl<S> FromRequestParts<S> for ApiUser
where
    Arc<SessionGate>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Ok(context) = AuthContext::from_request_parts(parts, state).await;
        context.user.map(Self).ok_or_else(|| Error::Api {
            status: StatusCode::UNAUTHORIZED,
            message: "Not authenticated".to_string(),
        })
    }
}
