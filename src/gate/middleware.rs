//! Axum middleware running the session gate in front of every route.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use super::{GateOutcome, SessionGate};
use crate::auth::cookie_header;

/// Axum middleware applying the [`SessionGate`] to every request.
///
/// On pass-through with a validated session the [`AuthContext`] is inserted
/// into the request extensions for page handlers.
///
/// [`AuthContext`]: crate::auth::AuthContext
pub async fn session_gate(
    State(gate): State<Arc<SessionGate>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    let cookie_header = cookie_header(request.headers()).into_owned();
    let jar = CookieJar::from_headers(request.headers());

    let outcome = gate.evaluate(&path, &cookie_header).await;
    let rules = gate.rules();

    match outcome {
        GateOutcome::Bypass | GateOutcome::Unclassified | GateOutcome::AuthPageAllow => {
            tracing::debug!(path = %path, outcome = outcome.label(), "gate pass");
            next.run(request).await
        }
        GateOutcome::ProtectedAllow(context) => {
            tracing::debug!(path = %path, outcome = "protected_allow", "gate pass");
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        GateOutcome::RedirectAuthenticated => {
            tracing::info!(
                name: "gate.redirect",
                path = %path,
                to = %rules.landing_path,
                outcome = outcome.label(),
                "Already signed in, redirecting"
            );
            Redirect::temporary(&rules.landing_path).into_response()
        }
        GateOutcome::RedirectSignin { clear_cookie } => {
            tracing::info!(
                name: "gate.redirect",
                path = %path,
                to = %rules.signin_path,
                outcome = outcome.label(),
                "No valid session, redirecting"
            );
            let redirect = Redirect::temporary(&rules.signin_path);
            if clear_cookie {
                let jar = jar.remove(removal_cookie(&rules.cookie_name));
                (jar, redirect).into_response()
            } else {
                redirect.into_response()
            }
        }
    }
}

/// Cookie matching the one set at sign-in, for deletion.
pub(crate) fn removal_cookie(name: &str) -> Cookie<'static> {
    Cookie::build(name.to_owned()).path("/").build()
}
