//! Session gate: cookie-based route guard.
//!
//! Every page request is resolved to exactly one [`GateOutcome`] before any
//! page handler runs:
//!
//! - bypassed paths and unclassified pages pass through untouched;
//! - auth pages render unless the session is proven valid, in which case the
//!   user is sent to the landing page;
//! - protected pages render only with a proven-valid session. A rejected
//!   session is redirected to sign-in and its cookie deleted; an unverifiable
//!   one (backend unreachable) is redirected without touching the cookie.
//!
//! The auth-page branch fails open and the protected branch fails closed.

pub mod middleware;
pub mod route;
pub mod validator;

use std::sync::Arc;

use crate::auth::AuthContext;
use crate::backend::{CurrentUser, session_token};
use crate::config::GateConfig;

pub use middleware::session_gate;
pub use route::{RouteKind, classify};
pub use validator::{BackendSessionValidator, SessionStatus, SessionValidator};

/// Terminal state of the gate for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Asset, API or file-like path; no check performed.
    Bypass,
    /// Neither an auth page nor protected.
    Unclassified,
    /// Auth page rendered: no cookie, or the session could not be proven valid.
    AuthPageAllow,
    /// Auth page requested with a valid session; go to the landing page.
    RedirectAuthenticated,
    /// Protected page with a valid session.
    ProtectedAllow(AuthContext),
    /// Protected page without a valid session.
    RedirectSignin {
        /// Delete the session cookie (the backend rejected it).
        clear_cookie: bool,
    },
}

impl GateOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Bypass => "bypass",
            Self::Unclassified => "unclassified",
            Self::AuthPageAllow => "auth_page_allow",
            Self::RedirectAuthenticated => "redirect_authenticated",
            Self::ProtectedAllow(_) => "protected_allow",
            Self::RedirectSignin { clear_cookie: true } => "redirect_signin_clear",
            Self::RedirectSignin { clear_cookie: false } => "redirect_signin",
        }
    }
}

/// Route rules plus the validator they consult.
#[derive(Debug)]
pub struct SessionGate {
    rules: GateConfig,
    validator: Arc<dyn SessionValidator>,
}

impl SessionGate {
    pub fn new(rules: GateConfig, validator: Arc<dyn SessionValidator>) -> Self {
        Self { rules, validator }
    }

    pub fn rules(&self) -> &GateConfig {
        &self.rules
    }

    /// Whether the raw cookie header carries a non-empty session cookie.
    pub fn has_session(&self, cookie_header: &str) -> bool {
        session_token(cookie_header, &self.rules.cookie_name).is_some()
    }

    /// Resolve the gate's decision for `path`.
    ///
    /// Performs at most one validation call and never fails.
    pub async fn evaluate(&self, path: &str, cookie_header: &str) -> GateOutcome {
        match classify(&self.rules, path) {
            RouteKind::Bypass => GateOutcome::Bypass,
            RouteKind::Unclassified => GateOutcome::Unclassified,
            RouteKind::AuthPage => {
                if !self.has_session(cookie_header) {
                    return GateOutcome::AuthPageAllow;
                }
                match self.validator.validate(cookie_header).await {
                    SessionStatus::Valid(_) => GateOutcome::RedirectAuthenticated,
                    SessionStatus::Invalid(_) | SessionStatus::Unreachable(_) => {
                        GateOutcome::AuthPageAllow
                    }
                }
            }
            RouteKind::Protected => {
                if !self.has_session(cookie_header) {
                    return GateOutcome::RedirectSignin {
                        clear_cookie: false,
                    };
                }
                match self.validator.validate(cookie_header).await {
                    SessionStatus::Valid(user) => {
                        GateOutcome::ProtectedAllow(AuthContext::from_validation(user))
                    }
                    SessionStatus::Invalid(_) => GateOutcome::RedirectSignin { clear_cookie: true },
                    SessionStatus::Unreachable(_) => GateOutcome::RedirectSignin {
                        clear_cookie: false,
                    },
                }
            }
        }
    }

    /// Look up the current user for pages the gate does not guard.
    pub async fn resolve_user(&self, cookie_header: &str) -> Option<CurrentUser> {
        if !self.has_session(cookie_header) {
            return None;
        }
        match self.validator.validate(cookie_header).await {
            SessionStatus::Valid(user) => user,
            SessionStatus::Invalid(_) | SessionStatus::Unreachable(_) => None,
        }
    }
}
