//! Path classification for the session gate.

use crate::config::GateConfig;

/// How the gate treats a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Static assets, proxied API routes and anything file-like. Never checked.
    Bypass,
    /// Sign-in and sign-up pages.
    AuthPage,
    /// Pages that require a valid session.
    Protected,
    /// Everything else. Passes through.
    Unclassified,
}

/// `true` when `path` is `prefix` itself or one of its descendants.
fn under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Classify `path` against the configured rules.
///
/// Bypass wins over every other kind; auth pages are matched exactly and
/// protected pages by prefix.
pub fn classify(rules: &GateConfig, path: &str) -> RouteKind {
    if path.contains('.') || rules.bypass_prefixes.iter().any(|p| under(path, p)) {
        return RouteKind::Bypass;
    }
    if rules.auth_pages.iter().any(|p| p == path) {
        return RouteKind::AuthPage;
    }
    if rules.protected_prefixes.iter().any(|p| under(path, p)) {
        return RouteKind::Protected;
    }
    RouteKind::Unclassified
}
