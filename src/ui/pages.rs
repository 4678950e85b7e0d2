use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Html,
};
use serde::Deserialize;

use super::{escape_html, html_shell};
use crate::auth::{AuthContext, RequireUser, cookie_header};
use crate::backend::{CurrentUser, Rag};
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub(super) struct Notice {
    #[serde(default)]
    error: Option<String>,
}

fn nav(user: Option<&CurrentUser>) -> String {
    match user {
        Some(user) => format!(
            r#"<a href="/dashboard">Dashboard</a>
            <a href="/settings">Settings</a>
            <form method="post" action="/api/auth/logout" class="inline">
                <button type="submit">Sign out ({})</button>
            </form>"#,
            escape_html(user.display_name())
        ),
        None => r#"<a href="/signin">Sign in</a> <a href="/signup">Sign up</a>"#.to_string(),
    }
}

fn error_banner(error: Option<&str>) -> String {
    error
        .map(|e| format!(r#"<p class="error" role="alert">{}</p>"#, escape_html(e)))
        .unwrap_or_default()
}

pub(super) async fn index(auth: AuthContext) -> Html<String> {
    let call_to_action = if auth.is_authenticated() {
        r#"<a class="button" href="/dashboard">Go to your dashboard</a>"#
    } else {
        r#"<a class="button" href="/signup">Get started</a>"#
    };
    let content = format!(
        r#"<section class="hero">
            <h1>Chat with your documents</h1>
            <p>Create retrieval-augmented knowledge bases and ask them questions.</p>
            {call_to_action}
        </section>"#
    );
    Html(html_shell("Home", &nav(auth.user()), &content))
}

pub(super) async fn signin(Query(notice): Query<Notice>) -> Html<String> {
    let content = format!(
        r#"<h1>Sign in</h1>
        {}
        <form method="post" action="/api/auth/login" class="auth-form">
            <label>Email <input type="email" name="email" required autocomplete="email"></label>
            <label>Password <input type="password" name="password" required autocomplete="current-password"></label>
            <button type="submit">Sign in</button>
        </form>
        <p>No account yet? <a href="/signup">Sign up</a></p>"#,
        error_banner(notice.error.as_deref())
    );
    Html(html_shell("Sign in", &nav(None), &content))
}

pub(super) async fn signup(Query(notice): Query<Notice>) -> Html<String> {
    let content = format!(
        r#"<h1>Create an account</h1>
        {}
        <form method="post" action="/api/auth/signup" class="auth-form">
            <label>Full name <input type="text" name="full_name" required autocomplete="name"></label>
            <label>Email <input type="email" name="email" required autocomplete="email"></label>
            <label>Password <input type="password" name="password" required autocomplete="new-password"></label>
            <button type="submit">Sign up</button>
        </form>
        <p>Already registered? <a href="/signin">Sign in</a></p>"#,
        error_banner(notice.error.as_deref())
    );
    Html(html_shell("Sign up", &nav(None), &content))
}

fn rag_row(rag: &Rag) -> String {
    format!(
        r#"<li class="rag">
            <a href="/chat/{id}">{name}</a>
            <span class="status status-{status}">{status}</span>
            <p>{description}</p>
        </li>"#,
        id = escape_html(&rag.id),
        name = escape_html(&rag.name),
        status = rag.status.as_str(),
        description = escape_html(&rag.description),
    )
}

pub(super) async fn dashboard(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    headers: HeaderMap,
) -> Html<String> {
    let body = match state
        .backend
        .list_rags(&user.id, &cookie_header(&headers))
        .await
    {
        Ok(rags) if rags.is_empty() => "<p>You have no RAGs yet.</p>".to_string(),
        Ok(rags) => {
            let rows: String = rags.iter().map(rag_row).collect();
            format!(r#"<ul class="rag-list">{rows}</ul>"#)
        }
        Err(e) => error_banner(Some(&e.user_message())),
    };
    let content = format!(
        "<h1>Welcome, {}</h1>\n<h2>Your RAGs</h2>\n{body}",
        escape_html(user.display_name())
    );
    Html(html_shell("Dashboard", &nav(Some(&user)), &content))
}

pub(super) async fn settings(RequireUser(user): RequireUser) -> Html<String> {
    let content = format!(
        r#"<h1>Settings</h1>
        <dl class="profile">
            <dt>Name</dt><dd>{name}</dd>
            <dt>Email</dt><dd>{email}</dd>
            <dt>Member since</dt><dd>{since}</dd>
        </dl>"#,
        name = escape_html(user.full_name.as_deref().unwrap_or("-")),
        email = escape_html(user.email.as_deref().unwrap_or("-")),
        since = escape_html(user.created_at.as_deref().unwrap_or("-")),
    );
    Html(html_shell("Settings", &nav(Some(&user)), &content))
}

pub(super) async fn chat(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(rag_id): Path<String>,
    headers: HeaderMap,
) -> Html<String> {
    let content = match state.backend.get_rag(&rag_id, &cookie_header(&headers)).await {
        Ok(rag) => format!(
            r#"<h1>{name}</h1>
            <p class="meta">{llm} · top {top_k} · {status}</p>
            <section id="chat"
                data-endpoint="/api/rag/ask/stream"
                data-collection="{collection}"
                data-embedding="{embedding}">
                <div id="answer" aria-live="polite"></div>
                <form id="ask-form">
                    <input type="text" name="query" placeholder="Ask a question" autocomplete="off">
                    <button type="submit" id="ask">Ask</button>
                    <button type="button" id="stop" hidden>Stop</button>
                </form>
            </section>
            <script src="/static/chat.js" defer></script>"#,
            name = escape_html(&rag.name),
            llm = escape_html(&rag.llm_model),
            top_k = rag.top_k,
            status = rag.status.as_str(),
            collection = escape_html(&rag.qdrant_collection),
            embedding = escape_html(&rag.embedding_model),
        ),
        Err(e) => format!(
            "<h1>Chat</h1>\n{}",
            error_banner(Some(&e.user_message()))
        ),
    };
    Html(html_shell("Chat", &nav(Some(&user)), &content))
}
