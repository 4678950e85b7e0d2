//! Server-rendered pages.
//!
//! Markup is deliberately plain; the only client-side behavior is the chat
//! page's streaming reader in `/static/chat.js`.

mod pages;

use axum::{Router, routing::get};

use crate::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::index))
        .route("/signin", get(pages::signin))
        .route("/signup", get(pages::signup))
        .route("/dashboard", get(pages::dashboard))
        .route("/dashboard/settings", get(pages::settings))
        .route("/settings", get(pages::settings))
        .route("/chat/{rag_id}", get(pages::chat))
}

/// Escape text for HTML element content and double-quoted attributes.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Wrap page content in the document shell. `nav` is trusted markup.
pub fn html_shell(title: &str, nav: &str, content: &str) -> String {
    let title = escape_html(title);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="Create and chat with your RAG knowledge bases">
    <title>{title} - RAG Portal</title>
    <link rel="stylesheet" href="/static/app.css">
</head>
<body>
    <header class="app-header">
        <a href="/" class="brand">RAG Portal</a>
        <nav>{nav}</nav>
    </header>
    <main id="app">
        {content}
    </main>
</body>
</html>"#
    )
}
