//! RAG Portal server and command-line client.

#![allow(clippy::cast_possible_truncation)]

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use mimalloc::MiMalloc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use rag_portal::backend::{BackendClient, session_cookie_header};
use rag_portal::chat::{AnswerClient, AskOutcome, ChatView};
use rag_portal::config::{AppConfig, Cli, Command};
use rag_portal::server::start_server;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before clap reads flag env vars
    let _ = dotenv();

    let cli = Cli::parse();
    let config = AppConfig::from_cli(&cli).context("Failed to load configuration")?;
    init_tracing(config.log.json);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => start_server(Arc::new(config)).await,
        Command::Ask {
            rag,
            session,
            query,
        } => ask(&config, &rag, &session, &query).await,
        Command::Rags { session } => rags(&config, &session).await,
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (json_layer, text_layer) = if json {
        (Some(fmt::layer().json().with_target(true)), None)
    } else {
        (None, Some(fmt::layer().with_target(true)))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

async fn current_user_id(backend: &BackendClient, cookie: &str) -> anyhow::Result<String> {
    let me = backend.me(cookie).await?;
    anyhow::ensure!(
        me.status.is_success(),
        "session rejected by backend ({})",
        me.status
    );
    let user: rag_portal::backend::CurrentUser =
        serde_json::from_slice(&me.body).context("unexpected /auth/me response")?;
    Ok(user.id)
}

async fn rags(config: &AppConfig, session: &str) -> anyhow::Result<()> {
    let cookie = session_cookie_header(&config.gate.cookie_name, session);
    let backend = BackendClient::new(&config.backend.url, config.gate.cookie_name.clone())?;
    let user_id = current_user_id(&backend, &cookie).await?;

    for rag in backend.list_rags(&user_id, &cookie).await? {
        println!(
            "{}\t{}\t{}\t{}",
            rag.id,
            rag.status.as_str(),
            rag.name,
            rag.description
        );
    }
    Ok(())
}

/// Stream one answer to stdout. Ctrl-C stops the answer, not the process.
async fn ask(config: &AppConfig, rag_id: &str, session: &str, query: &str) -> anyhow::Result<()> {
    let cookie = session_cookie_header(&config.gate.cookie_name, session);
    let backend = BackendClient::new(&config.backend.url, config.gate.cookie_name.clone())?;
    let rag = backend.get_rag(rag_id, &cookie).await?;

    let stream_backend =
        BackendClient::new(config.backend.public_url(), config.gate.cookie_name.clone())?;
    let view = Arc::new(ChatView::new(AnswerClient::new(stream_backend, cookie)));

    let mut updates = view.subscribe();
    let printer = tokio::spawn(async move {
        let mut printed = 0;
        let mut stdout = std::io::stdout();
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            if let Some(delta) = state.text.get(printed..) {
                let _ = stdout.write_all(delta.as_bytes());
                let _ = stdout.flush();
                printed = state.text.len();
            }
        }
    });

    let answer = {
        let view = Arc::clone(&view);
        let query = query.to_owned();
        tokio::spawn(async move { view.ask(&query, Some(&rag)).await })
    };
    tokio::pin!(answer);

    let outcome = tokio::select! {
        outcome = &mut answer => outcome?,
        _ = tokio::signal::ctrl_c() => {
            view.stop();
            answer.await?
        }
    };

    drop(view);
    let _ = printer.await;
    println!();

    match outcome {
        AskOutcome::Completed => Ok(()),
        AskOutcome::Cancelled => {
            info!(name: "chat.answer.stopped", "Answer stopped");
            Ok(())
        }
        AskOutcome::Failed(message) => anyhow::bail!(message),
        AskOutcome::Ignored => anyhow::bail!("empty question"),
        AskOutcome::Busy => anyhow::bail!("another answer is in flight"),
    }
}
