//! RAG Portal
//!
//! Web front end for a RAG backend: users sign in, manage their RAG
//! configurations and chat with them, with answers streamed token by token.
//!
//! # Architecture
//!
//! - **Server**: Axum router serving pages, a same-origin `/api` proxy and static assets
//! - **Session gate**: cookie-based route guard validated against the backend
//! - **Backend client**: reqwest client for the backend's `/api/v1` routes
//! - **Chat**: pull-based streaming answer client with incremental UTF-8 decoding
//!
//! # Modules
//!
//! - [`gate`]: route classification and the gate middleware
//! - [`auth`]: per-request authentication context and extractors
//! - [`backend`]: backend client and wire types
//! - [`chat`]: streaming answers and chat view state
//! - [`api`]: `/api` proxy routes
//! - [`ui`]: server-rendered pages

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod api;
pub mod auth;
pub mod backend;
pub mod chat;
pub mod config;
pub mod error;
pub mod gate;
pub mod server;
pub mod ui;

pub use server::AppState;
