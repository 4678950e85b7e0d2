//! Wire types exchanged with the RAG backend.

use serde::{Deserialize, Deserializer, Serialize};

/// The signed-in user as reported by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User identifier. The backend may encode it as a number or a string.
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl CurrentUser {
    /// Name to greet the user with.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Processing state of a RAG configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RagStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl RagStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

/// A named RAG configuration, shared by the dashboard, the chat page and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rag {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    pub status: RagStatus,
    pub chunk_size: u32,
    pub chunk_overlap: u32,
    pub embedding_model: String,
    pub llm_model: String,
    pub document_count: u32,
    pub top_k: u32,
    pub qdrant_collection: String,
}

/// Payload for creating a RAG configuration.
///
/// Missing fields take the backend's defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagCreate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub qdrant_collection: String,
    pub embedding_model: String,
    pub llm_model: String,
    pub chunk_size: u32,
    pub chunk_overlap: u32,
    pub top_k: u32,
    pub document_count: u32,
    pub is_active: bool,
}

impl Default for RagCreate {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            qdrant_collection: String::new(),
            embedding_model: "text-embedding-3-large".to_string(),
            llm_model: "gpt-4o-mini".to_string(),
            chunk_size: 1000,
            chunk_overlap: 400,
            top_k: 5,
            document_count: 0,
            is_active: true,
        }
    }
}

/// Body of `POST /rag/ask/stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    pub query: String,
    pub collection_name: String,
    pub embedding: String,
}

impl AskRequest {
    /// Build a question against the given RAG's collection and embedding model.
    pub fn for_rag(query: impl Into<String>, rag: &Rag) -> Self {
        Self {
            query: query.into(),
            collection_name: rag.qdrant_collection.clone(),
            embedding: rag.embedding_model.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub full_name: String,
    pub password: String,
}

/// Body returned by `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}
