//! Async client for the Ragbox file-vault, knowledge-base and chat API.
//!
//! The entry point is [`Client`]: construct it with a secret token, upload
//! files (subject to a local 10 MiB gate), build RAG knowledge bases from
//! documents, and chat against them. All state lives on the service side;
//! the client is a typed, stateless call surface over it.

pub mod backend;
pub mod client;
pub mod error;
pub mod models;
pub mod poll;

pub use backend::{Backend, FilePayload};
pub use client::{Client, MAX_FILE_SIZE};
pub use error::{Error, Result};
pub use models::{
    ChatMessage, ChatResponse, ChatSession, Document, KnowledgeBase,
    KnowledgeBaseStatus, MessageRole, UploadHistoryItem, UploadHistoryPage,
};
pub use poll::{wait_for_any_ready, wait_until_ready, RetryPolicy};
