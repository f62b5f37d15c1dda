pub mod http;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    ChatResponse, ChatSession, Document, KnowledgeBase, UploadHistoryPage,
};

/// A file travelling with a request. The client reads local paths; backends
/// only ever see bytes, which keeps them substitutable by in-memory stubs.
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

impl FilePayload {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
        }
    }
}

/// Remote operations of the Ragbox service, one method per endpoint.
///
/// The shipped implementation is [`http::HttpBackend`]; tests substitute an
/// in-memory stub. Identifiers and status transitions are owned by the
/// service, a backend never invents either.
#[async_trait]
pub trait Backend: Send + Sync {
    // ── Files ──

    /// Store a file, returning its content hash.
    async fn upload_file(&self, file: FilePayload) -> Result<String>;

    /// Store a passport image through the identity pipeline.
    async fn upload_passport(&self, file: FilePayload) -> Result<String>;

    /// Fetch a stored object and write it under `save_dir`, returning the
    /// path of the written file.
    async fn download_file(&self, hash: &str, save_dir: &Path) -> Result<PathBuf>;

    /// Fetch a stored object into memory.
    async fn download(&self, hash: &str) -> Result<Vec<u8>>;

    /// Remove a stored object, returning the service's confirmation.
    async fn delete_file(&self, hash: &str) -> Result<String>;

    // ── Knowledge bases ──

    async fn create_knowledge_base(
        &self,
        document: FilePayload,
        name: &str,
    ) -> Result<KnowledgeBase>;

    async fn add_document(
        &self,
        document: FilePayload,
        knowledge_base_id: &str,
    ) -> Result<Document>;

    async fn delete_document(
        &self,
        document_id: &str,
        knowledge_base_id: &str,
    ) -> Result<String>;

    async fn knowledge_bases(&self) -> Result<Vec<KnowledgeBase>>;

    async fn knowledge_base(&self, id: &str) -> Result<KnowledgeBase>;

    // ── Chat ──

    /// Ask a question against a knowledge base. Passing an existing session
    /// id continues that conversation, `None` starts a new one.
    async fn create_chat_session(
        &self,
        knowledge_base_id: &str,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ChatResponse>;

    async fn chat_sessions(&self) -> Result<Vec<ChatSession>>;

    async fn chat_session(&self, id: &str) -> Result<ChatSession>;

    // ── Account ──

    async fn uploaded_documents(&self) -> Result<Vec<Document>>;

    async fn upload_history(&self, page: u32, page_size: u32) -> Result<UploadHistoryPage>;
}
