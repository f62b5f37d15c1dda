use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backend::http::{HttpBackend, DEFAULT_BASE_URL};
use crate::backend::{Backend, FilePayload};
use crate::error::{Error, Result};
use crate::models::{
    ChatResponse, ChatSession, Document, KnowledgeBase, UploadHistoryPage,
};

/// Largest file the service accepts for upload.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Typed client for the Ragbox service.
///
/// The client validates the upload size limit locally before any bytes go on
/// the wire; everything else is forwarded to the backend unchanged. It holds
/// no cache and no session state between calls, so a single instance can be
/// shared freely across tasks.
#[derive(Clone)]
pub struct Client {
    backend: Arc<dyn Backend>,
    max_file_size: u64,
}

impl Client {
    /// Build a client against the hosted service.
    pub fn new(secret_token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(secret_token, DEFAULT_BASE_URL)
    }

    /// Build a client against a self-hosted deployment.
    pub fn with_base_url(
        secret_token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let secret_token = secret_token.into();
        if secret_token.is_empty() {
            return Err(Error::MissingToken);
        }
        Ok(Self::with_backend(HttpBackend::new(secret_token, base_url)))
    }

    /// Build a client from the `RAGBOX_SECRET_TOKEN` environment variable.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("RAGBOX_SECRET_TOKEN").unwrap_or_default();
        Self::new(token)
    }

    /// Build a client over an arbitrary backend. Used by tests to substitute
    /// an in-memory stub for the HTTP transport.
    pub fn with_backend(backend: impl Backend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
            max_file_size: MAX_FILE_SIZE,
        }
    }

    /// Stat a local file and refuse it before any network traffic when it is
    /// over the limit.
    async fn read_validated(&self, path: &Path) -> Result<Vec<u8>> {
        let size = tokio::fs::metadata(path).await?.len();
        if size > self.max_file_size {
            return Err(Error::FileTooLarge {
                size,
                limit: self.max_file_size,
            });
        }
        Ok(tokio::fs::read(path).await?)
    }

    async fn read_payload(&self, path: &Path) -> Result<FilePayload> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        Ok(FilePayload::new(bytes, file_name))
    }

    // ── Files ──

    /// Upload a local file under `file_name`, returning its content hash.
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        file_name: &str,
    ) -> Result<String> {
        let bytes = self.read_validated(path.as_ref()).await?;
        self.backend
            .upload_file(FilePayload::new(bytes, file_name))
            .await
    }

    /// Upload a passport image through the identity pipeline.
    pub async fn upload_passport(
        &self,
        path: impl AsRef<Path>,
        file_name: &str,
    ) -> Result<String> {
        let bytes = self.read_validated(path.as_ref()).await?;
        self.backend
            .upload_passport(FilePayload::new(bytes, file_name))
            .await
    }

    /// Download a stored object into `save_dir`, returning the written path.
    pub async fn download_file(
        &self,
        hash: &str,
        save_dir: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        self.backend.download_file(hash, save_dir.as_ref()).await
    }

    /// Download a stored object into memory.
    pub async fn download(&self, hash: &str) -> Result<Vec<u8>> {
        self.backend.download(hash).await
    }

    /// Delete a stored object by content hash.
    pub async fn delete_file(&self, hash: &str) -> Result<String> {
        self.backend.delete_file(hash).await
    }

    // ── Knowledge bases ──

    /// Create a knowledge base seeded with the document at `document_path`.
    /// The returned record starts in `processing` status; see
    /// [`crate::poll::wait_until_ready`] for waiting on the transition.
    pub async fn create_knowledge_base(
        &self,
        document_path: impl AsRef<Path>,
        name: &str,
    ) -> Result<KnowledgeBase> {
        let document = self.read_payload(document_path.as_ref()).await?;
        self.backend.create_knowledge_base(document, name).await
    }

    pub async fn add_document(
        &self,
        document_path: impl AsRef<Path>,
        knowledge_base_id: &str,
    ) -> Result<Document> {
        let document = self.read_payload(document_path.as_ref()).await?;
        self.backend.add_document(document, knowledge_base_id).await
    }

    pub async fn delete_document(
        &self,
        document_id: &str,
        knowledge_base_id: &str,
    ) -> Result<String> {
        self.backend
            .delete_document(document_id, knowledge_base_id)
            .await
    }

    pub async fn knowledge_bases(&self) -> Result<Vec<KnowledgeBase>> {
        self.backend.knowledge_bases().await
    }

    pub async fn knowledge_base(&self, id: &str) -> Result<KnowledgeBase> {
        self.backend.knowledge_base(id).await
    }

    // ── Chat ──

    /// Ask a question against a knowledge base. A meaningful answer needs the
    /// base in `ready` status; the service, not this client, enforces that.
    pub async fn create_chat_session(
        &self,
        knowledge_base_id: &str,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ChatResponse> {
        self.backend
            .create_chat_session(knowledge_base_id, message, session_id)
            .await
    }

    pub async fn chat_sessions(&self) -> Result<Vec<ChatSession>> {
        self.backend.chat_sessions().await
    }

    pub async fn chat_session(&self, id: &str) -> Result<ChatSession> {
        self.backend.chat_session(id).await
    }

    // ── Account ──

    pub async fn uploaded_documents(&self) -> Result<Vec<Document>> {
        self.backend.uploaded_documents().await
    }

    /// Page through the upload ledger. `page` is zero-based.
    pub async fn upload_history(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<UploadHistoryPage> {
        self.backend.upload_history(page, page_size).await
    }
}
