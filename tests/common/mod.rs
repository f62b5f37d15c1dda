use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ragbox::models::{
    ChatMessage, ChatResponse, ChatSession, Document, KnowledgeBase,
    KnowledgeBaseStatus, MessageRole, UploadHistoryItem, UploadHistoryPage,
};
use ragbox::{Backend, Error, FilePayload, Result};

const STUB_TIMESTAMP: &str = "2024-01-01T00:00:00Z";

/// Write `size` bytes of repeating content into a temp file.
pub fn temp_file_of_size(dir: &tempfile::TempDir, name: &str, size: usize) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).expect("create temp file");
    let chunk = vec![0x5au8; 8192];
    let mut written = 0;
    while written < size {
        let take = chunk.len().min(size - written);
        file.write_all(&chunk[..take]).expect("write temp file");
        written += take;
    }
    path
}

#[derive(Default)]
struct StubState {
    files: HashMap<String, FilePayload>,
    history: Vec<UploadHistoryItem>,
    knowledge_bases: HashMap<String, KnowledgeBase>,
    // Reads observed per knowledge base, for the processing -> ready flip.
    kb_reads: HashMap<String, u32>,
    sessions: HashMap<String, ChatSession>,
}

/// In-memory stand-in for the remote service.
///
/// Stores uploads in a map keyed by minted hashes, keeps an upload ledger,
/// and flips knowledge bases from `processing` to `ready` after a
/// configurable number of status reads.
#[derive(Clone, Default)]
pub struct StubBackend {
    inner: Arc<StubInner>,
}

#[derive(Default)]
struct StubInner {
    state: Mutex<StubState>,
    upload_calls: AtomicU32,
    ready_after: AtomicU32,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Knowledge bases report `processing` for this many reads, then `ready`.
    pub fn ready_after(reads: u32) -> Self {
        let stub = Self::default();
        stub.inner.ready_after.store(reads, Ordering::SeqCst);
        stub
    }

    /// How many upload requests actually reached the stub.
    pub fn upload_calls(&self) -> u32 {
        self.inner.upload_calls.load(Ordering::SeqCst)
    }

    /// Register a knowledge base that will never leave `failed`.
    pub fn insert_failed_knowledge_base(&self, name: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let kb = KnowledgeBase {
            id: id.clone(),
            name: name.to_string(),
            status: KnowledgeBaseStatus::Failed,
            created_at: STUB_TIMESTAMP.to_string(),
            documents: vec![],
        };
        let mut state = self.inner.state.lock().unwrap();
        state.knowledge_bases.insert(id.clone(), kb);
        id
    }

    /// Register a knowledge base after the fact, as if another client had
    /// created one while we were polling an empty listing.
    pub fn insert_ready_knowledge_base(&self, name: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let kb = KnowledgeBase {
            id: id.clone(),
            name: name.to_string(),
            status: KnowledgeBaseStatus::Ready,
            created_at: STUB_TIMESTAMP.to_string(),
            documents: vec![],
        };
        let mut state = self.inner.state.lock().unwrap();
        state.knowledge_bases.insert(id.clone(), kb);
        id
    }

    fn store_upload(&self, file: FilePayload) -> String {
        self.inner.upload_calls.fetch_add(1, Ordering::SeqCst);
        let hash = uuid::Uuid::new_v4().to_string();
        let mut state = self.inner.state.lock().unwrap();
        state.history.push(UploadHistoryItem {
            id: uuid::Uuid::new_v4().to_string(),
            upload_hash: hash.clone(),
            user_id: "stub-user".to_string(),
            file_name: file.file_name.clone(),
            file_size: file.bytes.len() as u64,
            created_at: STUB_TIMESTAMP.to_string(),
            updated_at: STUB_TIMESTAMP.to_string(),
            version: 0,
        });
        state.files.insert(hash.clone(), file);
        hash
    }

    fn make_document(file: &FilePayload, hash: &str) -> Document {
        Document {
            id: uuid::Uuid::new_v4().to_string(),
            name: file.file_name.clone(),
            hash: hash.to_string(),
            created_at: STUB_TIMESTAMP.to_string(),
        }
    }

    /// Apply the read-count flip to one knowledge base.
    fn observe_kb(state: &mut StubState, id: &str, ready_after: u32) {
        let reads = state.kb_reads.entry(id.to_string()).or_insert(0);
        *reads += 1;
        let flip = *reads > ready_after;
        if let Some(kb) = state.knowledge_bases.get_mut(id) {
            if flip && kb.status == KnowledgeBaseStatus::Processing {
                kb.status = KnowledgeBaseStatus::Ready;
            }
        }
    }

    fn not_found(what: &str) -> Error {
        Error::Api {
            status: 404,
            message: format!("{what} not found"),
        }
    }
}

#[async_trait]
impl Backend for StubBackend {
    async fn upload_file(&self, file: FilePayload) -> Result<String> {
        Ok(self.store_upload(file))
    }

    async fn upload_passport(&self, file: FilePayload) -> Result<String> {
        Ok(self.store_upload(file))
    }

    async fn download_file(&self, hash: &str, save_dir: &Path) -> Result<PathBuf> {
        let (file_name, bytes) = {
            let state = self.inner.state.lock().unwrap();
            let file = state.files.get(hash).ok_or_else(|| Self::not_found("file"))?;
            (file.file_name.clone(), file.bytes.clone())
        };
        tokio::fs::create_dir_all(save_dir).await?;
        let target = save_dir.join(file_name);
        tokio::fs::write(&target, bytes).await?;
        Ok(target)
    }

    async fn download(&self, hash: &str) -> Result<Vec<u8>> {
        let state = self.inner.state.lock().unwrap();
        state
            .files
            .get(hash)
            .map(|file| file.bytes.clone())
            .ok_or_else(|| Self::not_found("file"))
    }

    async fn delete_file(&self, hash: &str) -> Result<String> {
        let mut state = self.inner.state.lock().unwrap();
        if state.files.remove(hash).is_none() {
            return Err(Self::not_found("file"));
        }
        state.history.retain(|item| item.upload_hash != hash);
        Ok(format!("deleted {hash}"))
    }

    async fn create_knowledge_base(
        &self,
        document: FilePayload,
        name: &str,
    ) -> Result<KnowledgeBase> {
        let hash = uuid::Uuid::new_v4().to_string();
        let doc = Self::make_document(&document, &hash);
        let kb = KnowledgeBase {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            status: KnowledgeBaseStatus::Processing,
            created_at: STUB_TIMESTAMP.to_string(),
            documents: vec![doc],
        };
        let mut state = self.inner.state.lock().unwrap();
        state.knowledge_bases.insert(kb.id.clone(), kb.clone());
        Ok(kb)
    }

    async fn add_document(
        &self,
        document: FilePayload,
        knowledge_base_id: &str,
    ) -> Result<Document> {
        let hash = uuid::Uuid::new_v4().to_string();
        let doc = Self::make_document(&document, &hash);
        let mut state = self.inner.state.lock().unwrap();
        let kb = state
            .knowledge_bases
            .get_mut(knowledge_base_id)
            .ok_or_else(|| Self::not_found("knowledge base"))?;
        kb.documents.push(doc.clone());
        Ok(doc)
    }

    async fn delete_document(
        &self,
        document_id: &str,
        knowledge_base_id: &str,
    ) -> Result<String> {
        let mut state = self.inner.state.lock().unwrap();
        let kb = state
            .knowledge_bases
            .get_mut(knowledge_base_id)
            .ok_or_else(|| Self::not_found("knowledge base"))?;
        let before = kb.documents.len();
        kb.documents.retain(|doc| doc.id != document_id);
        if kb.documents.len() == before {
            return Err(Self::not_found("document"));
        }
        Ok(format!("deleted {document_id}"))
    }

    async fn knowledge_bases(&self) -> Result<Vec<KnowledgeBase>> {
        let ready_after = self.inner.ready_after.load(Ordering::SeqCst);
        let mut state = self.inner.state.lock().unwrap();
        let ids: Vec<String> = state.knowledge_bases.keys().cloned().collect();
        for id in &ids {
            Self::observe_kb(&mut state, id, ready_after);
        }
        Ok(state.knowledge_bases.values().cloned().collect())
    }

    async fn knowledge_base(&self, id: &str) -> Result<KnowledgeBase> {
        let ready_after = self.inner.ready_after.load(Ordering::SeqCst);
        let mut state = self.inner.state.lock().unwrap();
        Self::observe_kb(&mut state, id, ready_after);
        state
            .knowledge_bases
            .get(id)
            .cloned()
            .ok_or_else(|| Self::not_found("knowledge base"))
    }

    async fn create_chat_session(
        &self,
        knowledge_base_id: &str,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ChatResponse> {
        let mut state = self.inner.state.lock().unwrap();
        if !state.knowledge_bases.contains_key(knowledge_base_id) {
            return Err(Self::not_found("knowledge base"));
        }

        let session = match session_id {
            Some(id) => state
                .sessions
                .get_mut(id)
                .ok_or_else(|| Self::not_found("chat session"))?,
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                state.sessions.entry(id.clone()).or_insert(ChatSession {
                    id,
                    knowledge_base_id: knowledge_base_id.to_string(),
                    created_at: STUB_TIMESTAMP.to_string(),
                    messages: vec![],
                })
            }
        };

        let answer = format!("stub answer to: {message}");
        session.messages.push(ChatMessage {
            role: MessageRole::User,
            content: message.to_string(),
            timestamp: STUB_TIMESTAMP.to_string(),
        });
        session.messages.push(ChatMessage {
            role: MessageRole::Assistant,
            content: answer.clone(),
            timestamp: STUB_TIMESTAMP.to_string(),
        });

        Ok(ChatResponse {
            session_id: session.id.clone(),
            answer,
            sources: None,
        })
    }

    async fn chat_sessions(&self) -> Result<Vec<ChatSession>> {
        let state = self.inner.state.lock().unwrap();
        Ok(state.sessions.values().cloned().collect())
    }

    async fn chat_session(&self, id: &str) -> Result<ChatSession> {
        let state = self.inner.state.lock().unwrap();
        state
            .sessions
            .get(id)
            .cloned()
            .ok_or_else(|| Self::not_found("chat session"))
    }

    async fn uploaded_documents(&self) -> Result<Vec<Document>> {
        let state = self.inner.state.lock().unwrap();
        Ok(state
            .history
            .iter()
            .map(|item| Document {
                id: item.id.clone(),
                name: item.file_name.clone(),
                hash: item.upload_hash.clone(),
                created_at: item.created_at.clone(),
            })
            .collect())
    }

    async fn upload_history(&self, page: u32, page_size: u32) -> Result<UploadHistoryPage> {
        let state = self.inner.state.lock().unwrap();
        let items: Vec<UploadHistoryItem> = state
            .history
            .iter()
            .skip(page as usize * page_size as usize)
            .take(page_size as usize)
            .cloned()
            .collect();
        Ok(UploadHistoryPage {
            total_files_uploaded: state.history.len() as u64,
            upload_histories: items,
        })
    }
}
