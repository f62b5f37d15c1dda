use serde::{Deserialize, Serialize};

/// Processing state of a knowledge base. Owned entirely by the service;
/// clients only ever observe it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeBaseStatus {
    Processing,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub id: String,
    pub name: String,
    pub status: KnowledgeBaseStatus,
    pub created_at: String,
    #[serde(default)]
    pub documents: Vec<Document>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub hash: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub knowledge_base_id: String,
    pub created_at: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

/// One row of the upload ledger. Field names on the wire are fixed by the
/// service's document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadHistoryItem {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "uploadHash")]
    pub upload_hash: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "fileSize")]
    pub file_size: u64,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
    #[serde(rename = "__v")]
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadHistoryPage {
    #[serde(rename = "totalFilesUploaded")]
    pub total_files_uploaded: u64,
    #[serde(rename = "uploadHistories")]
    pub upload_histories: Vec<UploadHistoryItem>,
}
