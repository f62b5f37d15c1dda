use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{Backend, FilePayload};
use crate::error::{Error, Result};
use crate::models::{
    ChatResponse, ChatSession, Document, KnowledgeBase, UploadHistoryPage,
};

pub const DEFAULT_BASE_URL: &str = "https://api.ragbox.ai";

/// reqwest-backed implementation of [`Backend`] against the hosted service.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    secret_token: String,
    base_url: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    hash: String,
}

#[derive(Deserialize)]
struct ConfirmationResponse {
    message: String,
}

#[derive(Serialize)]
struct ChatSessionRequest<'a> {
    knowledge_base_id: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

/// Error payloads are `{"message": "..."}` when the service produced them;
/// proxies and load balancers return plain text.
#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl HttpBackend {
    pub fn new(secret_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            secret_token: secret_token.into(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(&self, resp: Response) -> Result<Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or(text);
        Err(Error::Api { status, message })
    }

    async fn upload_multipart(&self, path: &str, file: FilePayload) -> Result<String> {
        debug!(file_name = %file.file_name, size = file.bytes.len(), "uploading");
        let part = multipart::Part::bytes(file.bytes).file_name(file.file_name);
        let form = multipart::Form::new().part("file", part);

        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.secret_token)
            .multipart(form)
            .send()
            .await?;
        let resp = self.check(resp).await?;

        let data: UploadResponse = resp.json().await?;
        Ok(data.hash)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn upload_file(&self, file: FilePayload) -> Result<String> {
        self.upload_multipart("/v1/files", file).await
    }

    async fn upload_passport(&self, file: FilePayload) -> Result<String> {
        self.upload_multipart("/v1/passports", file).await
    }

    async fn download_file(&self, hash: &str, save_dir: &Path) -> Result<PathBuf> {
        let resp = self
            .client
            .get(self.url(&format!("/v1/files/{hash}")))
            .bearer_auth(&self.secret_token)
            .send()
            .await?;
        let resp = self.check(resp).await?;

        let file_name = resp
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| hash.to_string());
        let target = save_dir.join(file_name);

        tokio::fs::create_dir_all(save_dir).await?;
        let mut out = tokio::fs::File::create(&target).await?;
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            out.write_all(&chunk?).await?;
        }
        out.flush().await?;

        debug!(hash, path = %target.display(), "downloaded");
        Ok(target)
    }

    async fn download(&self, hash: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(self.url(&format!("/v1/files/{hash}")))
            .bearer_auth(&self.secret_token)
            .send()
            .await?;
        let resp = self.check(resp).await?;
        Ok(resp.bytes().await?.to_vec())
    }

    async fn delete_file(&self, hash: &str) -> Result<String> {
        let resp = self
            .client
            .delete(self.url(&format!("/v1/files/{hash}")))
            .bearer_auth(&self.secret_token)
            .send()
            .await?;
        let resp = self.check(resp).await?;
        let data: ConfirmationResponse = resp.json().await?;
        Ok(data.message)
    }

    async fn create_knowledge_base(
        &self,
        document: FilePayload,
        name: &str,
    ) -> Result<KnowledgeBase> {
        let part = multipart::Part::bytes(document.bytes).file_name(document.file_name);
        let form = multipart::Form::new()
            .part("document", part)
            .text("name", name.to_string());

        let resp = self
            .client
            .post(self.url("/v1/knowledge-bases"))
            .bearer_auth(&self.secret_token)
            .multipart(form)
            .send()
            .await?;
        let resp = self.check(resp).await?;
        Ok(resp.json().await?)
    }

    async fn add_document(
        &self,
        document: FilePayload,
        knowledge_base_id: &str,
    ) -> Result<Document> {
        let part = multipart::Part::bytes(document.bytes).file_name(document.file_name);
        let form = multipart::Form::new().part("document", part);

        let resp = self
            .client
            .post(self.url(&format!("/v1/knowledge-bases/{knowledge_base_id}/documents")))
            .bearer_auth(&self.secret_token)
            .multipart(form)
            .send()
            .await?;
        let resp = self.check(resp).await?;
        Ok(resp.json().await?)
    }

    async fn delete_document(
        &self,
        document_id: &str,
        knowledge_base_id: &str,
    ) -> Result<String> {
        let resp = self
            .client
            .delete(self.url(&format!(
                "/v1/knowledge-bases/{knowledge_base_id}/documents/{document_id}"
            )))
            .bearer_auth(&self.secret_token)
            .send()
            .await?;
        let resp = self.check(resp).await?;
        let data: ConfirmationResponse = resp.json().await?;
        Ok(data.message)
    }

    async fn knowledge_bases(&self) -> Result<Vec<KnowledgeBase>> {
        let resp = self
            .client
            .get(self.url("/v1/knowledge-bases"))
            .bearer_auth(&self.secret_token)
            .send()
            .await?;
        let resp = self.check(resp).await?;
        Ok(resp.json().await?)
    }

    async fn knowledge_base(&self, id: &str) -> Result<KnowledgeBase> {
        let resp = self
            .client
            .get(self.url(&format!("/v1/knowledge-bases/{id}")))
            .bearer_auth(&self.secret_token)
            .send()
            .await?;
        let resp = self.check(resp).await?;
        Ok(resp.json().await?)
    }

    async fn create_chat_session(
        &self,
        knowledge_base_id: &str,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ChatResponse> {
        let body = ChatSessionRequest {
            knowledge_base_id,
            message,
            session_id,
        };

        let resp = self
            .client
            .post(self.url("/v1/chat-sessions"))
            .bearer_auth(&self.secret_token)
            .json(&body)
            .send()
            .await?;
        let resp = self.check(resp).await?;
        Ok(resp.json().await?)
    }

    async fn chat_sessions(&self) -> Result<Vec<ChatSession>> {
        let resp = self
            .client
            .get(self.url("/v1/chat-sessions"))
            .bearer_auth(&self.secret_token)
            .send()
            .await?;
        let resp = self.check(resp).await?;
        Ok(resp.json().await?)
    }

    async fn chat_session(&self, id: &str) -> Result<ChatSession> {
        let resp = self
            .client
            .get(self.url(&format!("/v1/chat-sessions/{id}")))
            .bearer_auth(&self.secret_token)
            .send()
            .await?;
        let resp = self.check(resp).await?;
        Ok(resp.json().await?)
    }

    async fn uploaded_documents(&self) -> Result<Vec<Document>> {
        let resp = self
            .client
            .get(self.url("/v1/files"))
            .bearer_auth(&self.secret_token)
            .send()
            .await?;
        let resp = self.check(resp).await?;
        Ok(resp.json().await?)
    }

    async fn upload_history(&self, page: u32, page_size: u32) -> Result<UploadHistoryPage> {
        let resp = self
            .client
            .get(self.url("/v1/files/history"))
            .query(&[("page", page), ("page_size", page_size)])
            .bearer_auth(&self.secret_token)
            .send()
            .await?;
        let resp = self.check(resp).await?;
        Ok(resp.json().await?)
    }
}

/// Extract the filename from a `Content-Disposition` header value.
fn filename_from_disposition(value: &str) -> Option<String> {
    let marker = "filename=";
    let start = value.find(marker)? + marker.len();
    let rest = &value[start..];
    let name = if let Some(stripped) = rest.strip_prefix('"') {
        stripped.split('"').next()?
    } else {
        rest.split(';').next()?.trim()
    };
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
