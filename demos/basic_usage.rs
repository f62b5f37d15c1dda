//! End-to-end walkthrough against a live deployment.
//!
//! Expects `RAGBOX_SECRET_TOKEN` in the environment and sample documents
//! under `documents/`. Run with:
//!
//! ```sh
//! cargo run --example basic_usage
//! ```

use ragbox::{wait_until_ready, Client, RetryPolicy};

async fn run() -> ragbox::Result<()> {
    let client = Client::from_env()?;

    println!("Uploading file...");
    let hash = client
        .upload_file("documents/sample.pdf", "sample.pdf")
        .await?;
    println!("File uploaded: {hash}");

    println!("Uploading passport...");
    let passport_hash = client
        .upload_passport("documents/passport.jpg", "passport.jpg")
        .await?;
    println!("Passport uploaded: {passport_hash}");

    println!("Creating knowledge base...");
    let kb = client
        .create_knowledge_base("documents/knowledge.pdf", "My Knowledge Base")
        .await?;
    println!("Knowledge base created: {}", kb.id);

    println!("Adding document...");
    let document = client
        .add_document("documents/additional.pdf", &kb.id)
        .await?;
    println!("Document added: {}", document.id);

    println!("Waiting for the knowledge base to become ready...");
    let kb = wait_until_ready(&client, &kb.id, &RetryPolicy::default()).await?;
    println!("Knowledge base ready: {}", kb.id);

    println!("Starting chat session...");
    let chat = client
        .create_chat_session(&kb.id, "What is the main topic of the document?", None)
        .await?;
    println!("Answer: {}", chat.answer);

    let follow_up = client
        .create_chat_session(&kb.id, "Summarize it in one sentence.", Some(&chat.session_id))
        .await?;
    println!("Follow-up answer: {}", follow_up.answer);

    let documents = client.uploaded_documents().await?;
    println!("Uploaded documents: {}", serde_json::to_string_pretty(&documents).unwrap_or_default());

    let history = client.upload_history(0, 20).await?;
    println!(
        "Upload history: {} file(s) total, {} on this page",
        history.total_files_uploaded,
        history.upload_histories.len()
    );

    println!("Downloading file...");
    let path = client.download_file(&hash, "downloads").await?;
    println!("File downloaded to {}", path.display());

    println!("Deleting file...");
    let confirmation = client.delete_file(&hash).await?;
    println!("Deleted: {confirmation}");

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ragbox=debug".into()),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
