//! Bounded waiting for knowledge-base readiness.
//!
//! The service transitions a knowledge base from `processing` to `ready` (or
//! `failed`) on its own schedule; clients can only re-read. These helpers put
//! a retry budget and growing sleeps around that re-read so callers do not
//! hammer the API in a tight loop.

use std::time::Duration;

use tracing::debug;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::models::{KnowledgeBase, KnowledgeBaseStatus};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay before the given zero-based attempt: doubles from
    /// `initial_delay`, capped at `max_delay`.
    fn delay_for(&self, attempt: u32) -> Duration {
        let doubled = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        doubled.min(self.max_delay)
    }
}

/// Poll one knowledge base until it reports `ready`.
///
/// A `failed` status aborts immediately; exhausting the attempt budget yields
/// [`Error::ReadyTimeout`].
pub async fn wait_until_ready(
    client: &Client,
    knowledge_base_id: &str,
    policy: &RetryPolicy,
) -> Result<KnowledgeBase> {
    for attempt in 0..policy.max_attempts {
        let kb = client.knowledge_base(knowledge_base_id).await?;
        match kb.status {
            KnowledgeBaseStatus::Ready => return Ok(kb),
            KnowledgeBaseStatus::Failed => {
                return Err(Error::KnowledgeBaseFailed { id: kb.id });
            }
            KnowledgeBaseStatus::Processing => {
                let delay = policy.delay_for(attempt);
                debug!(id = %kb.id, attempt, delay_ms = delay.as_millis() as u64, "still processing");
                tokio::time::sleep(delay).await;
            }
        }
    }
    Err(Error::ReadyTimeout {
        attempts: policy.max_attempts,
    })
}

/// Poll the knowledge-base listing until any entry reports `ready`.
///
/// An empty listing means no base has been registered yet, not an error; the
/// attempt is consumed and polling continues.
pub async fn wait_for_any_ready(client: &Client, policy: &RetryPolicy) -> Result<KnowledgeBase> {
    for attempt in 0..policy.max_attempts {
        let bases = client.knowledge_bases().await?;
        if let Some(kb) = bases
            .iter()
            .find(|kb| kb.status == KnowledgeBaseStatus::Ready)
        {
            return Ok(kb.clone());
        }
        if !bases.is_empty()
            && bases
                .iter()
                .all(|kb| kb.status == KnowledgeBaseStatus::Failed)
        {
            // Nothing left that could ever become ready.
            return Err(Error::KnowledgeBaseFailed {
                id: bases[0].id.clone(),
            });
        }
        let delay = policy.delay_for(attempt);
        debug!(count = bases.len(), attempt, "no ready knowledge base yet");
        tokio::time::sleep(delay).await;
    }
    Err(Error::ReadyTimeout {
        attempts: policy.max_attempts,
    })
}
