//! Session-scoped conversation lifecycle: start, follow up, poll, fetch.

use std::sync::Arc;

use chrono::Utc;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::config::PollConfig;
use crate::error::{Error, GenieError};
use crate::genie::api::GenieApi;
use crate::genie::message::{Message, QueryResult};
use crate::store::history::{HistoryEntry, HistorySink};

/// Identifiers of the exchange currently being driven.
#[derive(Debug, Clone)]
struct ActiveExchange {
    conversation_id: String,
    current_message_id: String,
}

/// One user session's conversation with Genie.
///
/// Owns its state explicitly: the bound space, the acting user, and the
/// current (conversation, message) pair. One instance per session; polling is
/// a blocking await, so a single instance never issues two polls for the same
/// message concurrently. Sessions share nothing mutable except the history
/// sink, which serializes its own appends.
pub struct Conversation {
    api: Arc<dyn GenieApi>,
    history: Arc<dyn HistorySink>,
    space_id: String,
    user: String,
    poll: PollConfig,
    active: Option<ActiveExchange>,
}

impl Conversation {
    pub fn new(
        api: Arc<dyn GenieApi>,
        history: Arc<dyn HistorySink>,
        space_id: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            api,
            history,
            space_id: space_id.into(),
            user: user.into(),
            poll: PollConfig::default(),
            active: None,
        }
    }

    /// Override the default poll pacing.
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn space_id(&self) -> &str {
        &self.space_id
    }

    /// Id of the conversation being driven, if one has been started.
    pub fn conversation_id(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.conversation_id.as_str())
    }

    /// Id of the most recently sent message, if any.
    pub fn current_message_id(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.current_message_id.as_str())
    }

    /// Forget the current conversation; the next `ask` starts a new one.
    /// Conversations are never closed server-side.
    pub fn reset(&mut self) {
        self.active = None;
    }

    /// Send a prompt: starts a conversation on first use, follows up after.
    pub async fn ask(&mut self, prompt: &str) -> Result<String, Error> {
        if self.active.is_some() {
            self.follow_up(prompt).await
        } else {
            self.start(prompt).await
        }
    }

    /// Open a new conversation with an initial prompt. Returns the id of the
    /// message the service created for it.
    ///
    /// The service is the source of truth for conversation creation: no
    /// idempotency key is sent, so retrying after a transient failure may
    /// create a second conversation.
    pub async fn start(&mut self, prompt: &str) -> Result<String, Error> {
        let started = self.api.start_conversation(&self.space_id, prompt).await?;
        debug!(
            conversation_id = %started.conversation_id,
            message_id = %started.message_id,
            "Conversation started"
        );
        self.active = Some(ActiveExchange {
            conversation_id: started.conversation_id.clone(),
            current_message_id: started.message_id.clone(),
        });
        self.record_exchange(prompt, &started.conversation_id, &started.message_id)
            .await;
        Ok(started.message_id)
    }

    /// Send a follow-up on the active conversation. The returned message id
    /// becomes the current message for subsequent polls.
    pub async fn follow_up(&mut self, content: &str) -> Result<String, Error> {
        let conversation_id = self
            .active
            .as_ref()
            .map(|a| a.conversation_id.clone())
            .ok_or(GenieError::NoConversation)?;
        let message_id = self
            .api
            .send_followup(&self.space_id, &conversation_id, content)
            .await?;
        debug!(
            conversation_id = %conversation_id,
            message_id = %message_id,
            "Follow-up sent"
        );
        if let Some(active) = self.active.as_mut() {
            active.current_message_id = message_id.clone();
        }
        self.record_exchange(content, &conversation_id, &message_id)
            .await;
        Ok(message_id)
    }

    /// Poll the current message until it completes or the budget runs out.
    pub async fn wait_for_reply(&self) -> Result<Message, Error> {
        let active = self.active.as_ref().ok_or(GenieError::NoConversation)?;
        let conversation_id = active.conversation_id.clone();
        let message_id = active.current_message_id.clone();
        self.poll_message(&conversation_id, &message_id).await
    }

    /// Repeatedly fetch a message until its status is terminal, sleeping
    /// `poll.interval` between fetches.
    ///
    /// Never returns a non-terminal message as success. A poll that would
    /// exceed `poll.timeout` returns `Timeout` instead; the message may still
    /// complete later, so the caller can poll again with the same identifiers.
    pub async fn poll_message(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<Message, Error> {
        let started = Instant::now();
        loop {
            let message = self
                .api
                .get_message(&self.space_id, conversation_id, message_id)
                .await?;
            if message.status.is_terminal() {
                debug!(
                    message_id = %message_id,
                    status = %message.status,
                    "Message reached terminal status"
                );
                return Ok(message);
            }
            let elapsed = started.elapsed();
            if elapsed + self.poll.interval > self.poll.timeout {
                return Err(GenieError::Timeout {
                    message_id: message_id.to_string(),
                    elapsed,
                }
                .into());
            }
            sleep(self.poll.interval).await;
        }
    }

    /// Fetch the tabular result behind a query attachment of `message`.
    /// Results are fetched lazily and never cached across calls.
    pub async fn fetch_query_result(
        &self,
        message: &Message,
        attachment_id: &str,
    ) -> Result<QueryResult, Error> {
        Ok(self
            .api
            .query_result(
                &self.space_id,
                &message.conversation_id,
                &message.id,
                attachment_id,
            )
            .await?)
    }

    /// Append one history entry for a successful exchange. A sink failure is
    /// logged and does not fail the exchange itself.
    async fn record_exchange(&self, prompt: &str, conversation_id: &str, message_id: &str) {
        let entry = HistoryEntry {
            prompt: prompt.to_string(),
            conversation_id: conversation_id.to_string(),
            message_id: message_id.to_string(),
            space_id: self.space_id.clone(),
            timestamp: Utc::now(),
            user: self.user.clone(),
        };
        if let Err(e) = self.history.record(&entry).await {
            warn!("Failed to record history entry: {e}");
        }
    }
}
