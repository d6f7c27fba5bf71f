//! The four wire operations the Genie service exposes.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error::GenieError;
use crate::genie::message::{Message, QueryResult};
use crate::transport::ApiClient;

/// Identifiers returned when a conversation is created.
#[derive(Debug, Clone, Deserialize)]
pub struct StartedConversation {
    pub conversation_id: String,
    pub message_id: String,
}

#[derive(Debug, Deserialize)]
struct FollowupResponse {
    message_id: String,
}

/// Operations against the Genie REST API.
///
/// `ApiClient` implements this over HTTP; tests substitute scripted fixtures.
#[async_trait]
pub trait GenieApi: Send + Sync {
    /// Open a conversation in a space with an initial prompt.
    async fn start_conversation(
        &self,
        space_id: &str,
        content: &str,
    ) -> Result<StartedConversation, GenieError>;

    /// Fetch the current state of a message.
    async fn get_message(
        &self,
        space_id: &str,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<Message, GenieError>;

    /// Send a follow-up prompt on an existing conversation. Returns the id of
    /// the newly created message.
    async fn send_followup(
        &self,
        space_id: &str,
        conversation_id: &str,
        content: &str,
    ) -> Result<String, GenieError>;

    /// Fetch the tabular result behind a query attachment.
    async fn query_result(
        &self,
        space_id: &str,
        conversation_id: &str,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<QueryResult, GenieError>;
}

#[async_trait]
impl GenieApi for ApiClient {
    async fn start_conversation(
        &self,
        space_id: &str,
        content: &str,
    ) -> Result<StartedConversation, GenieError> {
        let path = format!("/spaces/{space_id}/start-conversation");
        let body = self.post_json(&path, &json!({ "content": content })).await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn get_message(
        &self,
        space_id: &str,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<Message, GenieError> {
        let path =
            format!("/spaces/{space_id}/conversations/{conversation_id}/messages/{message_id}");
        let body = self.get_json(&path).await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn send_followup(
        &self,
        space_id: &str,
        conversation_id: &str,
        content: &str,
    ) -> Result<String, GenieError> {
        let path = format!("/spaces/{space_id}/conversations/{conversation_id}/messages");
        let body = self.post_json(&path, &json!({ "content": content })).await?;
        let parsed: FollowupResponse = serde_json::from_value(body)?;
        Ok(parsed.message_id)
    }

    async fn query_result(
        &self,
        space_id: &str,
        conversation_id: &str,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<QueryResult, GenieError> {
        let path = format!(
            "/spaces/{space_id}/conversations/{conversation_id}/messages/{message_id}/query-result/{attachment_id}"
        );
        let body = self.get_json(&path).await?;
        QueryResult::from_response(&body)
    }
}
