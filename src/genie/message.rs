//! Message, attachment, and query-result types returned by the service.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::GenieError;

/// Lifecycle status of a Genie message.
///
/// The service defines its own set of in-flight names (`RUNNING`,
/// `EXECUTING_QUERY`, ...); only `COMPLETED` and `FAILED` are terminal, and a
/// terminal status never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageStatus {
    Completed,
    Failed,
    /// Any service-defined non-terminal status, kept verbatim.
    InFlight(String),
}

impl MessageStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageStatus::Completed | MessageStatus::Failed)
    }
}

impl From<&str> for MessageStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "COMPLETED" => MessageStatus::Completed,
            "FAILED" => MessageStatus::Failed,
            other => MessageStatus::InFlight(other.to_string()),
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageStatus::Completed => f.write_str("COMPLETED"),
            MessageStatus::Failed => f.write_str("FAILED"),
            MessageStatus::InFlight(raw) => f.write_str(raw),
        }
    }
}

impl<'de> Deserialize<'de> for MessageStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(MessageStatus::from(raw.as_str()))
    }
}

/// One attachment on a message, decided at parse time.
#[derive(Debug, Clone, PartialEq)]
pub enum Attachment {
    /// Free-text answer.
    Text { content: String },
    /// Generated SQL plus a handle for fetching its tabular result.
    Query {
        sql: String,
        description: String,
        /// Absent when the service has no result resource for this query.
        attachment_id: Option<String>,
    },
}

#[derive(Deserialize)]
struct RawAttachment {
    attachment_id: Option<String>,
    text: Option<RawText>,
    query: Option<RawQuery>,
}

#[derive(Deserialize)]
struct RawText {
    content: String,
}

#[derive(Deserialize)]
struct RawQuery {
    query: String,
    #[serde(default)]
    description: String,
}

impl RawAttachment {
    /// Text wins if the service ever sends both payloads on one attachment.
    fn into_attachment(self) -> Option<Attachment> {
        if let Some(text) = self.text {
            return Some(Attachment::Text {
                content: text.content,
            });
        }
        if let Some(query) = self.query {
            return Some(Attachment::Query {
                sql: query.query,
                description: query.description,
                attachment_id: self.attachment_id,
            });
        }
        None
    }
}

/// Attachments the client cannot render (neither text nor query) are dropped
/// here; the order of the rest is the order of appearance in the response.
fn deserialize_attachments<'de, D>(deserializer: D) -> Result<Vec<Attachment>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<RawAttachment> = Vec::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(RawAttachment::into_attachment)
        .collect())
}

/// A message within a conversation, as returned by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    /// The prompt that produced this message.
    #[serde(default)]
    pub content: String,
    pub status: MessageStatus,
    #[serde(default, deserialize_with = "deserialize_attachments")]
    pub attachments: Vec<Attachment>,
}

/// Column names plus rectangular row data behind a query attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Parse the service's statement-response envelope.
    ///
    /// Any missing or mistyped key is reported as `MalformedResult` naming
    /// the offending piece, so a bad payload degrades to "no data" for the
    /// caller instead of ending the session.
    pub fn from_response(response: &Value) -> Result<Self, GenieError> {
        let statement = field(response, "statement_response")?;

        let columns = field(statement, "manifest")
            .and_then(|manifest| field(manifest, "schema"))
            .and_then(|schema| field(schema, "columns"))?
            .as_array()
            .ok_or_else(|| malformed("manifest.schema.columns is not an array"))?
            .iter()
            .map(|column| {
                column
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| malformed("column entry missing a name"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rows = field(statement, "result")
            .and_then(|result| field(result, "data_array"))?
            .as_array()
            .ok_or_else(|| malformed("result.data_array is not an array"))?
            .iter()
            .map(|row| {
                row.as_array()
                    .cloned()
                    .ok_or_else(|| malformed("data_array row is not an array"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { columns, rows })
    }
}

fn field<'a>(value: &'a Value, key: &str) -> Result<&'a Value, GenieError> {
    value.get(key).ok_or_else(|| malformed(&format!("missing {key}")))
}

fn malformed(reason: &str) -> GenieError {
    GenieError::MalformedResult {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── Status parsing ──────────────────────────────────────────────

    #[test]
    fn terminal_statuses() {
        assert!(MessageStatus::from("COMPLETED").is_terminal());
        assert!(MessageStatus::from("FAILED").is_terminal());
    }

    #[test]
    fn service_defined_statuses_are_in_flight() {
        for raw in ["RUNNING", "EXECUTING_QUERY", "PENDING_WAREHOUSE", ""] {
            let status = MessageStatus::from(raw);
            assert_eq!(status, MessageStatus::InFlight(raw.to_string()));
            assert!(!status.is_terminal());
        }
    }

    #[test]
    fn status_display_round_trips_raw_name() {
        assert_eq!(MessageStatus::from("RUNNING").to_string(), "RUNNING");
        assert_eq!(MessageStatus::Completed.to_string(), "COMPLETED");
    }

    // ── Message and attachment parsing ──────────────────────────────

    #[test]
    fn message_parses_attachments_in_order() {
        let message: Message = serde_json::from_value(json!({
            "id": "m1",
            "conversation_id": "c1",
            "content": "What is the volume in web3?",
            "status": "COMPLETED",
            "attachments": [
                { "text": { "content": "Volume is 1.2B" } },
                {
                    "attachment_id": "a1",
                    "query": {
                        "query": "SELECT sum(volume) FROM trades",
                        "description": "Total volume"
                    }
                },
                { "text": { "content": "Source: trades table" } }
            ]
        }))
        .unwrap();

        assert_eq!(message.status, MessageStatus::Completed);
        assert_eq!(
            message.attachments,
            vec![
                Attachment::Text {
                    content: "Volume is 1.2B".into()
                },
                Attachment::Query {
                    sql: "SELECT sum(volume) FROM trades".into(),
                    description: "Total volume".into(),
                    attachment_id: Some("a1".into()),
                },
                Attachment::Text {
                    content: "Source: trades table".into()
                },
            ]
        );
    }

    #[test]
    fn query_attachment_without_id_or_description() {
        let message: Message = serde_json::from_value(json!({
            "id": "m1",
            "conversation_id": "c1",
            "status": "COMPLETED",
            "attachments": [
                { "query": { "query": "SELECT 1" } }
            ]
        }))
        .unwrap();

        assert_eq!(
            message.attachments,
            vec![Attachment::Query {
                sql: "SELECT 1".into(),
                description: String::new(),
                attachment_id: None,
            }]
        );
    }

    #[test]
    fn unrenderable_attachments_are_dropped_without_reordering() {
        let message: Message = serde_json::from_value(json!({
            "id": "m1",
            "conversation_id": "c1",
            "status": "COMPLETED",
            "attachments": [
                { "text": { "content": "first" } },
                { "attachment_id": "mystery" },
                { "text": { "content": "second" } }
            ]
        }))
        .unwrap();

        assert_eq!(
            message.attachments,
            vec![
                Attachment::Text { content: "first".into() },
                Attachment::Text { content: "second".into() },
            ]
        );
    }

    #[test]
    fn message_without_attachments_field() {
        let message: Message = serde_json::from_value(json!({
            "id": "m1",
            "conversation_id": "c1",
            "status": "RUNNING"
        }))
        .unwrap();

        assert!(message.attachments.is_empty());
        assert!(message.content.is_empty());
    }

    // ── Query result parsing ────────────────────────────────────────

    fn sample_response() -> Value {
        json!({
            "statement_response": {
                "manifest": {
                    "schema": {
                        "columns": [ { "name": "date" }, { "name": "volume" } ]
                    }
                },
                "result": {
                    "data_array": [ [ "2024-01-01", 100 ] ]
                }
            }
        })
    }

    #[test]
    fn query_result_parses_columns_and_rows() {
        let result = QueryResult::from_response(&sample_response()).unwrap();
        assert_eq!(result.columns, vec!["date", "volume"]);
        assert_eq!(result.rows, vec![vec![json!("2024-01-01"), json!(100)]]);
        assert!(!result.is_empty());
    }

    #[test]
    fn missing_data_array_is_malformed_not_a_panic() {
        let mut response = sample_response();
        response["statement_response"]["result"]
            .as_object_mut()
            .unwrap()
            .remove("data_array");

        let err = QueryResult::from_response(&response).unwrap_err();
        assert!(matches!(err, GenieError::MalformedResult { ref reason } if reason.contains("data_array")));
    }

    #[test]
    fn missing_statement_response_is_malformed() {
        let err = QueryResult::from_response(&json!({})).unwrap_err();
        assert!(
            matches!(err, GenieError::MalformedResult { ref reason } if reason.contains("statement_response"))
        );
    }

    #[test]
    fn column_without_name_is_malformed() {
        let mut response = sample_response();
        response["statement_response"]["manifest"]["schema"]["columns"] = json!([{}]);
        let err = QueryResult::from_response(&response).unwrap_err();
        assert!(matches!(err, GenieError::MalformedResult { .. }));
    }

    #[test]
    fn non_array_row_is_malformed() {
        let mut response = sample_response();
        response["statement_response"]["result"]["data_array"] = json!(["not-a-row"]);
        let err = QueryResult::from_response(&response).unwrap_err();
        assert!(matches!(err, GenieError::MalformedResult { .. }));
    }

    #[test]
    fn empty_data_array_is_an_empty_result() {
        let mut response = sample_response();
        response["statement_response"]["result"]["data_array"] = json!([]);
        let result = QueryResult::from_response(&response).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.columns, vec!["date", "volume"]);
    }
}
