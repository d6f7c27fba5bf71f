//! Authenticated HTTP transport for the Genie REST API.

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::config::GenieConfig;
use crate::error::GenieError;

/// Path prefix for every Genie endpoint under the workspace host.
const API_PREFIX: &str = "/api/2.0/genie";

/// Low-level client owning the HTTP connection pool and the bearer token.
///
/// Every request carries `Authorization: Bearer <token>`. A non-2xx status is
/// a `Transport` failure carrying the status code and response body; nothing
/// is retried here.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: SecretString,
}

impl ApiClient {
    pub fn new(config: &GenieConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.host.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    /// GET a Genie resource, returning its parsed JSON body.
    pub async fn get_json(&self, path: &str) -> Result<Value, GenieError> {
        let response = self
            .client
            .get(self.endpoint(path))
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| GenieError::Request(e.to_string()))?;
        Self::parse_response(response).await
    }

    /// POST a JSON body to a Genie resource, returning the parsed response.
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value, GenieError> {
        let response = self
            .client
            .post(self.endpoint(path))
            .bearer_auth(self.token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| GenieError::Request(e.to_string()))?;
        Self::parse_response(response).await
    }

    async fn parse_response(response: reqwest::Response) -> Result<Value, GenieError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenieError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(GenieError::Transport {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollConfig;

    fn test_config(host: &str) -> GenieConfig {
        GenieConfig {
            host: host.into(),
            token: SecretString::from("dapi-test-token"),
            poll: PollConfig::default(),
        }
    }

    #[test]
    fn endpoint_joins_prefix_and_path() {
        let client = ApiClient::new(&test_config("https://acme.cloud.example.com"));
        assert_eq!(
            client.endpoint("/spaces/s1/start-conversation"),
            "https://acme.cloud.example.com/api/2.0/genie/spaces/s1/start-conversation"
        );
    }

    #[test]
    fn endpoint_strips_trailing_slash_from_host() {
        let client = ApiClient::new(&test_config("https://acme.cloud.example.com/"));
        assert_eq!(
            client.endpoint("/spaces/s1"),
            "https://acme.cloud.example.com/api/2.0/genie/spaces/s1"
        );
    }

    #[tokio::test]
    async fn connection_failure_is_a_request_error() {
        // Nothing listens on the discard port; expect a typed failure, not a panic.
        let client = ApiClient::new(&test_config("http://127.0.0.1:9"));
        let err = client.get_json("/spaces/s1").await.unwrap_err();
        assert!(matches!(err, GenieError::Request(_)));
    }
}
