//! Space access registry: pending requests and per-user grants.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::AccessError;

/// A user's request for access to one or more spaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub id: Uuid,
    pub email: String,
    pub requested_spaces: Vec<String>,
    pub requested_at: DateTime<Utc>,
}

/// On-disk shape of the registry.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct AccessState {
    /// email -> space ids the user may query.
    #[serde(default)]
    grants: BTreeMap<String, BTreeSet<String>>,
    #[serde(default)]
    requests: Vec<AccessRequest>,
}

/// JSON-file-backed access registry.
///
/// The whole state stays small (one entry per user), so mutations rewrite the
/// file through a temp-file rename rather than patching in place.
pub struct AccessStore {
    path: PathBuf,
    state: Mutex<AccessState>,
}

impl AccessStore {
    /// Open the registry, loading existing state if the file is present.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, AccessError> {
        let path = path.into();
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => AccessState::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Record a request for access to the given spaces. Returns the request id.
    pub async fn submit_request(
        &self,
        email: &str,
        spaces: Vec<String>,
    ) -> Result<Uuid, AccessError> {
        let request = AccessRequest {
            id: Uuid::new_v4(),
            email: email.to_string(),
            requested_spaces: spaces,
            requested_at: Utc::now(),
        };
        let mut state = self.state.lock().await;
        state.requests.push(request.clone());
        self.persist(&state).await?;
        Ok(request.id)
    }

    /// Requests awaiting a grant, oldest first.
    pub async fn pending_requests(&self) -> Vec<AccessRequest> {
        self.state.lock().await.requests.clone()
    }

    /// Grant spaces to the requesting user. `spaces` may be a subset of what
    /// was requested. Acting on one request settles every pending request
    /// from that user.
    pub async fn grant(&self, request_id: Uuid, spaces: &[String]) -> Result<(), AccessError> {
        let mut state = self.state.lock().await;
        let Some(position) = state.requests.iter().position(|r| r.id == request_id) else {
            return Err(AccessError::RequestNotFound(request_id));
        };
        let email = state.requests[position].email.clone();
        state
            .grants
            .entry(email.clone())
            .or_default()
            .extend(spaces.iter().cloned());
        state.requests.retain(|r| r.email != email);
        self.persist(&state).await
    }

    /// Whether a user may query a space.
    pub async fn has_access(&self, email: &str, space_id: &str) -> bool {
        self.state
            .lock()
            .await
            .grants
            .get(email)
            .is_some_and(|spaces| spaces.contains(space_id))
    }

    /// Spaces a user has been granted, sorted.
    pub async fn allowed_spaces(&self, email: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .grants
            .get(email)
            .map(|spaces| spaces.iter().cloned().collect())
            .unwrap_or_default()
    }

    async fn persist(&self, state: &AccessState) -> Result<(), AccessError> {
        let raw = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
