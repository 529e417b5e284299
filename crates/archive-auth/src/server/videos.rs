//! Protected video metadata endpoint.
//!
//! `PUT /private/video/{id}` stores a new version of a video's metadata document,
//! attributed to the authenticated client.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::oauth::AuthContext;
use super::{HttpState, json_response};
use crate::credentials::ClientId;
use crate::error::RecordError;

/// Top-level keys that change on their own without making a new version.
const UNVERSIONED_KEYS: [&str; 3] = ["audiencies", "publicitat", "youbora"];

/// Versioned video metadata storage.
#[async_trait]
pub trait VideoRecords: Send + Sync {
    /// Append a version of `video_id`'s metadata written by `client_id`.
    ///
    /// Returns the new version number (0 for the first).
    async fn insert(
        &self,
        video_id: i64,
        data: Value,
        client_id: ClientId,
    ) -> Result<u32, RecordError>;
}

/// One stored version of a video's metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoVersion {
    pub version: u32,
    pub data: Value,
    pub client_id: ClientId,
    pub created_at: DateTime<Utc>,
}

/// In-memory [`VideoRecords`].
#[derive(Debug, Clone, Default)]
pub struct MemoryVideoRecords {
    videos: Arc<RwLock<HashMap<i64, Vec<VideoVersion>>>>,
}

impl MemoryVideoRecords {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored versions of a video, oldest first.
    pub async fn versions(&self, video_id: i64) -> Vec<VideoVersion> {
        self.videos
            .read()
            .await
            .get(&video_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl VideoRecords for MemoryVideoRecords {
    async fn insert(
        &self,
        video_id: i64,
        data: Value,
        client_id: ClientId,
    ) -> Result<u32, RecordError> {
        let mut videos = self.videos.write().await;
        let versions = videos.entry(video_id).or_default();

        let previous = versions.last().map(|v| &v.data);
        if previous.is_some_and(|prev| same_version(prev, &data)) {
            return Err(RecordError::Rejected("No change from last version".into()));
        }

        let version = u32::try_from(versions.len())
            .map_err(|_| RecordError::Backend(format!("too many versions of video {video_id}")))?;
        versions.push(VideoVersion {
            version,
            data,
            client_id,
            created_at: Utc::now(),
        });
        Ok(version)
    }
}

/// Whether two documents differ only in [`UNVERSIONED_KEYS`].
fn same_version(previous: &Value, next: &Value) -> bool {
    match (previous, next) {
        (Value::Object(previous), Value::Object(next)) => {
            versioned_fields(previous) == versioned_fields(next)
        }
        _ => previous == next,
    }
}

fn versioned_fields(document: &Map<String, Value>) -> BTreeMap<&str, &Value> {
    document
        .iter()
        .filter(|(key, _)| !UNVERSIONED_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.as_str(), value))
        .collect()
}

#[derive(Debug, Serialize)]
struct PutVideoResponse {
    id: i64,
    version: u32,
}

/// `PUT /private/video/{id}`
///
/// The body is a JSON document that must be marked published
/// (`informacio.estat.actiu == true`).
pub async fn put_video(
    auth: AuthContext,
    State(state): State<Arc<HttpState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let Ok(video_id) = id.parse::<i64>() else {
        return (StatusCode::BAD_REQUEST, "Bad video id").into_response();
    };

    let Ok(data) = serde_json::from_slice::<Value>(&body) else {
        return (StatusCode::BAD_REQUEST, "Bad data").into_response();
    };

    let published = data.pointer("/informacio/estat/actiu") == Some(&Value::Bool(true));
    if !published {
        return (StatusCode::BAD_REQUEST, "Unpublished video").into_response();
    }

    match state.videos.insert(video_id, data, auth.client_id).await {
        Ok(version) => {
            tracing::info!(video_id, version, client_id = %auth.client_id, "Stored video version");
            let body = PutVideoResponse {
                id: video_id,
                version,
            };
            json_response(StatusCode::OK, &body)
        }
        Err(RecordError::Rejected(message)) => (StatusCode::BAD_REQUEST, message).into_response(),
        Err(e) => {
            tracing::error!(error = %e, video_id, "Failed to store video");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
        }
    }
}
