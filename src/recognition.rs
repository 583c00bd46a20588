//! Recognition endpoint client and payload types
//!
//! One clip, one POST: the WAV bytes go up as multipart form data and the
//! endpoint answers with track metadata or an error. No retries; every
//! failure is terminal for the cycle and surfaced to the user.

use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Fixed recognition path on the endpoint
pub const RECOGNIZE_PATH: &str = "/recognize";

/// Field name and filename for the uploaded clip
const AUDIO_FIELD: &str = "audio";
const AUDIO_FILENAME: &str = "recording.wav";

/// Recognition error taxonomy
#[derive(Error, Debug)]
pub enum RecognitionError {
    /// Request never completed (connection refused, timeout, ...)
    #[error("Recognition request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Endpoint answered with a non-success status
    #[error("Recognition service returned HTTP {0}")]
    Status(StatusCode),
    /// Well-formed payload carrying an error field, shown verbatim
    #[error("{0}")]
    Service(String),
    /// Body was not valid recognition JSON
    #[error("Malformed recognition response: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Cover art URLs in preference order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtLinks {
    #[serde(default)]
    pub coverart: Option<String>,
    #[serde(default)]
    pub coverarthq: Option<String>,
    #[serde(default)]
    pub background: Option<String>,
}

impl ArtLinks {
    /// First non-empty URL: coverart, then coverarthq, then background
    pub fn best(&self) -> Option<&str> {
        [&self.coverart, &self.coverarthq, &self.background]
            .into_iter()
            .filter_map(|url| url.as_deref())
            .find(|url| !url.is_empty())
    }
}

/// A successful recognition result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackMatch {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub release_date: String,
    #[serde(default)]
    pub images: ArtLinks,
    /// Lyrics lines in display order; empty means not available
    #[serde(default)]
    pub lyrics: Vec<String>,
    /// Provider page for the track, when the endpoint supplies one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Raw endpoint payload: either a match or an application-level failure.
/// Failure is tried first so a payload carrying an error field never parses
/// as a match.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Recognition {
    Failure { error: String },
    Match(TrackMatch),
}

/// Decode an endpoint response body
pub fn decode_recognition(body: &str) -> Result<Recognition, RecognitionError> {
    Ok(serde_json::from_str(body)?)
}

/// HTTP client for the recognition endpoint
pub struct RecognitionClient {
    client: reqwest::Client,
    endpoint: String,
}

impl RecognitionClient {
    /// Build a client for the given endpoint base URL
    pub fn new(endpoint: &str) -> Result<Self, RecognitionError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Submit a WAV-encoded clip and return the match.
    ///
    /// Exactly one request per call; transport failures, non-2xx statuses,
    /// and error payloads each map to their own variant.
    pub async fn recognize(&self, wav: Vec<u8>) -> Result<TrackMatch, RecognitionError> {
        let part = Part::bytes(wav)
            .file_name(AUDIO_FILENAME)
            .mime_str("audio/wav")?;
        let form = Form::new().part(AUDIO_FIELD, part);

        let url = format!("{}{}", self.endpoint, RECOGNIZE_PATH);
        let response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RecognitionError::Status(status));
        }

        let body = response.text().await?;
        match decode_recognition(&body)? {
            Recognition::Failure { error } => Err(RecognitionError::Service(error)),
            Recognition::Match(track) => Ok(track),
        }
    }
}
