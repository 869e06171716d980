//! Paste service client used for long Discord messages.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use pierlink_types::config::PasteServiceConfig;
use pierlink_types::error::MutatorError;

/// Uploads text and returns a public URL for it.
#[async_trait]
pub trait PasteService: Send + Sync {
    async fn upload(&self, content: &str, expires_in_days: u32) -> Result<String, MutatorError>;
}

#[derive(Debug, Serialize)]
struct NewPaste<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires: Option<String>,
    files: Vec<NewFile<'a>>,
}

#[derive(Debug, Serialize)]
struct NewFile<'a> {
    name: &'a str,
    content: FileContent<'a>,
}

#[derive(Debug, Serialize)]
struct FileContent<'a> {
    format: &'static str,
    value: &'a str,
}

#[derive(Debug, Deserialize)]
struct PasteResponse {
    status: String,
    result: Option<PasteResult>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PasteResult {
    id: String,
}

/// paste.gg v1 API client.
pub struct PasteGgClient {
    http: Client,
    api_url: String,
    link_base: String,
}

impl PasteGgClient {
    pub fn new(config: &PasteServiceConfig) -> Self {
        Self {
            http: Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            link_base: config.link_base.trim_end_matches('/').to_owned(),
        }
    }

    fn expiry(days: u32) -> Option<String> {
        (days > 0).then(|| {
            (Utc::now() + ChronoDuration::days(i64::from(days)))
                .to_rfc3339_opts(SecondsFormat::Secs, true)
        })
    }
}

#[async_trait]
impl PasteService for PasteGgClient {
    async fn upload(&self, content: &str, expires_in_days: u32) -> Result<String, MutatorError> {
        let body = NewPaste {
            name: "Discord message",
            expires: Self::expiry(expires_in_days),
            files: vec![NewFile {
                name: "message.md",
                content: FileContent {
                    format: "text",
                    value: content,
                },
            }],
        };

        let resp = self
            .http
            .post(format!("{}/pastes", self.api_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| MutatorError::UploadFailed(e.to_string()))?;

        let status = resp.status();
        let parsed: PasteResponse = resp
            .json()
            .await
            .map_err(|e| MutatorError::UploadFailed(format!("HTTP {status}: {e}")))?;

        if parsed.status == "success"
            && let Some(result) = parsed.result
        {
            debug!(paste_id = %result.id, "paste uploaded");
            return Ok(format!("{}/{}", self.link_base, result.id));
        }
        Err(MutatorError::UploadFailed(parsed.message.unwrap_or_else(|| {
            format!("paste service answered {}", parsed.status)
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_format() {
        let expiry = PasteGgClient::expiry(7).unwrap();
        assert!(expiry.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&expiry).is_ok());
        assert!(PasteGgClient::expiry(0).is_none());
    }

    #[test]
    fn request_body_shape() {
        let body = NewPaste {
            name: "Discord message",
            expires: None,
            files: vec![NewFile {
                name: "message.md",
                content: FileContent {
                    format: "text",
                    value: "hello",
                },
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("expires").is_none());
        assert_eq!(json["files"][0]["content"]["format"], "text");
        assert_eq!(json["files"][0]["content"]["value"], "hello");
    }

    #[test]
    fn response_parses() {
        let ok: PasteResponse =
            serde_json::from_str(r#"{"status":"success","result":{"id":"abc123"}}"#).unwrap();
        assert_eq!(ok.result.unwrap().id, "abc123");

        let err: PasteResponse =
            serde_json::from_str(r#"{"status":"error","error":"bad","message":"nope"}"#).unwrap();
        assert!(err.result.is_none());
        assert_eq!(err.message.as_deref(), Some("nope"));
    }

    #[tokio::test]
    async fn unreachable_service_is_upload_failure() {
        let client = PasteGgClient::new(&PasteServiceConfig {
            api_url: "http://127.0.0.1:1".into(),
            ..Default::default()
        });
        let err = client.upload("text", 1).await.unwrap_err();
        assert!(matches!(err, MutatorError::UploadFailed(_)));
    }
}
