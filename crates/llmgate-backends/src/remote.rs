//! Remote call helpers: GET, JSON POST and multipart POST against third-party APIs.
//!
//! A non-2xx answer is a normal [`RemoteCallResult`]; the caller inspects
//! `status_code` itself. [`RemoteError`] is reserved for calls that could not
//! be made at all. There is no retry at this layer.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use reqwest::header::HeaderMap;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use llmgate_core::BackendError;

// ─────────────────────────────────────────────
// Result / error types
// ─────────────────────────────────────────────

/// Outcome of one outbound call that reached the remote server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteCallResult {
    pub status_code: u16,
    pub body: String,
    pub headers: HashMap<String, String>,
}

impl RemoteCallResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP client could not be initialized: {0}")]
    Init(String),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not read {path} for upload: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<RemoteError> for BackendError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::File { .. } => BackendError::Staging(err.to_string()),
            RemoteError::Init(_) | RemoteError::Request { .. } => {
                BackendError::Transport(err.to_string())
            }
        }
    }
}

/// The file half of a multipart upload.
#[derive(Clone, Copy, Debug)]
pub struct FilePart<'a> {
    /// Form field carrying the file (e.g. `"file"`).
    pub field_name: &'a str,
    /// Local path the bytes are read from.
    pub path: &'a Path,
    /// File name announced to the remote side.
    pub file_name: &'a str,
}

// ─────────────────────────────────────────────
// RemoteClient
// ─────────────────────────────────────────────

/// Thin wrapper over a shared, connection-pooled `reqwest::Client`.
#[derive(Clone, Debug)]
pub struct RemoteClient {
    client: reqwest::Client,
}

impl RemoteClient {
    /// Build a client whose calls give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Init(e.to_string()))?;
        Ok(Self { client })
    }

    /// `GET url`.
    pub async fn get_json(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<RemoteCallResult, RemoteError> {
        debug!(url = %url, "GET");
        let result = self.client.get(url).headers(headers.clone()).send().await;
        Self::finish(url, result).await
    }

    /// `POST url` with a JSON body.
    pub async fn post_json(
        &self,
        url: &str,
        headers: &HeaderMap,
        body: &Value,
    ) -> Result<RemoteCallResult, RemoteError> {
        debug!(url = %url, "POST json");
        let result = self
            .client
            .post(url)
            .headers(headers.clone())
            .json(body)
            .send()
            .await;
        Self::finish(url, result).await
    }

    /// `POST url` as `multipart/form-data`: every `(name, value)` in `fields`
    /// as a text part, plus the file read from `file.path`.
    pub async fn post_multipart(
        &self,
        url: &str,
        headers: &HeaderMap,
        fields: &[(&str, &str)],
        file: FilePart<'_>,
    ) -> Result<RemoteCallResult, RemoteError> {
        let bytes = tokio::fs::read(file.path)
            .await
            .map_err(|source| RemoteError::File {
                path: file.path.display().to_string(),
                source,
            })?;

        debug!(
            url = %url,
            file = file.file_name,
            bytes = bytes.len(),
            "POST multipart"
        );

        let file_part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file.file_name.to_string())
            .mime_str("application/octet-stream")
            .map_err(|source| RemoteError::Request {
                url: url.to_string(),
                source,
            })?;

        let mut form = reqwest::multipart::Form::new();
        for (name, value) in fields {
            form = form.text(name.to_string(), value.to_string());
        }
        let form = form.part(file.field_name.to_string(), file_part);

        let result = self
            .client
            .post(url)
            .headers(headers.clone())
            .multipart(form)
            .send()
            .await;
        Self::finish(url, result).await
    }

    async fn finish(
        url: &str,
        result: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<RemoteCallResult, RemoteError> {
        let response = result.map_err(|source| {
            error!(url = %url, error = %source, "HTTP request failed");
            RemoteError::Request {
                url: url.to_string(),
                source,
            }
        })?;

        let status_code = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .text()
            .await
            .map_err(|source| RemoteError::Request {
                url: url.to_string(),
                source,
            })?;

        debug!(url = %url, status = status_code, bytes = body.len(), "response received");

        Ok(RemoteCallResult {
            status_code,
            body,
            headers,
        })
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> RemoteClient {
        RemoteClient::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_get_json_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header("x-test", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-request-id", "req-42")
                    .set_body_json(json!({"ok": true})),
            )
            .mount(&server)
            .await;

        let mut headers = HeaderMap::new();
        headers.insert("x-test", HeaderValue::from_static("1"));

        let result = client()
            .get_json(&format!("{}/ping", server.uri()), &headers)
            .await
            .unwrap();

        assert!(result.is_success());
        assert_eq!(result.json().unwrap()["ok"], true);
        assert_eq!(result.headers.get("x-request-id").map(String::as_str), Some("req-42"));
    }

    #[tokio::test]
    async fn test_non_2xx_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let result = client()
            .get_json(&server.uri(), &HeaderMap::new())
            .await
            .unwrap();

        assert_eq!(result.status_code, 503);
        assert!(!result.is_success());
        assert_eq!(result.body, "busy");
    }

    #[tokio::test]
    async fn test_post_json_sends_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/threads"))
            .and(body_json(json!({"messages": []})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "thread_1"})))
            .expect(1)
            .mount(&server)
            .await;

        let result = client()
            .post_json(
                &format!("{}/threads", server.uri()),
                &HeaderMap::new(),
                &json!({"messages": []}),
            )
            .await
            .unwrap();

        assert_eq!(result.json().unwrap()["id"], "thread_1");
    }

    #[tokio::test]
    async fn test_post_multipart_sends_fields_and_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files"))
            .and(body_string_contains("assistants"))
            .and(body_string_contains("report.pdf"))
            .and(body_string_contains("%PDF-1.4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "file-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("1234.pdf");
        std::fs::write(&staged, b"%PDF-1.4 test").unwrap();

        let result = client()
            .post_multipart(
                &format!("{}/files", server.uri()),
                &HeaderMap::new(),
                &[("purpose", "assistants")],
                FilePart {
                    field_name: "file",
                    path: &staged,
                    file_name: "report.pdf",
                },
            )
            .await
            .unwrap();

        assert_eq!(result.status_code, 200);
        assert_eq!(result.json().unwrap()["id"], "file-1");
    }

    #[tokio::test]
    async fn test_post_multipart_missing_file() {
        let err = client()
            .post_multipart(
                "http://127.0.0.1:1/files",
                &HeaderMap::new(),
                &[],
                FilePart {
                    field_name: "file",
                    path: Path::new("/nonexistent/staged.pdf"),
                    file_name: "staged.pdf",
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::File { .. }));

        let err = BackendError::from(err);
        assert!(matches!(err, BackendError::Staging(_)));
        assert!(!crate::upstream::is_transient(&err));
    }

    #[tokio::test]
    async fn test_connection_refused_is_error() {
        // Point to a port that's not listening
        let err = client()
            .get_json("http://127.0.0.1:1/nothing", &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Request { .. }));

        let backend_err: BackendError = err.into();
        assert_eq!(backend_err.code(), 500);
    }
}
