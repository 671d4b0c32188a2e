//! Rewrites client message references into remote file references.
//!
//! Clients point at staged attachments by correlation id:
//!
//! - content parts: `{"type":"image_file","image_file":{"uuid":..,"original_filename":..}}`
//!   become `{"type":"image_file","image_file":{"file_id":..}}`
//! - message `attachments`: `{"uuid":..,"original_filename":..}` become
//!   `{"file_id":..,"tools":[{"type":"file_search"}]}` for documents and are
//!   dropped for images, which travel as content parts instead.
//!
//! Each correlation id is uploaded at most once per request.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use llmgate_core::BackendError;

use super::api::AssistantApi;
use crate::extension::is_image_filename;
use crate::staging::ScratchSpace;
use crate::upstream::is_transient;

/// Uploads staged attachments on demand and remembers what it uploaded.
pub(crate) struct Uploader<'a> {
    api: &'a dyn AssistantApi,
    scratch: &'a mut ScratchSpace,
    uploaded: HashMap<String, String>,
    produced: Vec<String>,
    attempts: u32,
    retry_delay: Duration,
}

impl<'a> Uploader<'a> {
    pub fn new(
        api: &'a dyn AssistantApi,
        scratch: &'a mut ScratchSpace,
        attempts: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            api,
            scratch,
            uploaded: HashMap::new(),
            produced: Vec::new(),
            attempts: attempts.max(1),
            retry_delay,
        }
    }

    /// Remote file ids of every fresh upload, in upload order.
    pub fn into_produced(self) -> Vec<String> {
        self.produced
    }

    /// Remote id for `correlation_id`, uploading it if this is the first reference.
    async fn file_id_for(
        &mut self,
        correlation_id: &str,
        original_filename: &str,
    ) -> Result<String, BackendError> {
        if let Some(id) = self.uploaded.get(correlation_id) {
            debug!(file = correlation_id, file_id = %id, "reusing uploaded file");
            return Ok(id.clone());
        }

        let path = self
            .scratch
            .path_for(correlation_id)
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                BackendError::InvalidRequest(format!(
                    "Message references attachment '{correlation_id}', which was not sent with the request."
                ))
            })?;

        let upload_name = if original_filename.is_empty() {
            correlation_id
        } else {
            original_filename
        };
        let outcome = self.upload_with_retry(&path, upload_name).await;
        self.scratch.release(correlation_id).await;

        let id = outcome?;
        if id.is_empty() {
            return Err(BackendError::Protocol(
                "File upload succeeded but returned no file id.".to_string(),
            ));
        }

        info!(file = correlation_id, file_id = %id, "uploaded attachment");
        self.uploaded.insert(correlation_id.to_string(), id.clone());
        self.produced.push(id.clone());
        Ok(id)
    }

    async fn upload_with_retry(
        &self,
        path: &Path,
        file_name: &str,
    ) -> Result<String, BackendError> {
        let mut attempt = 1;
        loop {
            match self.api.upload_file(path, file_name).await {
                Ok(id) => return Ok(id),
                Err(e) if attempt < self.attempts && is_transient(&e) => {
                    warn!(file = file_name, attempt, error = %e, "upload failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn str_field<'v>(value: &'v Value, key: &str) -> Option<&'v str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Rewrite every attachment reference in `messages`, uploading as needed.
pub(crate) async fn transform_messages(
    messages: &mut [Value],
    uploader: &mut Uploader<'_>,
) -> Result<(), BackendError> {
    for message in messages.iter_mut() {
        if let Some(parts) = message.get_mut("content").and_then(Value::as_array_mut) {
            for part in parts.iter_mut() {
                if part.get("type").and_then(Value::as_str) != Some("image_file") {
                    continue;
                }
                let Some(image) = part.get("image_file") else {
                    continue;
                };
                let Some(uuid) = str_field(image, "uuid").map(String::from) else {
                    continue;
                };
                let original = str_field(image, "original_filename")
                    .unwrap_or_default()
                    .to_string();

                let file_id = uploader.file_id_for(&uuid, &original).await?;
                part["image_file"] = json!({ "file_id": file_id });
            }
        }

        if let Some(attachments) = message
            .get_mut("attachments")
            .and_then(Value::as_array_mut)
        {
            let mut rewritten = Vec::with_capacity(attachments.len());
            for attachment in attachments.iter() {
                if attachment.get("file_id").is_some() {
                    rewritten.push(attachment.clone());
                    continue;
                }
                let Some(uuid) = str_field(attachment, "uuid") else {
                    warn!("dropping attachment reference without uuid");
                    continue;
                };
                let original = str_field(attachment, "original_filename").unwrap_or_default();

                let file_id = uploader.file_id_for(uuid, original).await?;
                let name = if original.is_empty() { uuid } else { original };
                if is_image_filename(name) {
                    debug!(file = uuid, "image attachment travels as content part");
                    continue;
                }
                rewritten.push(json!({
                    "file_id": file_id,
                    "tools": [{ "type": "file_search" }],
                }));
            }
            *attachments = rewritten;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::fake::FakeApi;
    use llmgate_core::AttachmentDescriptor;
    use std::sync::atomic::Ordering;

    async fn staged(root: &Path, names: &[&str]) -> ScratchSpace {
        let attachments: Vec<AttachmentDescriptor> = names
            .iter()
            .map(|n| {
                AttachmentDescriptor::new(*n, n.as_bytes().to_vec(), "application/octet-stream")
            })
            .collect();
        ScratchSpace::stage(root, &attachments).await.unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_reference_uploads_once() {
        let root = tempfile::tempdir().unwrap();
        let mut scratch = staged(root.path(), &["111.png"]).await;
        let api = FakeApi::default();

        let mut messages = vec![
            json!({"role": "user", "content": [
                {"type": "text", "text": "look"},
                {"type": "image_file", "image_file": {"uuid": "111.png", "original_filename": "cat.png"}}
            ]}),
            json!({"role": "user", "content": [
                {"type": "image_file", "image_file": {"uuid": "111.png", "original_filename": "cat.png"}}
            ]}),
        ];

        let mut uploader = Uploader::new(&api, &mut scratch, 1, Duration::ZERO);
        transform_messages(&mut messages, &mut uploader).await.unwrap();
        let produced = uploader.into_produced();

        assert_eq!(api.upload_count(), 1);
        assert_eq!(produced, vec!["file-1"]);
        assert_eq!(messages[0]["content"][1]["image_file"], json!({"file_id": "file-1"}));
        assert_eq!(messages[1]["content"][0]["image_file"], json!({"file_id": "file-1"}));
        // Text parts are untouched
        assert_eq!(messages[0]["content"][0]["text"], "look");
        // Upload used the user-facing name and the staged bytes
        let uploads = api.uploads.lock().unwrap();
        assert_eq!(uploads[0].0, "cat.png");
        assert_eq!(uploads[0].1, b"111.png");
        drop(uploads);
        // Staged file released after upload
        assert!(scratch.is_empty());
    }

    #[tokio::test]
    async fn test_attachments_rewritten_and_images_dropped() {
        let root = tempfile::tempdir().unwrap();
        let mut scratch = staged(root.path(), &["1.pdf", "2.jpg"]).await;
        let api = FakeApi::default();

        let mut messages = vec![json!({
            "role": "user",
            "content": "summarize",
            "attachments": [
                {"uuid": "1.pdf", "original_filename": "report.pdf"},
                {"uuid": "2.jpg", "original_filename": "chart.jpg"}
            ]
        })];

        let mut uploader = Uploader::new(&api, &mut scratch, 1, Duration::ZERO);
        transform_messages(&mut messages, &mut uploader).await.unwrap();
        let produced = uploader.into_produced();

        assert_eq!(
            messages[0]["attachments"],
            json!([{"file_id": "file-1", "tools": [{"type": "file_search"}]}])
        );
        assert_eq!(produced, vec!["file-1", "file-2"]);
        assert_eq!(messages[0]["content"], "summarize");
    }

    #[tokio::test]
    async fn test_already_uploaded_document_is_reused() {
        let root = tempfile::tempdir().unwrap();
        let mut scratch = staged(root.path(), &["5.txt"]).await;
        let api = FakeApi::default();

        let mut messages = vec![
            json!({"role": "user", "attachments": [{"uuid": "5.txt", "original_filename": "a.txt"}]}),
            json!({"role": "user", "attachments": [{"uuid": "5.txt", "original_filename": "a.txt"}]}),
        ];

        let mut uploader = Uploader::new(&api, &mut scratch, 1, Duration::ZERO);
        transform_messages(&mut messages, &mut uploader).await.unwrap();

        assert_eq!(api.upload_count(), 1);
        assert_eq!(messages[0]["attachments"], messages[1]["attachments"]);
        assert_eq!(messages[1]["attachments"][0]["file_id"], "file-1");
    }

    #[tokio::test]
    async fn test_image_uploaded_as_content_then_dropped_from_attachments() {
        let root = tempfile::tempdir().unwrap();
        let mut scratch = staged(root.path(), &["9.webp"]).await;
        let api = FakeApi::default();

        let mut messages = vec![json!({
            "role": "user",
            "content": [{"type": "image_file", "image_file": {"uuid": "9.webp", "original_filename": "pic.webp"}}],
            "attachments": [{"uuid": "9.webp", "original_filename": "pic.webp"}]
        })];

        let mut uploader = Uploader::new(&api, &mut scratch, 1, Duration::ZERO);
        transform_messages(&mut messages, &mut uploader).await.unwrap();

        assert_eq!(api.upload_count(), 1);
        assert_eq!(messages[0]["attachments"], json!([]));
        assert_eq!(messages[0]["content"][0]["image_file"]["file_id"], "file-1");
    }

    #[tokio::test]
    async fn test_unknown_reference_is_client_error() {
        let root = tempfile::tempdir().unwrap();
        let mut scratch = staged(root.path(), &[]).await;
        let api = FakeApi::default();

        let mut messages = vec![json!({
            "role": "user",
            "attachments": [{"uuid": "404.pdf", "original_filename": "ghost.pdf"}]
        })];

        let mut uploader = Uploader::new(&api, &mut scratch, 1, Duration::ZERO);
        let err = transform_messages(&mut messages, &mut uploader)
            .await
            .unwrap_err();
        assert_eq!(err.code(), 400);
        assert!(err.to_string().contains("404.pdf"));
        assert_eq!(api.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_retried_on_transport_error() {
        let root = tempfile::tempdir().unwrap();
        let mut scratch = staged(root.path(), &["3.csv"]).await;
        let api = FakeApi {
            upload_failures: 2.into(),
            ..Default::default()
        };

        let mut messages = vec![json!({"attachments": [{"uuid": "3.csv", "original_filename": "d.csv"}]})];
        let mut uploader = Uploader::new(&api, &mut scratch, 3, Duration::ZERO);
        transform_messages(&mut messages, &mut uploader).await.unwrap();

        assert_eq!(api.upload_calls.load(Ordering::SeqCst), 3);
        assert_eq!(api.upload_count(), 1);
    }

    #[tokio::test]
    async fn test_upload_gives_up_and_releases_file() {
        let root = tempfile::tempdir().unwrap();
        let mut scratch = staged(root.path(), &["3.csv"]).await;
        let api = FakeApi {
            upload_failures: 10.into(),
            ..Default::default()
        };

        let mut messages = vec![json!({"attachments": [{"uuid": "3.csv", "original_filename": "d.csv"}]})];
        let mut uploader = Uploader::new(&api, &mut scratch, 2, Duration::ZERO);
        let err = transform_messages(&mut messages, &mut uploader)
            .await
            .unwrap_err();
        drop(uploader);

        assert_eq!(err.code(), 500);
        assert_eq!(api.upload_calls.load(Ordering::SeqCst), 2);
        assert!(scratch.is_empty());
    }

    #[tokio::test]
    async fn test_references_without_uuid_are_left_alone() {
        let root = tempfile::tempdir().unwrap();
        let mut scratch = staged(root.path(), &[]).await;
        let api = FakeApi::default();

        let mut messages = vec![json!({
            "role": "user",
            "content": [{"type": "image_file", "image_file": {"file_id": "file-existing"}}],
            "attachments": [{"file_id": "file-doc", "tools": [{"type": "file_search"}]}, {"original_filename": "x.pdf"}]
        })];

        let mut uploader = Uploader::new(&api, &mut scratch, 1, Duration::ZERO);
        transform_messages(&mut messages, &mut uploader).await.unwrap();

        assert_eq!(messages[0]["content"][0]["image_file"]["file_id"], "file-existing");
        assert_eq!(messages[0]["attachments"].as_array().unwrap().len(), 1);
        assert_eq!(api.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_uploads_carry_each_attachment_own_bytes() {
        let root = tempfile::tempdir().unwrap();
        let mut scratch = staged(root.path(), &["a b.txt", "a_b.txt"]).await;
        let api = FakeApi::default();

        let mut messages = vec![json!({
            "role": "user",
            "content": "compare",
            "attachments": [
                {"uuid": "a b.txt", "original_filename": "first.txt"},
                {"uuid": "a_b.txt", "original_filename": "second.txt"}
            ]
        })];
        let mut uploader = Uploader::new(&api, &mut scratch, 1, Duration::ZERO);
        transform_messages(&mut messages, &mut uploader).await.unwrap();

        let uploads = api.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0], ("first.txt".to_string(), b"a b.txt".to_vec()));
        assert_eq!(uploads[1], ("second.txt".to_string(), b"a_b.txt".to_vec()));
    }

    #[tokio::test]
    async fn test_unstructured_client_error_is_not_retried() {
        use crate::assistant::client::OpenAiAssistants;
        use crate::remote::RemoteClient;
        use llmgate_core::config::ProviderConfig;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files"))
            .respond_with(ResponseTemplate::new(400).set_body_string("<html>Bad Request</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let provider = ProviderConfig {
            api_key: "sk-test".into(),
            api_base: Some(server.uri()),
            extra_headers: None,
        };
        let api = OpenAiAssistants::new(
            &provider,
            "gpt4o",
            RemoteClient::new(Duration::from_secs(5)).unwrap(),
        )
        .unwrap();

        let root = tempfile::tempdir().unwrap();
        let mut scratch = staged(root.path(), &["5.pdf"]).await;
        let mut messages = vec![json!({"attachments": [{"uuid": "5.pdf", "original_filename": "r.pdf"}]})];
        let mut uploader = Uploader::new(&api, &mut scratch, 3, Duration::ZERO);
        let err = transform_messages(&mut messages, &mut uploader)
            .await
            .unwrap_err();
        drop(uploader);

        assert_eq!(err.code(), 500);
        assert!(err.to_string().contains("400"));
        assert!(scratch.is_empty());
        server.verify().await;
    }
}
