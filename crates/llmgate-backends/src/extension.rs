//! File extension policy: per-backend allow-lists and the rejection message.

use llmgate_core::{AttachmentDescriptor, BackendError};
use tracing::warn;

/// Extensions the assistant file-search tooling accepts.
pub const ASSISTANT_EXTENSIONS: &[&str] = &[
    "c", "cpp", "css", "csv", "doc", "docx", "gif", "go", "html", "java", "jpeg", "jpg", "js",
    "json", "md", "pdf", "php", "pkl", "png", "pptx", "py", "rb", "tar", "tex", "ts", "txt",
    "webp", "xlsx", "xml", "zip",
];

/// Extensions treated as images when deciding how an attachment is referenced.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// The substring after the last `.`, lower-cased; empty when there is no `.`.
pub fn file_extension(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

fn normalize(extension: &str) -> String {
    extension.trim_start_matches('.').to_lowercase()
}

/// Case-insensitive, dot-stripped membership test.
pub fn is_supported<S: AsRef<str>>(extension: &str, allowed: &[S]) -> bool {
    let wanted = normalize(extension);
    allowed.iter().any(|a| normalize(a.as_ref()) == wanted)
}

/// Whether a file name carries one of the [`IMAGE_EXTENSIONS`].
pub fn is_image_filename(filename: &str) -> bool {
    is_supported(&file_extension(filename), IMAGE_EXTENSIONS)
}

/// Rejection text naming the bad extension and every allowed one, in allow-list order.
pub fn format_rejection<S: AsRef<str>>(extension: &str, allowed: &[S]) -> String {
    let mut msg = format!(
        "Upload failed because the file format \".{}\" is not allowed.",
        normalize(extension)
    );
    if allowed.is_empty() {
        msg.push_str(" This model does not accept file attachments.");
        return msg;
    }

    let listed: Vec<String> = allowed
        .iter()
        .map(|a| format!("\".{}\"", normalize(a.as_ref())))
        .collect();
    msg.push_str(" Please use one of the supported file extensions: ");
    msg.push_str(&listed.join(", "));
    msg
}

// ─────────────────────────────────────────────
// ExtensionPolicy
// ─────────────────────────────────────────────

/// An ordered allow-list bound to one backend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtensionPolicy {
    allowed: Vec<String>,
}

impl ExtensionPolicy {
    pub fn new<S: AsRef<str>>(allowed: &[S]) -> Self {
        Self {
            allowed: allowed.iter().map(|a| normalize(a.as_ref())).collect(),
        }
    }

    /// Policy that rejects every attachment.
    pub fn deny_all() -> Self {
        Self::default()
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    /// Check a single file name.
    pub fn check(&self, filename: &str) -> Result<(), BackendError> {
        let extension = file_extension(filename);
        if is_supported(&extension, &self.allowed) {
            return Ok(());
        }
        let message = format_rejection(&extension, &self.allowed);
        warn!(file = filename, extension = %extension, "attachment rejected");
        Err(BackendError::UnsupportedExtension { extension, message })
    }

    /// Check every attachment; stops at the first violation.
    pub fn check_all(&self, attachments: &[AttachmentDescriptor]) -> Result<(), BackendError> {
        attachments.iter().try_for_each(|a| self.check(a.filename()))
    }
}
