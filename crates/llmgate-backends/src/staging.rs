//! Per-request scratch space for attachments waiting to be uploaded.
//!
//! Each request gets its own `<scratch root>/<uuid>/` directory, so
//! concurrent requests never collide even when clients reuse correlation ids.
//! Files are removed one by one as their upload step finishes, and the
//! directory itself is removed when the [`ScratchSpace`] is dropped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use llmgate_core::utils::safe_filename;
use llmgate_core::{AttachmentDescriptor, BackendError};

pub struct ScratchSpace {
    dir: PathBuf,
    staged: HashMap<String, PathBuf>,
}

impl ScratchSpace {
    /// Write every attachment under a fresh directory below `root`,
    /// keyed by its correlation id (the attachment's filename).
    ///
    /// On-disk names carry the attachment's position, so ids that sanitize to
    /// the same component stay apart. A repeated id keeps its first body.
    pub async fn stage(
        root: &Path,
        attachments: &[AttachmentDescriptor],
    ) -> Result<Self, BackendError> {
        let dir = root.join(uuid::Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&dir).await?;

        // From here on, Drop cleans up even if a write fails.
        let mut space = Self {
            dir,
            staged: HashMap::new(),
        };

        for (index, attachment) in attachments.iter().enumerate() {
            if space.staged.contains_key(attachment.filename()) {
                warn!(file = attachment.filename(), "duplicate attachment id, keeping the first");
                continue;
            }
            let name = format!("{index}-{}", safe_filename(attachment.filename()));
            let path = space.dir.join(name);
            tokio::fs::write(&path, attachment.body()).await?;
            debug!(
                file = attachment.filename(),
                bytes = attachment.body().len(),
                "staged attachment"
            );
            space.staged.insert(attachment.filename().to_string(), path);
        }

        Ok(space)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of a staged attachment that has not been released yet.
    pub fn path_for(&self, correlation_id: &str) -> Option<&Path> {
        self.staged.get(correlation_id).map(PathBuf::as_path)
    }

    /// Number of files still on disk.
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Delete a staged file once its upload step is over.
    pub async fn release(&mut self, correlation_id: &str) {
        if let Some(path) = self.staged.remove(correlation_id) {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "failed to remove staged file");
            }
        }
    }
}

impl Drop for ScratchSpace {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(dir = %self.dir.display(), error = %e, "failed to remove scratch dir");
            }
        }
    }
}
