use crate::backend::{AuthProvider, Backend, ObjectStore, UploadError};
use crate::types::{SelectedFile, UploadStatus, UserId};
use std::sync::Arc;

/// Storage key for an uploaded file: `{prefix}/{user}/{file_name}`, or
/// `{user}/{file_name}` when the prefix is empty.
pub fn object_key(prefix: &str, user: &UserId, file_name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{}/{}", user, file_name)
    } else {
        format!("{}/{}/{}", prefix, user, file_name)
    }
}

/// File picker selection and status of the document uploader
pub struct UploadFlow {
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn ObjectStore>,
    prefix: String,
    selected: Option<SelectedFile>,
    status: UploadStatus,
}

impl UploadFlow {
    /// Identity goes through the backend's session, so uploads and the chat
    /// share one signed-in user.
    pub fn new(backend: &Backend) -> Self {
        Self::with_collaborators(
            backend.session.clone(),
            backend.store.clone(),
            backend.config.upload_prefix.clone(),
        )
    }

    pub fn with_collaborators(
        auth: Arc<dyn AuthProvider>,
        store: Arc<dyn ObjectStore>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            store,
            prefix: prefix.into(),
            selected: None,
            status: UploadStatus::Idle,
        }
    }

    pub fn status(&self) -> &UploadStatus {
        &self.status
    }

    pub fn selected(&self) -> Option<&SelectedFile> {
        self.selected.as_ref()
    }

    /// Remember the picked file. Type and size are not checked.
    pub fn select_file(&mut self, file: SelectedFile) {
        self.selected = Some(file);
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Start an upload of the selected file.
    ///
    /// Sets the status synchronously: `NoFileSelected` (and returns `None`)
    /// when nothing is picked, `Uploading` otherwise. The returned job does
    /// the network work and its result goes back through [`Self::finish`].
    pub fn begin_upload(&mut self) -> Option<UploadJob> {
        let Some(file) = self.selected.clone() else {
            self.status = UploadStatus::NoFileSelected;
            return None;
        };

        self.status = UploadStatus::Uploading;
        Some(UploadJob {
            auth: self.auth.clone(),
            store: self.store.clone(),
            prefix: self.prefix.clone(),
            file,
        })
    }

    pub fn finish(&mut self, status: UploadStatus) {
        self.status = status;
    }

    /// Run a whole upload in place and return the final status
    pub async fn submit_upload(&mut self) -> &UploadStatus {
        if let Some(job) = self.begin_upload() {
            let status = job.run().await;
            self.finish(status);
        }
        &self.status
    }
}

/// One upload attempt, detached from the flow so it can run in a task.
pub struct UploadJob {
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn ObjectStore>,
    prefix: String,
    file: SelectedFile,
}

impl UploadJob {
    pub fn file_name(&self) -> &str {
        &self.file.name
    }

    /// Identity, write, then URL lookup. Any failure ends the attempt with
    /// a generic failure status; the cause only goes to the log.
    pub async fn run(self) -> UploadStatus {
        let file_name = self.file.name.clone();
        match self.execute().await {
            Ok(url) => {
                tracing::info!(file = %file_name, url = %url, "upload finished");
                UploadStatus::Success(url)
            }
            Err(err) => {
                tracing::error!(file = %file_name, error = %err, "Error uploading file");
                UploadStatus::Failure
            }
        }
    }

    async fn execute(self) -> Result<String, UploadError> {
        let user = self.auth.ensure_anonymous_identity().await?;
        let key = object_key(&self.prefix, &user, &self.file.name);
        tracing::debug!(key = %key, bytes = self.file.bytes.len(), "writing object");

        let handle = self.store.write(&key, self.file.bytes).await?;
        let url = self.store.public_url(&handle).await?;
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryAuth, MemoryStore};

    #[test]
    fn test_object_key_with_prefix() {
        let user = UserId::new("u1");
        assert_eq!(object_key("documents", &user, "a.pdf"), "documents/u1/a.pdf");
        assert_eq!(object_key("/documents/", &user, "a.pdf"), "documents/u1/a.pdf");
    }

    #[test]
    fn test_object_key_without_prefix() {
        let user = UserId::new("u1");
        assert_eq!(object_key("", &user, "a.pdf"), "u1/a.pdf");
    }

    #[test]
    fn test_begin_without_file_sets_no_file_selected() {
        let mut flow = UploadFlow::with_collaborators(
            Arc::new(MemoryAuth::new()),
            Arc::new(MemoryStore::new()),
            "documents",
        );
        assert_eq!(flow.status(), &UploadStatus::Idle);
        assert!(flow.begin_upload().is_none());
        assert_eq!(flow.status(), &UploadStatus::NoFileSelected);
    }

    #[test]
    fn test_begin_with_file_is_uploading_immediately() {
        let mut flow = UploadFlow::with_collaborators(
            Arc::new(MemoryAuth::new()),
            Arc::new(MemoryStore::new()),
            "documents",
        );
        flow.select_file(SelectedFile::new("report.pdf", b"pdf".to_vec()));

        let job = flow.begin_upload().expect("job");
        assert_eq!(job.file_name(), "report.pdf");
        assert_eq!(flow.status(), &UploadStatus::Uploading);
    }
}
