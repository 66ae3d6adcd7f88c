//! Google Drive publishing.
//!
//! `RemoteStore` is the thin seam over the Drive v3 REST surface;
//! `Publisher` layers get-or-create folder memoization on top. Folder
//! creation is serialized behind one lock so the same missing name is never
//! created twice by concurrent callers.

use crate::error::{DatasetError, Result};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{error, info};

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const DRIVE_UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/drive/v3/files?uploadType=resumable";
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Exact-name folder lookup under the given parent.
    async fn find_folder(&self, name: &str, parent_id: &str) -> Result<Option<String>>;
    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<String>;
    async fn upload_file(&self, local_path: &Path, folder_id: &str) -> Result<String>;
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
}

/// Drive v3 REST client authenticated with a bearer token.
pub struct DriveStore {
    http: reqwest::Client,
    token: String,
}

impl DriveStore {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
        }
    }
}

/// Drive query terms are single-quoted; a literal quote in the category
/// name must be backslash-escaped or the query is malformed.
fn folder_query(name: &str, parent_id: &str) -> String {
    let escaped = name.replace('\'', "\\'");
    format!("name='{escaped}' and mimeType='{FOLDER_MIME_TYPE}' and '{parent_id}' in parents")
}

impl RemoteStore for DriveStore {
    async fn find_folder(&self, name: &str, parent_id: &str) -> Result<Option<String>> {
        let query = folder_query(name, parent_id);
        let response = self
            .http
            .get(DRIVE_FILES_URL)
            .bearer_auth(&self.token)
            .query(&[
                ("q", query.as_str()),
                ("spaces", "drive"),
                ("fields", "files(id, name)"),
                ("pageSize", "10"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DatasetError::ApiCall(format!(
                "Drive folder lookup returned status {status}"
            )));
        }

        let list: FileList = response.json().await?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<String> {
        let metadata = json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
            "parents": [parent_id],
        });
        let response = self
            .http
            .post(DRIVE_FILES_URL)
            .bearer_auth(&self.token)
            .query(&[("fields", "id")])
            .json(&metadata)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DatasetError::ApiCall(format!(
                "Drive folder create returned status {status}"
            )));
        }

        let file: DriveFile = response.json().await?;
        Ok(file.id)
    }

    async fn upload_file(&self, local_path: &Path, folder_id: &str) -> Result<String> {
        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let metadata = json!({
            "name": name,
            "parents": [folder_id],
        });

        // Resumable upload: session handshake, then a single content PUT.
        let response = self
            .http
            .post(DRIVE_UPLOAD_URL)
            .bearer_auth(&self.token)
            .json(&metadata)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DatasetError::ApiCall(format!(
                "Drive upload session returned status {status}"
            )));
        }
        let session_url = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                DatasetError::ApiCall("Drive upload session missing Location header".into())
            })?;

        let bytes = tokio::fs::read(local_path).await?;
        let response = self
            .http
            .put(&session_url)
            .bearer_auth(&self.token)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DatasetError::ApiCall(format!(
                "Drive upload returned status {status}"
            )));
        }

        let file: DriveFile = response.json().await?;
        Ok(file.id)
    }
}

/// Publishes kept images into category folders under one parent folder.
pub struct Publisher<S> {
    store: S,
    parent_id: String,
    folder_ids: Mutex<HashMap<String, String>>,
}

impl<S: RemoteStore> Publisher<S> {
    pub fn new(store: S, parent_id: impl Into<String>) -> Self {
        Self {
            store,
            parent_id: parent_id.into(),
            folder_ids: Mutex::new(HashMap::new()),
        }
    }

    /// Get-or-create the folder for one category name. The lock is held
    /// across lookup and creation, so at most one creation happens per name
    /// within this process. Failures log and collapse to `None`.
    pub async fn ensure_folder(&self, name: &str) -> Option<String> {
        let mut folder_ids = self.folder_ids.lock().await;
        if let Some(id) = folder_ids.get(name) {
            return Some(id.clone());
        }

        match self.get_or_create(name).await {
            Ok(id) => {
                folder_ids.insert(name.to_string(), id.clone());
                Some(id)
            }
            Err(e) => {
                error!("error in creating/getting folder '{name}': {e}");
                None
            }
        }
    }

    async fn get_or_create(&self, name: &str) -> Result<String> {
        if let Some(id) = self.store.find_folder(name, &self.parent_id).await? {
            info!("folder '{name}' exists with id {id}");
            return Ok(id);
        }
        info!("creating folder '{name}'");
        self.store.create_folder(name, &self.parent_id).await
    }

    /// Upload one kept image into a category folder. Failures log and
    /// collapse to `None`; the caller keeps going.
    pub async fn upload(&self, local_path: &Path, folder_id: &str) -> Option<String> {
        match self.store.upload_file(local_path, folder_id).await {
            Ok(id) => {
                info!("file uploaded successfully: {}", local_path.display());
                Some(id)
            }
            Err(e) => {
                error!("failed to upload file {}: {e}", local_path.display());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakeStore {
        folders: StdMutex<HashMap<(String, String), String>>,
        creations: AtomicUsize,
        fail_lookup: bool,
    }

    impl FakeStore {
        fn with_folder(name: &str, parent: &str, id: &str) -> Self {
            let store = Self::default();
            store
                .folders
                .lock()
                .unwrap()
                .insert((parent.to_string(), name.to_string()), id.to_string());
            store
        }
    }

    impl RemoteStore for FakeStore {
        async fn find_folder(&self, name: &str, parent_id: &str) -> Result<Option<String>> {
            if self.fail_lookup {
                return Err(DatasetError::ApiCall("lookup unavailable".into()));
            }
            Ok(self
                .folders
                .lock()
                .unwrap()
                .get(&(parent_id.to_string(), name.to_string()))
                .cloned())
        }

        async fn create_folder(&self, name: &str, parent_id: &str) -> Result<String> {
            let n = self.creations.fetch_add(1, Ordering::SeqCst);
            let id = format!("folder-{n}");
            self.folders
                .lock()
                .unwrap()
                .insert((parent_id.to_string(), name.to_string()), id.clone());
            Ok(id)
        }

        async fn upload_file(&self, _local_path: &Path, folder_id: &str) -> Result<String> {
            Ok(format!("file-in-{folder_id}"))
        }
    }

    #[test]
    fn test_folder_query_escapes_embedded_quotes() {
        let query = folder_query("Deficiencia d'Hierro", "root");
        assert!(query.contains(r"name='Deficiencia d\'Hierro'"));
        assert!(query.contains("'root' in parents"));
    }

    #[test]
    fn test_folder_query_plain_name_unchanged() {
        let query = folder_query("Insecto", "root");
        assert!(query.starts_with("name='Insecto' and "));
    }

    #[tokio::test]
    async fn test_ensure_folder_returns_existing_id_without_create() {
        let publisher = Publisher::new(FakeStore::with_folder("Insecto", "root", "abc"), "root");
        assert_eq!(publisher.ensure_folder("Insecto").await.as_deref(), Some("abc"));
        assert_eq!(publisher.ensure_folder("Insecto").await.as_deref(), Some("abc"));
        assert_eq!(publisher.store.creations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ensure_folder_creates_once_for_missing_name() {
        let publisher = Publisher::new(FakeStore::default(), "root");
        let first = publisher.ensure_folder("Ácaros").await.unwrap();
        let second = publisher.ensure_folder("Ácaros").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(publisher.store.creations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_ensure_folder_single_creation() {
        let publisher = Publisher::new(FakeStore::default(), "root");
        let (a, b) = tokio::join!(
            publisher.ensure_folder("Hongos"),
            publisher.ensure_folder("Hongos")
        );
        assert_eq!(a, b);
        assert_eq!(publisher.store.creations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_names_get_distinct_folders() {
        let publisher = Publisher::new(FakeStore::default(), "root");
        let a = publisher.ensure_folder("Hongos").await.unwrap();
        let b = publisher.ensure_folder("Insecto").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(publisher.store.creations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_ensure_folder_failure_is_none() {
        let store = FakeStore {
            fail_lookup: true,
            ..FakeStore::default()
        };
        let publisher = Publisher::new(store, "root");
        assert!(publisher.ensure_folder("Insecto").await.is_none());
    }

    #[tokio::test]
    async fn test_upload_reports_remote_id() {
        let publisher = Publisher::new(FakeStore::default(), "root");
        let id = publisher.upload(Path::new("a.jpg"), "folder-0").await;
        assert_eq!(id.as_deref(), Some("file-in-folder-0"));
    }
}
