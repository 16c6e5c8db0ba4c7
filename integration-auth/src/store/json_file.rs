//! Identity store backed by a single JSON document on disk.
//!
//! Layout: `{ "<integration_type>": [ { "user_id", "org_id", "integration_user_id" } ] }`.
//! Every call reads the whole document; writes go to a sibling temp file that is
//! then renamed over the original, and all access is serialized through one lock.
//! A document that is not valid JSON is moved aside to `<path>.corrupt` and the
//! store starts over empty.

use std::collections::BTreeMap;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{IdentityLink, IdentityStore};
use crate::error::{store_error, Error, StoreErrorKind};

type Document = BTreeMap<String, Vec<IdentityLink>>;

pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Create a store for the document at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<Document, Error> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Document::new()),
            Err(e) => return Err(store_error(StoreErrorKind::Io, e)),
        };

        if raw.trim().is_empty() {
            return Ok(Document::new());
        }

        match serde_json::from_str(&raw) {
            Ok(document) => Ok(document),
            Err(e) => {
                let corrupt_path = self.sibling_path(".corrupt");
                warn!(
                    "Identity store {} is not valid JSON ({}); moving it to {} and starting empty",
                    self.path.display(),
                    e,
                    corrupt_path.display()
                );
                tokio::fs::rename(&self.path, &corrupt_path)
                    .await
                    .map_err(|e| store_error(StoreErrorKind::Corrupt, e))?;
                Ok(Document::new())
            }
        }
    }

    fn sibling_path(&self, suffix: &str) -> PathBuf {
        let mut path = self.path.clone().into_os_string();
        path.push(suffix);
        PathBuf::from(path)
    }

    async fn write_document(&self, document: &Document) -> Result<(), Error> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| store_error(StoreErrorKind::Io, e))?;
        }

        let raw = serde_json::to_string_pretty(document)
            .map_err(|e| store_error(StoreErrorKind::Serialization, e))?;

        let tmp_path = self.sibling_path(".tmp");

        tokio::fs::write(&tmp_path, raw)
            .await
            .map_err(|e| store_error(StoreErrorKind::Io, e))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| store_error(StoreErrorKind::Io, e))
    }
}

#[async_trait]
impl IdentityStore for JsonFileStore {
    async fn upsert_identity(
        &self,
        integration_type: &str,
        user_id: &str,
        org_id: &str,
        integration_user_id: &str,
    ) -> Result<(), Error> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;

        let links = document.entry(integration_type.to_string()).or_default();
        match links
            .iter_mut()
            .find(|link| link.user_id == user_id && link.org_id == org_id)
        {
            Some(link) => link.integration_user_id = integration_user_id.to_string(),
            None => links.push(IdentityLink {
                user_id: user_id.to_string(),
                org_id: org_id.to_string(),
                integration_user_id: integration_user_id.to_string(),
            }),
        }

        self.write_document(&document).await?;
        debug!(
            "Linked {} identity for user {} in org {}",
            integration_type, user_id, org_id
        );
        Ok(())
    }

    async fn get_provider_user_id(
        &self,
        integration_type: &str,
        user_id: &str,
        org_id: &str,
    ) -> Result<Option<String>, Error> {
        let _guard = self.lock.lock().await;
        let document = self.read_document().await?;

        Ok(document.get(integration_type).and_then(|links| {
            links
                .iter()
                .find(|link| link.user_id == user_id && link.org_id == org_id)
                .map(|link| link.integration_user_id.clone())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> JsonFileStore {
        JsonFileStore::new(dir.path().join("nested").join("db.json"))
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let id = store
            .get_provider_user_id("hubspot", "user1", "org1")
            .await
            .unwrap();
        assert!(id.is_none());
    }

    #[tokio::test]
    async fn test_upsert_creates_file_and_updates_in_place() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store
            .upsert_identity("hubspot", "user1", "org1", "111")
            .await
            .unwrap();
        store
            .upsert_identity("hubspot", "user2", "org1", "333")
            .await
            .unwrap();
        store
            .upsert_identity("hubspot", "user1", "org1", "222")
            .await
            .unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let document: Document = serde_json::from_str(&raw).unwrap();
        let links = &document["hubspot"];
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].integration_user_id, "222");
        assert_eq!(links[1].integration_user_id, "333");
    }

    #[tokio::test]
    async fn test_links_survive_reopen() {
        let dir = TempDir::new().unwrap();
        store_in(&dir)
            .upsert_identity("hubspot", "user1", "org1", "111")
            .await
            .unwrap();

        let reopened = store_in(&dir);
        let id = reopened
            .get_provider_user_id("hubspot", "user1", "org1")
            .await
            .unwrap();
        assert_eq!(id, Some("111".to_string()));
    }

    #[tokio::test]
    async fn test_empty_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, "").unwrap();

        let store = JsonFileStore::new(&path);
        store
            .upsert_identity("hubspot", "user1", "org1", "111")
            .await
            .unwrap();
        assert_eq!(
            store
                .get_provider_user_id("hubspot", "user1", "org1")
                .await
                .unwrap(),
            Some("111".to_string())
        );
    }

    #[tokio::test]
    async fn test_corrupt_file_is_moved_aside_and_store_recovers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::new(&path);
        store
            .upsert_identity("hubspot", "user1", "org1", "111")
            .await
            .unwrap();
        store
            .upsert_identity("hubspot", "user2", "org1", "222")
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("db.json.corrupt")).unwrap(),
            "{ not json"
        );
        assert_eq!(
            store
                .get_provider_user_id("hubspot", "user1", "org1")
                .await
                .unwrap(),
            Some("111".to_string())
        );
        assert_eq!(
            store
                .get_provider_user_id("hubspot", "user2", "org1")
                .await
                .unwrap(),
            Some("222".to_string())
        );
    }
}
