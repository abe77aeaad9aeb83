//! Per-client export directory holding generated and uploaded documents.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::AppError;
use crate::models::Client;
use crate::utils::filenames::client_dir_name;

#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn client_dir(&self, client: &Client) -> PathBuf {
        self.root.join(client_dir_name(
            client.id,
            client.first_name.as_deref(),
            client.last_name.as_deref(),
        ))
    }

    pub async fn exists(&self, client: &Client, name: &str) -> bool {
        tokio::fs::metadata(self.client_dir(client).join(name))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// `Ok(None)` when the file does not exist.
    pub async fn read(&self, client: &Client, name: &str) -> Result<Option<Vec<u8>>, AppError> {
        match tokio::fs::read(self.client_dir(client).join(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Reads the first of `names` that exists, returning its name too.
    pub async fn read_first(
        &self,
        client: &Client,
        names: &[String],
    ) -> Result<Option<(String, Vec<u8>)>, AppError> {
        for name in names {
            if let Some(bytes) = self.read(client, name).await? {
                return Ok(Some((name.clone(), bytes)));
            }
        }
        Ok(None)
    }

    pub async fn write(&self, client: &Client, name: &str, bytes: &[u8]) -> Result<PathBuf, AppError> {
        let dir = self.client_dir(client);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(name);
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "Document written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::dashboard_service::fixtures::client;

    #[tokio::test]
    async fn test_write_then_read_in_client_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(tmp.path());
        let mut c = client(7, "דנה כהן");
        c.first_name = Some("דנה".into());
        c.last_name = Some("כהן".into());

        assert!(!store.exists(&c, "b1_edited.pdf").await);
        assert_eq!(store.read(&c, "b1_edited.pdf").await.unwrap(), None);

        let path = store.write(&c, "b1_edited.pdf", b"%PDF-1.5").await.unwrap();
        assert_eq!(path, tmp.path().join("7_דנה_כהן").join("b1_edited.pdf"));
        assert!(store.exists(&c, "b1_edited.pdf").await);
        assert_eq!(store.read(&c, "b1_edited.pdf").await.unwrap().unwrap(), b"%PDF-1.5");
    }

    #[tokio::test]
    async fn test_read_first_prefers_earlier_names() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(tmp.path());
        let c = client(3, "x");

        let names = vec!["edited.pdf".to_string(), "auto.pdf".to_string()];
        assert!(store.read_first(&c, &names).await.unwrap().is_none());

        store.write(&c, "auto.pdf", b"auto").await.unwrap();
        let (name, _) = store.read_first(&c, &names).await.unwrap().unwrap();
        assert_eq!(name, "auto.pdf");

        store.write(&c, "edited.pdf", b"edited").await.unwrap();
        let (name, bytes) = store.read_first(&c, &names).await.unwrap().unwrap();
        assert_eq!(name, "edited.pdf");
        assert_eq!(bytes, b"edited");
    }
}
