use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};

/// URL prefix under which stored objects are served.
pub const PUBLIC_PREFIX: &str = "/uploads";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("An object named {0} already exists")]
    AlreadyExists(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Folders of the public image bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Folder {
    Campaigns,
    DoctorImages,
    Posts,
}

impl Folder {
    pub fn as_str(self) -> &'static str {
        match self {
            Folder::Campaigns => "campaigns",
            Folder::DoctorImages => "doctorImages",
            Folder::Posts => "post",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub public_url: String,
}

/// Public image bucket kept on local disk.
///
/// Each object lives at `{root}/{folder}/{name}` and is served read-only at
/// `/uploads/{folder}/{name}`.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        for folder in [Folder::Campaigns, Folder::DoctorImages, Folder::Posts] {
            fs::create_dir_all(root.join(folder.as_str())).await?;
        }
        log::info!("Upload storage directory: {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes a new object. Existing objects are never overwritten.
    pub async fn put(
        &self,
        folder: Folder,
        name: &str,
        data: &[u8],
    ) -> Result<StoredObject, StorageError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(StorageError::InvalidKey(name.to_owned()));
        }
        let key = format!("{}/{}", folder.as_str(), name);
        let path = self.root.join(folder.as_str()).join(name);

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(key));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(data).await?;
        file.flush().await?;

        log::info!("Stored object {} ({} bytes)", key, data.len());
        Ok(StoredObject {
            public_url: public_url(&key),
            key,
        })
    }

    /// Deletes an object. A missing object is not an error.
    pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
        if key.split('/').any(|part| part.is_empty() || part == "..") {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        match fs::remove_file(self.root.join(key)).await {
            Ok(()) => {
                log::info!("Deleted object {}", key);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Object {} already gone", key);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Removes the object behind a public link, logging instead of failing.
    pub async fn remove_linked(&self, link: &str) {
        let Some(key) = key_for_url(link) else {
            log::warn!("Not a stored object link: {}", link);
            return;
        };
        if let Err(e) = self.remove(key).await {
            log::warn!("Failed to delete object {}: {}", key, e);
        }
    }
}

pub fn public_url(key: &str) -> String {
    format!("{PUBLIC_PREFIX}/{key}")
}

pub fn key_for_url(link: &str) -> Option<&str> {
    link.strip_prefix(PUBLIC_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|key| !key.is_empty())
}
