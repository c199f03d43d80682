use async_trait::async_trait;
use log::{error, info};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaStoreError {
    #[error("duplicate")]
    Duplicate,
    #[error("not_found")]
    NotFound,
    #[error("other: {0}")]
    Other(String),
}

/// Content-addressed blob store for page images and post attachments.
/// Blobs are keyed by the lowercase hex SHA-256 of their bytes.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn save(&self, hash: &str, mime: &str, bytes: &[u8]) -> Result<(), MediaStoreError>;
    async fn load(&self, hash: &str) -> Result<(Vec<u8>, String), MediaStoreError>;
}

pub const ALLOWED_MIME: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp", "video/mp4", "video/webm"];

pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

pub fn sniff_mime(bytes: &[u8]) -> String {
    infer::get(bytes)
        .map(|t| t.mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".into())
}

fn is_hash(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}

// ---------------- Filesystem implementation ----------------
pub struct FsMediaStore {
    root: PathBuf,
    // distinguishes temp files of overlapping writes of the same blob
    next_tmp: AtomicU64,
}

impl FsMediaStore {
    pub async fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        info!("media store rooted at '{}'", root.display());
        Ok(Self { root, next_tmp: AtomicU64::new(0) })
    }

    fn path_for(&self, hash: &str) -> Result<PathBuf, MediaStoreError> {
        if !is_hash(hash) {
            return Err(MediaStoreError::NotFound);
        }
        Ok(self.root.join(&hash[0..2]).join(hash))
    }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    async fn save(&self, hash: &str, _mime: &str, bytes: &[u8]) -> Result<(), MediaStoreError> {
        let path = self.path_for(hash).map_err(|_| MediaStoreError::Other(format!("bad hash {hash}")))?;
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(MediaStoreError::Duplicate);
        }
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| MediaStoreError::Other(e.to_string()))?;
        }
        // write-then-rename so readers never see a partial blob
        let n = self.next_tmp.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("{}.{n}.part", std::process::id()));
        if let Err(e) = tokio::fs::write(&tmp, bytes).await {
            error!("media write failed hash={hash} err={e}");
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(MediaStoreError::Other(e.to_string()));
        }
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            // an overlapping upload of the same bytes finished first
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(MediaStoreError::Duplicate);
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(MediaStoreError::Other(e.to_string()));
        }
        Ok(())
    }

    async fn load(&self, hash: &str) -> Result<(Vec<u8>, String), MediaStoreError> {
        let path = self.path_for(hash)?;
        let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => MediaStoreError::NotFound,
            _ => MediaStoreError::Other(e.to_string()),
        })?;
        let mime = sniff_mime(&bytes);
        Ok((bytes, mime))
    }
}

pub async fn build_media_store(data_dir: &str) -> anyhow::Result<Arc<dyn MediaStore>> {
    let store = FsMediaStore::new(PathBuf::from(data_dir).join("media")).await?;
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[tokio::test]
    async fn save_load_and_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsMediaStore::new(dir.path()).await.unwrap();
        let hash = hash_bytes(PNG_HEADER);

        store.save(&hash, "image/png", PNG_HEADER).await.unwrap();
        assert!(matches!(store.save(&hash, "image/png", PNG_HEADER).await, Err(MediaStoreError::Duplicate)));

        let (bytes, mime) = store.load(&hash).await.unwrap();
        assert_eq!(bytes, PNG_HEADER);
        assert_eq!(mime, "image/png");
        assert!(dir.path().join(&hash[0..2]).join(&hash).exists());
        assert!(matches!(store.load(&"0".repeat(64)).await, Err(MediaStoreError::NotFound)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overlapping_saves_of_one_blob_never_fail() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsMediaStore::new(dir.path()).await.unwrap());
        for i in 0..10u8 {
            let mut blob = PNG_HEADER.to_vec();
            blob.extend(std::iter::repeat(i).take(512 * 1024));
            let blob = Arc::new(blob);
            let hash = hash_bytes(&blob);
            let tasks: Vec<_> = (0..4)
                .map(|_| {
                    let (store, blob, hash) = (store.clone(), blob.clone(), hash.clone());
                    tokio::spawn(async move { store.save(&hash, "image/png", &blob).await })
                })
                .collect();
            let mut stored = 0;
            for t in tasks {
                match t.await.unwrap() {
                    Ok(()) => stored += 1,
                    Err(MediaStoreError::Duplicate) => {}
                    Err(e) => panic!("save failed: {e}"),
                }
            }
            assert!(stored >= 1);
            assert_eq!(store.load(&hash).await.unwrap().0, *blob);
        }
        // no temp files left behind
        for shard in std::fs::read_dir(dir.path()).unwrap() {
            for entry in std::fs::read_dir(shard.unwrap().path()).unwrap() {
                assert!(!entry.unwrap().file_name().to_string_lossy().ends_with(".part"));
            }
        }
    }

    #[tokio::test]
    async fn rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsMediaStore::new(dir.path()).await.unwrap();
        assert!(matches!(store.load("../etc/passwd").await, Err(MediaStoreError::NotFound)));
    }
}
