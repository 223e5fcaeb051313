use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Public URL prefix under which the upload directory is served.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

// 1. ImageStore Contract
/// ImageStore
///
/// Abstract contract for persisting uploaded question images. Handlers only know
/// the returned public URL, so the local-disk store can be swapped for the mock
/// in tests.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Stores `bytes` under a fresh `<uuid>.<ext>` name, keeping the extension of
    /// `original_filename`, and returns the public URL (`/uploads/<name>`).
    async fn save(&self, original_filename: &str, bytes: &[u8]) -> Result<String, String>;
}

// 2. The Real Implementation (local directory)
/// LocalImageStore
///
/// Writes files into a flat directory that the router serves under `/uploads`.
#[derive(Clone)]
pub struct LocalImageStore {
    dir: PathBuf,
}

impl LocalImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the upload directory if it does not exist yet. Safe to call at startup.
    pub async fn ensure_dir_exists(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn save(&self, original_filename: &str, bytes: &[u8]) -> Result<String, String> {
        let name = stored_name(original_filename);
        let path = self.dir.join(&name);

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| format!("{}: {}", path.display(), e))?;

        tracing::debug!(file = %name, size = bytes.len(), "image stored");
        Ok(public_url(&name))
    }
}

/// sanitize_extension
///
/// Keeps only the extension of a client-supplied filename, stripped of anything
/// that is not ASCII alphanumeric, so the stored name can never escape the upload
/// directory.
fn sanitize_extension(original_filename: &str) -> Option<String> {
    let base = original_filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let (_, ext) = base.rsplit_once('.')?;
    let ext: String = ext.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    (!ext.is_empty()).then_some(ext)
}

/// `<uuid-v4>.<ext>`, or just the UUID when the original name has no extension.
fn stored_name(original_filename: &str) -> String {
    let id = Uuid::new_v4();
    match sanitize_extension(original_filename) {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    }
}

fn public_url(name: &str) -> String {
    format!("{}/{}", UPLOADS_URL_PREFIX, name)
}

// 3. The Mock Implementation (For Unit Tests)
/// MockImageStore
///
/// Records nothing and touches no disk; returns the URL a real store would have.
#[derive(Clone, Default)]
pub struct MockImageStore {
    /// When true, every save returns a simulated failure.
    pub should_fail: bool,
}

impl MockImageStore {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl ImageStore for MockImageStore {
    async fn save(&self, original_filename: &str, _bytes: &[u8]) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }
        Ok(public_url(&stored_name(original_filename)))
    }
}

/// StorageState
///
/// The concrete type used to share the image store across the application state.
pub type StorageState = Arc<dyn ImageStore>;
