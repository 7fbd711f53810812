use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

/// Fixed identifier the session token is stored under.
pub const TOKEN_KEY: &str = "userToken";

/// Secure, process-independent storage for the session token.
///
/// `set` and `clear` must be durable once they return.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self) -> anyhow::Result<Option<String>>;
    async fn set(&self, token: &str) -> anyhow::Result<()>;
    async fn clear(&self) -> anyhow::Result<()>;
}

/// Token kept in an owner-only file under an app-private directory.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    dir: PathBuf,
    key: String,
}

impl FileTokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_key(dir, TOKEN_KEY)
    }

    pub fn with_key(dir: impl Into<PathBuf>, key: &str) -> Self {
        Self {
            dir: dir.into(),
            key: key.to_string(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.key)
    }

    async fn write_tmp(&self, tmp: &Path, token: &str) -> anyhow::Result<()> {
        let mut opts = tokio::fs::OpenOptions::new();
        opts.write(true).create_new(true);
        #[cfg(unix)]
        opts.mode(0o600);
        let mut file = opts
            .open(tmp)
            .await
            .with_context(|| format!("create {}", tmp.display()))?;
        file.write_all(token.as_bytes()).await.context("write token")?;
        file.sync_all().await.context("sync token")?;
        Ok(())
    }

    /// Flushes the directory entry so a rename or unlink survives a crash.
    #[cfg(unix)]
    async fn sync_dir(&self) -> anyhow::Result<()> {
        tokio::fs::File::open(&self.dir)
            .await
            .with_context(|| format!("open {}", self.dir.display()))?
            .sync_all()
            .await
            .with_context(|| format!("sync {}", self.dir.display()))
    }

    #[cfg(not(unix))]
    async fn sync_dir(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self) -> anyhow::Result<Option<String>> {
        let path = self.path();
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                let token = raw.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("read {}", path.display())),
        }
    }

    async fn set(&self, token: &str) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create {}", self.dir.display()))?;

        // write beside the target, then rename over it
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", self.key, uuid::Uuid::new_v4()));
        if let Err(e) = self.write_tmp(&tmp, token).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        if let Err(e) = tokio::fs::rename(&tmp, self.path()).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e).context("rename token file");
        }
        self.sync_dir().await
    }

    async fn clear(&self) -> anyhow::Result<()> {
        match tokio::fs::remove_file(self.path()).await {
            Ok(()) => self.sync_dir().await,
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("remove token file"),
        }
    }
}

/// In-process store, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        let store = Self::default();
        if let Ok(mut slots) = store.slots.lock() {
            slots.insert(TOKEN_KEY.to_string(), token.to_string());
        }
        store
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self) -> anyhow::Result<Option<String>> {
        let slots = self
            .slots
            .lock()
            .map_err(|_| anyhow::anyhow!("token store poisoned"))?;
        Ok(slots.get(TOKEN_KEY).cloned())
    }

    async fn set(&self, token: &str) -> anyhow::Result<()> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| anyhow::anyhow!("token store poisoned"))?;
        slots.insert(TOKEN_KEY.to_string(), token.to_string());
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| anyhow::anyhow!("token store poisoned"))?;
        slots.remove(TOKEN_KEY);
        Ok(())
    }
}
