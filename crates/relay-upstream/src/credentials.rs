//! Credential pool and its sources.
//!
//! The pool holds the current ordered credential list behind an
//! [`ArcSwap`]. Each outbound call takes a [`snapshot`](CredentialPool::snapshot)
//! and rotates through it locally; a reload swaps in a new list without
//! touching snapshots already handed out.

use arc_swap::ArcSwap;
use async_trait::async_trait;
use relay_core::{Credential, RelayError, RelayResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Provider of the ordered credential list
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Load the current list, in rotation order
    async fn load(&self) -> RelayResult<Vec<Credential>>;

    /// Short human-readable description for logs
    fn describe(&self) -> String;
}

/// Fixed list, typically from the configuration file
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    credentials: Vec<Credential>,
}

impl StaticCredentials {
    /// Wrap a list
    #[must_use]
    pub fn new(credentials: Vec<Credential>) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialSource for StaticCredentials {
    async fn load(&self) -> RelayResult<Vec<Credential>> {
        Ok(self.credentials.clone())
    }

    fn describe(&self) -> String {
        "static configuration".to_string()
    }
}

/// List read from a JSON or YAML file on every load
#[derive(Debug, Clone)]
pub struct FileCredentials {
    path: PathBuf,
}

impl FileCredentials {
    /// Read credentials from `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, contents: &str) -> RelayResult<Vec<Credential>> {
        let is_json = self
            .path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let parsed: Vec<Credential> = if is_json {
            serde_json::from_str(contents).map_err(|e| {
                RelayError::configuration(format!("{}: {e}", self.path.display()))
            })?
        } else {
            serde_yaml::from_str(contents).map_err(|e| {
                RelayError::configuration(format!("{}: {e}", self.path.display()))
            })?
        };

        Ok(parsed)
    }
}

#[async_trait]
impl CredentialSource for FileCredentials {
    async fn load(&self) -> RelayResult<Vec<Credential>> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            RelayError::configuration(format!(
                "Failed to read credentials file {}: {e}",
                self.path.display()
            ))
        })?;

        self.parse(&contents)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Ordered, reloadable credential pool
pub struct CredentialPool {
    source: Arc<dyn CredentialSource>,
    current: ArcSwap<Vec<Credential>>,
}

impl CredentialPool {
    /// Create a pool and perform the initial load.
    ///
    /// A failed initial load leaves the pool empty; calls then fail with
    /// [`RelayError::NoCredentials`] until a reload succeeds.
    pub async fn load(source: Arc<dyn CredentialSource>) -> Self {
        let pool = Self {
            source,
            current: ArcSwap::from_pointee(Vec::new()),
        };

        if let Err(e) = pool.reload().await {
            warn!(error = %e, "Initial credential load failed, pool is empty");
        }

        pool
    }

    /// Create a pool over a fixed list
    #[must_use]
    pub fn from_credentials(credentials: Vec<Credential>) -> Self {
        let source = Arc::new(StaticCredentials::new(credentials.clone()));
        Self {
            source,
            current: ArcSwap::from_pointee(credentials),
        }
    }

    /// Current list, shared read-only for the duration of one call
    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<Credential>> {
        self.current.load_full()
    }

    /// Number of credentials in the current list
    #[must_use]
    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    /// Whether the current list is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reload from the source and swap the list in.
    ///
    /// Entries with an empty email or token are dropped. On error the
    /// previous list stays in place.
    ///
    /// # Errors
    /// Returns the source's error
    pub async fn reload(&self) -> RelayResult<usize> {
        let loaded = self.source.load().await?;
        let total = loaded.len();

        let credentials: Vec<Credential> = loaded
            .into_iter()
            .filter(|c| !c.email.trim().is_empty() && !c.token().trim().is_empty())
            .collect();

        if credentials.len() < total {
            warn!(
                skipped = total - credentials.len(),
                "Ignoring credentials with empty email or token"
            );
        }

        let count = credentials.len();
        self.current.store(Arc::new(credentials));

        info!(
            count = count,
            source = %self.source.describe(),
            "Loaded upstream credentials"
        );

        Ok(count)
    }
}

impl std::fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPool")
            .field("source", &self.source.describe())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn emails(credentials: &[Credential]) -> Vec<&str> {
        credentials.iter().map(|c| c.email.as_str()).collect()
    }

    #[tokio::test]
    async fn test_static_pool_preserves_order() {
        let pool = CredentialPool::from_credentials(vec![
            Credential::new("a@example.com", "1"),
            Credential::new("b@example.com", "2"),
            Credential::new("c@example.com", "3"),
        ]);

        assert_eq!(pool.len(), 3);
        assert_eq!(
            emails(&pool.snapshot()),
            vec!["a@example.com", "b@example.com", "c@example.com"]
        );
    }

    #[tokio::test]
    async fn test_file_source_yaml() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("tempfile");
        writeln!(
            file,
            "- email: one@example.com\n  token: t1\n- email: two@example.com\n  token: t2"
        )
        .expect("write");

        let pool = CredentialPool::load(Arc::new(FileCredentials::new(file.path()))).await;
        assert_eq!(emails(&pool.snapshot()), vec!["one@example.com", "two@example.com"]);
    }

    #[tokio::test]
    async fn test_reload_swaps_without_touching_snapshots() {
        let mut file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .expect("tempfile");
        write!(file, r#"[{{"email": "old@example.com", "token": "t"}}]"#).expect("write");

        let pool = CredentialPool::load(Arc::new(FileCredentials::new(file.path()))).await;
        let before = pool.snapshot();

        std::fs::write(
            file.path(),
            r#"[{"email": "new1@example.com", "token": "a"}, {"email": "new2@example.com", "token": "b"}]"#,
        )
        .expect("rewrite");

        let count = pool.reload().await.expect("reload");
        assert_eq!(count, 2);
        assert_eq!(emails(&before), vec!["old@example.com"]);
        assert_eq!(
            emails(&pool.snapshot()),
            vec!["new1@example.com", "new2@example.com"]
        );
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_list() {
        let mut file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .expect("tempfile");
        write!(file, r#"[{{"email": "keep@example.com", "token": "t"}}]"#).expect("write");

        let pool = CredentialPool::load(Arc::new(FileCredentials::new(file.path()))).await;
        std::fs::write(file.path(), "not json").expect("rewrite");

        assert!(pool.reload().await.is_err());
        assert_eq!(emails(&pool.snapshot()), vec!["keep@example.com"]);
    }

    #[tokio::test]
    async fn test_missing_file_yields_empty_pool() {
        let pool = CredentialPool::load(Arc::new(FileCredentials::new(
            "/nonexistent/credentials.yaml",
        )))
        .await;
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn test_blank_entries_are_dropped() {
        let source = StaticCredentials::new(vec![
            Credential::new("ok@example.com", "t"),
            Credential::new("", "t"),
            Credential::new("no-token@example.com", " "),
        ]);

        let pool = CredentialPool::load(Arc::new(source)).await;
        assert_eq!(emails(&pool.snapshot()), vec!["ok@example.com"]);
    }
}
