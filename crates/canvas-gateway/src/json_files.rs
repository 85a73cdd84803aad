//! JSON file endpoints rooted at a fixed data directory

use crate::error::GatewayError;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};

/// Data directory that JSON files are read from and written to
#[derive(Debug, Clone)]
pub struct JsonFileRoot {
    root: PathBuf,
}

impl JsonFileRoot {
    /// Wrap a data directory; it need not exist yet
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The data directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a caller-supplied relative path to a file under the root
    ///
    /// Nothing touches the filesystem before the path is accepted.
    ///
    /// # Errors
    /// - [`GatewayError::PathTraversal`] if the path contains `..` or ends
    ///   up outside the root
    /// - [`GatewayError::InvalidPath`] if it is empty or not relative
    /// - [`GatewayError::NotJson`] if it does not end in `.json`
    pub fn resolve(&self, path: &str) -> Result<PathBuf, GatewayError> {
        if path.contains("..") {
            return Err(GatewayError::PathTraversal(path.to_string()));
        }
        let trimmed = path.trim_start_matches(['/', '\\']);
        if trimmed.trim().is_empty() {
            return Err(GatewayError::InvalidPath(path.to_string()));
        }

        let mut relative = PathBuf::new();
        for component in Path::new(trimmed).components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                Component::ParentDir => return Err(GatewayError::PathTraversal(path.to_string())),
                Component::RootDir | Component::Prefix(_) => {
                    return Err(GatewayError::InvalidPath(path.to_string()))
                }
            }
        }
        if relative.extension().and_then(|ext| ext.to_str()) != Some("json") {
            return Err(GatewayError::NotJson(path.to_string()));
        }

        let resolved = self.root.join(&relative);
        if !resolved.starts_with(&self.root) {
            return Err(GatewayError::PathTraversal(path.to_string()));
        }
        Ok(resolved)
    }

    /// Write `data` as pretty JSON, creating parent directories
    ///
    /// Returns the normalized relative path that was written.
    ///
    /// # Errors
    /// Returns error if the path is rejected, `data` is `null`, or the
    /// write fails
    pub async fn write_json(&self, path: &str, data: &Value) -> Result<String, GatewayError> {
        let target = self.resolve(path)?;
        if data.is_null() {
            return Err(GatewayError::InvalidData("data is null".to_string()));
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let text = serde_json::to_string_pretty(data)?;
        tokio::fs::write(&target, text).await?;

        let relative = relative_display(&self.root, &target);
        tracing::info!("wrote json file: {}", relative);
        Ok(relative)
    }

    /// Read and parse a JSON file
    ///
    /// # Errors
    /// Returns error if the path is rejected, the file is missing, or it
    /// does not parse
    pub async fn read_json(&self, path: &str) -> Result<Value, GatewayError> {
        let target = self.resolve(path)?;
        let text = tokio::fs::read_to_string(&target).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Every `.json` file under the root, as sorted `/`-separated paths
    ///
    /// A missing root yields an empty list.
    ///
    /// # Errors
    /// Returns error if a directory cannot be read
    pub async fn list_json_files(&self) -> Result<Vec<String>, GatewayError> {
        if !tokio::fs::try_exists(&self.root).await? {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                    files.push(relative_display(&self.root, &path));
                }
            }
        }
        files.sort();
        Ok(files)
    }
}

fn relative_display(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
