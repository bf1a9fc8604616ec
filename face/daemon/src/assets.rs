//! Asset resolution from a local directory
//!
//! Stands in for the companion transport: an asset reference is a path
//! relative to the asset directory.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use face_core::{AssetRef, AssetResolver, SyncError};

/// Resolves assets as files under one directory
#[derive(Clone, Debug)]
pub struct DirAssetResolver {
    root: PathBuf,
}

impl DirAssetResolver {
    /// Serve assets from `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path for `asset`, or `None` if it would leave the directory
    fn path_for(&self, asset: &AssetRef) -> Option<PathBuf> {
        let relative = Path::new(asset.as_str().trim_start_matches('/'));
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        (contained && !relative.as_os_str().is_empty()).then(|| self.root.join(relative))
    }
}

#[async_trait]
impl AssetResolver for DirAssetResolver {
    async fn resolve(&self, asset: &AssetRef) -> Result<Vec<u8>, SyncError> {
        let path = self
            .path_for(asset)
            .ok_or_else(|| SyncError::transport(asset, "reference escapes the asset directory"))?;

        tracing::debug!(asset = %asset, path = %path.display(), "Reading asset");
        tokio::fs::read(&path)
            .await
            .map_err(|e| SyncError::transport(asset, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_file_under_root() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir(dir.path().join("icons")).await.unwrap();
        tokio::fs::write(dir.path().join("icons/sun.png"), b"png-bytes")
            .await
            .unwrap();

        let resolver = DirAssetResolver::new(dir.path());
        let bytes = resolver.resolve(&AssetRef::new("icons/sun.png")).await.unwrap();
        assert_eq!(bytes, b"png-bytes");

        // A leading slash is relative to the root, not the filesystem
        let bytes = resolver.resolve(&AssetRef::new("/icons/sun.png")).await.unwrap();
        assert_eq!(bytes, b"png-bytes");
    }

    #[tokio::test]
    async fn test_missing_file_is_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = DirAssetResolver::new(dir.path());
        let result = resolver.resolve(&AssetRef::new("nope.png")).await;
        assert!(matches!(result, Err(SyncError::TransportUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_escaping_references_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = DirAssetResolver::new(dir.path().join("assets"));
        for reference in ["../secret", "icons/../../secret", ""] {
            match resolver.resolve(&AssetRef::new(reference)).await {
                Err(SyncError::TransportUnavailable { reason, .. }) => {
                    assert!(reason.contains("escapes"), "{reference}: {reason}");
                }
                other => panic!("{reference} should be rejected, got {other:?}"),
            }
        }
    }
}
