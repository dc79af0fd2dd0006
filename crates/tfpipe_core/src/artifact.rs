//! Plan artifact bridge.
//!
//! Each CI job is a fresh sandbox, so the binary plan produced by the plan job
//! travels to the apply job as a named artifact. Names are deterministic,
//! `tfplan-{environment}-{run_id}`, so matrix runs for different environments
//! in the same workflow run never collide.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ArtifactError;

/// Platform retention for published plans, recorded in the manifest only.
pub const RETENTION_DAYS: u32 = 7;

const MANIFEST_FILE: &str = "artifact.json";

/// Local plan file name: `{environment}.plan.tfplan`.
pub fn plan_file_name(environment: &str) -> String {
    format!("{}.plan.tfplan", environment)
}

/// Variable file name: `{environment}-variables.tfvars`.
pub fn var_file_name(environment: &str) -> String {
    format!("{}-variables.tfvars", environment)
}

/// Transfer name of a plan artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactName(String);

impl ArtifactName {
    /// `tfplan-{environment}-{run_id}`.
    pub fn for_plan(environment: &str, run_id: &str) -> Self {
        Self(format!("tfplan-{}-{}", environment, run_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata stored next to a published plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub name: ArtifactName,
    pub file_name: String,
    pub size_bytes: u64,
    pub published_at: DateTime<Utc>,
    pub retention_days: u32,
}

/// Reference to a published artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandle {
    pub name: ArtifactName,
    /// Directory holding the artifact payload
    pub location: PathBuf,
    pub manifest: ArtifactManifest,
}

/// Moves plan files between pipeline jobs.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Publish `file` under `name`. Fails if the file does not exist.
    async fn publish(&self, name: &ArtifactName, file: &Path) -> Result<ArtifactHandle, ArtifactError>;

    /// Fetch `name` into `dest_dir`, returning the restored file path.
    async fn download(&self, name: &ArtifactName, dest_dir: &Path) -> Result<PathBuf, ArtifactError>;

    async fn exists(&self, name: &ArtifactName) -> bool;
}

/// Filesystem-backed store; the workflow uploads and restores its root with
/// the platform's artifact actions.
#[derive(Debug, Clone)]
pub struct DirectoryArtifactStore {
    root: PathBuf,
}

impl DirectoryArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_dir(&self, name: &ArtifactName) -> PathBuf {
        self.root.join(name.as_str())
    }

    async fn read_manifest(&self, name: &ArtifactName) -> Result<ArtifactManifest, ArtifactError> {
        let path = self.artifact_dir(name).join(MANIFEST_FILE);
        if !path.is_file() {
            return Err(ArtifactError::NotFound(name.to_string()));
        }
        let raw = tokio::fs::read_to_string(&path).await?;
        let manifest: ArtifactManifest =
            serde_json::from_str(&raw).map_err(|e| ArtifactError::Corrupt {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        if manifest.name != *name {
            return Err(ArtifactError::Corrupt {
                name: name.to_string(),
                reason: format!("manifest belongs to '{}'", manifest.name),
            });
        }
        if Path::new(&manifest.file_name).file_name().and_then(|f| f.to_str())
            != Some(manifest.file_name.as_str())
        {
            return Err(ArtifactError::Corrupt {
                name: name.to_string(),
                reason: format!("invalid file name '{}'", manifest.file_name),
            });
        }
        Ok(manifest)
    }
}

#[async_trait]
impl ArtifactStore for DirectoryArtifactStore {
    async fn publish(&self, name: &ArtifactName, file: &Path) -> Result<ArtifactHandle, ArtifactError> {
        if !file.is_file() {
            return Err(ArtifactError::PlanFileMissing(file.to_path_buf()));
        }
        let file_name = file
            .file_name()
            .and_then(|f| f.to_str())
            .ok_or_else(|| ArtifactError::PlanFileMissing(file.to_path_buf()))?
            .to_string();

        let dir = self.artifact_dir(name);
        tokio::fs::create_dir_all(&dir).await?;
        let size_bytes = tokio::fs::copy(file, dir.join(&file_name)).await?;

        let manifest = ArtifactManifest {
            name: name.clone(),
            file_name,
            size_bytes,
            published_at: Utc::now(),
            retention_days: RETENTION_DAYS,
        };
        let json = serde_json::to_string_pretty(&manifest).map_err(|e| ArtifactError::Corrupt {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        tokio::fs::write(dir.join(MANIFEST_FILE), json).await?;

        info!("Published {} ({} bytes) to {:?}", name, size_bytes, dir);

        Ok(ArtifactHandle {
            name: name.clone(),
            location: dir,
            manifest,
        })
    }

    async fn download(&self, name: &ArtifactName, dest_dir: &Path) -> Result<PathBuf, ArtifactError> {
        let manifest = self.read_manifest(name).await?;
        let source = self.artifact_dir(name).join(&manifest.file_name);
        if !source.is_file() {
            return Err(ArtifactError::Corrupt {
                name: name.to_string(),
                reason: format!("payload '{}' is missing", manifest.file_name),
            });
        }

        tokio::fs::create_dir_all(dest_dir).await?;
        let target = dest_dir.join(&manifest.file_name);
        let copied = tokio::fs::copy(&source, &target).await?;
        if copied != manifest.size_bytes {
            return Err(ArtifactError::Corrupt {
                name: name.to_string(),
                reason: format!(
                    "expected {} bytes, restored {}",
                    manifest.size_bytes, copied
                ),
            });
        }

        debug!("Restored {} to {:?}", name, target);
        Ok(target)
    }

    async fn exists(&self, name: &ArtifactName) -> bool {
        self.read_manifest(name).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_names() {
        assert_eq!(ArtifactName::for_plan("prod", "12345").as_str(), "tfplan-prod-12345");
        assert_eq!(plan_file_name("prod"), "prod.plan.tfplan");
        assert_eq!(var_file_name("prod"), "prod-variables.tfvars");
    }

    #[test]
    fn test_names_differ_per_environment_in_same_run() {
        let dev = ArtifactName::for_plan("dev", "777");
        let prod = ArtifactName::for_plan("prod", "777");
        assert_ne!(dev, prod);
    }

    #[tokio::test]
    async fn test_round_trip_preserves_bytes() {
        let work = tempdir().unwrap();
        let store = DirectoryArtifactStore::new(work.path().join("artifacts"));

        let plan = work.path().join(plan_file_name("prod"));
        let bytes: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        std::fs::write(&plan, &bytes).unwrap();

        let name = ArtifactName::for_plan("prod", "12345");
        let handle = store.publish(&name, &plan).await.unwrap();
        assert_eq!(handle.manifest.size_bytes, 4096);
        assert_eq!(handle.manifest.retention_days, RETENTION_DAYS);

        let restored = store
            .download(&name, &work.path().join("apply-job"))
            .await
            .unwrap();
        assert_eq!(restored.file_name().unwrap(), "prod.plan.tfplan");
        assert_eq!(std::fs::read(restored).unwrap(), bytes);
    }

    #[tokio::test]
    async fn test_publish_without_plan_fails() {
        let work = tempdir().unwrap();
        let store = DirectoryArtifactStore::new(work.path());

        let err = store
            .publish(
                &ArtifactName::for_plan("prod", "1"),
                &work.path().join("prod.plan.tfplan"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ArtifactError::PlanFileMissing(_)));
    }

    #[tokio::test]
    async fn test_download_missing_artifact_fails() {
        let work = tempdir().unwrap();
        let store = DirectoryArtifactStore::new(work.path());

        let name = ArtifactName::for_plan("prod", "12345");
        assert!(!store.exists(&name).await);

        let err = store.download(&name, work.path()).await.unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound(ref n) if n == "tfplan-prod-12345"));
        assert!(err.to_string().contains("tfplan-prod-12345"));
    }

    #[tokio::test]
    async fn test_download_detects_missing_payload() {
        let work = tempdir().unwrap();
        let store = DirectoryArtifactStore::new(work.path().join("store"));
        let plan = work.path().join("dev.plan.tfplan");
        std::fs::write(&plan, b"plan").unwrap();

        let name = ArtifactName::for_plan("dev", "9");
        let handle = store.publish(&name, &plan).await.unwrap();
        std::fs::remove_file(handle.location.join("dev.plan.tfplan")).unwrap();

        let err = store.download(&name, work.path()).await.unwrap_err();
        assert!(matches!(err, ArtifactError::Corrupt { .. }));
    }
}
