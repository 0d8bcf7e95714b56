//! Project files and their tags.
//!
//! [`LocalProject`] stands in for a project on the data platform: a
//! directory of files plus a YAML manifest mapping file names to tags.
//!
//! ```yaml
//! ptenrl-enroll.csv: [queued]
//! visits-uds.csv: [queued, reviewed]
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{Result, SchedulerError};

/// Name of the tag manifest inside a local project directory.
pub const TAG_MANIFEST: &str = "tags.yaml";

/// A file in a project, as seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFile {
    pub name: String,
    pub tags: BTreeSet<String>,
    pub modified: DateTime<Utc>,
}

impl ProjectFile {
    pub fn has_tags(&self, tags: &BTreeSet<String>) -> bool {
        tags.is_subset(&self.tags)
    }
}

/// File listing and tagging operations on a project.
pub trait Project {
    /// Current files of the project.
    fn files(&self) -> Result<Vec<ProjectFile>>;

    /// Looks up a single file by name.
    fn file(&self, name: &str) -> Result<Option<ProjectFile>> {
        Ok(self.files()?.into_iter().find(|file| file.name == name))
    }

    /// Removes `tags` from the named file.
    fn remove_tags(&mut self, name: &str, tags: &BTreeSet<String>) -> Result<()>;
}

type TagManifest = BTreeMap<String, BTreeSet<String>>;

/// Project backed by a local directory.
#[derive(Debug, Clone)]
pub struct LocalProject {
    root: PathBuf,
}

impl LocalProject {
    pub fn open(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(SchedulerError::Io {
                path: root.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            });
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join(TAG_MANIFEST)
    }

    fn load_manifest(&self) -> Result<TagManifest> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(TagManifest::new());
        }
        let text = std::fs::read_to_string(&path).map_err(|source| SchedulerError::Io {
            path: path.clone(),
            source,
        })?;
        if text.trim().is_empty() {
            return Ok(TagManifest::new());
        }
        serde_yaml::from_str(&text).map_err(|source| SchedulerError::Manifest { path, source })
    }

    fn save_manifest(&self, manifest: &TagManifest) -> Result<()> {
        let path = self.manifest_path();
        let text = serde_yaml::to_string(manifest).map_err(|source| SchedulerError::Manifest {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, text).map_err(|source| SchedulerError::Io { path, source })
    }

    /// Adds `tags` to the named file.
    pub fn add_tags<I, S>(&mut self, name: &str, tags: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut manifest = self.load_manifest()?;
        manifest
            .entry(name.to_string())
            .or_default()
            .extend(tags.into_iter().map(Into::into));
        self.save_manifest(&manifest)
    }
}

impl Project for LocalProject {
    fn files(&self) -> Result<Vec<ProjectFile>> {
        let manifest = self.load_manifest()?;
        let read_error = |source| SchedulerError::Io {
            path: self.root.clone(),
            source,
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.root).map_err(read_error)? {
            let entry = entry.map_err(read_error)?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if name == TAG_MANIFEST {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|metadata| metadata.modified())
                .map_err(|source| SchedulerError::Io {
                    path: path.clone(),
                    source,
                })?;
            files.push(ProjectFile {
                name: name.to_string(),
                tags: manifest.get(name).cloned().unwrap_or_default(),
                modified: DateTime::<Utc>::from(modified),
            });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(root = %self.root.display(), count = files.len(), "listed project files");
        Ok(files)
    }

    fn remove_tags(&mut self, name: &str, tags: &BTreeSet<String>) -> Result<()> {
        if !self.path_of(name).is_file() {
            return Err(SchedulerError::FileNotFound(name.to_string()));
        }
        let mut manifest = self.load_manifest()?;
        if let Some(current) = manifest.get_mut(name) {
            current.retain(|tag| !tags.contains(tag));
            if current.is_empty() {
                manifest.remove(name);
            }
        }
        self.save_manifest(&manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn tags_round_trip_through_manifest() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a-uds.csv"), "ptid\n1\n").unwrap();
        let mut project = LocalProject::open(dir.path()).unwrap();

        project.add_tags("a-uds.csv", ["queued", "new"]).unwrap();
        let file = project.file("a-uds.csv").unwrap().unwrap();
        assert!(file.tags.contains("queued"));

        let remove: BTreeSet<String> = ["queued".to_string()].into();
        project.remove_tags("a-uds.csv", &remove).unwrap();
        let file = project.file("a-uds.csv").unwrap().unwrap();
        assert_eq!(file.tags, ["new".to_string()].into());
    }

    #[test]
    fn manifest_is_not_listed() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(TAG_MANIFEST), "").unwrap();
        let project = LocalProject::open(dir.path()).unwrap();
        assert!(project.files().unwrap().is_empty());
    }

    #[test]
    fn removing_tags_from_unknown_file_fails() {
        let dir = TempDir::new().unwrap();
        let mut project = LocalProject::open(dir.path()).unwrap();
        let result = project.remove_tags("missing.csv", &BTreeSet::new());
        assert!(matches!(result, Err(SchedulerError::FileNotFound(_))));
    }
}
