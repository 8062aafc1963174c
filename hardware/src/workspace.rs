use crate::error::{self, Result};
use snafu::ResultExt;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

/// A directory and a name that together isolate the artifacts of one testbed run (keys,
/// inventories, rendered plays) from every other run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    name: String,
    working_dir: PathBuf,
}

impl Workspace {
    /// Wraps an existing directory. Nothing is created on disk.
    pub fn new<P, S>(working_dir: P, name: S) -> Self
    where
        P: Into<PathBuf>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            working_dir: working_dir.into(),
        }
    }

    /// Creates `<root>/<name>` (and any missing parents) and returns the workspace for it.
    pub fn create<P, S>(root: P, name: S) -> Result<Self>
    where
        P: AsRef<Path>,
        S: Into<String>,
    {
        let name = name.into();
        let working_dir = root.as_ref().join(&name);
        fs::create_dir_all(&working_dir).context(error::CreateWorkspaceSnafu {
            path: &working_dir,
        })?;
        Ok(Self { name, working_dir })
    }

    /// Creates a workspace with a unique name of the form `<prefix>-<8 hex digits>` under `root`.
    pub fn generate<P, S>(root: P, prefix: S) -> Result<Self>
    where
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        let id = uuid::Uuid::new_v4().simple().to_string();
        Self::create(root, format!("{}-{}", prefix.as_ref(), &id[..8]))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

impl Display for Workspace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.working_dir.display())
    }
}

#[cfg(test)]
mod test {
    use super::Workspace;

    #[test]
    fn generate_creates_unique_directories() {
        let root = tempfile::TempDir::new().unwrap();
        let first = Workspace::generate(root.path(), "rook").unwrap();
        let second = Workspace::generate(root.path(), "rook").unwrap();
        assert_ne!(first.name(), second.name());
        assert!(first.name().starts_with("rook-"));
        assert_eq!(first.name().len(), "rook-".len() + 8);
        assert!(first.working_dir().is_dir());
        assert_eq!(first.working_dir(), root.path().join(first.name()));
    }
}
