use std::path::{Path, PathBuf};

use {anyhow::bail, tokio::process::Command};

use crate::types::Version;

/// A skill origin living at a local filesystem path.
///
/// Versioned by the path's `HEAD` commit when it is a git working tree;
/// fetched as a full recursive copy.
#[derive(Debug, Clone)]
pub struct LocalSource {
    path: PathBuf,
    name: String,
}

impl LocalSource {
    /// Resolve a user-supplied path: `~` expansion, canonicalization
    /// (symlinks resolved), and an up-front existence check.
    pub fn new(input: &str) -> anyhow::Result<Self> {
        let expanded = expand_tilde(input);
        let path = std::fs::canonicalize(&expanded)
            .map_err(|_| anyhow::anyhow!("local path does not exist: {input}"))?;
        Self::from_resolved(path)
    }

    /// Rebuild from the absolute path stored in a provenance record.
    pub fn from_stored(path: &Path) -> anyhow::Result<Self> {
        if !path.is_dir() {
            bail!("source path no longer exists: {}", path.display());
        }
        Self::from_resolved(path.to_path_buf())
    }

    fn from_resolved(path: PathBuf) -> anyhow::Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                anyhow::anyhow!("cannot derive a skill name from {}", path.display())
            })?;
        Ok(Self { path, name })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Leaf segment of the resolved path — the skill's name.
    pub fn skill_name(&self) -> &str {
        &self.name
    }

    /// `HEAD` commit of the source path, if it is inside a git checkout.
    /// Any git failure (not a repo, git missing) degrades to unknown.
    pub async fn head_commit(&self) -> Version {
        let output = Command::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(&self.path)
            .output()
            .await;
        match output {
            Ok(out) if out.status.success() => {
                let sha = String::from_utf8_lossy(&out.stdout).trim().to_string();
                Version::from_commit(sha)
            },
            _ => Version::Unknown,
        }
    }

    /// Recursively copy the source directory's contents into `staging`.
    pub fn copy_into(&self, staging: &Path) -> anyhow::Result<()> {
        crate::sync::copy_dir_recursive(&self.path, staging)
    }
}

/// Expand a leading `~` to the caller's home directory.
fn expand_tilde(input: &str) -> PathBuf {
    if input == "~" {
        if let Some(home) = skillsync_config::home_dir() {
            return home;
        }
    } else if let Some(rest) = input.strip_prefix("~/") {
        if let Some(home) = skillsync_config::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(input)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_nonexistent_path_fails_fast() {
        let err = LocalSource::new("/definitely/not/a/real/skillsync/path").unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_new_resolves_symlinks() {
        let tmp = tempfile::tempdir().unwrap();
        let real = tmp.path().join("real");
        std::fs::create_dir(&real).unwrap();

        let source = LocalSource::new(real.to_str().unwrap()).unwrap();
        assert_eq!(source.path(), std::fs::canonicalize(&real).unwrap());
    }

    #[test]
    fn test_expand_tilde() {
        if let Some(home) = skillsync_config::home_dir() {
            assert_eq!(expand_tilde("~"), home);
            assert_eq!(expand_tilde("~/skills/foo"), home.join("skills/foo"));
        }
        // `~user` and mid-path tildes stay untouched.
        assert_eq!(expand_tilde("/a/~/b"), PathBuf::from("/a/~/b"));
        assert_eq!(expand_tilde("~other/x"), PathBuf::from("~other/x"));
    }

    #[test]
    fn test_copy_into_recursive() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(src.join("ref")).unwrap();
        std::fs::write(src.join("SKILL.md"), "skill").unwrap();
        std::fs::write(src.join("ref/notes.md"), "notes").unwrap();

        let staging = tempfile::tempdir().unwrap();
        let source = LocalSource::new(src.to_str().unwrap()).unwrap();
        source.copy_into(staging.path()).unwrap();

        assert_eq!(
            std::fs::read_to_string(staging.path().join("SKILL.md")).unwrap(),
            "skill"
        );
        assert_eq!(
            std::fs::read_to_string(staging.path().join("ref/notes.md")).unwrap(),
            "notes"
        );
    }

    #[tokio::test]
    async fn test_head_commit_outside_git_is_unknown() {
        let tmp = tempfile::tempdir().unwrap();
        let source = LocalSource::from_stored(tmp.path()).unwrap();
        assert_eq!(source.head_commit().await, Version::Unknown);
    }

    #[test]
    fn test_from_stored_missing_path() {
        let err = LocalSource::from_stored(Path::new("/gone/skillsync/source")).unwrap_err();
        assert!(err.to_string().contains("no longer exists"));
    }
}
