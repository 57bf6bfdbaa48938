use std::path::Path;

use async_trait::async_trait;

use crate::{
    github::GithubSource,
    local::LocalSource,
    types::{Provenance, Version},
};

/// A skill's origin. The sync engine only talks to this trait; the two
/// implementations (GitHub subtree, local path) own all the transport,
/// shell-out, and parsing details.
#[async_trait]
pub trait SkillSource: Send + Sync + std::fmt::Debug {
    /// Name of the skill this origin provides (its directory name under
    /// the skills root).
    fn skill_name(&self) -> String;

    /// Human-readable origin, for logs and reports.
    fn describe(&self) -> String;

    /// Version currently available at the origin.
    async fn current_version(&self) -> anyhow::Result<Version>;

    /// Populate `staging` with exactly the origin's content.
    async fn fetch_into(&self, staging: &Path) -> anyhow::Result<()>;

    /// Fresh provenance record for an install completed at `now`.
    fn provenance(&self, version: &Version, now: &str) -> Provenance;
}

/// Build a source from an install argument: GitHub subtree URLs are
/// anything starting with `https://github.com/`, everything else is
/// treated as a local path.
pub fn from_input(input: &str) -> anyhow::Result<Box<dyn SkillSource>> {
    if input.starts_with("https://github.com/") {
        Ok(Box::new(GithubSource::new(input)?))
    } else {
        Ok(Box::new(LocalSource::new(input)?))
    }
}

/// Rebuild the source an installed skill came from.
pub fn from_provenance(record: &Provenance) -> anyhow::Result<Box<dyn SkillSource>> {
    match record {
        Provenance::Github { source_url, .. } => Ok(Box::new(GithubSource::new(source_url)?)),
        Provenance::Local { source_path, .. } => {
            Ok(Box::new(LocalSource::from_stored(source_path)?))
        },
    }
}

#[async_trait]
impl SkillSource for GithubSource {
    fn skill_name(&self) -> String {
        self.subtree().skill_name().to_string()
    }

    fn describe(&self) -> String {
        self.url().to_string()
    }

    async fn current_version(&self) -> anyhow::Result<Version> {
        self.latest_commit().await
    }

    async fn fetch_into(&self, staging: &Path) -> anyhow::Result<()> {
        self.download_subtree(staging).await
    }

    fn provenance(&self, version: &Version, now: &str) -> Provenance {
        Provenance::Github {
            source_url: self.url().to_string(),
            github_commit: version.to_string(),
            installed_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }
}

#[async_trait]
impl SkillSource for LocalSource {
    fn skill_name(&self) -> String {
        LocalSource::skill_name(self).to_string()
    }

    fn describe(&self) -> String {
        self.path().display().to_string()
    }

    async fn current_version(&self) -> anyhow::Result<Version> {
        Ok(self.head_commit().await)
    }

    async fn fetch_into(&self, staging: &Path) -> anyhow::Result<()> {
        let source = self.clone();
        let staging = staging.to_path_buf();
        tokio::task::spawn_blocking(move || source.copy_into(&staging)).await?
    }

    fn provenance(&self, version: &Version, now: &str) -> Provenance {
        Provenance::Local {
            source_path: self.path().to_path_buf(),
            local_git_commit: match version {
                Version::Commit(sha) => Some(sha.clone()),
                Version::Unknown => None,
            },
            installed_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }
}
