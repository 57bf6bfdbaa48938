use std::{
    ffi::OsStr,
    path::{Component, Path, PathBuf},
};

use anyhow::{Context, bail};

use crate::types::Version;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_ARCHIVE_BASE: &str = "https://github.com";
const USER_AGENT: &str = "skillsync";

const EXPECTED_URL_SHAPE: &str = "https://github.com/<owner>/<repo>/tree/<branch>/<path>";

/// Parsed form of a GitHub subtree URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubSubtree {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Path of the skill directory within the repo, `/`-separated.
    pub path: String,
}

impl GithubSubtree {
    /// Leaf segment of the subtree path — the skill's name.
    pub fn skill_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Parse a GitHub subtree URL, tolerating a trailing slash.
pub fn parse_subtree_url(url: &str) -> anyhow::Result<GithubSubtree> {
    let trimmed = url.trim().trim_end_matches('/');
    let rest = trimmed
        .strip_prefix("https://github.com/")
        .ok_or_else(|| anyhow::anyhow!("invalid GitHub URL '{url}': expected {EXPECTED_URL_SHAPE}"))?;

    let segments: Vec<&str> = rest.split('/').collect();
    if segments.len() < 5 || segments[2] != "tree" || segments.iter().any(|s| s.is_empty()) {
        bail!("invalid GitHub URL '{url}': expected {EXPECTED_URL_SHAPE}");
    }

    Ok(GithubSubtree {
        owner: segments[0].to_string(),
        repo: segments[1].to_string(),
        branch: segments[3].to_string(),
        path: segments[4..].join("/"),
    })
}

/// A skill origin living in a GitHub repository subtree at a branch.
///
/// Versioned by the most recent commit touching the subtree path; fetched
/// as the branch tarball with only the subtree extracted.
#[derive(Debug)]
pub struct GithubSource {
    subtree: GithubSubtree,
    /// Original URL, kept verbatim for provenance.
    url: String,
    client: reqwest::Client,
    token: Option<String>,
    api_base: String,
    archive_base: String,
}

impl GithubSource {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let subtree = parse_subtree_url(url)?;
        Ok(Self {
            subtree,
            url: url.trim().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
            api_base: DEFAULT_API_BASE.to_string(),
            archive_base: DEFAULT_ARCHIVE_BASE.to_string(),
        })
    }

    pub fn subtree(&self) -> &GithubSubtree {
        &self.subtree
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Redirect API and archive requests, for tests against a mock server.
    pub fn with_endpoints(mut self, api_base: &str, archive_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self.archive_base = archive_base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// SHA of the most recent commit touching the subtree path on the
    /// branch. An empty commit list means the version cannot be determined.
    pub async fn latest_commit(&self) -> anyhow::Result<Version> {
        let GithubSubtree {
            owner,
            repo,
            branch,
            path,
        } = &self.subtree;

        let url = format!("{}/repos/{owner}/{repo}/commits", self.api_base);
        let mut request = self
            .client
            .get(&url)
            .query(&[("sha", branch.as_str()), ("path", path.as_str()), ("per_page", "1")])
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", USER_AGENT);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("token {token}"));
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("commit lookup for {owner}/{repo} failed"))?;
        if !response.status().is_success() {
            bail!("GitHub API request failed: HTTP {}", response.status());
        }

        let commits: serde_json::Value = response.json().await?;
        let sha = commits
            .as_array()
            .and_then(|a| a.first())
            .and_then(|c| c.get("sha"))
            .and_then(|s| s.as_str());

        match sha {
            Some(sha) => Ok(Version::Commit(sha.to_string())),
            // No commits touch this path on this branch.
            None => Ok(Version::Unknown),
        }
    }

    /// Download the branch tarball and extract only the subtree into
    /// `staging`, stripping the archive's synthetic top-level directory and
    /// the subtree's own leading segments.
    pub async fn download_subtree(&self, staging: &Path) -> anyhow::Result<()> {
        let GithubSubtree {
            owner,
            repo,
            branch,
            path,
        } = &self.subtree;

        let url = format!(
            "{}/{owner}/{repo}/archive/refs/heads/{branch}.tar.gz",
            self.archive_base
        );
        let response = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .with_context(|| format!("tarball download for {owner}/{repo} failed"))?;
        if !response.status().is_success() {
            bail!("failed to download tarball: HTTP {}", response.status());
        }
        let bytes = response.bytes().await?;

        let subpath = path.clone();
        let dest = staging.to_path_buf();
        tokio::task::spawn_blocking(move || extract_subtree(&bytes, &subpath, &dest)).await??;

        if std::fs::read_dir(staging)?.next().is_none() {
            bail!("extraction produced no files; check that the URL, branch, and path are correct");
        }

        tracing::debug!(%owner, %repo, %branch, %path, "fetched subtree tarball");
        Ok(())
    }
}

/// Unpack only entries under `<top-level>/<subpath>/` into `dest`.
fn extract_subtree(bytes: &[u8], subpath: &str, dest: &Path) -> anyhow::Result<()> {
    let wanted: Vec<&str> = subpath.split('/').collect();
    let decoder = flate2::read::GzDecoder::new(bytes);
    let mut archive = tar::Archive::new(decoder);

    for entry in archive.entries()? {
        let mut entry = entry?;
        let kind = entry.header().entry_type();
        if kind.is_symlink() || kind.is_hard_link() {
            tracing::warn!("skipping symlink/hardlink archive entry");
            continue;
        }

        let path = entry.path()?.into_owned();
        let Some(rel) = subtree_relative(&path, &wanted)? else {
            continue;
        };
        if rel.as_os_str().is_empty() {
            continue;
        }

        let target = dest.join(&rel);
        if kind.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        entry.unpack(&target)?;
    }

    Ok(())
}

/// Strip the synthetic `<repo>-<branch>/` top level plus the subtree
/// prefix. Entries outside the subtree yield `None`; unsafe components are
/// an error.
fn subtree_relative(path: &Path, wanted: &[&str]) -> anyhow::Result<Option<PathBuf>> {
    let mut components = path.components();
    if components.next().is_none() {
        return Ok(None);
    }
    for segment in wanted {
        match components.next() {
            Some(Component::Normal(actual)) if actual == OsStr::new(segment) => {},
            _ => return Ok(None),
        }
    }

    let rel: PathBuf = components.collect();
    for component in rel.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {},
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                bail!("archive contains unsafe path component: {}", path.display());
            },
        }
    }
    Ok(Some(rel))
}
