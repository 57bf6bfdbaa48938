use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

/// Marker written to `github_commit` when the commit could not be resolved.
pub const UNKNOWN_VERSION: &str = "unknown";

// ── Version identifier ───────────────────────────────────────────────────────

/// The version of a skill at its origin: a git commit SHA, or unknown when
/// the origin carries no version information (local path outside a git
/// checkout, branch with no matching commits).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Version {
    Commit(String),
    Unknown,
}

impl Version {
    pub fn from_commit(sha: impl Into<String>) -> Self {
        let sha = sha.into();
        if sha.is_empty() || sha == UNKNOWN_VERSION {
            Self::Unknown
        } else {
            Self::Commit(sha)
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Commit(_))
    }

    /// Abbreviated form for display (12 chars, like `git log --oneline`-ish).
    pub fn short(&self) -> &str {
        match self {
            Self::Commit(sha) => &sha[..sha.len().min(12)],
            Self::Unknown => UNKNOWN_VERSION,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commit(sha) => f.write_str(sha),
            Self::Unknown => f.write_str(UNKNOWN_VERSION),
        }
    }
}

// ── Provenance record ────────────────────────────────────────────────────────

/// Per-skill provenance, persisted as `.metadata.json` inside the skill
/// directory. Tagged union keyed by `source_type`; read sites narrow on the
/// variant before touching kind-specific fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source_type", rename_all = "lowercase")]
pub enum Provenance {
    Github {
        /// Full subtree URL the skill was installed from.
        source_url: String,
        /// Last-synced commit SHA, or `"unknown"`.
        github_commit: String,
        installed_at: String,
        updated_at: String,
    },
    Local {
        /// Resolved absolute path of the source directory.
        source_path: PathBuf,
        /// HEAD commit of the source at last sync, when it is a git checkout.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        local_git_commit: Option<String>,
        installed_at: String,
        updated_at: String,
    },
}

impl Provenance {
    /// The version recorded at the last sync.
    pub fn version(&self) -> Version {
        match self {
            Self::Github { github_commit, .. } => Version::from_commit(github_commit.clone()),
            Self::Local {
                local_git_commit, ..
            } => local_git_commit
                .clone()
                .map_or(Version::Unknown, Version::Commit),
        }
    }

    pub fn installed_at(&self) -> &str {
        match self {
            Self::Github { installed_at, .. } | Self::Local { installed_at, .. } => installed_at,
        }
    }

    pub fn updated_at(&self) -> &str {
        match self {
            Self::Github { updated_at, .. } | Self::Local { updated_at, .. } => updated_at,
        }
    }

    /// Human-readable origin, for `list` and uninstall reporting.
    pub fn source_display(&self) -> String {
        match self {
            Self::Github { source_url, .. } => source_url.clone(),
            Self::Local { source_path, .. } => source_path.display().to_string(),
        }
    }

    /// Merge a completed sync into this record: origin identity and
    /// `installed_at` are preserved, version and `updated_at` advance.
    pub fn synced(&self, version: &Version, now: &str) -> Self {
        match self {
            Self::Github {
                source_url,
                installed_at,
                ..
            } => Self::Github {
                source_url: source_url.clone(),
                github_commit: version.to_string(),
                installed_at: installed_at.clone(),
                updated_at: now.to_string(),
            },
            Self::Local {
                source_path,
                local_git_commit,
                installed_at,
                ..
            } => Self::Local {
                source_path: source_path.clone(),
                // A source that stopped reporting a commit keeps the last
                // known one rather than erasing it.
                local_git_commit: match version {
                    Version::Commit(sha) => Some(sha.clone()),
                    Version::Unknown => local_git_commit.clone(),
                },
                installed_at: installed_at.clone(),
                updated_at: now.to_string(),
            },
        }
    }
}

/// Current time as the ISO 8601 string stored in provenance records.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provenance_tagged_serialization() {
        let record = Provenance::Github {
            source_url: "https://github.com/owner/repo/tree/main/skills/demo".into(),
            github_commit: "abc123".into(),
            installed_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["source_type"], "github");
        assert_eq!(json["github_commit"], "abc123");

        let record = Provenance::Local {
            source_path: PathBuf::from("/home/user/skills/demo"),
            local_git_commit: None,
            installed_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["source_type"], "local");
        // Absent commit is omitted entirely, not serialized as null.
        assert!(json.get("local_git_commit").is_none());
    }

    #[test]
    fn test_version_from_commit_sentinel() {
        assert_eq!(Version::from_commit("unknown"), Version::Unknown);
        assert_eq!(Version::from_commit(""), Version::Unknown);
        assert!(Version::from_commit("deadbeef").is_known());
    }

    #[test]
    fn test_version_short() {
        let v = Version::Commit("0123456789abcdef0123".into());
        assert_eq!(v.short(), "0123456789ab");
        assert_eq!(Version::Unknown.short(), "unknown");
    }

    #[test]
    fn test_synced_preserves_identity_and_installed_at() {
        let record = Provenance::Local {
            source_path: PathBuf::from("/src/demo"),
            local_git_commit: Some("old".into()),
            installed_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
        };

        let updated = record.synced(&Version::Commit("new".into()), "2026-02-01T00:00:00Z");
        assert_eq!(updated.installed_at(), "2026-01-01T00:00:00Z");
        assert_eq!(updated.updated_at(), "2026-02-01T00:00:00Z");
        assert_eq!(updated.version(), Version::Commit("new".into()));

        // Unknown current version keeps the previously recorded commit.
        let kept = record.synced(&Version::Unknown, "2026-02-01T00:00:00Z");
        assert_eq!(kept.version(), Version::Commit("old".into()));
    }
}
