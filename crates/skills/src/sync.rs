use std::path::{Path, PathBuf};

use {
    anyhow::bail,
    tracing::{error, info, warn},
};

use crate::{
    provenance, registry,
    source::{self, SkillSource},
    types::{Version, now_timestamp},
};

/// Manifest file every skill directory must carry at its root.
pub const MANIFEST_FILE: &str = "SKILL.md";

/// Flags shared by install and update.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Overwrite an existing install / re-sync even when up to date.
    pub force: bool,
    /// Report what would happen without touching the skills root.
    pub dry_run: bool,
}

/// Terminal state of a sync operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Fresh content moved into place, provenance created.
    Installed,
    /// Content replaced, provenance version advanced.
    Updated,
    /// Stored and current versions match; nothing done.
    UpToDate,
    /// Version undeterminable and `force` absent; nothing done.
    SkippedNoVersion,
    /// Dry run stopped before any mutation.
    DryRun,
    /// Skill directory removed.
    Removed,
}

/// Per-skill result of an `update --all` fan-out.
pub struct SkillSyncReport {
    pub name: String,
    pub result: anyhow::Result<SyncOutcome>,
}

/// What the version comparison tells update to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncDecision {
    UpToDate,
    Proceed,
    ProceedForced,
    SkipUnknown,
}

/// Orchestrates install/update/uninstall against a fixed skills root.
///
/// All content acquisition goes through a temp staging directory outside
/// the destination tree; the destination is only touched after the staged
/// content passes validation. The remove-then-move window is the accepted
/// (non-transactional) data-loss bound.
pub struct SyncEngine {
    root: PathBuf,
}

impl SyncEngine {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Install a skill from a resolved source.
    pub async fn install(
        &self,
        skill_source: &dyn SkillSource,
        opts: SyncOptions,
    ) -> anyhow::Result<SyncOutcome> {
        let name = skill_source.skill_name();
        let dest = self.root.join(&name);

        if dest.exists() && !opts.force {
            bail!(
                "skill '{name}' already exists at {}; use --force to overwrite",
                dest.display()
            );
        }

        if opts.dry_run {
            if dest.exists() {
                info!(skill = %name, "would replace existing skill");
            }
            info!(
                skill = %name,
                source = %skill_source.describe(),
                dest = %dest.display(),
                "would install skill"
            );
            return Ok(SyncOutcome::DryRun);
        }

        let staging = self.stage(skill_source).await?;

        // Version lookup is best-effort on install: failure degrades to the
        // unknown marker rather than aborting a fetch that already succeeded.
        let version = match skill_source.current_version().await {
            Ok(v) => v,
            Err(e) => {
                warn!(skill = %name, %e, "could not resolve source version");
                Version::Unknown
            },
        };

        tokio::fs::create_dir_all(&self.root).await?;
        if dest.exists() {
            tokio::fs::remove_dir_all(&dest).await?;
        }
        move_staged(staging, &dest)?;

        let now = now_timestamp();
        provenance::write(&dest, &skill_source.provenance(&version, &now))?;

        info!(skill = %name, version = %version.short(), dest = %dest.display(), "installed skill");
        Ok(SyncOutcome::Installed)
    }

    /// Update one installed skill from its recorded origin.
    pub async fn update(&self, name: &str, opts: SyncOptions) -> anyhow::Result<SyncOutcome> {
        let dest = self.root.join(name);
        if !dest.is_dir() {
            bail!("skill '{name}' is not installed");
        }

        let record = provenance::read(&dest).ok_or_else(|| {
            anyhow::anyhow!("skill '{name}' has no metadata and cannot be updated; reinstall it")
        })?;

        let skill_source = source::from_provenance(&record)?;
        let current = skill_source.current_version().await?;
        let stored = record.version();

        match compare_versions(&stored, &current, opts.force) {
            SyncDecision::UpToDate => {
                info!(skill = %name, version = %current.short(), "up to date");
                return Ok(SyncOutcome::UpToDate);
            },
            SyncDecision::SkipUnknown => {
                info!(skill = %name, "cannot determine source version; use --force to re-sync");
                return Ok(SyncOutcome::SkippedNoVersion);
            },
            SyncDecision::ProceedForced => {
                info!(skill = %name, "re-syncing despite unchanged version (--force)");
            },
            SyncDecision::Proceed => {
                info!(skill = %name, old = %stored.short(), new = %current.short(), "update available");
            },
        }

        if opts.dry_run {
            info!(skill = %name, "would update skill");
            return Ok(SyncOutcome::DryRun);
        }

        let staging = self.stage(skill_source.as_ref()).await?;
        tokio::fs::remove_dir_all(&dest).await?;
        move_staged(staging, &dest)?;

        let now = now_timestamp();
        provenance::write(&dest, &record.synced(&current, &now))?;

        info!(skill = %name, version = %current.short(), "updated skill");
        Ok(SyncOutcome::Updated)
    }

    /// Update every managed skill, strictly one at a time. A failure on one
    /// skill is recorded in its report and does not abort the rest.
    pub async fn update_all(&self, opts: SyncOptions) -> anyhow::Result<Vec<SkillSyncReport>> {
        let installed = registry::list(&self.root)?;
        let mut reports = Vec::with_capacity(installed.len());
        for skill in installed {
            let result = self.update(&skill.name, opts).await;
            if let Err(e) = &result {
                error!(skill = %skill.name, %e, "update failed");
            }
            reports.push(SkillSyncReport {
                name: skill.name,
                result,
            });
        }
        Ok(reports)
    }

    /// Remove an installed skill directory (provenance goes with it).
    pub async fn uninstall(&self, name: &str, dry_run: bool) -> anyhow::Result<SyncOutcome> {
        let dest = self.root.join(name);
        if !dest.is_dir() {
            bail!("skill '{name}' is not installed");
        }

        if let Some(record) = provenance::read(&dest) {
            info!(skill = %name, source = %record.source_display(), "removing skill");
        }

        if dry_run {
            info!(skill = %name, dest = %dest.display(), "would remove skill");
            return Ok(SyncOutcome::DryRun);
        }

        tokio::fs::remove_dir_all(&dest).await?;
        info!(skill = %name, "removed skill");
        Ok(SyncOutcome::Removed)
    }

    /// Fetch into a fresh temp dir and validate the result. The returned
    /// guard removes the staging area on drop, success or failure.
    async fn stage(&self, skill_source: &dyn SkillSource) -> anyhow::Result<tempfile::TempDir> {
        let staging = tempfile::Builder::new().prefix("skillsync-").tempdir()?;
        skill_source.fetch_into(staging.path()).await?;
        validate_skill_dir(staging.path())?;
        Ok(staging)
    }
}

/// Version comparison policy for update.
fn compare_versions(stored: &Version, current: &Version, force: bool) -> SyncDecision {
    if !current.is_known() {
        if force {
            SyncDecision::ProceedForced
        } else {
            SyncDecision::SkipUnknown
        }
    } else if current == stored {
        if force {
            SyncDecision::ProceedForced
        } else {
            SyncDecision::UpToDate
        }
    } else {
        SyncDecision::Proceed
    }
}

/// A skill directory must carry its manifest at the root.
pub fn validate_skill_dir(dir: &Path) -> anyhow::Result<()> {
    if !dir.join(MANIFEST_FILE).is_file() {
        bail!(
            "no {MANIFEST_FILE} found in '{}'; this does not appear to be a valid skill directory",
            dir.display()
        );
    }
    Ok(())
}

/// Move staged content into the destination: plain rename when staging and
/// destination share a filesystem, recursive copy otherwise. The staging
/// guard cleans up whatever is left behind.
fn move_staged(staging: tempfile::TempDir, dest: &Path) -> anyhow::Result<()> {
    if std::fs::rename(staging.path(), dest).is_ok() {
        // The directory itself moved; nothing left for the guard to remove.
        let _ = staging.close();
        return Ok(());
    }
    std::fs::create_dir_all(dest)?;
    copy_dir_recursive(staging.path(), dest)
}

/// Recursive directory copy. Symlinks are skipped rather than followed.
pub(crate) fn copy_dir_recursive(src: &Path, dest: &Path) -> anyhow::Result<()> {
    for entry in walkdir::WalkDir::new(src).min_depth(1) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src)?;
        let target = dest.join(rel);
        let file_type = entry.file_type();
        if file_type.is_symlink() {
            warn!(path = %entry.path().display(), "skipping symlink in source directory");
            continue;
        }
        if file_type.is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
