use std::path::Path;

use crate::types::Provenance;

/// Reserved metadata file at the root of every managed skill directory.
/// Not part of the skill's own content.
pub const METADATA_FILE: &str = ".metadata.json";

/// Read a skill's provenance record.
///
/// Fails soft: a missing or malformed file yields `None`. Metadata is
/// advisory — a skill works without it, it just can't be updated.
pub fn read(skill_dir: &Path) -> Option<Provenance> {
    let path = skill_dir.join(METADATA_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::debug!(path = %path.display(), %e, "ignoring malformed metadata file");
            None
        },
    }
}

/// Write a skill's provenance record atomically (temp file + rename).
pub fn write(skill_dir: &Path, record: &Provenance) -> anyhow::Result<()> {
    let path = skill_dir.join(METADATA_FILE);
    let tmp = skill_dir.join(".metadata.json.tmp");
    let mut data = serde_json::to_string_pretty(record)?;
    data.push('\n');
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, &path)?;
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::types::Version, std::path::PathBuf};

    fn sample() -> Provenance {
        Provenance::Local {
            source_path: PathBuf::from("/src/demo"),
            local_git_commit: Some("abc".into()),
            installed_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn test_write_and_read_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), &sample()).unwrap();

        let loaded = read(tmp.path()).unwrap();
        assert_eq!(loaded, sample());
        assert_eq!(loaded.version(), Version::Commit("abc".into()));
    }

    #[test]
    fn test_read_missing_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(read(tmp.path()).is_none());
    }

    #[test]
    fn test_read_malformed_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(METADATA_FILE), "{not json").unwrap();
        assert!(read(tmp.path()).is_none());

        // Valid JSON but the wrong shape also fails soft.
        std::fs::write(tmp.path().join(METADATA_FILE), r#"{"source_type":"ftp"}"#).unwrap();
        assert!(read(tmp.path()).is_none());
    }

    #[test]
    fn test_write_unwritable_dir_is_hard_error() {
        let missing = PathBuf::from("/nonexistent-skillsync-test-dir");
        assert!(write(&missing, &sample()).is_err());
    }
}
