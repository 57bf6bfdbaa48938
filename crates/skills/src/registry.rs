use std::path::Path;

use crate::{provenance, types::Provenance};

/// An installed skill paired with its provenance record.
pub struct InstalledSkill {
    pub name: String,
    pub provenance: Provenance,
}

/// Snapshot of the managed skills under `root`, sorted by name.
///
/// Subdirectories without a provenance record are not managed by this tool
/// and are silently omitted. A missing root means nothing is installed.
pub fn list(root: &Path) -> anyhow::Result<Vec<InstalledSkill>> {
    let mut skills = Vec::new();
    if !root.is_dir() {
        return Ok(skills);
    }

    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(record) = provenance::read(&path) else {
            continue;
        };
        skills.push(InstalledSkill {
            name: entry.file_name().to_string_lossy().into_owned(),
            provenance: record,
        });
    }

    skills.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(skills)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::path::PathBuf};

    fn install_fixture(root: &Path, name: &str) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("SKILL.md"), "skill").unwrap();
        provenance::write(
            &dir,
            &Provenance::Local {
                source_path: PathBuf::from("/src").join(name),
                local_git_commit: None,
                installed_at: "2026-01-01T00:00:00Z".into(),
                updated_at: "2026-01-01T00:00:00Z".into(),
            },
        )
        .unwrap();
    }

    #[test]
    fn test_list_missing_root_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let skills = list(&tmp.path().join("nope")).unwrap();
        assert!(skills.is_empty());
    }

    #[test]
    fn test_list_sorted_and_skips_unmanaged() {
        let tmp = tempfile::tempdir().unwrap();
        install_fixture(tmp.path(), "zeta");
        install_fixture(tmp.path(), "alpha");

        // Unmanaged directory and a stray file are both omitted.
        std::fs::create_dir(tmp.path().join("manual-skill")).unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "x").unwrap();

        let skills = list(tmp.path()).unwrap();
        let names: Vec<&str> = skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["alpha", "zeta"]);
    }
}
