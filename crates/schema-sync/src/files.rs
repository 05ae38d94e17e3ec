//! Reading and writing the generated schema directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use schema_sync_core::{FileAction, FileChange, SchemaAst};

use crate::error::{CliError, Result};

/// Reads every `.rs` file directly inside `dir`, keyed by file name.
///
/// A missing directory reads as empty.
pub fn read_schema_dir(dir: &Path) -> Result<BTreeMap<String, String>> {
    let mut files = BTreeMap::new();
    if !dir.exists() {
        debug!(dir = %dir.display(), "Schema directory does not exist yet");
        return Ok(files);
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || path.extension().is_none_or(|ext| ext != "rs") {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        files.insert(name.to_string(), std::fs::read_to_string(&path)?);
    }
    debug!(dir = %dir.display(), files = files.len(), "Read schema directory");
    Ok(files)
}

/// Reads a code-side schema serialized as JSON.
pub fn read_code_schema(path: &Path) -> Result<SchemaAst> {
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
}

fn target(dir: &Path, file: &str) -> Result<PathBuf> {
    let plain = Path::new(file)
        .file_name()
        .is_some_and(|name| name == file && file != "." && file != "..");
    if !plain || file.contains(['/', '\\']) {
        return Err(CliError::InvalidFileName(file.to_string()));
    }
    Ok(dir.join(file))
}

/// Writes planned changes into `dir`.
///
/// Merges without content only carry notes and are not written. Returns the
/// number of files written or removed.
pub fn apply_file_changes(dir: &Path, changes: &[FileChange]) -> Result<usize> {
    std::fs::create_dir_all(dir)?;
    let mut applied = 0;
    for change in changes {
        let path = target(dir, &change.file)?;
        match (change.action, &change.content) {
            (FileAction::Delete, _) => {
                if path.exists() {
                    std::fs::remove_file(&path)?;
                    applied += 1;
                }
            }
            (FileAction::Merge, None) => {
                debug!(file = %change.file, "Nothing to merge");
                continue;
            }
            (_, Some(content)) => {
                std::fs::write(&path, content)?;
                applied += 1;
            }
            (_, None) => return Err(CliError::MissingContent(change.file.clone())),
        }
        info!(file = %change.file, action = %change.action, "Applied file change");
    }
    Ok(applied)
}

/// Timestamped migration file name, e.g. `20240131_154500_sync.surql`.
#[must_use]
pub fn migration_file_name(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d_%H%M%S_sync.surql").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_migration_file_name() {
        let now = Utc.with_ymd_and_hms(2024, 1, 31, 15, 45, 0).unwrap();
        assert_eq!(migration_file_name(now), "20240131_154500_sync.surql");
    }

    #[test]
    fn test_missing_dir_reads_empty() {
        let files = read_schema_dir(Path::new("/nonexistent/schema")).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_file_names_stay_inside_dir() {
        let dir = Path::new("schema");
        assert_eq!(target(dir, "user.rs").unwrap(), dir.join("user.rs"));
        for bad in ["../user.rs", "a/b.rs", "..", ""] {
            assert!(matches!(target(dir, bad), Err(CliError::InvalidFileName(_))), "{bad}");
        }
    }
}
