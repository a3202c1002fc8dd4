use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// One `.pb` file found in the corpus directory, with the stat fields the
/// incremental refresh compares against the stored index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub file_name: String,
    pub path: PathBuf,
    pub mtime_ms: u64,
    pub size: u64,
}

/// File names the index will touch. Path separators and leading dots are
/// rejected so a caller-supplied name cannot reach outside the corpus;
/// anything else, spaces and non-ASCII included, is a legitimate file name.
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 255
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
}

/// List the `.pb` files directly under `dir`, sorted by file name.
///
/// Files that vanish between the listing and the stat call are skipped,
/// not errors; the next refresh sees the final state.
pub fn scan(dir: &Path) -> std::io::Result<Vec<ScannedFile>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("failed to read directory entry: {err}");
                continue;
            }
        };

        let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if !file_name.ends_with(".pb") || !is_safe_file_name(&file_name) {
            continue;
        }

        let meta = match entry.metadata() {
            Ok(meta) => meta,
            Err(err) => {
                log::debug!("skipping {file_name}: stat failed: {err}");
                continue;
            }
        };
        if !meta.is_file() {
            continue;
        }

        let mtime_ms = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .and_then(|d| u64::try_from(d.as_millis()).ok())
            .unwrap_or(0);

        files.push(ScannedFile {
            file_name,
            path: entry.path(),
            mtime_ms,
            size: meta.len(),
        });
    }

    files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    log::debug!("scanned {} pb files in {}", files.len(), dir.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn lists_only_pb_files_sorted() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("b_city.pb"), b"META\n").unwrap();
        fs::write(temp.path().join("a_city.pb"), b"META\n").unwrap();
        fs::write(temp.path().join("notes.txt"), b"x").unwrap();
        fs::create_dir(temp.path().join("sub.pb")).unwrap();

        let files = scan(temp.path()).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["a_city.pb", "b_city.pb"]);
    }

    #[test]
    fn rejects_traversal_but_not_unusual_names() {
        assert!(is_safe_file_name("poland_katowice_2024.pb"));
        assert!(is_safe_file_name("poland_kraków_2024.pb"));
        assert!(is_safe_file_name("new york 2021.pb"));
        assert!(!is_safe_file_name(".hidden.pb"));
        assert!(!is_safe_file_name("a/b.pb"));
        assert!(!is_safe_file_name("a\\b.pb"));
        assert!(!is_safe_file_name(""));
    }

    #[test]
    fn lists_unicode_and_spaced_names() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("poland_kraków_2024.pb"), b"META\n").unwrap();
        fs::write(temp.path().join("new york 2021.pb"), b"META\n").unwrap();

        let files = scan(temp.path()).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["new york 2021.pb", "poland_kraków_2024.pb"]);
    }

    #[test]
    fn stat_fields_track_content() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("x.pb"), b"META\nkey;value\n").unwrap();

        let files = scan(temp.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].size, 15);
        assert!(files[0].mtime_ms > 0);
    }
}
