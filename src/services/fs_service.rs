use crate::error::{Result, SorterError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext.to_lowercase()))
        .unwrap_or(false)
}

/// Files directly inside `dir` matching `extensions`, grouped per extension in the
/// order the extensions are given. Order within a group is whatever the filesystem
/// returns. Symlinks to files are included.
///
/// Failing to read `dir` itself is an error; entries that cannot be read are skipped.
pub fn list_matching_files(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                let path = e.path().unwrap_or(dir).to_path_buf();
                return Err(SorterError::filesystem(path, io::Error::from(e)));
            }
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };
        if entry.path().is_file() {
            files.push(entry.into_path());
        }
    }

    let mut grouped = Vec::new();
    for ext in extensions {
        let wanted = std::slice::from_ref(ext);
        grouped.extend(files.iter().filter(|p| has_extension(p, wanted)).cloned());
    }
    Ok(grouped)
}

/// Turn a label into a single directory name.
pub fn label_folder_name(label: &str) -> Result<String> {
    let name: String = label
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    if name.trim().is_empty() || name == "." || name == ".." {
        return Err(SorterError::filesystem(
            label,
            io::Error::new(io::ErrorKind::InvalidInput, "label is not a usable folder name"),
        ));
    }
    Ok(name)
}

/// `<dir of file>/<label>/<file name>`.
pub fn destination_for(file_path: &Path, label: &str) -> Result<PathBuf> {
    let file_name = file_path.file_name().ok_or_else(|| {
        SorterError::filesystem(
            file_path,
            io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
        )
    })?;
    let directory = file_path.parent().unwrap_or_else(|| Path::new(""));
    Ok(directory.join(label_folder_name(label)?).join(file_name))
}

/// Move `file_path` into the `label` folder next to it and return the new path.
///
/// The folder is created when missing. An existing file at the destination is never
/// replaced: the call fails with [`SorterError::Collision`] and the source stays put.
///
/// On filesystems without hard links the move falls back to an existence check
/// followed by a rename. A file created at the destination between those two steps
/// is overwritten.
pub fn place(file_path: &Path, label: &str) -> Result<PathBuf> {
    let destination = destination_for(file_path, label)?;
    if let Some(folder) = destination.parent() {
        fs::create_dir_all(folder).map_err(|e| SorterError::filesystem(folder, e))?;
    }
    move_no_clobber(file_path, &destination)?;
    Ok(destination)
}

fn move_no_clobber(source: &Path, destination: &Path) -> Result<()> {
    match fs::hard_link(source, destination) {
        Ok(()) => {
            if let Err(e) = fs::remove_file(source) {
                // Keep the source as the only copy.
                let _ = fs::remove_file(destination);
                return Err(SorterError::filesystem(source, e));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(SorterError::Collision {
            destination: destination.to_path_buf(),
        }),
        // Filesystems without hard links.
        Err(_) => {
            let exists = destination
                .try_exists()
                .map_err(|e| SorterError::filesystem(destination, e))?;
            if exists {
                return Err(SorterError::Collision {
                    destination: destination.to_path_buf(),
                });
            }
            fs::rename(source, destination).map_err(|e| SorterError::filesystem(source, e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::TempDir;

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn lists_only_direct_matching_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.png"), b"a").unwrap();
        fs::write(dir.path().join("b.JPG"), b"b").unwrap();
        fs::write(dir.path().join("notes.txt"), b"c").unwrap();
        fs::create_dir(dir.path().join("cat")).unwrap();
        fs::write(dir.path().join("cat").join("old.png"), b"d").unwrap();
        fs::create_dir(dir.path().join("folder.png")).unwrap();

        let mut files = list_matching_files(dir.path(), &exts(&["png", "jpg"])).unwrap();
        files.sort();
        assert_eq!(files, vec![dir.path().join("a.png"), dir.path().join("b.JPG")]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = list_matching_files(&dir.path().join("missing"), &exts(&["png"])).unwrap_err();
        assert!(matches!(err, SorterError::Filesystem { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_files_are_listed() {
        let dir = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let real = elsewhere.path().join("real.png");
        fs::write(&real, b"a").unwrap();
        std::os::unix::fs::symlink(&real, dir.path().join("link.png")).unwrap();

        let files = list_matching_files(dir.path(), &exts(&["png"])).unwrap();
        assert_eq!(files, vec![dir.path().join("link.png")]);
    }

    #[cfg(unix)]
    #[test]
    fn broken_entries_do_not_stop_the_listing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.png"), b"a").unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.png"), dir.path().join("dangling.png")).unwrap();
        fs::write(dir.path().join("b.png"), b"b").unwrap();

        let mut files = list_matching_files(dir.path(), &exts(&["png"])).unwrap();
        files.sort();
        assert_eq!(files, vec![dir.path().join("a.png"), dir.path().join("b.png")]);
    }

    #[test]
    fn destination_is_label_folder_beside_file() {
        let dest = destination_for(Path::new("/photos/photo.png"), "cat").unwrap();
        assert_eq!(dest, PathBuf::from("/photos/cat/photo.png"));
    }

    #[test]
    fn labels_with_separators_stay_one_component() {
        assert_eq!(label_folder_name("AC/DC").unwrap(), "AC_DC");
        assert_eq!(label_folder_name("tabby, tabby cat").unwrap(), "tabby, tabby cat");
        assert!(label_folder_name("..").is_err());
        assert!(label_folder_name("  ").is_err());
    }

    #[test]
    fn place_moves_file_and_creates_folder() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("photo.png");
        fs::write(&source, b"pixels").unwrap();

        let dest = place(&source, "cat").unwrap();

        assert_eq!(dest, dir.path().join("cat").join("photo.png"));
        assert!(!source.exists());
        assert_eq!(fs::read(&dest).unwrap(), b"pixels");
    }

    #[test]
    fn collision_leaves_source_untouched() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("photo.png");
        fs::write(&source, b"new").unwrap();
        fs::create_dir(dir.path().join("cat")).unwrap();
        let existing = dir.path().join("cat").join("photo.png");
        fs::write(&existing, b"old").unwrap();

        let err = place(&source, "cat").unwrap_err();

        assert!(matches!(err, SorterError::Collision { ref destination } if *destination == existing));
        assert_eq!(fs::read(&source).unwrap(), b"new");
        assert_eq!(fs::read(&existing).unwrap(), b"old");
    }

    #[test]
    fn existing_label_folder_is_reused() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("one.png");
        let second = dir.path().join("two.png");
        fs::write(&first, b"1").unwrap();
        fs::write(&second, b"2").unwrap();

        place(&first, "dog").unwrap();
        place(&second, "dog").unwrap();

        assert!(dir.path().join("dog").join("one.png").exists());
        assert!(dir.path().join("dog").join("two.png").exists());
    }

    #[test]
    fn concurrent_placement_into_new_folder() {
        let dir = TempDir::new().unwrap();
        let barrier = Arc::new(Barrier::new(4));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let source = dir.path().join(format!("{}.png", i));
                fs::write(&source, [i as u8]).unwrap();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    place(&source, "bird")
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }
        for i in 0..4 {
            assert!(dir.path().join("bird").join(format!("{}.png", i)).exists());
        }
    }

    #[test]
    fn missing_source_is_a_filesystem_error() {
        let dir = TempDir::new().unwrap();
        let err = place(&dir.path().join("gone.png"), "cat").unwrap_err();
        assert!(matches!(err, SorterError::Filesystem { .. }));
    }
}
