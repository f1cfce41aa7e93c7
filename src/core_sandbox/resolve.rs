use super::error::SandboxError;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Turns a client supplied path into a canonical path on the local filesystem.
///
/// # Arguments
///
/// * `cwd` - The session's current directory, as shown to the client.
/// * `root` - The canonical FTP root.
/// * `chrooted` - Whether the process already runs inside an OS-level chroot.
/// * `path` - The requested path, absolute or relative to `cwd`. `None` resolves `cwd` itself.
///
/// # Returns
///
/// The canonical path. `.` and `..` are folded first and cannot climb above
/// `/`, then the OS follows symlinks. A missing leaf is allowed so that new
/// files can be created, but its parent must exist. Without chroot the result
/// always lies below `root`; anything else is refused.
pub fn resolve(
    cwd: &str,
    root: &Path,
    chrooted: bool,
    path: Option<&str>,
) -> Result<PathBuf, SandboxError> {
    let joined = match path {
        Some(path) if path.starts_with('/') => path.to_string(),
        Some(path) => format!("{}/{}", cwd, path),
        None => cwd.to_string(),
    };
    let dir = normalize(&joined);

    let full = if chrooted {
        PathBuf::from(&dir)
    } else {
        let prefix = root.to_string_lossy();
        PathBuf::from(format!("{}{}", prefix.trim_end_matches('/'), dir))
    };

    let canonical = match fs::canonicalize(&full) {
        Ok(canonical) => canonical,
        Err(_) => canonicalize_parent(&full)?,
    };

    if !chrooted && !canonical.starts_with(root) {
        debug!(
            "Refusing {} -> {}, outside {}",
            dir,
            canonical.display(),
            root.display()
        );
        return Err(SandboxError::OutsideRoot);
    }

    Ok(canonical)
}

/// Entry point for the path commands (CWD, DELE, MKD, RMD, SIZE, MDTM,
/// MLST and the listings). An absolute `path` is taken from the root and a
/// relative one from `cwd`, which is exactly what [`resolve`] does, so this
/// simply delegates.
pub fn resolve_absolute(
    cwd: &str,
    root: &Path,
    chrooted: bool,
    path: Option<&str>,
) -> Result<PathBuf, SandboxError> {
    resolve(cwd, root, chrooted, path)
}

/// Maps a resolved path back to what the client sees, i.e. relative to root.
pub fn visible_path(root: &Path, chrooted: bool, full: &Path) -> String {
    if chrooted {
        return full.to_string_lossy().into_owned();
    }
    match full.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => String::from("/"),
        Ok(rel) => format!("/{}", rel.to_string_lossy()),
        Err(_) => String::from("/"),
    }
}

/// Folds `.`, `..` and repeated separators, clamping at `/`.
fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            part => parts.push(part),
        }
    }
    format!("/{}", parts.join("/"))
}

// Target doesn't exist: allow it only if the parent does.
fn canonicalize_parent(full: &Path) -> Result<PathBuf, SandboxError> {
    // A dangling symlink must not be followed to wherever it points.
    if fs::symlink_metadata(full).is_ok() {
        return Err(SandboxError::NotFound);
    }
    let leaf = full.file_name().ok_or(SandboxError::NotFound)?;
    let parent = full.parent().ok_or(SandboxError::NotFound)?;
    let parent = fs::canonicalize(parent).map_err(|_| SandboxError::NotFound)?;
    if !parent.is_dir() {
        return Err(SandboxError::NotFound);
    }
    Ok(parent.join(leaf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("pub/reports")).unwrap();
        fs::write(root.join("pub/readme.txt"), b"hello").unwrap();
        (dir, root)
    }

    #[test]
    fn test_root_resolves_to_root() {
        let (_dir, root) = setup();
        assert_eq!(resolve("/", &root, false, None).unwrap(), root);
        assert_eq!(resolve("/", &root, false, Some("/")).unwrap(), root);
        assert_eq!(resolve("/", &root, false, Some(".")).unwrap(), root);
        assert_eq!(resolve("/", &root, false, Some("..")).unwrap(), root);
    }

    #[test]
    fn test_relative_and_absolute() {
        let (_dir, root) = setup();
        assert_eq!(
            resolve("/pub", &root, false, Some("reports")).unwrap(),
            root.join("pub/reports")
        );
        assert_eq!(
            resolve("/pub/reports", &root, false, Some("/pub/readme.txt")).unwrap(),
            root.join("pub/readme.txt")
        );
        assert_eq!(
            resolve("/pub", &root, false, Some("reports//..//readme.txt")).unwrap(),
            root.join("pub/readme.txt")
        );
    }

    #[test]
    fn test_new_file_needs_existing_parent() {
        let (_dir, root) = setup();
        assert_eq!(
            resolve("/pub", &root, false, Some("upload.bin")).unwrap(),
            root.join("pub/upload.bin")
        );
        assert_eq!(
            resolve("/", &root, false, Some("nodir/upload.bin")),
            Err(SandboxError::NotFound)
        );
        assert_eq!(
            resolve("/", &root, false, Some("pub/readme.txt/child")),
            Err(SandboxError::NotFound)
        );
    }

    #[test]
    fn test_dot_dot_never_escapes() {
        let (_dir, root) = setup();
        let cwds = ["/", "/pub", "/pub/reports"];
        let tails = ["", "etc/passwd", "pub", "nothing-here"];
        for cwd in cwds {
            for depth in 0..8 {
                for tail in tails {
                    let request = format!("{}{}", "../".repeat(depth), tail);
                    for path in [request.clone(), format!("/{}", request)] {
                        if let Ok(resolved) = resolve(cwd, &root, false, Some(&path)) {
                            assert!(
                                resolved.starts_with(&root),
                                "{} from {} escaped to {}",
                                path,
                                cwd,
                                resolved.display()
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_symlink_out_of_root_is_refused() {
        let (_dir, root) = setup();
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("secret"), b"x").unwrap();
        symlink(outside.path(), root.join("escape")).unwrap();

        assert_eq!(
            resolve("/", &root, false, Some("escape/secret")),
            Err(SandboxError::OutsideRoot)
        );
        assert_eq!(
            resolve("/", &root, false, Some("escape/new-file")),
            Err(SandboxError::OutsideRoot)
        );
    }

    #[test]
    fn test_dangling_symlink_is_not_found() {
        let (_dir, root) = setup();
        symlink("/nonexistent/target/file", root.join("dangling")).unwrap();
        assert_eq!(
            resolve("/", &root, false, Some("dangling")),
            Err(SandboxError::NotFound)
        );
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let (_dir, root) = setup();
        let first = resolve("/pub", &root, false, Some("reports")).unwrap();
        let visible = visible_path(&root, false, &first);
        assert_eq!(visible, "/pub/reports");
        assert_eq!(resolve("/", &root, false, Some(&visible)).unwrap(), first);
        assert_eq!(resolve(&visible, &root, false, None).unwrap(), first);

        // Inside a chroot the canonical path is already what the client sees.
        let chrooted = resolve("/", Path::new("/"), true, first.to_str()).unwrap();
        assert_eq!(chrooted, first);
    }

    #[test]
    fn test_resolve_absolute_ignores_cwd() {
        let (_dir, root) = setup();
        assert_eq!(
            resolve_absolute("/pub/reports", &root, false, Some("/pub/readme.txt")).unwrap(),
            root.join("pub/readme.txt")
        );
        assert_eq!(
            resolve_absolute("/pub", &root, false, Some("readme.txt")).unwrap(),
            root.join("pub/readme.txt")
        );
    }

    #[test]
    fn test_resolve_absolute_agrees_with_resolve() {
        let (_dir, root) = setup();
        for (cwd, path) in [
            ("/pub", Some("/pub/reports")),
            ("/pub/reports", Some("..")),
            ("/pub", Some("new.txt")),
            ("/pub", None),
            ("/", Some("../../etc")),
        ] {
            assert_eq!(
                resolve_absolute(cwd, &root, false, path),
                resolve(cwd, &root, false, path),
                "{} {:?}",
                cwd,
                path
            );
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("//pub//./reports/"), "/pub/reports");
        assert_eq!(normalize("/pub/../../.."), "/");
        assert_eq!(normalize("a/b/../c"), "/a/c");
    }

    #[test]
    fn test_visible_path() {
        let root = Path::new("/srv/ftp");
        assert_eq!(visible_path(root, false, Path::new("/srv/ftp")), "/");
        assert_eq!(visible_path(root, false, Path::new("/srv/ftp/a/b")), "/a/b");
        assert_eq!(visible_path(root, true, Path::new("/a/b")), "/a/b");
    }
}
