use crate::config::ServerConfig;
use crate::session::SessionError;
use log::{info, warn};
use nix::unistd::{chdir, chroot, getegid, geteuid, initgroups, setegid, seteuid, User};
use std::ffi::CString;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

/// Outcome of confining the process to the FTP root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confinement {
    /// Root as seen by the sandbox, `/` once chrooted.
    pub root: PathBuf,
    pub chrooted: bool,
}

/// Performs the one-time root confinement and privilege drop.
pub trait Confiner: Send + Sync {
    fn confine(&self, root: &Path, settings: &ServerConfig) -> Result<Confinement, SessionError>;
}

/// Confines the real process: chroot when privileged, chdir otherwise.
pub struct OsConfiner;

/// Leaves the process alone. The sandbox alone keeps clients below `root`.
pub struct Unconfined;

impl Confiner for Unconfined {
    fn confine(&self, root: &Path, _settings: &ServerConfig) -> Result<Confinement, SessionError> {
        Ok(Confinement {
            root: root.to_path_buf(),
            chrooted: false,
        })
    }
}

impl Confiner for OsConfiner {
    fn confine(&self, root: &Path, settings: &ServerConfig) -> Result<Confinement, SessionError> {
        let privileged = geteuid().is_root();

        // Look the user up while /etc/passwd is still reachable.
        let user = if privileged {
            match User::from_name(&settings.ftp_user) {
                Ok(Some(user)) => Some(user),
                Ok(None) => {
                    warn!(
                        "User {} does not exist, keeping current privileges",
                        settings.ftp_user
                    );
                    None
                }
                Err(e) => {
                    warn!("Failed looking up user {}: {}", settings.ftp_user, e);
                    None
                }
            }
        } else {
            None
        };

        let chrooted = if privileged {
            chroot(root).map_err(|e| {
                SessionError::Confinement(format!("chroot({}): {}", root.display(), e))
            })?;
            chdir("/").map_err(|e| SessionError::Confinement(format!("chdir(/): {}", e)))?;
            true
        } else {
            chdir(root).map_err(|e| {
                SessionError::Confinement(format!("chdir({}): {}", root.display(), e))
            })?;
            false
        };

        if let Some(user) = user {
            drop_privileges(&user);
        }

        let served = if chrooted { Path::new("/") } else { root };
        if !settings.writable && writable_by_us(served) {
            return Err(SessionError::WritableRoot(root.display().to_string()));
        }

        info!(
            "Serving {}{}",
            root.display(),
            if chrooted { " (chrooted)" } else { "" }
        );

        Ok(Confinement {
            root: served.to_path_buf(),
            chrooted,
        })
    }
}

fn drop_privileges(user: &User) {
    match CString::new(user.name.as_str()) {
        Ok(name) => {
            if let Err(e) = initgroups(&name, user.gid) {
                warn!("Failed setting supplementary groups for {}: {}", user.name, e);
            }
        }
        Err(e) => warn!("Invalid user name {}: {}", user.name, e),
    }
    if let Err(e) = setegid(user.gid) {
        warn!("Failed dropping group privileges to {}: {}", user.gid, e);
    }
    if let Err(e) = seteuid(user.uid) {
        warn!("Failed dropping user privileges to {}: {}", user.uid, e);
    }
}

/// Checks the mode bits of `path` against our effective uid and gid.
fn writable_by_us(path: &Path) -> bool {
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(_) => return false,
    };
    let mode = meta.mode();
    if geteuid().as_raw() == meta.uid() {
        mode & 0o200 != 0
    } else if getegid().as_raw() == meta.gid() {
        mode & 0o020 != 0
    } else {
        mode & 0o002 != 0
    }
}
