use crate::core_ftpcommand::utils::clean_list_argument;
use crate::core_network::begin_transfer;
use crate::core_sandbox::SandboxError;
use crate::core_transfer::listing::{self, entry_for, format_facts};
use crate::core_transfer::{ListFormat, TransferCursor};
use crate::helpers::send_response;
use crate::session::{PendingOp, Session};
use log::{debug, warn};
use std::io;
use std::path::PathBuf;

/// Handles the LIST FTP command.
///
/// Sends `ls -l` style lines over the data channel. `ls` flags given by the
/// client are skipped.
///
/// # Arguments
///
/// * `session` - The client session.
/// * `arg` - Optional directory or file, relative to the working directory.
///
/// # Returns
///
/// Result<(), std::io::Error> indicating whether the control connection is still usable.
pub async fn handle_list_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<(), std::io::Error> {
    let arg = arg.and_then(clean_list_argument);
    let target = session.resolve(arg.as_deref());
    list_over_data(session, target, ListFormat::Long).await
}

/// Handles the NLST FTP command: bare names over the data channel.
pub async fn handle_nlst_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<(), std::io::Error> {
    let arg = arg.and_then(clean_list_argument);
    let target = session.resolve(arg.as_deref());
    list_over_data(session, target, ListFormat::Names).await
}

/// Handles the MLSD FTP command: machine readable facts over the data channel.
pub async fn handle_mlsd_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<(), std::io::Error> {
    let target = session.resolve_absolute(arg);
    let format = ListFormat::Facts(session.mlst_facts.clone());
    list_over_data(session, target, format).await
}

/// Handles the MLST FTP command.
///
/// Unlike MLSD the facts of the single target go out on the control channel.
pub async fn handle_mlst_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<(), std::io::Error> {
    let entry = match session.resolve_absolute(arg) {
        Ok(path) => entry_for(&path),
        Err(e) => return send_response(&mut session.writer, e.to_ftp_response()).await,
    };
    let entry = match entry {
        Ok(entry) => entry,
        Err(_) => {
            return send_response(&mut session.writer, b"550 No such file or directory.\r\n")
                .await;
        }
    };

    let name = session.visible(&entry.path);
    let response = format!(
        "250-Listing {}\r\n {} {}\r\n250 End.\r\n",
        arg.unwrap_or(name.as_str()),
        format_facts(&entry, &session.mlst_facts),
        name
    );
    send_response(&mut session.writer, response.as_bytes()).await
}

async fn list_over_data(
    session: &mut Session,
    target: Result<PathBuf, SandboxError>,
    format: ListFormat,
) -> Result<(), std::io::Error> {
    let path = match target {
        Ok(path) => path,
        Err(e) => return send_response(&mut session.writer, e.to_ftp_response()).await,
    };

    let entries = match take_snapshot(path.clone(), session.root.clone(), format.clone()).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed reading directory {}: {}", path.display(), e);
            return send_response(&mut session.writer, b"550 No such file or directory.\r\n")
                .await;
        }
    };

    debug!(
        "Reading directory {} ... {} number of entries",
        path.display(),
        entries.len()
    );
    begin_transfer(session, PendingOp::List, TransferCursor::list(entries, format)).await
}

async fn take_snapshot(
    path: PathBuf,
    root: PathBuf,
    format: ListFormat,
) -> io::Result<Vec<listing::ListEntry>> {
    tokio::task::spawn_blocking(move || listing::snapshot(&path, &root, &format))
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
}
