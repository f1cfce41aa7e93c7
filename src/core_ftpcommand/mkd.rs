use crate::core_ftpcommand::utils::fs_error_reply;
use crate::helpers::send_response;
use crate::session::Session;
use log::{info, warn};
use std::os::unix::fs::DirBuilderExt;

/// Handles the MKD (Make Directory) FTP command.
///
/// The new directory gets mode 0755 and is reported back with its full
/// client-visible path.
///
/// # Arguments
///
/// * `session` - The client session.
/// * `arg` - The directory to create. Its parent must already exist.
///
/// # Returns
///
/// Result<(), std::io::Error> indicating the success or failure of the operation.
pub async fn handle_mkd_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<(), std::io::Error> {
    let path = match arg.map(|_| session.resolve_absolute(arg)) {
        Some(Ok(path)) => path,
        _ => {
            return send_response(&mut session.writer, b"550 No such file or directory.\r\n")
                .await;
        }
    };

    let mut builder = std::fs::DirBuilder::new();
    builder.mode(0o755);
    let target = path.clone();
    let created = tokio::task::spawn_blocking(move || builder.create(&target))
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
        .and_then(|result| result);

    match created {
        Ok(()) => {
            let visible = session.visible(&path);
            info!("Client {} created {}", session.peer, visible);
            let reply = format!("257 \"{}\" created.\r\n", visible);
            send_response(&mut session.writer, reply.as_bytes()).await
        }
        Err(e) => {
            warn!("Failed creating directory {}: {}", path.display(), e);
            let reply = fs_error_reply(&e, b"550 Not allowed to create directory.\r\n");
            send_response(&mut session.writer, reply).await
        }
    }
}
