use crate::core_ftpcommand::utils::fs_error_reply;
use crate::helpers::send_response;
use crate::session::Session;
use log::{info, warn};
use tokio::fs;

/// Handles the DELE (Delete) FTP command.
///
/// # Arguments
///
/// * `session` - The client session.
/// * `arg` - The file to delete.
///
/// # Returns
///
/// Result<(), std::io::Error> indicating the success or failure of the operation.
pub async fn handle_dele_command(
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

    match fs::remove_file(&path).await {
        Ok(()) => {
            info!("Client {} deleted {}", session.peer, session.visible(&path));
            send_response(&mut session.writer, b"200 Command OK\r\n").await
        }
        Err(e) => {
            warn!("Failed deleting {}: {}", path.display(), e);
            let reply = fs_error_reply(&e, b"550 Not allowed to remove file or directory.\r\n");
            send_response(&mut session.writer, reply).await
        }
    }
}
