use crate::core_network::begin_transfer;
use crate::core_transfer::TransferCursor;
use crate::helpers::send_response;
use crate::session::{PendingOp, Session};
use log::{error, info};
use tokio::fs::File;

/// Handles the RETR (Retrieve) FTP command.
///
/// The file is opened here, before any data connection is made, so a missing
/// file is reported without touching the data channel. A pending REST offset
/// is applied once the data connection is up.
///
/// # Arguments
///
/// * `session` - The client session.
/// * `arg` - The file to send, absolute or relative to the working directory.
///
/// # Returns
///
/// Result<(), std::io::Error> indicating whether the control connection is still usable.
pub async fn handle_retr_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<(), std::io::Error> {
    let path = match session.resolve(arg) {
        Ok(path) => path,
        Err(e) => return send_response(&mut session.writer, e.to_ftp_response()).await,
    };

    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return send_response(&mut session.writer, b"550 Not a regular file.\r\n").await,
        Err(_) => {
            return send_response(&mut session.writer, b"550 No such file or directory.\r\n")
                .await;
        }
    }

    let file = match File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            error!("Failed opening file {}: {}", path.display(), e);
            return send_response(&mut session.writer, b"451 Trouble to RETR file.\r\n").await;
        }
    };

    let name = session.visible(&path);
    info!("Client {} retrieving {}", session.peer, name);
    begin_transfer(session, PendingOp::Retrieve, TransferCursor::retrieve(file, name)).await
}
