use crate::helpers::send_response;
use crate::session::Session;
use log::info;

/// Handles the QUIT FTP command.
///
/// The session loop sees `quit` and tears the session down after the reply.
///
/// # Arguments
///
/// * `session` - The client session.
/// * `_arg` - Ignored.
///
/// # Returns
///
/// Result<(), std::io::Error> indicating the success or failure of the operation.
pub async fn handle_quit_command(
    session: &mut Session,
    _arg: Option<&str>,
) -> Result<(), std::io::Error> {
    info!("Received QUIT from {}, closing connection.", session.peer);
    session.quit = true;
    send_response(&mut session.writer, b"221 Goodbye.\r\n").await
}

#[cfg(test)]
mod tests {
    use crate::core_network::network::tests::start_server;
    use std::fs;

    #[tokio::test]
    async fn test_quit_drops_pending_transfer() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("a.txt"), b"alpha").unwrap();
        let mut client = start_server(root.path()).await;

        client.cmd("PASV").await;
        client.send("RETR a.txt").await;
        assert_eq!(client.cmd("QUIT").await, "221 Goodbye.\r\n");
    }
}
