use crate::helpers::send_response;
use crate::session::{DataChannel, Session};
use log::info;

/// Handles the ABOR FTP command.
///
/// Drops whatever transfer and data connection exist. The 426 is only sent
/// when there was something to abort, the 226 always follows.
pub async fn handle_abor_command(
    session: &mut Session,
    _arg: Option<&str>,
) -> Result<(), std::io::Error> {
    let active = session.busy()
        || matches!(
            session.data,
            DataChannel::Listening(_) | DataChannel::Connecting(_) | DataChannel::Open(_)
        );

    session.close_data();
    session.release_transfer();

    if active {
        info!("Transfer with {} aborted by client", session.peer);
        send_response(
            &mut session.writer,
            b"426 Connection closed; transfer aborted.\r\n",
        )
        .await?;
    }
    send_response(&mut session.writer, b"226 Closing data connection.\r\n").await
}

#[cfg(test)]
mod tests {
    use crate::core_network::network::tests::start_server;
    use std::fs;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_abor_clears_rest_offset() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("a.txt"), b"alpha").unwrap();
        let mut client = start_server(root.path()).await;

        client.cmd("REST 3").await;
        client.cmd("PASV").await;
        assert_eq!(
            client.cmd("ABOR").await,
            "426 Connection closed; transfer aborted.\r\n"
        );
        assert_eq!(client.reply().await, "226 Closing data connection.\r\n");

        let mut data = client.pasv().await;
        let started = client.cmd("RETR a.txt").await;
        assert!(started.starts_with("125 ") || started.starts_with("150 "));
        let mut received = Vec::new();
        data.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"alpha");
        assert_eq!(client.reply().await, "226 Transfer complete.\r\n");
    }
}
