use crate::helpers::send_response;
use crate::session::{Session, TransferType};
use log::debug;

/// Handles the TYPE FTP command.
///
/// Only `A` and `I` are accepted. The type changes what SIZE reports, file
/// contents are always sent as they are stored.
pub async fn handle_type_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<(), std::io::Error> {
    let wanted = arg.map(|arg| arg.trim().to_ascii_uppercase());
    let (transfer_type, response): (TransferType, &[u8]) = match wanted.as_deref() {
        Some("A") | Some("A N") => (TransferType::Ascii, b"200 Type set to A.\r\n"),
        Some("I") | Some("L 8") => (TransferType::Binary, b"200 Type set to I.\r\n"),
        _ => {
            return send_response(&mut session.writer, b"501 Invalid argument to TYPE.\r\n")
                .await;
        }
    };

    debug!("Transfer type for {} is now {:?}", session.peer, transfer_type);
    session.transfer_type = transfer_type;
    send_response(&mut session.writer, response).await
}

#[cfg(test)]
mod tests {
    use crate::core_network::network::tests::start_server;

    #[tokio::test]
    async fn test_type_and_syst() {
        let root = tempfile::tempdir().unwrap();
        let mut client = start_server(root.path()).await;

        assert_eq!(client.cmd("SYST").await, "215 UNIX Type: L8\r\n");
        assert_eq!(client.cmd("TYPE A").await, "200 Type set to A.\r\n");
        assert_eq!(client.cmd("type i").await, "200 Type set to I.\r\n");
        assert_eq!(client.cmd("TYPE E").await, "501 Invalid argument to TYPE.\r\n");
        assert_eq!(client.cmd("TYPE").await, "501 Invalid argument to TYPE.\r\n");
    }
}
