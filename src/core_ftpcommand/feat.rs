use crate::helpers::send_response;
use crate::session::Session;

/// Handles the FEAT FTP command.
pub async fn handle_feat_command(
    session: &mut Session,
    _arg: Option<&str>,
) -> Result<(), std::io::Error> {
    let features = "211-Features:\r\n \
                    EPSV\r\n \
                    PASV\r\n \
                    SIZE\r\n \
                    UTF8\r\n \
                    REST STREAM\r\n \
                    MLST modify*;perm*;size*;type*;\r\n\
                    211 End\r\n";
    send_response(&mut session.writer, features.as_bytes()).await
}

#[cfg(test)]
mod tests {
    use crate::core_network::network::tests::start_server;

    #[tokio::test]
    async fn test_feat() {
        let root = tempfile::tempdir().unwrap();
        let mut client = start_server(root.path()).await;

        assert_eq!(
            client.cmd("FEAT").await,
            "211-Features:\r\n EPSV\r\n PASV\r\n SIZE\r\n UTF8\r\n REST STREAM\r\n MLST modify*;perm*;size*;type*;\r\n211 End\r\n"
        );
    }
}
