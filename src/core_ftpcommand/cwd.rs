use crate::helpers::send_response;
use crate::session::Session;
use log::debug;

/// Handles the CWD (Change Working Directory) FTP command.
///
/// Without an argument the directory is left as it is.
///
/// # Arguments
///
/// * `session` - The client session.
/// * `arg` - The directory to change to, absolute or relative to the current one.
///
/// # Returns
///
/// Result<(), std::io::Error> indicating the success or failure of the operation.
pub async fn handle_cwd_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<(), std::io::Error> {
    if arg.is_none() {
        return send_response(&mut session.writer, b"250 OK\r\n").await;
    }

    let dir = match session.resolve_absolute(arg) {
        Ok(dir) if dir.is_dir() => dir,
        _ => {
            debug!("CWD {:?} refused for {}", arg, session.peer);
            return send_response(&mut session.writer, b"550 No such directory.\r\n").await;
        }
    };

    session.cwd = session.visible(&dir);
    debug!("New working directory for {}: {}", session.peer, session.cwd);
    send_response(&mut session.writer, b"250 OK\r\n").await
}

#[cfg(test)]
mod tests {
    use crate::core_network::network::tests::start_server;
    use std::fs;

    #[tokio::test]
    async fn test_cwd_edge_cases() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("pub")).unwrap();
        fs::write(root.path().join("file.txt"), b"x").unwrap();
        let mut client = start_server(root.path()).await;

        assert_eq!(client.cmd("CWD").await, "250 OK\r\n");
        assert_eq!(client.cmd("CWD file.txt").await, "550 No such directory.\r\n");
        assert_eq!(client.cmd("CWD nowhere").await, "550 No such directory.\r\n");
        assert_eq!(client.cmd("CWD ../../..").await, "250 OK\r\n");
        assert_eq!(client.cmd("PWD").await, "257 \"/\"\r\n");

        client.cmd("CWD pub").await;
        assert_eq!(client.cmd("CDUP").await, "250 OK\r\n");
        assert_eq!(client.cmd("PWD").await, "257 \"/\"\r\n");
    }
}
