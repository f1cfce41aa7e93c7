use crate::core_ftpcommand::utils::fs_error_reply;
use crate::helpers::send_response;
use crate::session::Session;
use log::{info, warn};
use tokio::fs;

/// Handles the RMD (Remove Directory) FTP command. Only empty directories go.
pub async fn handle_rmd_command(
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

    if path == session.root {
        return send_response(
            &mut session.writer,
            b"550 Not allowed to remove file or directory.\r\n",
        )
        .await;
    }

    match fs::remove_dir(&path).await {
        Ok(()) => {
            info!("Client {} removed {}", session.peer, session.visible(&path));
            send_response(&mut session.writer, b"200 Command OK\r\n").await
        }
        Err(e) => {
            warn!("Failed removing directory {}: {}", path.display(), e);
            let reply = fs_error_reply(&e, b"550 Not allowed to remove file or directory.\r\n");
            send_response(&mut session.writer, reply).await
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::core_network::network::tests::start_server;
    use std::fs;

    #[tokio::test]
    async fn test_rmd() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("empty")).unwrap();
        fs::create_dir(root.path().join("full")).unwrap();
        fs::write(root.path().join("full/file"), b"x").unwrap();
        let mut client = start_server(root.path()).await;

        assert_eq!(client.cmd("RMD empty").await, "200 Command OK\r\n");
        assert!(!root.path().join("empty").exists());
        assert_eq!(client.cmd("RMD full").await, "550 Unknown error.\r\n");
        assert_eq!(client.cmd("RMD empty").await, "550 No such file or directory.\r\n");
        assert_eq!(
            client.cmd("RMD /").await,
            "550 Not allowed to remove file or directory.\r\n"
        );
        assert!(root.path().exists());
    }
}
