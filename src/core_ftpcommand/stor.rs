use crate::core_network::begin_transfer;
use crate::core_transfer::TransferCursor;
use crate::helpers::send_response;
use crate::session::{PendingOp, Session};
use log::{error, info};
use tokio::fs::OpenOptions;

/// Handles the STOR (Store) FTP command.
///
/// The target's parent directory must exist. After REST the file is kept
/// and written from the offset, otherwise it is truncated.
pub async fn handle_stor_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<(), std::io::Error> {
    let path = match arg.map(|_| session.resolve(arg)) {
        Some(Ok(path)) => path,
        _ => {
            error!("Invalid STOR path {:?} from {}", arg, session.peer);
            return send_response(&mut session.writer, b"451 Trouble storing file.\r\n").await;
        }
    };

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(session.offset == 0)
        .open(&path)
        .await;
    let file = match file {
        Ok(file) => file,
        Err(e) => {
            error!("Failed opening file {} for writing: {}", path.display(), e);
            return send_response(&mut session.writer, b"451 Trouble storing file.\r\n").await;
        }
    };

    let name = session.visible(&path);
    info!("Client {} storing {}", session.peer, name);
    begin_transfer(session, PendingOp::Store, TransferCursor::store(file, name)).await
}

#[cfg(test)]
mod tests {
    use crate::core_network::network::tests::start_server;
    use std::fs;

    #[tokio::test]
    async fn test_stor_refusals() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("pub")).unwrap();
        let mut client = start_server(root.path()).await;

        assert_eq!(client.cmd("STOR").await, "451 Trouble storing file.\r\n");
        assert_eq!(
            client.cmd("STOR missing/dir/file.bin").await,
            "451 Trouble storing file.\r\n"
        );
        assert_eq!(client.cmd("STOR pub").await, "451 Trouble storing file.\r\n");
        assert!(!root.path().join("missing").exists());
    }
}
