use crate::helpers::send_response;
use crate::session::{Session, TransferType};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Counts `\n` bytes, each becomes `\r\n` in ASCII mode.
async fn count_newlines(path: &Path) -> std::io::Result<u64> {
    let mut file = File::open(path).await?;
    let mut buf = vec![0u8; crate::constants::BUFFER_SIZE];
    let mut count = 0u64;
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            return Ok(count);
        }
        count += buf[..n].iter().filter(|b| **b == b'\n').count() as u64;
    }
}

/// Handles the SIZE FTP command.
///
/// # Arguments
///
/// * `session` - The client session.
/// * `arg` - The file to measure.
///
/// # Returns
///
/// Result<(), std::io::Error> indicating the success or failure of the operation.
pub async fn handle_size_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<(), std::io::Error> {
    let missing: &[u8] = b"550 No such file, or argument is a directory.\r\n";

    let path = match arg.map(|_| session.resolve_absolute(arg)) {
        Some(Ok(path)) => path,
        _ => return send_response(&mut session.writer, missing).await,
    };
    let meta = match tokio::fs::metadata(&path).await {
        Ok(meta) if !meta.is_dir() => meta,
        _ => return send_response(&mut session.writer, missing).await,
    };

    let mut size = meta.len();
    if session.transfer_type == TransferType::Ascii {
        size += match count_newlines(&path).await {
            Ok(extra) => extra,
            Err(_) => return send_response(&mut session.writer, missing).await,
        };
    }

    let response = format!("213 {}\r\n", size);
    send_response(&mut session.writer, response.as_bytes()).await
}

#[cfg(test)]
mod tests {
    use crate::core_network::network::tests::start_server;
    use std::fs;

    #[tokio::test]
    async fn test_size_binary_and_ascii() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("lines.txt"), b"one\ntwo\nthree\n").unwrap();
        fs::create_dir(root.path().join("pub")).unwrap();
        let mut client = start_server(root.path()).await;

        assert_eq!(client.cmd("SIZE lines.txt").await, "213 14\r\n");
        client.cmd("TYPE A").await;
        assert_eq!(client.cmd("SIZE /lines.txt").await, "213 17\r\n");
        assert_eq!(
            client.cmd("SIZE pub").await,
            "550 No such file, or argument is a directory.\r\n"
        );
        assert_eq!(
            client.cmd("SIZE missing").await,
            "550 No such file, or argument is a directory.\r\n"
        );
    }
}
