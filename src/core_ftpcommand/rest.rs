use crate::helpers::send_response;
use crate::session::Session;

/// Handles the REST (Restart) FTP command.
///
/// The offset only applies to the next RETR or STOR.
pub async fn handle_rest_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<(), std::io::Error> {
    let offset = match arg.and_then(|arg| arg.trim().parse::<u64>().ok()) {
        Some(offset) => offset,
        None => return send_response(&mut session.writer, b"501 Invalid argument.\r\n").await,
    };

    session.offset = offset;
    let response = format!(
        "350 Restarting at {}.  Send STOR or RETR to continue transfer.\r\n",
        offset
    );
    send_response(&mut session.writer, response.as_bytes()).await
}
