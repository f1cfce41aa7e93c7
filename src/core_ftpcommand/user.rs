use crate::helpers::send_response;
use crate::session::Session;
use log::info;

/// Handles the USER FTP command.
///
/// Every login is a guest login. `anonymous` and `ftp` are let in at once,
/// other names are asked for a password that PASS then accepts.
///
/// # Arguments
///
/// * `session` - The client session.
/// * `arg` - The username provided by the client.
///
/// # Returns
///
/// Result<(), std::io::Error> indicating the success or failure of the operation.
pub async fn handle_user_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<(), std::io::Error> {
    session.username = None;

    let username = match arg {
        Some(username) => username,
        None => {
            return send_response(&mut session.writer, b"530 You must input your name.\r\n")
                .await;
        }
    };

    session.username = Some(username.to_string());
    info!("Received USER {} from {}", username, session.peer);

    let response: &[u8] =
        if username.eq_ignore_ascii_case("anonymous") || username.eq_ignore_ascii_case("ftp") {
            b"230 Guest login OK, access restrictions apply.\r\n"
        } else {
            b"331 Login OK, please enter password.\r\n"
        };
    send_response(&mut session.writer, response).await
}
