use crate::helpers::send_response;
use crate::session::Session;

/// Handles the PWD (Print Working Directory) FTP command.
///
/// # Arguments
///
/// * `session` - The client session.
/// * `_arg` - Ignored.
///
/// # Returns
///
/// Result<(), std::io::Error> indicating the success or failure of the operation.
pub async fn handle_pwd_command(
    session: &mut Session,
    _arg: Option<&str>,
) -> Result<(), std::io::Error> {
    let response = format!("257 \"{}\"\r\n", session.cwd);
    send_response(&mut session.writer, response.as_bytes()).await
}
