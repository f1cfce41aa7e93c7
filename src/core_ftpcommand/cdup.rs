use crate::core_ftpcommand::cwd::handle_cwd_command;
use crate::session::Session;

/// Handles the CDUP FTP command, the same as `CWD ..`.
pub async fn handle_cdup_command(
    session: &mut Session,
    _arg: Option<&str>,
) -> Result<(), std::io::Error> {
    handle_cwd_command(session, Some("..")).await
}
