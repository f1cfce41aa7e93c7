use crate::helpers::send_response;
use crate::session::Session;
use std::io;

/// Answers 503 when a transfer is already pending or streaming.
///
/// Returns `true` when the command was refused and must not run.
pub async fn refuse_if_busy(session: &mut Session) -> Result<bool, io::Error> {
    if !session.busy() {
        return Ok(false);
    }
    send_response(
        &mut session.writer,
        b"503 Transfer already in progress, send ABOR first.\r\n",
    )
    .await?;
    Ok(true)
}

/// Maps a failed DELE/RMD/MKD to its 550 reply.
pub fn fs_error_reply(e: &io::Error, not_allowed: &'static [u8]) -> &'static [u8] {
    match e.kind() {
        io::ErrorKind::NotFound => b"550 No such file or directory.\r\n",
        io::ErrorKind::PermissionDenied => not_allowed,
        _ => b"550 Unknown error.\r\n",
    }
}

/// Strips `ls` style flags and double quotes from a LIST/NLST argument.
///
/// Returns `None` when nothing but flags is left.
pub fn clean_list_argument(arg: &str) -> Option<String> {
    let mut rest = arg.trim_start();
    if rest.starts_with('-') {
        rest = match rest.find(char::is_whitespace) {
            Some(end) => rest[end..].trim_start(),
            None => "",
        };
    }
    let cleaned: String = rest.chars().filter(|c| *c != '"').collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
