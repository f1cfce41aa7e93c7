use crate::core_transfer::listing::utc_stamp;
use crate::helpers::send_response;
use crate::session::Session;
use chrono::NaiveDateTime;
use filetime::FileTime;
use log::{debug, warn};

/// Splits `[YYYYMMDDHHMMSS ]file` into the optional timestamp and the file.
fn split_mdtm_argument(arg: &str) -> (Option<&str>, &str) {
    match arg.split_once(' ') {
        Some((stamp, file))
            if stamp.len() == 14 && stamp.bytes().all(|b| b.is_ascii_digit()) =>
        {
            (Some(stamp), file.trim_start())
        }
        _ => (None, arg),
    }
}

/// Parses an MDTM timestamp, taken as UTC.
fn parse_stamp(stamp: &str) -> Option<FileTime> {
    let time = NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S").ok()?;
    Some(FileTime::from_unix_time(time.and_utc().timestamp(), 0))
}

/// Handles the MDTM (Modification Time) FTP command.
///
/// With a leading timestamp the file's modification time is set first.
/// Either way the reply carries the current modification time in UTC.
///
/// # Arguments
///
/// * `session` - The client session.
/// * `arg` - `[YYYYMMDDHHMMSS ]file`.
///
/// # Returns
///
/// Result<(), std::io::Error> indicating the success or failure of the operation.
pub async fn handle_mdtm_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<(), std::io::Error> {
    let (stamp, file) = match arg {
        Some(arg) => split_mdtm_argument(arg),
        None => (None, ""),
    };

    let path = match session.resolve_absolute(Some(file).filter(|file| !file.is_empty())) {
        Ok(path) if path.is_file() => path,
        _ => return send_response(&mut session.writer, b"550 Not a regular file.\r\n").await,
    };

    if let Some(stamp) = stamp {
        let mtime = match parse_stamp(stamp) {
            Some(mtime) => mtime,
            None => {
                return send_response(&mut session.writer, b"550 Invalid time format\r\n").await;
            }
        };
        if let Err(e) = filetime::set_file_mtime(&path, mtime) {
            warn!("Failed setting mtime of {}: {}", path.display(), e);
            return send_response(&mut session.writer, b"550 Invalid time format\r\n").await;
        }
        debug!("Set mtime of {} to {}", path.display(), stamp);
    }

    let meta = match tokio::fs::metadata(&path).await {
        Ok(meta) => meta,
        Err(_) => return send_response(&mut session.writer, b"550 Not a regular file.\r\n").await,
    };
    let response = format!("213 {}\r\n", utc_stamp(&meta));
    send_response(&mut session.writer, response.as_bytes()).await
}
