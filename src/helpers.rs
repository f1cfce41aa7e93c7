use log::debug;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;

/// Lowest telnet command byte (SE). IAC, IP and DM all sit at or above it.
const TELNET_COMMAND_MIN: u8 = 0xf0;

/// Sends a response to the client.
pub async fn send_response(
    writer: &mut OwnedWriteHalf,
    message: &[u8],
) -> Result<(), std::io::Error> {
    debug!("Send: {}", String::from_utf8_lossy(message).trim_end());
    writer.write_all(message).await?;
    Ok(())
}

/// Drops the telnet command bytes some clients put in front of ABOR and friends.
///
/// Covers `IAC IP IAC DM` sent in band as well as the same sequence with the
/// `IAC` eaten by urgent-mode delivery, which leaves a bare `DM`.
pub fn strip_telnet(line: &[u8]) -> &[u8] {
    let start = line
        .iter()
        .position(|&b| b < TELNET_COMMAND_MIN)
        .unwrap_or(line.len());
    &line[start..]
}

/// Splits a control line into its upper-cased verb and an optional argument.
///
/// Returns `None` for a line holding nothing but whitespace.
pub fn split_command(line: &str) -> Option<(String, Option<String>)> {
    let line = line.trim_end_matches(['\r', '\n']).trim_start();
    if line.trim().is_empty() {
        return None;
    }
    let (verb, arg) = match line.split_once(' ') {
        Some((verb, arg)) => (verb, Some(arg)),
        None => (line, None),
    };
    let arg = arg
        .map(|arg| arg.trim_start_matches(' '))
        .filter(|arg| !arg.is_empty())
        .map(str::to_string);
    Some((verb.to_ascii_uppercase(), arg))
}
