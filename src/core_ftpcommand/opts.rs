use crate::core_transfer::listing::{describe_facts, parse_mlst_facts};
use crate::helpers::send_response;
use crate::session::Session;

/// Handles the OPTS FTP command.
///
/// `OPTS MLST fact;fact;...` picks the facts MLST and MLSD report. Anything
/// else, typically `OPTS UTF8 ON`, is acknowledged as is.
pub async fn handle_opts_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<(), std::io::Error> {
    let (option, value) = match arg {
        Some(arg) => match arg.split_once(' ') {
            Some((option, value)) => (option, value),
            None => (arg, ""),
        },
        None => ("", ""),
    };

    if !option.eq_ignore_ascii_case("MLST") {
        return send_response(&mut session.writer, b"200 UTF8 OPTS ON\r\n").await;
    }

    session.mlst_facts = parse_mlst_facts(value);
    let response = format!("200 MLST OPTS {}\r\n", describe_facts(&session.mlst_facts));
    send_response(&mut session.writer, response.as_bytes()).await
}
