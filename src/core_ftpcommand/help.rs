use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::helpers::send_response;
use crate::session::Session;

/// Verbs per line in the HELP listing.
const HELP_COLUMNS: usize = 14;

fn help_text() -> String {
    let mut text = String::from("214-The following commands are recognized.");
    for (i, command) in FtpCommand::ALL.iter().enumerate() {
        if i % HELP_COLUMNS == 0 {
            text.push_str("\r\n");
        }
        text.push(' ');
        text.push_str(command.as_str());
    }
    text.push_str("\r\n214 Help OK.\r\n");
    text
}

/// Handles the HELP FTP command.
pub async fn handle_help_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<(), std::io::Error> {
    if let Some(arg) = arg {
        if !arg.eq_ignore_ascii_case("SITE") {
            return send_response(
                &mut session.writer,
                b"500 command HELP does not take any arguments on this server.\r\n",
            )
            .await;
        }
    }
    send_response(&mut session.writer, help_text().as_bytes()).await
}
