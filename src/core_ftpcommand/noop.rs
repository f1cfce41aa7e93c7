use crate::helpers::send_response;
use crate::session::Session;
use log::debug;

pub async fn handle_noop_command(
    session: &mut Session,
    _arg: Option<&str>,
) -> Result<(), std::io::Error> {
    send_response(&mut session.writer, b"200 NOOP OK.\r\n").await
}

/// CLNT only tells us the client's name, which is logged and otherwise ignored.
pub async fn handle_clnt_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<(), std::io::Error> {
    debug!("Client {} identifies as {:?}", session.peer, arg);
    send_response(&mut session.writer, b"200 CLNT\r\n").await
}
