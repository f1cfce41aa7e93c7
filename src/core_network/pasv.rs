use crate::core_ftpcommand::utils::refuse_if_busy;
use crate::helpers::send_response;
use crate::session::Session;
use log::{debug, error};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::TcpListener;

/// Formats the 227 reply for a passive listener.
pub fn format_pasv_reply(ip: Ipv4Addr, port: u16) -> String {
    let octets = ip.octets();
    format!(
        "227 Entering Passive Mode ({},{},{},{},{},{})\r\n",
        octets[0],
        octets[1],
        octets[2],
        octets[3],
        port >> 8,
        port & 0xff
    )
}

/// Opens a listener on `ip`, the address the client reached us on.
async fn open_listener(ip: IpAddr) -> std::io::Result<(TcpListener, u16)> {
    let listener = TcpListener::bind(SocketAddr::new(ip, 0)).await?;
    let port = listener.local_addr()?.port();
    Ok((listener, port))
}

fn advertised_ipv4(session: &Session) -> Option<Ipv4Addr> {
    if let Some(addr) = session.pasv_address {
        return Some(addr);
    }
    match session.local.ip() {
        IpAddr::V4(ip) => Some(ip),
        IpAddr::V6(ip) => ip.to_ipv4_mapped(),
    }
}

/// Handles the PASV (Passive Mode) FTP command.
///
/// # Arguments
///
/// * `session` - The client session; its data channel becomes a listener.
/// * `_arg` - Ignored.
///
/// # Returns
///
/// Result<(), std::io::Error> indicating whether the reply could be sent.
pub async fn handle_pasv_command(
    session: &mut Session,
    _arg: Option<&str>,
) -> Result<(), std::io::Error> {
    if refuse_if_busy(session).await? {
        return Ok(());
    }

    let ip = match advertised_ipv4(session) {
        Some(ip) => ip,
        None => {
            return send_response(
                &mut session.writer,
                b"425 PASV needs an IPv4 control connection, use EPSV.\r\n",
            )
            .await;
        }
    };

    let (listener, port) = match open_listener(session.local.ip()).await {
        Ok(bound) => bound,
        Err(e) => {
            error!("Failed to open passive listener: {}", e);
            return send_response(&mut session.writer, b"426 Internal server error.\r\n").await;
        }
    };

    debug!("Passive listener for {} on port {}", session.peer, port);
    session.set_listener(listener);
    let reply = format_pasv_reply(ip, port);
    send_response(&mut session.writer, reply.as_bytes()).await
}

/// Handles the EPSV (Extended Passive Mode) FTP command.
pub async fn handle_epsv_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<(), std::io::Error> {
    if arg.map_or(false, |arg| arg.eq_ignore_ascii_case("ALL")) {
        return send_response(&mut session.writer, b"200 Command OK\r\n").await;
    }

    if refuse_if_busy(session).await? {
        return Ok(());
    }

    let (listener, port) = match open_listener(session.local.ip()).await {
        Ok(bound) => bound,
        Err(e) => {
            error!("Failed to open passive listener: {}", e);
            return send_response(&mut session.writer, b"426 Internal server error.\r\n").await;
        }
    };

    debug!("Extended passive listener for {} on port {}", session.peer, port);
    session.set_listener(listener);
    let reply = format!("229 Entering Extended Passive Mode (|||{}|)\r\n", port);
    send_response(&mut session.writer, reply.as_bytes()).await
}
