use crate::core_ftpcommand::utils::refuse_if_busy;
use crate::helpers::send_response;
use crate::session::Session;
use log::{debug, warn};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Parses the `h1,h2,h3,h4,p1,p2` argument of PORT.
pub fn parse_port_argument(arg: &str) -> Option<SocketAddr> {
    let parts: Vec<u8> = arg
        .trim()
        .split(',')
        .map(|part| part.trim().parse::<u8>())
        .collect::<Result<_, _>>()
        .ok()?;
    if parts.len() != 6 {
        return None;
    }
    let ip = Ipv4Addr::new(parts[0], parts[1], parts[2], parts[3]);
    let port = (parts[4] as u16) << 8 | parts[5] as u16;
    Some(SocketAddr::new(IpAddr::V4(ip), port))
}

/// Parses the `|proto|address|port|` argument of EPRT (RFC 2428).
pub fn parse_eprt_argument(arg: &str) -> Option<SocketAddr> {
    let arg = arg.trim();
    let delimiter = arg.chars().next()?;
    let fields: Vec<&str> = arg.split(delimiter).collect();
    if fields.len() != 5 || !fields[0].is_empty() || !fields[4].is_empty() {
        return None;
    }
    let ip: IpAddr = match fields[1] {
        "1" => IpAddr::V4(fields[2].parse().ok()?),
        "2" => IpAddr::V6(fields[2].parse().ok()?),
        _ => return None,
    };
    let port: u16 = fields[3].parse().ok()?;
    Some(SocketAddr::new(ip, port))
}

/// Handles the PORT (Active Mode) FTP command.
///
/// The address is only recorded here; the connection is made when a
/// transfer command needs it.
pub async fn handle_port_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<(), std::io::Error> {
    if refuse_if_busy(session).await? {
        return Ok(());
    }

    let arg = match arg {
        Some(arg) => arg,
        None => {
            return send_response(&mut session.writer, b"500 No PORT specified.\r\n").await;
        }
    };

    match parse_port_argument(arg) {
        Some(addr) => {
            debug!("Client {} wants data on {}", session.peer, addr);
            session.set_target(addr);
            send_response(&mut session.writer, b"200 PORT command successful.\r\n").await
        }
        None => {
            warn!("Illegal PORT argument from {}: {}", session.peer, arg);
            send_response(&mut session.writer, b"500 Illegal PORT command.\r\n").await
        }
    }
}

pub async fn handle_eprt_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<(), std::io::Error> {
    if refuse_if_busy(session).await? {
        return Ok(());
    }

    match arg.and_then(parse_eprt_argument) {
        Some(addr) => {
            debug!("Client {} wants data on {}", session.peer, addr);
            session.set_target(addr);
            send_response(&mut session.writer, b"200 EPRT command successful.\r\n").await
        }
        None => {
            warn!("Illegal EPRT argument from {}: {:?}", session.peer, arg);
            send_response(&mut session.writer, b"501 Illegal EPRT command.\r\n").await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_port_argument() {
        assert_eq!(
            parse_port_argument("127,0,0,1,200,5"),
            Some("127.0.0.1:51205".parse().unwrap())
        );
        assert_eq!(
            parse_port_argument(" 10, 1, 2, 3, 0, 21 "),
            Some("10.1.2.3:21".parse().unwrap())
        );
        assert_eq!(parse_port_argument("127,0,0,1,200"), None);
        assert_eq!(parse_port_argument("127,0,0,1,256,5"), None);
        assert_eq!(parse_port_argument("a,b,c,d,e,f"), None);
        assert_eq!(parse_port_argument(""), None);
    }

    #[test]
    fn test_parse_eprt_argument() {
        assert_eq!(
            parse_eprt_argument("|1|132.235.1.2|6275|"),
            Some("132.235.1.2:6275".parse().unwrap())
        );
        assert_eq!(
            parse_eprt_argument("|2|::1|5282|"),
            Some("[::1]:5282".parse().unwrap())
        );
        assert_eq!(
            parse_eprt_argument("!1!10.0.0.1!21!"),
            Some("10.0.0.1:21".parse().unwrap())
        );
        assert_eq!(parse_eprt_argument("|3|10.0.0.1|21|"), None);
        assert_eq!(parse_eprt_argument("|1|::1|21|"), None);
        assert_eq!(parse_eprt_argument("|1|10.0.0.1|70000|"), None);
        assert_eq!(parse_eprt_argument("1|10.0.0.1|21"), None);
    }
}
