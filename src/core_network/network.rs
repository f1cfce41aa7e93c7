use crate::constants::{MAX_COMMAND_LEN, PASV_ACCEPT_RETRIES};
use crate::core_ftpcommand::handlers::dispatch;
use crate::core_transfer::{Step, TransferCursor, TransferError};
use crate::helpers::{send_response, split_command, strip_telnet};
use crate::session::{ConnectTask, DataChannel, PendingOp, Session, SessionManager};
use log::{debug, error, info, warn};
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader, Interest};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::sleep_until;

enum Event {
    Line(io::Result<usize>),
    Data(DataEvent),
    Timeout,
}

enum DataEvent {
    Accepted(io::Result<TcpStream>),
    Connected(io::Result<TcpStream>),
    Ready(io::Result<()>),
}

/// Spawns the task serving one FTP control connection.
pub fn begin_ftp_session(manager: Arc<SessionManager>, stream: TcpStream) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (mut session, mut reader) = match manager.create(stream).await {
            Ok(created) => created,
            Err(e) => {
                error!("Failed to set up FTP session: {}", e);
                return;
            }
        };
        info!("Client {} connected", session.peer);

        if let Err(e) = serve(&mut session, &mut reader).await {
            warn!("Control connection with {} failed: {}", session.peer, e);
        }
        manager.destroy(&mut session).await;
    })
}

/// Runs the session until QUIT, disconnect, inactivity or a control channel error.
pub async fn serve(
    session: &mut Session,
    reader: &mut BufReader<OwnedReadHalf>,
) -> io::Result<()> {
    let greeting = format!(
        "220 tinyftpd ({}) ready.\r\n",
        env!("CARGO_PKG_VERSION")
    );
    send_response(&mut session.writer, greeting.as_bytes()).await?;

    let mut line: Vec<u8> = Vec::with_capacity(256);
    let mut discarding = false;

    while !session.quit {
        let armed = data_armed(session);
        let interest = session
            .cursor
            .as_ref()
            .map(TransferCursor::interest)
            .unwrap_or(Interest::WRITABLE);
        let deadline = session.deadline;
        let limit = MAX_COMMAND_LEN.saturating_sub(line.len()).max(1) as u64;
        let mut limited = (&mut *reader).take(limit);

        let event = tokio::select! {
            read = limited.read_until(b'\n', &mut line) => Event::Line(read),
            event = next_data_event(&mut session.data, interest), if armed => Event::Data(event),
            _ = sleep_until(deadline) => Event::Timeout,
        };

        match event {
            Event::Line(Ok(0)) => {
                debug!("Client {} closed the control connection", session.peer);
                break;
            }
            Event::Line(Ok(_)) => {
                if !line.ends_with(b"\n") {
                    if line.len() >= MAX_COMMAND_LEN {
                        line.clear();
                        if !discarding {
                            discarding = true;
                            send_response(&mut session.writer, b"500 Command line too long.\r\n")
                                .await?;
                        }
                    }
                    continue;
                }
                let raw = std::mem::take(&mut line);
                if std::mem::take(&mut discarding) {
                    continue;
                }
                handle_line(session, &raw).await?;
            }
            Event::Line(Err(e)) => return Err(e),
            Event::Data(event) => on_data_event(session, event).await?,
            Event::Timeout => {
                info!("Inactivity timer, closing session with {}", session.peer);
                break;
            }
        }
    }

    Ok(())
}

async fn handle_line(session: &mut Session, raw: &[u8]) -> io::Result<()> {
    let stripped = strip_telnet(raw);
    let text = String::from_utf8_lossy(stripped);
    let (verb, arg) = match split_command(&text) {
        Some(command) => command,
        None => return Ok(()),
    };

    if verb == "PASS" {
        debug!("Recv: PASS ****");
    } else {
        debug!("Recv: {}", text.trim_end());
    }
    session.touch();
    dispatch(session, &verb, arg.as_deref()).await
}

fn data_armed(session: &Session) -> bool {
    match &session.data {
        DataChannel::Listening(_) | DataChannel::Connecting(_) => true,
        DataChannel::Open(_) => session.cursor.is_some(),
        DataChannel::None | DataChannel::Target(_) => false,
    }
}

async fn next_data_event(data: &mut DataChannel, interest: Interest) -> DataEvent {
    match data {
        DataChannel::Listening(listener) => {
            DataEvent::Accepted(listener.accept().await.map(|(stream, _)| stream))
        }
        DataChannel::Connecting(connect) => DataEvent::Connected(connect.await),
        DataChannel::Open(stream) => DataEvent::Ready(stream.ready(interest).await.map(|_| ())),
        DataChannel::None | DataChannel::Target(_) => std::future::pending().await,
    }
}

async fn on_data_event(session: &mut Session, event: DataEvent) -> io::Result<()> {
    match event {
        DataEvent::Accepted(Ok(stream)) => {
            debug!("Data connection from {:?} accepted", stream.peer_addr());
            session.data = DataChannel::Open(stream);
            session.accept_failures = 0;
            session.touch();
            if session.pending != PendingOp::None {
                send_response(
                    &mut session.writer,
                    b"150 Data connection accepted; transfer starting.\r\n",
                )
                .await?;
                start_transfer(session).await?;
            }
            Ok(())
        }
        DataEvent::Accepted(Err(e)) => {
            session.accept_failures += 1;
            warn!(
                "Failed accepting data connection ({}/{}): {}",
                session.accept_failures, PASV_ACCEPT_RETRIES, e
            );
            if session.accept_failures < PASV_ACCEPT_RETRIES {
                return Ok(());
            }
            session.close_data();
            if session.busy() {
                session.release_transfer();
                send_response(&mut session.writer, b"425 Cannot open data connection.\r\n")
                    .await?;
            }
            Ok(())
        }
        DataEvent::Connected(Ok(stream)) => {
            debug!("Connected to client data port {:?}", stream.peer_addr());
            session.data = DataChannel::Open(stream);
            session.touch();
            send_response(
                &mut session.writer,
                b"150 Data connection opened; transfer starting.\r\n",
            )
            .await?;
            start_transfer(session).await
        }
        DataEvent::Connected(Err(e)) => {
            warn!("Failed connecting to client {} data port: {}", session.peer, e);
            session.close_data();
            session.release_transfer();
            send_response(
                &mut session.writer,
                b"425 TCP connection cannot be established.\r\n",
            )
            .await
        }
        DataEvent::Ready(Ok(())) => step_transfer(session).await,
        DataEvent::Ready(Err(e)) => fail_transfer(session, TransferError::Connection(e)).await,
    }
}

/// Hands a freshly prepared transfer to the data channel.
///
/// Starts at once on an open channel, dials out for PORT/EPRT, and otherwise
/// parks until the passive listener accepts.
pub async fn begin_transfer(
    session: &mut Session,
    op: PendingOp,
    cursor: TransferCursor,
) -> io::Result<()> {
    session.pending = op;
    session.cursor = Some(cursor);

    match &session.data {
        DataChannel::Open(_) => {
            send_response(
                &mut session.writer,
                b"125 Data connection already open; transfer starting.\r\n",
            )
            .await?;
            start_transfer(session).await
        }
        DataChannel::Target(addr) => {
            let addr = *addr;
            debug!("Connecting to client data port {}", addr);
            session.data = DataChannel::Connecting(ConnectTask::spawn(addr));
            Ok(())
        }
        DataChannel::Listening(_) | DataChannel::Connecting(_) => Ok(()),
        DataChannel::None => {
            session.release_transfer();
            send_response(&mut session.writer, b"425 Use PORT or PASV first.\r\n").await
        }
    }
}

/// Applies a REST offset once the data channel is ready. A failed seek ends the transfer.
async fn start_transfer(session: &mut Session) -> io::Result<()> {
    let offset = session.offset;
    if offset > 0 {
        if let Some(cursor) = session.cursor.as_mut() {
            if let Err(e) = cursor.seek(offset).await {
                warn!("Failed seeking to {}: {}", offset, e);
                session.close_data();
                session.release_transfer();
                return send_response(
                    &mut session.writer,
                    b"551 Failed seeking to that position in file.\r\n",
                )
                .await;
            }
        }
        session.offset = 0;
    }

    if let Some(cursor) = &session.cursor {
        debug!("Starting transfer of {} from offset {}", cursor.name(), offset);
    }
    Ok(())
}

async fn step_transfer(session: &mut Session) -> io::Result<()> {
    let (cursor, stream) = match (&mut session.cursor, &session.data) {
        (Some(cursor), DataChannel::Open(stream)) => (cursor, stream),
        _ => return Ok(()),
    };

    match cursor.step(stream).await {
        Ok(Step::Continue) => {
            session.touch();
            Ok(())
        }
        Ok(Step::Done) => finish_transfer(session).await,
        Err(e) => fail_transfer(session, e).await,
    }
}

async fn finish_transfer(session: &mut Session) -> io::Result<()> {
    if let Some(cursor) = &session.cursor {
        info!(
            "Transfer of {} to/from {} complete, {} bytes",
            cursor.name(),
            session.peer,
            cursor.transferred()
        );
    }
    session.close_data();
    session.release_transfer();
    send_response(&mut session.writer, b"226 Transfer complete.\r\n").await
}

async fn fail_transfer(session: &mut Session, e: TransferError) -> io::Result<()> {
    let op = session.pending;
    warn!("Transfer with {} aborted: {}", session.peer, e);
    session.close_data();
    session.release_transfer();
    send_response(&mut session.writer, e.to_ftp_response(op)).await
}
