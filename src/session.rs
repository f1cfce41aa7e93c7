use crate::config::ServerConfig;
use crate::constants::DEFAULT_MLST_FACTS;
use crate::core_confine::{Confinement, Confiner};
use crate::core_sandbox::{self, SandboxError};
use crate::core_tftp::TftpSession;
use crate::core_transfer::TransferCursor;
use log::{debug, info, warn};
use nix::sys::socket::{setsockopt, sockopt};
use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Cannot confine to FTP root: {0}")]
    Confinement(String),

    #[error("FTP root {0} is writable, possible security violation")]
    WritableRoot(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    Ascii,
    Binary,
}

/// Transfer command waiting for, or streaming over, the data channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingOp {
    None,
    List,
    Retrieve,
    Store,
}

/// An active-mode connect running on its own task, aborted when dropped.
pub struct ConnectTask(JoinHandle<io::Result<TcpStream>>);

impl ConnectTask {
    pub fn spawn(addr: SocketAddr) -> Self {
        Self(tokio::spawn(TcpStream::connect(addr)))
    }
}

impl Future for ConnectTask {
    type Output = io::Result<TcpStream>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx).map(|joined| match joined {
            Ok(connected) => connected,
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
        })
    }
}

impl Drop for ConnectTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// The session's single data connection slot.
pub enum DataChannel {
    None,
    /// PASV/EPSV: waiting for the client to connect.
    Listening(TcpListener),
    /// PORT/EPRT: where to connect once a transfer command arrives.
    Target(SocketAddr),
    /// Active connect in flight.
    Connecting(ConnectTask),
    Open(TcpStream),
}

impl DataChannel {
    pub fn is_none(&self) -> bool {
        matches!(self, DataChannel::None)
    }

    pub fn is_open(&self) -> bool {
        matches!(self, DataChannel::Open(_))
    }
}

pub struct Session {
    pub writer: OwnedWriteHalf,
    pub peer: SocketAddr,
    pub local: SocketAddr,
    pub root: PathBuf,
    pub chrooted: bool,
    pub pasv_address: Option<Ipv4Addr>,
    pub cwd: String,
    pub transfer_type: TransferType,
    pub username: Option<String>,
    pub data: DataChannel,
    pub pending: PendingOp,
    pub cursor: Option<TransferCursor>,
    /// REST offset for the next RETR or STOR.
    pub offset: u64,
    pub mlst_facts: String,
    pub accept_failures: u32,
    pub inactivity: Duration,
    pub deadline: Instant,
    pub quit: bool,
}

impl Session {
    pub fn resolve(&self, path: Option<&str>) -> Result<PathBuf, SandboxError> {
        core_sandbox::resolve(&self.cwd, &self.root, self.chrooted, path)
    }

    pub fn resolve_absolute(&self, path: Option<&str>) -> Result<PathBuf, SandboxError> {
        core_sandbox::resolve_absolute(&self.cwd, &self.root, self.chrooted, path)
    }

    pub fn visible(&self, full: &Path) -> String {
        core_sandbox::visible_path(&self.root, self.chrooted, full)
    }

    /// Pushes the inactivity deadline out.
    pub fn touch(&mut self) {
        self.deadline = Instant::now() + self.inactivity;
    }

    /// A transfer command was accepted and has not finished yet.
    pub fn busy(&self) -> bool {
        self.pending != PendingOp::None || self.cursor.is_some()
    }

    pub fn set_listener(&mut self, listener: TcpListener) {
        self.data = DataChannel::Listening(listener);
        self.accept_failures = 0;
    }

    pub fn set_target(&mut self, target: SocketAddr) {
        self.data = DataChannel::Target(target);
    }

    pub fn close_data(&mut self) {
        self.data = DataChannel::None;
        self.accept_failures = 0;
    }

    /// Drops the cursor and forgets the pending operation and REST offset.
    pub fn release_transfer(&mut self) {
        self.cursor = None;
        self.pending = PendingOp::None;
        self.offset = 0;
    }
}

/// Creates and tears down sessions, and confines the process once.
pub struct SessionManager {
    settings: ServerConfig,
    confiner: Box<dyn Confiner>,
    confinement: OnceCell<Confinement>,
}

impl SessionManager {
    pub fn new(settings: ServerConfig, confiner: Box<dyn Confiner>) -> Self {
        Self {
            settings,
            confiner,
            confinement: OnceCell::new(),
        }
    }

    pub fn settings(&self) -> &ServerConfig {
        &self.settings
    }

    /// Confines on first use, later calls return the stored outcome.
    pub async fn confinement(&self) -> Result<&Confinement, SessionError> {
        self.confinement
            .get_or_try_init(|| async { self.confiner.confine(&self.settings.root, &self.settings) })
            .await
    }

    pub async fn create(
        &self,
        stream: TcpStream,
    ) -> Result<(Session, BufReader<OwnedReadHalf>), SessionError> {
        let confinement = self.confinement().await?.clone();
        let peer = stream.peer_addr()?;
        let local = stream.local_addr()?;
        // Telnet urgent bytes must arrive in the command stream.
        if let Err(e) = setsockopt(stream.as_raw_fd(), sockopt::OobInline, &true) {
            warn!("Failed to set SO_OOBINLINE for {}: {}", peer, e);
        }
        let (reader, writer) = stream.into_split();
        let inactivity = self.settings.inactivity();

        debug!("New FTP session from {}", peer);

        let session = Session {
            writer,
            peer,
            local,
            root: confinement.root,
            chrooted: confinement.chrooted,
            pasv_address: self.settings.pasv_address,
            cwd: String::from("/"),
            transfer_type: TransferType::Binary,
            username: None,
            data: DataChannel::None,
            pending: PendingOp::None,
            cursor: None,
            offset: 0,
            mlst_facts: String::from(DEFAULT_MLST_FACTS),
            accept_failures: 0,
            inactivity,
            deadline: Instant::now() + inactivity,
            quit: false,
        };

        Ok((session, BufReader::new(reader)))
    }

    /// Releases everything the session holds. Safe to call more than once.
    pub async fn destroy(&self, session: &mut Session) {
        session.release_transfer();
        session.close_data();
        let _ = session.writer.shutdown().await;
        info!("Client {} disconnected", session.peer);
    }

    pub async fn create_tftp(&self, socket: Arc<UdpSocket>) -> Result<TftpSession, SessionError> {
        let confinement = self.confinement().await?;
        Ok(TftpSession::new(
            socket,
            confinement.root.clone(),
            confinement.chrooted,
            self.settings.inactivity(),
        ))
    }
}
