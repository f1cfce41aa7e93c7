use super::error::TftpError;
use super::protocol::{
    build_ack, build_error, build_oack, parse_packet, Packet, Request, SegmentBuffer,
    TftpErrorCode, TftpOpcode, TransferMode,
};
use crate::constants::{MAX_SEGSIZE, MIN_SEGSIZE, SEGSIZE, TFTP_HEADER_LEN};
use crate::core_sandbox::{self, SandboxError};
use log::{debug, info, warn};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UdpSocket;
use tokio::time::timeout;

enum TftpState {
    AwaitingRequest,
    Reading {
        file: File,
        /// Blocks sent so far; the wire carries the low 16 bits.
        block: u64,
        eof: bool,
        /// OACK sent, waiting for ACK 0 before block 1.
        awaiting_oack_ack: bool,
    },
    Writing {
        file: File,
        expected: u16,
    },
    Done,
}

/// One TFTP exchange with a single peer over the shared server socket.
pub struct TftpSession {
    socket: Arc<UdpSocket>,
    peer: Option<SocketAddr>,
    root: PathBuf,
    chrooted: bool,
    timeout: Duration,
    segment: SegmentBuffer,
    filename: String,
    state: TftpState,
}

impl TftpSession {
    pub fn new(socket: Arc<UdpSocket>, root: PathBuf, chrooted: bool, timeout: Duration) -> Self {
        Self {
            socket,
            peer: None,
            root,
            chrooted,
            timeout,
            segment: SegmentBuffer::new(SEGSIZE),
            filename: String::new(),
            state: TftpState::AwaitingRequest,
        }
    }

    /// Serves datagrams until the exchange completes, fails or times out.
    pub async fn run(mut self) -> Result<(), TftpError> {
        let mut recv = vec![0u8; SEGSIZE + TFTP_HEADER_LEN];

        while !matches!(self.state, TftpState::Done) {
            let (len, from) = match timeout(self.timeout, self.socket.recv_from(&mut recv)).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!("TFTP session with {:?} timed out", self.peer);
                    break;
                }
            };

            match self.peer {
                None => self.peer = Some(from),
                Some(peer) if peer != from => {
                    self.reject_foreign(from, &recv[..len]).await?;
                    continue;
                }
                Some(_) => {}
            }

            self.handle(&recv[..len]).await?;

            let wanted = self.segment.segsize() + TFTP_HEADER_LEN;
            if recv.len() < wanted {
                recv.resize(wanted, 0);
            }
        }

        Ok(())
    }

    async fn handle(&mut self, datagram: &[u8]) -> Result<(), TftpError> {
        let packet = match parse_packet(datagram) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("Bad TFTP packet from {:?}: {}", self.peer, e);
                return self
                    .fail(TftpErrorCode::IllegalOperation, "Illegal TFTP operation")
                    .await;
            }
        };

        match packet {
            Packet::Request(request) => {
                if matches!(self.state, TftpState::AwaitingRequest) {
                    self.on_request(request).await
                } else {
                    debug!("Ignoring repeated {} from {:?}", request.opcode, self.peer);
                    Ok(())
                }
            }
            Packet::Data { block, payload } => self.on_data(block, payload).await,
            Packet::Ack { block } => self.on_ack(block).await,
            Packet::Error { code, message } => {
                info!(
                    "TFTP peer {:?} aborted {}: {} ({})",
                    self.peer, self.filename, message, code
                );
                self.state = TftpState::Done;
                Ok(())
            }
            Packet::OptionAck(_) => {
                self.fail(TftpErrorCode::IllegalOperation, "Illegal TFTP operation")
                    .await
            }
        }
    }

    async fn on_request(&mut self, request: Request) -> Result<(), TftpError> {
        self.filename = request.filename.clone();
        debug!(
            "TFTP {} {} mode {} from {:?}",
            request.opcode, request.filename, request.mode, self.peer
        );

        match TransferMode::from_str_opt(&request.mode) {
            Some(TransferMode::Octet) | Some(TransferMode::NetAscii) => {}
            Some(TransferMode::Mail) | None => {
                return self
                    .fail(TftpErrorCode::IllegalOperation, "Unsupported transfer mode")
                    .await;
            }
        }

        let negotiated = self.negotiate(&request.options);

        let path = match core_sandbox::resolve(
            "/",
            &self.root,
            self.chrooted,
            Some(&request.filename),
        ) {
            Ok(path) => path,
            Err(SandboxError::OutsideRoot) => {
                return self
                    .fail(TftpErrorCode::AccessViolation, "Access violation")
                    .await;
            }
            Err(SandboxError::NotFound) => {
                return self
                    .fail(TftpErrorCode::FileNotFound, "File not found")
                    .await;
            }
        };

        if request.opcode == TftpOpcode::ReadRequest {
            let file = match open_for_read(&path).await {
                Ok(file) => file,
                Err(e) => {
                    let code = TftpErrorCode::from_io(&e);
                    return self.fail(code, code.default_message()).await;
                }
            };
            info!("TFTP sending {} to {:?}", self.filename, self.peer);
            self.state = TftpState::Reading {
                file,
                block: 0,
                eof: false,
                awaiting_oack_ack: !negotiated.is_empty(),
            };
            if negotiated.is_empty() {
                self.send_next_block().await
            } else {
                self.send(&build_oack(&negotiated)).await
            }
        } else {
            let file = match File::create(&path).await {
                Ok(file) => file,
                Err(e) => {
                    let code = match TftpErrorCode::from_io(&e) {
                        TftpErrorCode::NotDefined => TftpErrorCode::AccessViolation,
                        code => code,
                    };
                    return self.fail(code, code.default_message()).await;
                }
            };
            info!("TFTP receiving {} from {:?}", self.filename, self.peer);
            self.state = TftpState::Writing { file, expected: 1 };
            if negotiated.is_empty() {
                self.send(&build_ack(0)).await
            } else {
                self.send(&build_oack(&negotiated)).await
            }
        }
    }

    /// Applies the options we understand, returning those to acknowledge.
    fn negotiate(&mut self, options: &[(String, String)]) -> Vec<(String, String)> {
        let mut accepted = Vec::new();
        for (name, value) in options {
            if !name.eq_ignore_ascii_case("blksize") {
                debug!("Ignoring TFTP option {}={}", name, value);
                continue;
            }
            match value.trim().parse::<usize>() {
                Ok(size) if size >= MIN_SEGSIZE => {
                    let size = size.min(MAX_SEGSIZE);
                    self.segment.resize(size);
                    accepted.push(("blksize".to_string(), size.to_string()));
                }
                _ => debug!("Ignoring blksize {}", value),
            }
        }
        accepted
    }

    async fn on_data(&mut self, block: u16, payload: &[u8]) -> Result<(), TftpError> {
        let segsize = self.segment.segsize();
        let (file, expected) = match &mut self.state {
            TftpState::Writing { file, expected } => (file, expected),
            _ => {
                return self
                    .fail(TftpErrorCode::IllegalOperation, "Illegal TFTP operation")
                    .await;
            }
        };

        if block != *expected {
            let message = format!("Expected block {}, got DATA for block {}", expected, block);
            return self.fail(TftpErrorCode::NotDefined, &message).await;
        }

        let written = match file.write_all(payload).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            warn!("TFTP write of {} failed: {}", self.filename, e);
            return self
                .fail(TftpErrorCode::DiskFull, "Disk full or allocation exceeded")
                .await;
        }

        *expected = expected.wrapping_add(1);
        let last = payload.len() < segsize;
        self.send(&build_ack(block)).await?;

        if last {
            info!("TFTP received {} from {:?}", self.filename, self.peer);
            self.state = TftpState::Done;
        }
        Ok(())
    }

    async fn on_ack(&mut self, block: u16) -> Result<(), TftpError> {
        let (current, eof, awaiting_oack_ack) = match &mut self.state {
            TftpState::Reading {
                block: current,
                eof,
                awaiting_oack_ack,
                ..
            } => (*current as u16, *eof, awaiting_oack_ack),
            _ => {
                return self
                    .fail(TftpErrorCode::IllegalOperation, "Illegal TFTP operation")
                    .await;
            }
        };

        if *awaiting_oack_ack {
            if block != 0 {
                let message = format!("Expected ACK for options, got ACK for block {}", block);
                return self.fail(TftpErrorCode::NotDefined, &message).await;
            }
            *awaiting_oack_ack = false;
            return self.send_next_block().await;
        }

        if block == current {
            if eof {
                info!("TFTP sent {} to {:?}", self.filename, self.peer);
                self.state = TftpState::Done;
                return Ok(());
            }
            return self.send_next_block().await;
        }

        if block == current.wrapping_sub(1) {
            debug!("Duplicate ACK {}, resending block {}", block, current);
            let packet = self.segment.packet().to_vec();
            return self.send(&packet).await;
        }

        let message = format!("Expected ACK for block {}, got {}", current, block);
        self.fail(TftpErrorCode::NotDefined, &message).await
    }

    async fn send_next_block(&mut self) -> Result<(), TftpError> {
        let segsize = self.segment.segsize();
        let (file, block, eof) = match &mut self.state {
            TftpState::Reading {
                file, block, eof, ..
            } => (file, block, eof),
            _ => return Ok(()),
        };

        let len = match read_segment(file, self.segment.payload_mut()).await {
            Ok(len) => len,
            Err(e) => {
                warn!("TFTP read of {} failed: {}", self.filename, e);
                return self.fail(TftpErrorCode::NotDefined, "Read error").await;
            }
        };

        *block += 1;
        *eof = len < segsize;
        self.segment.seal_data(*block as u16, len);
        let packet = self.segment.packet().to_vec();
        self.send(&packet).await
    }

    async fn reject_foreign(&self, from: SocketAddr, datagram: &[u8]) -> Result<(), TftpError> {
        let opcode = datagram
            .get(..2)
            .and_then(|op| TftpOpcode::from_u16(u16::from_be_bytes([op[0], op[1]])));
        let packet = match opcode {
            Some(TftpOpcode::ReadRequest) | Some(TftpOpcode::WriteRequest) => {
                build_error(TftpErrorCode::NotDefined, "Server busy")
            }
            _ => build_error(TftpErrorCode::UnknownTransferId, "Unknown transfer ID"),
        };
        debug!("Rejecting TFTP datagram from {}", from);
        self.socket.send_to(&packet, from).await?;
        Ok(())
    }

    async fn fail(&mut self, code: TftpErrorCode, message: &str) -> Result<(), TftpError> {
        warn!(
            "TFTP error {} to {:?} for {}: {}",
            code.as_u16(),
            self.peer,
            self.filename,
            message
        );
        self.state = TftpState::Done;
        self.send(&build_error(code, message)).await
    }

    async fn send(&self, packet: &[u8]) -> Result<(), TftpError> {
        if let Some(peer) = self.peer {
            self.socket.send_to(packet, peer).await?;
        }
        Ok(())
    }
}

async fn open_for_read(path: &std::path::Path) -> std::io::Result<File> {
    let file = OpenOptions::new().read(true).open(path).await?;
    if file.metadata().await?.is_dir() {
        return Err(std::io::Error::from(std::io::ErrorKind::NotFound));
    }
    Ok(file)
}

/// Reads until `buf` is full or the file ends.
async fn read_segment(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
