//! TFTP wire format (RFC 1350) with option negotiation (RFC 2347/2348).

use super::error::TftpError;
use crate::constants::TFTP_HEADER_LEN;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TftpOpcode {
    ReadRequest = 1,
    WriteRequest = 2,
    Data = 3,
    Acknowledgment = 4,
    Error = 5,
    OptionAck = 6,
}

impl TftpOpcode {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Self::ReadRequest),
            2 => Some(Self::WriteRequest),
            3 => Some(Self::Data),
            4 => Some(Self::Acknowledgment),
            5 => Some(Self::Error),
            6 => Some(Self::OptionAck),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ReadRequest => "RRQ",
            Self::WriteRequest => "WRQ",
            Self::Data => "DATA",
            Self::Acknowledgment => "ACK",
            Self::Error => "ERROR",
            Self::OptionAck => "OACK",
        }
    }
}

impl fmt::Display for TftpOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Error codes defined by RFC 1350.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TftpErrorCode {
    NotDefined = 0,
    FileNotFound = 1,
    AccessViolation = 2,
    DiskFull = 3,
    IllegalOperation = 4,
    UnknownTransferId = 5,
    FileAlreadyExists = 6,
    NoSuchUser = 7,
}

impl TftpErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn default_message(self) -> &'static str {
        match self {
            Self::NotDefined => "Undefined error",
            Self::FileNotFound => "File not found",
            Self::AccessViolation => "Access violation",
            Self::DiskFull => "Disk full or allocation exceeded",
            Self::IllegalOperation => "Illegal TFTP operation",
            Self::UnknownTransferId => "Unknown transfer ID",
            Self::FileAlreadyExists => "File already exists",
            Self::NoSuchUser => "No such user",
        }
    }

    /// Closest TFTP code for a local I/O failure.
    pub fn from_io(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileNotFound,
            std::io::ErrorKind::PermissionDenied => Self::AccessViolation,
            std::io::ErrorKind::AlreadyExists => Self::FileAlreadyExists,
            _ => Self::NotDefined,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Octet,
    NetAscii,
    Mail,
}

impl TransferMode {
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "octet" => Some(Self::Octet),
            "netascii" => Some(Self::NetAscii),
            "mail" => Some(Self::Mail),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub opcode: TftpOpcode,
    pub filename: String,
    pub mode: String,
    pub options: Vec<(String, String)>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Packet<'a> {
    Request(Request),
    Data { block: u16, payload: &'a [u8] },
    Ack { block: u16 },
    Error { code: u16, message: String },
    OptionAck(Vec<(String, String)>),
}

pub fn parse_packet(buf: &[u8]) -> Result<Packet<'_>, TftpError> {
    if buf.len() < 2 {
        return Err(TftpError::Malformed("packet too short".to_string()));
    }
    let opcode = u16::from_be_bytes([buf[0], buf[1]]);
    let opcode = TftpOpcode::from_u16(opcode)
        .ok_or_else(|| TftpError::Malformed(format!("unknown opcode {}", opcode)))?;

    match opcode {
        TftpOpcode::ReadRequest | TftpOpcode::WriteRequest => parse_request(opcode, &buf[2..]),
        TftpOpcode::Data => {
            let block = block_number(buf, opcode)?;
            Ok(Packet::Data {
                block,
                payload: &buf[TFTP_HEADER_LEN..],
            })
        }
        TftpOpcode::Acknowledgment => Ok(Packet::Ack {
            block: block_number(buf, opcode)?,
        }),
        TftpOpcode::Error => {
            let code = block_number(buf, opcode)?;
            let message = next_string(&buf[TFTP_HEADER_LEN..])
                .map(|(message, _)| message)
                .unwrap_or_else(|| {
                    String::from_utf8_lossy(&buf[TFTP_HEADER_LEN..]).into_owned()
                });
            Ok(Packet::Error { code, message })
        }
        TftpOpcode::OptionAck => Ok(Packet::OptionAck(parse_options(&buf[2..]))),
    }
}

fn block_number(buf: &[u8], opcode: TftpOpcode) -> Result<u16, TftpError> {
    if buf.len() < TFTP_HEADER_LEN {
        return Err(TftpError::Malformed(format!("short {} packet", opcode)));
    }
    Ok(u16::from_be_bytes([buf[2], buf[3]]))
}

fn parse_request(opcode: TftpOpcode, buf: &[u8]) -> Result<Packet<'_>, TftpError> {
    let (filename, rest) =
        next_string(buf).ok_or_else(|| TftpError::Malformed("missing filename".to_string()))?;
    let (mode, rest) =
        next_string(rest).ok_or_else(|| TftpError::Malformed("missing mode".to_string()))?;
    if filename.is_empty() {
        return Err(TftpError::Malformed("empty filename".to_string()));
    }
    Ok(Packet::Request(Request {
        opcode,
        filename,
        mode,
        options: parse_options(rest),
    }))
}

// A trailing name without a value is dropped.
fn parse_options(mut buf: &[u8]) -> Vec<(String, String)> {
    let mut options = Vec::new();
    while let Some((name, rest)) = next_string(buf) {
        match next_string(rest) {
            Some((value, rest)) => {
                options.push((name, value));
                buf = rest;
            }
            None => break,
        }
    }
    options
}

fn next_string(buf: &[u8]) -> Option<(String, &[u8])> {
    let end = buf.iter().position(|&b| b == 0)?;
    let value = String::from_utf8_lossy(&buf[..end]).into_owned();
    Some((value, &buf[end + 1..]))
}

pub fn build_ack(block: u16) -> Vec<u8> {
    let mut packet = Vec::with_capacity(TFTP_HEADER_LEN);
    packet.extend_from_slice(&TftpOpcode::Acknowledgment.as_u16().to_be_bytes());
    packet.extend_from_slice(&block.to_be_bytes());
    packet
}

/// Error message is sent ASCIIZ.
pub fn build_error(code: TftpErrorCode, message: &str) -> Vec<u8> {
    let mut packet = Vec::with_capacity(TFTP_HEADER_LEN + message.len() + 1);
    packet.extend_from_slice(&TftpOpcode::Error.as_u16().to_be_bytes());
    packet.extend_from_slice(&code.as_u16().to_be_bytes());
    packet.extend_from_slice(message.as_bytes());
    packet.push(0);
    packet
}

pub fn build_oack(options: &[(String, String)]) -> Vec<u8> {
    let mut packet = TftpOpcode::OptionAck.as_u16().to_be_bytes().to_vec();
    for (name, value) in options {
        packet.extend_from_slice(name.as_bytes());
        packet.push(0);
        packet.extend_from_slice(value.as_bytes());
        packet.push(0);
    }
    packet
}

/// Outgoing DATA packet, sized for the negotiated segment and reused per block.
pub struct SegmentBuffer {
    buf: Vec<u8>,
    segsize: usize,
    len: usize,
}

impl SegmentBuffer {
    pub fn new(segsize: usize) -> Self {
        Self {
            buf: vec![0; segsize + TFTP_HEADER_LEN],
            segsize,
            len: 0,
        }
    }

    pub fn segsize(&self) -> usize {
        self.segsize
    }

    /// Grows or shrinks in place; any sealed packet is discarded.
    pub fn resize(&mut self, segsize: usize) {
        self.segsize = segsize;
        self.buf.resize(segsize + TFTP_HEADER_LEN, 0);
        self.len = 0;
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buf[TFTP_HEADER_LEN..]
    }

    /// Writes the DATA header in front of `payload_len` bytes of payload.
    pub fn seal_data(&mut self, block: u16, payload_len: usize) {
        self.buf[..2].copy_from_slice(&TftpOpcode::Data.as_u16().to_be_bytes());
        self.buf[2..4].copy_from_slice(&block.to_be_bytes());
        self.len = TFTP_HEADER_LEN + payload_len.min(self.segsize);
    }

    pub fn packet(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rrq_with_options() {
        let packet = b"\x00\x01boot/pxelinux.0\x00octet\x00blksize\x001428\x00tsize\x000\x00";
        match parse_packet(packet).unwrap() {
            Packet::Request(req) => {
                assert_eq!(req.opcode, TftpOpcode::ReadRequest);
                assert_eq!(req.filename, "boot/pxelinux.0");
                assert_eq!(req.mode, "octet");
                assert_eq!(
                    req.options,
                    vec![
                        ("blksize".to_string(), "1428".to_string()),
                        ("tsize".to_string(), "0".to_string())
                    ]
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_wrq_without_mode_is_malformed() {
        assert!(parse_packet(b"\x00\x02file.bin\x00").is_err());
        assert!(parse_packet(b"\x00\x02\x00octet\x00").is_err());
    }

    #[test]
    fn test_parse_data_ack_error() {
        assert_eq!(
            parse_packet(b"\x00\x03\x00\x07abc").unwrap(),
            Packet::Data {
                block: 7,
                payload: b"abc"
            }
        );
        assert_eq!(
            parse_packet(b"\x00\x03\x00\x08").unwrap(),
            Packet::Data {
                block: 8,
                payload: b""
            }
        );
        assert_eq!(
            parse_packet(b"\x00\x04\xff\xff").unwrap(),
            Packet::Ack { block: 65535 }
        );
        assert_eq!(
            parse_packet(b"\x00\x05\x00\x01File not found\x00").unwrap(),
            Packet::Error {
                code: 1,
                message: "File not found".to_string()
            }
        );
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_packet(b"").is_err());
        assert!(parse_packet(b"\x00").is_err());
        assert!(parse_packet(b"\x00\x09abc").is_err());
        assert!(parse_packet(b"\x00\x04\x01").is_err());
    }

    #[test]
    fn test_build_error_is_asciiz() {
        let packet = build_error(TftpErrorCode::FileNotFound, "File not found");
        assert_eq!(&packet[..4], b"\x00\x05\x00\x01");
        assert_eq!(&packet[4..], b"File not found\x00");
    }

    #[test]
    fn test_build_ack_and_oack() {
        assert_eq!(build_ack(258), b"\x00\x04\x01\x02");
        let oack = build_oack(&[("blksize".to_string(), "1024".to_string())]);
        assert_eq!(oack, b"\x00\x06blksize\x001024\x00");
    }

    #[test]
    fn test_segment_buffer_resize_in_place() {
        let mut segment = SegmentBuffer::new(512);
        segment.payload_mut()[..3].copy_from_slice(b"abc");
        segment.seal_data(1, 3);
        assert_eq!(segment.packet(), b"\x00\x03\x00\x01abc");

        segment.resize(1024);
        assert_eq!(segment.segsize(), 1024);
        assert_eq!(segment.payload_mut().len(), 1024);
        assert!(segment.packet().is_empty());
    }

    #[test]
    fn test_transfer_modes() {
        assert_eq!(TransferMode::from_str_opt("OCTET"), Some(TransferMode::Octet));
        assert_eq!(TransferMode::from_str_opt("netascii"), Some(TransferMode::NetAscii));
        assert_eq!(TransferMode::from_str_opt("mail"), Some(TransferMode::Mail));
        assert_eq!(TransferMode::from_str_opt("binary"), None);
    }
}
