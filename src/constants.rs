// src/constants.rs

use std::time::Duration;

pub const FTP_DEFAULT_PORT: u16 = 21;
pub const TFTP_DEFAULT_PORT: u16 = 69;

pub const FTP_DEFAULT_USER: &str = "ftp";
pub const FTP_DEFAULT_HOME: &str = "/srv/ftp";

/// Size of one transfer step, and of the listing flush threshold.
pub const BUFFER_SIZE: usize = 8192;

/// Longest control line we are willing to buffer before giving up on it.
pub const MAX_COMMAND_LEN: usize = 4096;

/// This is a small server, it doesn't expect >3 min inactivity.
pub const INACTIVITY_TIMER: Duration = Duration::from_secs(180);

/// Transient accept failures tolerated on a passive listener.
pub const PASV_ACCEPT_RETRIES: u32 = 3;

/// Default TFTP segment size (RFC 1350).
pub const SEGSIZE: usize = 512;
/// Smallest blksize we negotiate, smaller requests are ignored.
pub const MIN_SEGSIZE: usize = 32;
/// Largest blksize allowed by RFC 2348.
pub const MAX_SEGSIZE: usize = 65464;
/// Opcode + block number.
pub const TFTP_HEADER_LEN: usize = 4;

/// Facts reported by MLST/MLSD until the client picks others with OPTS.
pub const DEFAULT_MLST_FACTS: &str = "mpst";
