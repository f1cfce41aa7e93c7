use thiserror::Error;

#[derive(Debug, Error)]
pub enum TftpError {
    #[error("Malformed TFTP packet: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
