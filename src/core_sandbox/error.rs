use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SandboxError {
    #[error("No such file or directory")]
    NotFound,

    #[error("Path resolves outside the FTP root")]
    OutsideRoot,
}

impl SandboxError {
    pub fn to_ftp_response(&self) -> &'static [u8] {
        match self {
            SandboxError::NotFound | SandboxError::OutsideRoot => {
                b"550 No such file or directory.\r\n"
            }
        }
    }
}
