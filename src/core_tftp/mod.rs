pub mod engine;
pub mod error;
pub mod protocol;

pub use engine::TftpSession;
pub use error::TftpError;
