pub mod network;
pub mod pasv;
pub mod port;

pub use network::{begin_ftp_session, begin_transfer, serve};
