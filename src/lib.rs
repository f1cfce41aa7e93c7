pub mod config;
pub mod constants;
pub mod core_cli;
pub mod core_confine;
pub mod core_ftpcommand;
pub mod core_log;
pub mod core_network;
pub mod core_sandbox;
pub mod core_tftp;
pub mod core_transfer;
pub mod helpers;
pub mod server;
pub mod session;

pub use config::Config;
