use anyhow::{bail, Result};
use clap::Parser;
use log::info;
use tinyftpd::core_cli::Cli;
use tinyftpd::core_log::{init_logger, parse_level};
use tinyftpd::{server, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Cli::parse();

    let level = match parse_level(&args.log_level) {
        Some(level) => level,
        None => bail!("Invalid log level: {}", args.log_level),
    };
    init_logger(level);

    // Load configuration from the TOML file, when one is given
    let mut config = if args.config.is_empty() {
        Config::default()
    } else {
        Config::load_from_file(&args.config)?
    };

    // Command line wins over the file
    if let Some(root) = args.root {
        config.server.root = root;
    }
    if let Some(port) = args.ftp_port {
        config.server.ftp_port = port;
    }
    if let Some(port) = args.tftp_port {
        config.server.tftp_port = port;
    }
    if args.pasv_addr.is_some() {
        config.server.pasv_address = args.pasv_addr;
    }
    if args.writable {
        config.server.writable = true;
    }
    config.canonicalize_root()?;

    info!("tinyftpd v{} starting", env!("CARGO_PKG_VERSION"));
    server::run(config).await
}
