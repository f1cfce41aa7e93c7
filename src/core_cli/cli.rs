use clap::Parser;
use std::net::Ipv4Addr;
use std::path::PathBuf;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "tinyftpd",
    version,
    about = "A small FTP and TFTP server for a single shared directory."
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "")]
    pub config: String,

    /// Log level: none, err, warning, notice, info, debug
    #[arg(short = 'l', long = "log-level", default_value = "notice")]
    pub log_level: String,

    /// FTP control port, 0 disables FTP
    #[arg(long)]
    pub ftp_port: Option<u16>,

    /// TFTP port, 0 disables TFTP
    #[arg(long)]
    pub tftp_port: Option<u16>,

    /// Address to advertise in PASV replies
    #[arg(long = "pasv-addr")]
    pub pasv_addr: Option<Ipv4Addr>,

    /// Allow serving a root the unprivileged user can write to
    #[arg(short, long)]
    pub writable: bool,

    /// Directory to serve
    pub root: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["tinyftpd"]);
        assert_eq!(cli.config, "");
        assert_eq!(cli.log_level, "notice");
        assert!(cli.ftp_port.is_none());
        assert!(!cli.writable);
        assert!(cli.root.is_none());
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "tinyftpd",
            "-l",
            "debug",
            "--ftp-port",
            "2121",
            "--tftp-port",
            "0",
            "--pasv-addr",
            "10.0.0.1",
            "-w",
            "/srv/pub",
        ]);
        assert_eq!(cli.log_level, "debug");
        assert_eq!(cli.ftp_port, Some(2121));
        assert_eq!(cli.tftp_port, Some(0));
        assert_eq!(cli.pasv_addr, Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert!(cli.writable);
        assert_eq!(cli.root, Some(PathBuf::from("/srv/pub")));
    }
}
