use crate::core_confine::OsConfiner;
use crate::core_network::begin_ftp_session;
use crate::session::SessionManager;
use crate::Config;
use anyhow::{bail, Context, Result};
use log::{error, info, warn};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::{TcpListener, UdpSocket};
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;

/// Runs the FTP and TFTP services until Ctrl-C or SIGTERM.
///
/// The process is confined to the root before anything is served, a failure
/// there is fatal. A service configured with port 0 is left out, but at
/// least one of them must start.
///
/// # Arguments
///
/// * `config` - The server configuration, with its root already canonical.
///
/// # Returns
///
/// Result<(), anyhow::Error> indicating the success or failure of the operation.
pub async fn run(config: Config) -> Result<()> {
    info!("Starting server with config: {:?}", config);

    let ftp_listener = bind_ftp(config.server.ftp_port).await;
    let tftp_socket = bind_tftp(config.server.tftp_port).await;
    if ftp_listener.is_none() && tftp_socket.is_none() {
        bail!("Neither FTP nor TFTP could be started");
    }

    let manager = Arc::new(SessionManager::new(config.server, Box::new(OsConfiner)));
    let confinement = manager
        .confinement()
        .await
        .context("Failed to confine server to FTP root")?;
    info!(
        "Serving {} ({})",
        confinement.root.display(),
        if confinement.chrooted { "chrooted" } else { "not chrooted" }
    );

    let mut services: Vec<JoinHandle<()>> = Vec::new();
    if let Some(listener) = ftp_listener {
        services.push(tokio::spawn(serve_ftp(manager.clone(), listener)));
    }
    if let Some(socket) = tftp_socket {
        services.push(tokio::spawn(serve_tftp(manager.clone(), Arc::new(socket))));
    }

    wait_for_shutdown().await?;
    info!("Shutting down");
    for service in services {
        service.abort();
    }
    Ok(())
}

async fn bind_ftp(port: u16) -> Option<TcpListener> {
    if port == 0 {
        info!("FTP service disabled");
        return None;
    }
    match TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))).await {
        Ok(listener) => {
            info!("FTP server listening on port {}", port);
            Some(listener)
        }
        Err(e) => {
            error!("Failed to start FTP service on port {}: {}", port, e);
            None
        }
    }
}

async fn bind_tftp(port: u16) -> Option<UdpSocket> {
    if port == 0 {
        info!("TFTP service disabled");
        return None;
    }
    match UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))).await {
        Ok(socket) => {
            info!("TFTP server listening on port {}", port);
            Some(socket)
        }
        Err(e) => {
            error!("Failed to start TFTP service on port {}: {}", port, e);
            None
        }
    }
}

async fn serve_ftp(manager: Arc<SessionManager>, listener: TcpListener) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                begin_ftp_session(manager.clone(), stream);
            }
            Err(e) => warn!("Failed accepting FTP connection: {}", e),
        }
    }
}

/// Serves one TFTP exchange at a time. The next request is only read once
/// the current exchange is over.
async fn serve_tftp(manager: Arc<SessionManager>, socket: Arc<UdpSocket>) {
    loop {
        if let Err(e) = socket.readable().await {
            error!("TFTP socket failed: {}", e);
            return;
        }
        if let Err(e) = begin_tftp_session(manager.clone(), socket.clone()).await {
            warn!("TFTP session task failed: {}", e);
        }
    }
}

/// Spawns the task serving one TFTP exchange on the shared socket.
pub fn begin_tftp_session(manager: Arc<SessionManager>, socket: Arc<UdpSocket>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let session = match manager.create_tftp(socket).await {
            Ok(session) => session,
            Err(e) => {
                error!("Failed to set up TFTP session: {}", e);
                return;
            }
        };
        if let Err(e) = session.run().await {
            warn!("TFTP session failed: {}", e);
        }
    })
}

async fn wait_for_shutdown() -> Result<()> {
    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("Failed to listen for Ctrl-C")?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::manager_for;
    use std::fs;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_tftp_exchanges_are_served_one_after_another() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("a.txt"), b"first").unwrap();
        fs::write(root.path().join("b.txt"), b"second").unwrap();
        let manager = Arc::new(manager_for(root.path()));
        let server = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let addr = server.local_addr().unwrap();
        tokio::spawn(serve_tftp(manager, server));

        for (name, content) in [("a.txt", &b"first"[..]), ("b.txt", &b"second"[..])] {
            let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            let mut rrq = vec![0, 1];
            rrq.extend_from_slice(name.as_bytes());
            rrq.push(0);
            rrq.extend_from_slice(b"octet\0");
            client.send_to(&rrq, addr).await.unwrap();

            let mut buf = [0u8; 600];
            let (n, _) = timeout(Duration::from_secs(5), client.recv_from(&mut buf))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(&buf[..4], &[0, 3, 0, 1]);
            assert_eq!(&buf[4..n], content);
            client.send_to(&[0, 4, 0, 1], addr).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_disabled_services_bind_nothing() {
        assert!(bind_ftp(0).await.is_none());
        assert!(bind_tftp(0).await.is_none());
    }
}
