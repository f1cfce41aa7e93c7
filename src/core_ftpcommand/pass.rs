use crate::helpers::send_response;
use crate::session::Session;
use log::info;

/// Handles the PASS FTP command.
///
/// The password is never checked, any user that got this far is a guest.
pub async fn handle_pass_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<(), std::io::Error> {
    let username = match &session.username {
        Some(username) => username.clone(),
        None => {
            return send_response(&mut session.writer, b"503 No username given.\r\n").await;
        }
    };

    if arg.is_none() {
        return send_response(&mut session.writer, b"503 No password given.\r\n").await;
    }

    info!("Guest login for {} from {}", username, session.peer);
    send_response(
        &mut session.writer,
        b"230 Guest login OK, access restrictions apply.\r\n",
    )
    .await
}

#[cfg(test)]
mod tests {
    use crate::core_network::network::tests::start_server;

    #[tokio::test]
    async fn test_pass_needs_user_and_password() {
        let root = tempfile::tempdir().unwrap();
        let mut client = start_server(root.path()).await;

        assert_eq!(client.cmd("PASS secret").await, "503 No username given.\r\n");
        client.cmd("USER alice").await;
        assert_eq!(client.cmd("PASS").await, "503 No password given.\r\n");
        assert_eq!(
            client.cmd("PASS secret").await,
            "230 Guest login OK, access restrictions apply.\r\n"
        );
    }
}
