use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::core_ftpcommand::utils::refuse_if_busy;
use crate::core_ftpcommand::{
    abor, cdup, cwd, dele, feat, help, list, mdtm, mkd, noop, opts, pass, pwd, quit, rest, retr,
    rmd, size, stor, syst, type_, user,
};
use crate::helpers::send_response;
use crate::session::Session;
use log::warn;

// Specific crates for PORT and PASV commands
use crate::core_network::pasv;
use crate::core_network::port;

/// Runs one control command against the session.
///
/// An `Err` means the control connection itself failed.
pub async fn dispatch(
    session: &mut Session,
    verb: &str,
    arg: Option<&str>,
) -> Result<(), std::io::Error> {
    let command = match FtpCommand::from_str(verb) {
        Some(command) => command,
        None => {
            warn!("Unknown command '{}' from {}", verb, session.peer);
            let reply = format!("500 command '{}' not recognized by server.\r\n", verb);
            return send_response(&mut session.writer, reply.as_bytes()).await;
        }
    };

    if command.is_transfer() && refuse_if_busy(session).await? {
        return Ok(());
    }

    match command {
        FtpCommand::ABOR => abor::handle_abor_command(session, arg).await,
        FtpCommand::DELE => dele::handle_dele_command(session, arg).await,
        FtpCommand::USER => user::handle_user_command(session, arg).await,
        FtpCommand::PASS => pass::handle_pass_command(session, arg).await,
        FtpCommand::SYST => syst::handle_syst_command(session, arg).await,
        FtpCommand::TYPE => type_::handle_type_command(session, arg).await,
        FtpCommand::PORT => port::handle_port_command(session, arg).await,
        FtpCommand::EPRT => port::handle_eprt_command(session, arg).await,
        FtpCommand::RETR => retr::handle_retr_command(session, arg).await,
        FtpCommand::MKD => mkd::handle_mkd_command(session, arg).await,
        FtpCommand::RMD => rmd::handle_rmd_command(session, arg).await,
        FtpCommand::REST => rest::handle_rest_command(session, arg).await,
        FtpCommand::MDTM => mdtm::handle_mdtm_command(session, arg).await,
        FtpCommand::PASV => pasv::handle_pasv_command(session, arg).await,
        FtpCommand::EPSV => pasv::handle_epsv_command(session, arg).await,
        FtpCommand::QUIT => quit::handle_quit_command(session, arg).await,
        FtpCommand::LIST => list::handle_list_command(session, arg).await,
        FtpCommand::NLST => list::handle_nlst_command(session, arg).await,
        FtpCommand::MLST => list::handle_mlst_command(session, arg).await,
        FtpCommand::MLSD => list::handle_mlsd_command(session, arg).await,
        FtpCommand::CLNT => noop::handle_clnt_command(session, arg).await,
        FtpCommand::OPTS => opts::handle_opts_command(session, arg).await,
        FtpCommand::PWD => pwd::handle_pwd_command(session, arg).await,
        FtpCommand::STOR => stor::handle_stor_command(session, arg).await,
        FtpCommand::CWD => cwd::handle_cwd_command(session, arg).await,
        FtpCommand::CDUP => cdup::handle_cdup_command(session, arg).await,
        FtpCommand::SIZE => size::handle_size_command(session, arg).await,
        FtpCommand::NOOP => noop::handle_noop_command(session, arg).await,
        FtpCommand::HELP => help::handle_help_command(session, arg).await,
        FtpCommand::FEAT => feat::handle_feat_command(session, arg).await,
    }
}
