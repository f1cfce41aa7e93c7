#[derive(Eq, Hash, PartialEq, Debug, Clone, Copy)]
pub enum FtpCommand {
    ABOR,
    DELE,
    USER,
    PASS,
    SYST,
    TYPE,
    PORT,
    EPRT,
    RETR,
    MKD,
    RMD,
    REST,
    MDTM,
    PASV,
    EPSV,
    QUIT,
    LIST,
    NLST,
    MLST,
    MLSD,
    CLNT,
    OPTS,
    PWD,
    STOR,
    CWD,
    CDUP,
    SIZE,
    NOOP,
    HELP,
    FEAT,
}

impl FtpCommand {
    /// Every supported verb, in the order HELP prints them.
    pub const ALL: [FtpCommand; 30] = [
        FtpCommand::ABOR,
        FtpCommand::DELE,
        FtpCommand::USER,
        FtpCommand::PASS,
        FtpCommand::SYST,
        FtpCommand::TYPE,
        FtpCommand::PORT,
        FtpCommand::EPRT,
        FtpCommand::RETR,
        FtpCommand::MKD,
        FtpCommand::RMD,
        FtpCommand::REST,
        FtpCommand::MDTM,
        FtpCommand::PASV,
        FtpCommand::EPSV,
        FtpCommand::QUIT,
        FtpCommand::LIST,
        FtpCommand::NLST,
        FtpCommand::MLST,
        FtpCommand::MLSD,
        FtpCommand::CLNT,
        FtpCommand::OPTS,
        FtpCommand::PWD,
        FtpCommand::STOR,
        FtpCommand::CWD,
        FtpCommand::CDUP,
        FtpCommand::SIZE,
        FtpCommand::NOOP,
        FtpCommand::HELP,
        FtpCommand::FEAT,
    ];

    pub fn from_str(cmd: &str) -> Option<FtpCommand> {
        let cmd = cmd.to_ascii_uppercase();
        FtpCommand::ALL
            .iter()
            .copied()
            .find(|command| command.as_str() == cmd)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FtpCommand::ABOR => "ABOR",
            FtpCommand::DELE => "DELE",
            FtpCommand::USER => "USER",
            FtpCommand::PASS => "PASS",
            FtpCommand::SYST => "SYST",
            FtpCommand::TYPE => "TYPE",
            FtpCommand::PORT => "PORT",
            FtpCommand::EPRT => "EPRT",
            FtpCommand::RETR => "RETR",
            FtpCommand::MKD => "MKD",
            FtpCommand::RMD => "RMD",
            FtpCommand::REST => "REST",
            FtpCommand::MDTM => "MDTM",
            FtpCommand::PASV => "PASV",
            FtpCommand::EPSV => "EPSV",
            FtpCommand::QUIT => "QUIT",
            FtpCommand::LIST => "LIST",
            FtpCommand::NLST => "NLST",
            FtpCommand::MLST => "MLST",
            FtpCommand::MLSD => "MLSD",
            FtpCommand::CLNT => "CLNT",
            FtpCommand::OPTS => "OPTS",
            FtpCommand::PWD => "PWD",
            FtpCommand::STOR => "STOR",
            FtpCommand::CWD => "CWD",
            FtpCommand::CDUP => "CDUP",
            FtpCommand::SIZE => "SIZE",
            FtpCommand::NOOP => "NOOP",
            FtpCommand::HELP => "HELP",
            FtpCommand::FEAT => "FEAT",
        }
    }

    /// Commands that need the data channel.
    pub fn is_transfer(&self) -> bool {
        matches!(
            self,
            FtpCommand::LIST
                | FtpCommand::NLST
                | FtpCommand::MLSD
                | FtpCommand::RETR
                | FtpCommand::STOR
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!(FtpCommand::from_str("retr"), Some(FtpCommand::RETR));
        assert_eq!(FtpCommand::from_str("Mlsd"), Some(FtpCommand::MLSD));
        assert_eq!(FtpCommand::from_str("RNFR"), None);
        assert_eq!(FtpCommand::from_str(""), None);
    }

    #[test]
    fn test_every_verb_round_trips() {
        for command in FtpCommand::ALL {
            assert_eq!(FtpCommand::from_str(command.as_str()), Some(command));
        }
    }
}
