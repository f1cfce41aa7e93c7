use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

/// Maps the daemon's syslog-flavoured level names onto `log` filters.
///
/// `notice` has no direct counterpart in `log` and is treated as `info`.
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    match name.to_ascii_lowercase().as_str() {
        "none" => Some(LevelFilter::Off),
        "err" | "error" => Some(LevelFilter::Error),
        "warning" | "warn" => Some(LevelFilter::Warn),
        "notice" | "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        _ => None,
    }
}

/// Builds the process logger. `RUST_LOG`, when set, wins over `level`.
pub fn init_logger(level: LevelFilter) {
    let default = level.as_str().to_ascii_lowercase();
    let _ = Builder::from_env(Env::default().default_filter_or(default))
        .format(|buf, record| {
            let timestamp = buf.timestamp();
            writeln!(
                buf,
                "[{}] [{}] {}",
                timestamp,
                record.level(),
                record.args()
            )
        })
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level_names() {
        assert_eq!(parse_level("none"), Some(LevelFilter::Off));
        assert_eq!(parse_level("err"), Some(LevelFilter::Error));
        assert_eq!(parse_level("WARNING"), Some(LevelFilter::Warn));
        assert_eq!(parse_level("notice"), Some(LevelFilter::Info));
        assert_eq!(parse_level("info"), Some(LevelFilter::Info));
        assert_eq!(parse_level("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_level("chatty"), None);
    }
}
