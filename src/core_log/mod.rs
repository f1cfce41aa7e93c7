pub mod logger;

pub use logger::{init_logger, parse_level};
