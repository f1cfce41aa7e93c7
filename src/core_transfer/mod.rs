pub mod engine;
pub mod listing;

pub use engine::{Step, TransferCursor, TransferError};
pub use listing::ListFormat;
